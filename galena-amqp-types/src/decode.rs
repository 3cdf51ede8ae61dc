//! The AMQP primitive decoder.
//!
//! Dispatch is by format code. `skip_value` walks a value using only the
//! declared sizes in the encoding, so skipping never allocates
//! sub-elements.

use crate::buffer::SliceReader;
use crate::described::{Described, Descriptor};
use crate::error::Error;
use crate::format_code::{Category, FormatCode};
use crate::primitives::{
    Array, Binary, Dec128, Dec32, Dec64, OrderedMap, Symbol, Timestamp, Uuid,
};
use crate::value::Value;

/// Decodes AMQP values from a byte slice.
#[derive(Debug)]
pub struct Decoder<'a> {
    reader: SliceReader<'a>,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over `slice`.
    pub fn new(slice: &'a [u8]) -> Self {
        Self {
            reader: SliceReader::new(slice),
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    /// Whether any bytes remain.
    pub fn has_remaining(&self) -> bool {
        self.reader.remaining() > 0
    }

    /// Peeks the next format code without consuming it.
    pub fn peek_format_code(&self) -> Result<FormatCode, Error> {
        FormatCode::try_from(self.reader.peek()?)
    }

    /// Reads one complete value.
    pub fn read_value(&mut self) -> Result<Value, Error> {
        let code = self.reader.read_u8()?;
        self.read_value_with_code(code)
    }

    /// Skips one complete value without allocating its sub-elements.
    pub fn skip_value(&mut self) -> Result<(), Error> {
        let code = self.reader.read_u8()?;
        match Category::of(code)? {
            Category::Described => {
                self.skip_value()?; // descriptor
                self.skip_value() // body
            }
            Category::Fixed(width) => self.reader.skip(width),
            Category::Variable8 => {
                let size = self.reader.read_u8()? as usize;
                self.reader.skip(size)
            }
            Category::Variable32 => {
                let size = self.reader.read_u32()? as usize;
                self.reader.skip(size)
            }
            // the declared size spans the count field and the body
            Category::Compound8 | Category::Array8 => {
                let size = self.reader.read_u8()? as usize;
                self.reader.skip(size)
            }
            Category::Compound32 | Category::Array32 => {
                let size = self.reader.read_u32()? as usize;
                self.reader.skip(size)
            }
        }
    }

    /// Reads the payload of a value whose constructor has already been
    /// consumed. Array decoding re-enters here with the shared element
    /// constructor.
    fn read_value_with_code(&mut self, code: u8) -> Result<Value, Error> {
        let code = FormatCode::try_from(code)?;
        let value = match code {
            FormatCode::Described => {
                let descriptor = self.read_descriptor()?;
                let value = self.read_value()?;
                Value::Described(Box::new(Described { descriptor, value }))
            }

            FormatCode::Null => Value::Null,

            FormatCode::Boolean => match self.reader.read_u8()? {
                0x00 => Value::Bool(false),
                0x01 => Value::Bool(true),
                _ => return Err(Error::InvalidValue),
            },
            FormatCode::BooleanTrue => Value::Bool(true),
            FormatCode::BooleanFalse => Value::Bool(false),

            FormatCode::UByte => Value::UByte(self.reader.read_u8()?),
            FormatCode::UShort => Value::UShort(self.reader.read_u16()?),

            FormatCode::UInt => Value::UInt(self.reader.read_u32()?),
            FormatCode::SmallUInt => Value::UInt(self.reader.read_u8()? as u32),
            FormatCode::UInt0 => Value::UInt(0),

            FormatCode::ULong => Value::ULong(self.reader.read_u64()?),
            FormatCode::SmallULong => Value::ULong(self.reader.read_u8()? as u64),
            FormatCode::ULong0 => Value::ULong(0),

            FormatCode::Byte => Value::Byte(self.reader.read_i8()?),
            FormatCode::Short => Value::Short(self.reader.read_i16()?),

            FormatCode::Int => Value::Int(self.reader.read_i32()?),
            FormatCode::SmallInt => Value::Int(self.reader.read_i8()? as i32),

            FormatCode::Long => Value::Long(self.reader.read_i64()?),
            FormatCode::SmallLong => Value::Long(self.reader.read_i8()? as i64),

            FormatCode::Float => Value::Float(self.reader.read_f32()?.into()),
            FormatCode::Double => Value::Double(self.reader.read_f64()?.into()),

            FormatCode::Decimal32 => Value::Dec32(Dec32::try_from(self.reader.read_bytes(4)?)?),
            FormatCode::Decimal64 => Value::Dec64(Dec64::try_from(self.reader.read_bytes(8)?)?),
            FormatCode::Decimal128 => {
                Value::Dec128(Dec128::try_from(self.reader.read_bytes(16)?)?)
            }

            FormatCode::Char => {
                let raw = self.reader.read_u32()?;
                let c = char::from_u32(raw).ok_or(Error::InvalidValue)?;
                Value::Char(c)
            }

            FormatCode::Timestamp => {
                Value::Timestamp(Timestamp::from_milliseconds(self.reader.read_i64()?))
            }

            FormatCode::Uuid => Value::Uuid(Uuid::try_from(self.reader.read_bytes(16)?)?),

            FormatCode::VBin8 => {
                let size = self.reader.read_u8()? as usize;
                Value::Binary(Binary::from(self.reader.read_bytes(size)?))
            }
            FormatCode::VBin32 => {
                let size = self.reader.read_u32()? as usize;
                Value::Binary(Binary::from(self.reader.read_bytes(size)?))
            }

            FormatCode::Str8 => {
                let size = self.reader.read_u8()? as usize;
                Value::String(std::str::from_utf8(self.reader.read_bytes(size)?)?.to_string())
            }
            FormatCode::Str32 => {
                let size = self.reader.read_u32()? as usize;
                Value::String(std::str::from_utf8(self.reader.read_bytes(size)?)?.to_string())
            }

            FormatCode::Sym8 => {
                let size = self.reader.read_u8()? as usize;
                Value::Symbol(Symbol::new(std::str::from_utf8(
                    self.reader.read_bytes(size)?,
                )?))
            }
            FormatCode::Sym32 => {
                let size = self.reader.read_u32()? as usize;
                Value::Symbol(Symbol::new(std::str::from_utf8(
                    self.reader.read_bytes(size)?,
                )?))
            }

            FormatCode::List0 => Value::List(Vec::new()),
            FormatCode::List8 => {
                let (count, end) = self.read_compound_header_8()?;
                let value = self.read_list_elements(count)?;
                self.check_consumed(end)?;
                value
            }
            FormatCode::List32 => {
                let (count, end) = self.read_compound_header_32()?;
                let value = self.read_list_elements(count)?;
                self.check_consumed(end)?;
                value
            }

            FormatCode::Map8 => {
                let (count, end) = self.read_compound_header_8()?;
                let value = self.read_map_entries(count)?;
                self.check_consumed(end)?;
                value
            }
            FormatCode::Map32 => {
                let (count, end) = self.read_compound_header_32()?;
                let value = self.read_map_entries(count)?;
                self.check_consumed(end)?;
                value
            }

            FormatCode::Array8 => {
                let (count, end) = self.read_compound_header_8()?;
                let value = self.read_array_elements(count)?;
                self.check_consumed(end)?;
                value
            }
            FormatCode::Array32 => {
                let (count, end) = self.read_compound_header_32()?;
                let value = self.read_array_elements(count)?;
                self.check_consumed(end)?;
                value
            }
        };
        Ok(value)
    }

    fn read_descriptor(&mut self) -> Result<Descriptor, Error> {
        match self.read_value()? {
            Value::ULong(code) => Ok(Descriptor::Code(code)),
            Value::Symbol(symbol) => Ok(Descriptor::Symbol(symbol)),
            _ => Err(Error::InvalidValue),
        }
    }

    /// Returns (count, end position). The declared size spans the count
    /// field and the body.
    fn read_compound_header_8(&mut self) -> Result<(usize, usize), Error> {
        let size = self.reader.read_u8()? as usize;
        if size < 1 || size > self.reader.remaining() {
            return Err(Error::InvalidLength);
        }
        let end = self.reader.position() + size;
        let count = self.reader.read_u8()? as usize;
        Ok((count, end))
    }

    fn read_compound_header_32(&mut self) -> Result<(usize, usize), Error> {
        let size = self.reader.read_u32()? as usize;
        if size < 4 || size > self.reader.remaining() {
            return Err(Error::InvalidLength);
        }
        let end = self.reader.position() + size;
        let count = self.reader.read_u32()? as usize;
        Ok((count, end))
    }

    fn check_consumed(&self, end: usize) -> Result<(), Error> {
        if self.reader.position() != end {
            return Err(Error::InvalidLength);
        }
        Ok(())
    }

    fn read_list_elements(&mut self, count: usize) -> Result<Value, Error> {
        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            elements.push(self.read_value()?);
        }
        Ok(Value::List(elements))
    }

    fn read_map_entries(&mut self, count: usize) -> Result<Value, Error> {
        if count % 2 != 0 {
            return Err(Error::InvalidLength);
        }
        let mut map = OrderedMap::with_capacity(count / 2);
        for _ in 0..count / 2 {
            let key = self.read_value()?;
            let value = self.read_value()?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn read_array_elements(&mut self, count: usize) -> Result<Value, Error> {
        let code = self.reader.read_u8()?;
        if code == FormatCode::Described as u8 {
            let descriptor = self.read_descriptor()?;
            let element_code = self.reader.read_u8()?;
            let mut elements = Vec::with_capacity(count);
            for _ in 0..count {
                let body = self.read_value_with_code(element_code)?;
                elements.push(Value::Described(Box::new(Described {
                    descriptor: descriptor.clone(),
                    value: body,
                })));
            }
            Ok(Value::Array(Array(elements)))
        } else {
            let mut elements = Vec::with_capacity(count);
            for _ in 0..count {
                elements.push(self.read_value_with_code(code)?);
            }
            Ok(Value::Array(Array(elements)))
        }
    }
}

/// Decodes a single value from the front of `slice`.
pub fn from_slice(slice: &[u8]) -> Result<Value, Error> {
    Decoder::new(slice).read_value()
}

#[cfg(test)]
mod tests {
    use super::{from_slice, Decoder};
    use crate::described::Descriptor;
    use crate::encode::to_vec;
    use crate::primitives::{Array, Binary, OrderedMap, Symbol, Timestamp, Uuid};
    use crate::value::Value;

    fn round_trip(value: Value) {
        let buf = to_vec(&value).unwrap();
        let decoded = from_slice(&buf).unwrap();
        assert_eq!(decoded, value);
        // canonical re-encoding is byte identical
        assert_eq!(to_vec(&decoded).unwrap(), buf);
    }

    #[test]
    fn primitive_round_trips() {
        round_trip(Value::Null);
        round_trip(Value::Bool(true));
        round_trip(Value::Bool(false));
        round_trip(Value::UByte(0x7f));
        round_trip(Value::UShort(0xbeef));
        round_trip(Value::UInt(0));
        round_trip(Value::UInt(255));
        round_trip(Value::UInt(65_536));
        round_trip(Value::ULong(0));
        round_trip(Value::ULong(0x13));
        round_trip(Value::ULong(1 << 40));
        round_trip(Value::Byte(-1));
        round_trip(Value::Short(-513));
        round_trip(Value::Int(-127));
        round_trip(Value::Int(1 << 20));
        round_trip(Value::Long(-100));
        round_trip(Value::Long(i64::MIN));
        round_trip(Value::Float(1.5f32.into()));
        round_trip(Value::Double(std::f64::consts::PI.into()));
        round_trip(Value::Char('q'));
        round_trip(Value::Char('\u{1F980}'));
        round_trip(Value::Timestamp(Timestamp::from_milliseconds(1_234_567)));
        round_trip(Value::Uuid(Uuid::from([0xab; 16])));
        round_trip(Value::Binary(Binary::from(vec![0u8; 300])));
        round_trip(Value::String("hello".to_string()));
        round_trip(Value::Symbol(Symbol::from("amqp:decode-error")));
    }

    #[test]
    fn compound_round_trips() {
        round_trip(Value::List(vec![
            Value::from("hello"),
            Value::Null,
            Value::from(42u32),
        ]));

        let mut map = OrderedMap::new();
        map.insert(Value::from(Symbol::from("key")), Value::from(10u64));
        map.insert(Value::from("str"), Value::Bool(false));
        round_trip(Value::Map(map));

        let array: Array<Value> = vec![Value::from(1u32), Value::from(2u32)].into();
        round_trip(Value::Array(array));
    }

    #[test]
    fn described_round_trip() {
        let described = crate::described::Described {
            descriptor: Descriptor::Code(0x10),
            value: Value::List(vec![Value::from("container")]),
        };
        round_trip(Value::from(described));
    }

    #[test]
    fn skip_value_consumes_exact_bytes() {
        let value = Value::List(vec![
            Value::from("hello"),
            Value::from(42u32),
            Value::Binary(Binary::from(vec![1u8, 2, 3])),
        ]);
        let mut buf = to_vec(&value).unwrap();
        let total = buf.len();
        buf.extend_from_slice(&[0xff, 0xff]); // trailing garbage stays untouched

        let mut decoder = Decoder::new(&buf);
        decoder.skip_value().unwrap();
        assert_eq!(decoder.position(), total);
    }

    #[test]
    fn skip_described_value() {
        let described = crate::described::Described {
            descriptor: Descriptor::Symbol(Symbol::from("amqp:open:list")),
            value: Value::List(vec![Value::from("id")]),
        };
        let buf = to_vec(&Value::from(described)).unwrap();
        let mut decoder = Decoder::new(&buf);
        decoder.skip_value().unwrap();
        assert_eq!(decoder.position(), buf.len());
    }

    #[test]
    fn truncated_input_is_an_error() {
        let buf = to_vec(&Value::from("hello world")).unwrap();
        assert!(from_slice(&buf[..buf.len() - 1]).is_err());
    }

    #[test]
    fn declared_size_must_match() {
        // list8 claiming 10 bytes of content but only carrying 2
        let buf = [0xc0u8, 0x0a, 0x01, 0x43];
        assert!(from_slice(&buf).is_err());
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let buf = [0xa1u8, 0x02, 0xff, 0xfe];
        assert!(from_slice(&buf).is_err());
    }

    #[test]
    fn described_array_shares_descriptor() {
        let described = |n: u32| {
            Value::from(crate::described::Described {
                descriptor: Descriptor::Code(0x77),
                value: Value::List(vec![Value::from(n)]),
            })
        };
        let array: Array<Value> = vec![described(1), described(2)].into();
        round_trip(Value::Array(array));
    }
}
