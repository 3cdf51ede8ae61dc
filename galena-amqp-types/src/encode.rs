//! The AMQP primitive encoder.
//!
//! Every write picks the smallest legal format code for the value: zero and
//! one-octet integers use their zero-width and small codes, short strings
//! and binaries use the 8-bit-size codes, and compound values pick the
//! 8-bit header when both size and count fit.

use bytes::{BufMut, BytesMut};

use crate::described::{Described, Descriptor};
use crate::error::Error;
use crate::format_code::FormatCode;
use crate::primitives::{Array, Dec128, Dec32, Dec64, Timestamp, Uuid};
use crate::value::Value;

/// Encodes AMQP values into a [`BytesMut`].
#[derive(Debug)]
pub struct Encoder<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> Encoder<'a> {
    /// Creates an encoder appending to `buf`.
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    /// Writes a null value.
    pub fn write_null(&mut self) {
        self.buf.put_u8(FormatCode::Null as u8);
    }

    /// Writes a boolean using the zero-width true/false codes.
    pub fn write_boolean(&mut self, value: bool) {
        let code = match value {
            true => FormatCode::BooleanTrue,
            false => FormatCode::BooleanFalse,
        };
        self.buf.put_u8(code as u8);
    }

    /// Writes an unsigned byte.
    pub fn write_ubyte(&mut self, value: u8) {
        self.buf.put_u8(FormatCode::UByte as u8);
        self.buf.put_u8(value);
    }

    /// Writes an unsigned short.
    pub fn write_ushort(&mut self, value: u16) {
        self.buf.put_u8(FormatCode::UShort as u8);
        self.buf.put_u16(value);
    }

    /// Writes an unsigned int with the smallest legal code.
    pub fn write_uint(&mut self, value: u32) {
        if value == 0 {
            self.buf.put_u8(FormatCode::UInt0 as u8);
        } else if value <= u8::MAX as u32 {
            self.buf.put_u8(FormatCode::SmallUInt as u8);
            self.buf.put_u8(value as u8);
        } else {
            self.buf.put_u8(FormatCode::UInt as u8);
            self.buf.put_u32(value);
        }
    }

    /// Writes an unsigned long with the smallest legal code.
    pub fn write_ulong(&mut self, value: u64) {
        if value == 0 {
            self.buf.put_u8(FormatCode::ULong0 as u8);
        } else if value <= u8::MAX as u64 {
            self.buf.put_u8(FormatCode::SmallULong as u8);
            self.buf.put_u8(value as u8);
        } else {
            self.buf.put_u8(FormatCode::ULong as u8);
            self.buf.put_u64(value);
        }
    }

    /// Writes a signed byte.
    pub fn write_byte(&mut self, value: i8) {
        self.buf.put_u8(FormatCode::Byte as u8);
        self.buf.put_i8(value);
    }

    /// Writes a signed short.
    pub fn write_short(&mut self, value: i16) {
        self.buf.put_u8(FormatCode::Short as u8);
        self.buf.put_i16(value);
    }

    /// Writes a signed int with the smallest legal code.
    pub fn write_int(&mut self, value: i32) {
        if value >= i8::MIN as i32 && value <= i8::MAX as i32 {
            self.buf.put_u8(FormatCode::SmallInt as u8);
            self.buf.put_i8(value as i8);
        } else {
            self.buf.put_u8(FormatCode::Int as u8);
            self.buf.put_i32(value);
        }
    }

    /// Writes a signed long with the smallest legal code.
    pub fn write_long(&mut self, value: i64) {
        if value >= i8::MIN as i64 && value <= i8::MAX as i64 {
            self.buf.put_u8(FormatCode::SmallLong as u8);
            self.buf.put_i8(value as i8);
        } else {
            self.buf.put_u8(FormatCode::Long as u8);
            self.buf.put_i64(value);
        }
    }

    /// Writes an IEEE 754 binary32.
    pub fn write_float(&mut self, value: f32) {
        self.buf.put_u8(FormatCode::Float as u8);
        self.buf.put_f32(value);
    }

    /// Writes an IEEE 754 binary64.
    pub fn write_double(&mut self, value: f64) {
        self.buf.put_u8(FormatCode::Double as u8);
        self.buf.put_f64(value);
    }

    /// Writes a decimal32.
    pub fn write_dec32(&mut self, value: &Dec32) {
        self.buf.put_u8(FormatCode::Decimal32 as u8);
        self.buf.put_slice(value.as_inner());
    }

    /// Writes a decimal64.
    pub fn write_dec64(&mut self, value: &Dec64) {
        self.buf.put_u8(FormatCode::Decimal64 as u8);
        self.buf.put_slice(value.as_inner());
    }

    /// Writes a decimal128.
    pub fn write_dec128(&mut self, value: &Dec128) {
        self.buf.put_u8(FormatCode::Decimal128 as u8);
        self.buf.put_slice(value.as_inner());
    }

    /// Writes a character as UTF-32.
    pub fn write_char(&mut self, value: char) {
        self.buf.put_u8(FormatCode::Char as u8);
        self.buf.put_u32(value as u32);
    }

    /// Writes a timestamp.
    pub fn write_timestamp(&mut self, value: Timestamp) {
        self.buf.put_u8(FormatCode::Timestamp as u8);
        self.buf.put_i64(value.milliseconds());
    }

    /// Writes a uuid.
    pub fn write_uuid(&mut self, value: &Uuid) {
        self.buf.put_u8(FormatCode::Uuid as u8);
        self.buf.put_slice(value.as_inner());
    }

    /// Writes a binary with the smallest legal code.
    pub fn write_binary(&mut self, value: &[u8]) {
        if value.len() <= u8::MAX as usize {
            self.buf.put_u8(FormatCode::VBin8 as u8);
            self.buf.put_u8(value.len() as u8);
        } else {
            self.buf.put_u8(FormatCode::VBin32 as u8);
            self.buf.put_u32(value.len() as u32);
        }
        self.buf.put_slice(value);
    }

    /// Writes a string with the smallest legal code.
    pub fn write_string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        if bytes.len() <= u8::MAX as usize {
            self.buf.put_u8(FormatCode::Str8 as u8);
            self.buf.put_u8(bytes.len() as u8);
        } else {
            self.buf.put_u8(FormatCode::Str32 as u8);
            self.buf.put_u32(bytes.len() as u32);
        }
        self.buf.put_slice(bytes);
    }

    /// Writes a symbol with the smallest legal code.
    pub fn write_symbol(&mut self, value: &str) {
        let bytes = value.as_bytes();
        if bytes.len() <= u8::MAX as usize {
            self.buf.put_u8(FormatCode::Sym8 as u8);
            self.buf.put_u8(bytes.len() as u8);
        } else {
            self.buf.put_u8(FormatCode::Sym32 as u8);
            self.buf.put_u32(bytes.len() as u32);
        }
        self.buf.put_slice(bytes);
    }

    /// Writes a list, choosing `list0`/`list8`/`list32` by size and count.
    pub fn write_list(&mut self, values: &[Value]) -> Result<(), Error> {
        if values.is_empty() {
            self.buf.put_u8(FormatCode::List0 as u8);
            return Ok(());
        }

        let mut body = BytesMut::new();
        {
            let mut encoder = Encoder::new(&mut body);
            for value in values {
                encoder.write_value(value)?;
            }
        }
        self.write_compound_header(FormatCode::List8, FormatCode::List32, &body, values.len());
        self.buf.put_slice(&body);
        Ok(())
    }

    /// Writes a map; the count is twice the number of entries.
    pub fn write_map<'v, I>(&mut self, entries: I, len: usize) -> Result<(), Error>
    where
        I: IntoIterator<Item = (&'v Value, &'v Value)>,
    {
        let mut body = BytesMut::new();
        {
            let mut encoder = Encoder::new(&mut body);
            for (key, value) in entries {
                encoder.write_value(key)?;
                encoder.write_value(value)?;
            }
        }
        self.write_compound_header(FormatCode::Map8, FormatCode::Map32, &body, len * 2);
        self.buf.put_slice(&body);
        Ok(())
    }

    /// Writes an array: one element constructor shared by all elements.
    pub fn write_array(&mut self, values: &Array<Value>) -> Result<(), Error> {
        let mut body = BytesMut::new();
        {
            let mut encoder = Encoder::new(&mut body);
            encoder.write_array_elements(values)?;
        }
        self.write_compound_header(FormatCode::Array8, FormatCode::Array32, &body, values.len());
        self.buf.put_slice(&body);
        Ok(())
    }

    /// Writes a described value: the `0x00` marker, the descriptor, then
    /// the body.
    pub fn write_described(&mut self, value: &Described<Value>) -> Result<(), Error> {
        self.buf.put_u8(FormatCode::Described as u8);
        self.write_descriptor(&value.descriptor);
        self.write_value(&value.value)
    }

    /// Writes any [`Value`].
    pub fn write_value(&mut self, value: &Value) -> Result<(), Error> {
        match value {
            Value::Described(described) => self.write_described(described)?,
            Value::Null => self.write_null(),
            Value::Bool(v) => self.write_boolean(*v),
            Value::UByte(v) => self.write_ubyte(*v),
            Value::UShort(v) => self.write_ushort(*v),
            Value::UInt(v) => self.write_uint(*v),
            Value::ULong(v) => self.write_ulong(*v),
            Value::Byte(v) => self.write_byte(*v),
            Value::Short(v) => self.write_short(*v),
            Value::Int(v) => self.write_int(*v),
            Value::Long(v) => self.write_long(*v),
            Value::Float(v) => self.write_float(v.into_inner()),
            Value::Double(v) => self.write_double(v.into_inner()),
            Value::Dec32(v) => self.write_dec32(v),
            Value::Dec64(v) => self.write_dec64(v),
            Value::Dec128(v) => self.write_dec128(v),
            Value::Char(v) => self.write_char(*v),
            Value::Timestamp(v) => self.write_timestamp(*v),
            Value::Uuid(v) => self.write_uuid(v),
            Value::Binary(v) => self.write_binary(v),
            Value::String(v) => self.write_string(v),
            Value::Symbol(v) => self.write_symbol(v.as_str()),
            Value::List(v) => self.write_list(v)?,
            Value::Map(v) => self.write_map(v.iter(), v.len())?,
            Value::Array(v) => self.write_array(v)?,
        }
        Ok(())
    }

    fn write_descriptor(&mut self, descriptor: &Descriptor) {
        match descriptor {
            Descriptor::Code(code) => self.write_ulong(*code),
            Descriptor::Symbol(symbol) => self.write_symbol(symbol.as_str()),
        }
    }

    /// Compound headers: the declared size spans the count field and the
    /// body.
    fn write_compound_header(
        &mut self,
        narrow: FormatCode,
        wide: FormatCode,
        body: &BytesMut,
        count: usize,
    ) {
        if body.len() + 1 <= u8::MAX as usize && count <= u8::MAX as usize {
            self.buf.put_u8(narrow as u8);
            self.buf.put_u8((body.len() + 1) as u8);
            self.buf.put_u8(count as u8);
        } else {
            self.buf.put_u8(wide as u8);
            self.buf.put_u32((body.len() + 4) as u32);
            self.buf.put_u32(count as u32);
        }
    }

    /// Writes the shared element constructor followed by the element
    /// bodies. Array elements use the widest encoding of their type so one
    /// constructor fits all of them.
    fn write_array_elements(&mut self, values: &Array<Value>) -> Result<(), Error> {
        let first = match values.first() {
            Some(first) => first,
            None => {
                // an empty array still carries a constructor
                self.buf.put_u8(FormatCode::Null as u8);
                return Ok(());
            }
        };

        match first {
            Value::Described(first) => {
                self.buf.put_u8(FormatCode::Described as u8);
                self.write_descriptor(&first.descriptor);
                let code = wide_code(&first.value)?;
                self.buf.put_u8(code as u8);
                for value in values.iter() {
                    let described = match value {
                        Value::Described(d) if d.descriptor == first.descriptor => d,
                        _ => return Err(Error::InvalidValue),
                    };
                    self.write_wide_body(code, &described.value)?;
                }
            }
            _ => {
                let code = wide_code(first)?;
                self.buf.put_u8(code as u8);
                for value in values.iter() {
                    self.write_wide_body(code, value)?;
                }
            }
        }
        Ok(())
    }

    /// Writes a value's payload without its constructor, in the widest
    /// encoding of its type.
    fn write_wide_body(&mut self, code: FormatCode, value: &Value) -> Result<(), Error> {
        match (code, value) {
            (FormatCode::Null, Value::Null) => {}
            (FormatCode::Boolean, Value::Bool(v)) => self.buf.put_u8(*v as u8),
            (FormatCode::UByte, Value::UByte(v)) => self.buf.put_u8(*v),
            (FormatCode::UShort, Value::UShort(v)) => self.buf.put_u16(*v),
            (FormatCode::UInt, Value::UInt(v)) => self.buf.put_u32(*v),
            (FormatCode::ULong, Value::ULong(v)) => self.buf.put_u64(*v),
            (FormatCode::Byte, Value::Byte(v)) => self.buf.put_i8(*v),
            (FormatCode::Short, Value::Short(v)) => self.buf.put_i16(*v),
            (FormatCode::Int, Value::Int(v)) => self.buf.put_i32(*v),
            (FormatCode::Long, Value::Long(v)) => self.buf.put_i64(*v),
            (FormatCode::Float, Value::Float(v)) => self.buf.put_f32(v.into_inner()),
            (FormatCode::Double, Value::Double(v)) => self.buf.put_f64(v.into_inner()),
            (FormatCode::Decimal32, Value::Dec32(v)) => self.buf.put_slice(v.as_inner()),
            (FormatCode::Decimal64, Value::Dec64(v)) => self.buf.put_slice(v.as_inner()),
            (FormatCode::Decimal128, Value::Dec128(v)) => self.buf.put_slice(v.as_inner()),
            (FormatCode::Char, Value::Char(v)) => self.buf.put_u32(*v as u32),
            (FormatCode::Timestamp, Value::Timestamp(v)) => self.buf.put_i64(v.milliseconds()),
            (FormatCode::Uuid, Value::Uuid(v)) => self.buf.put_slice(v.as_inner()),
            (FormatCode::VBin32, Value::Binary(v)) => {
                self.buf.put_u32(v.len() as u32);
                self.buf.put_slice(v);
            }
            (FormatCode::Str32, Value::String(v)) => {
                self.buf.put_u32(v.len() as u32);
                self.buf.put_slice(v.as_bytes());
            }
            (FormatCode::Sym32, Value::Symbol(v)) => {
                self.buf.put_u32(v.as_str().len() as u32);
                self.buf.put_slice(v.as_str().as_bytes());
            }
            (FormatCode::List32, Value::List(v)) => {
                let mut body = BytesMut::new();
                {
                    let mut encoder = Encoder::new(&mut body);
                    for value in v {
                        encoder.write_value(value)?;
                    }
                }
                self.buf.put_u32((body.len() + 4) as u32);
                self.buf.put_u32(v.len() as u32);
                self.buf.put_slice(&body);
            }
            (FormatCode::Map32, Value::Map(v)) => {
                let mut body = BytesMut::new();
                {
                    let mut encoder = Encoder::new(&mut body);
                    for (key, value) in v.iter() {
                        encoder.write_value(key)?;
                        encoder.write_value(value)?;
                    }
                }
                self.buf.put_u32((body.len() + 4) as u32);
                self.buf.put_u32((v.len() * 2) as u32);
                self.buf.put_slice(&body);
            }
            (FormatCode::Array32, Value::Array(v)) => {
                let mut body = BytesMut::new();
                {
                    let mut encoder = Encoder::new(&mut body);
                    encoder.write_array_elements(v)?;
                }
                self.buf.put_u32((body.len() + 4) as u32);
                self.buf.put_u32(v.len() as u32);
                self.buf.put_slice(&body);
            }
            _ => return Err(Error::InvalidValue),
        }
        Ok(())
    }
}

/// The widest constructor for a value, used for array elements.
fn wide_code(value: &Value) -> Result<FormatCode, Error> {
    let code = match value {
        Value::Null => FormatCode::Null,
        Value::Bool(_) => FormatCode::Boolean,
        Value::UByte(_) => FormatCode::UByte,
        Value::UShort(_) => FormatCode::UShort,
        Value::UInt(_) => FormatCode::UInt,
        Value::ULong(_) => FormatCode::ULong,
        Value::Byte(_) => FormatCode::Byte,
        Value::Short(_) => FormatCode::Short,
        Value::Int(_) => FormatCode::Int,
        Value::Long(_) => FormatCode::Long,
        Value::Float(_) => FormatCode::Float,
        Value::Double(_) => FormatCode::Double,
        Value::Dec32(_) => FormatCode::Decimal32,
        Value::Dec64(_) => FormatCode::Decimal64,
        Value::Dec128(_) => FormatCode::Decimal128,
        Value::Char(_) => FormatCode::Char,
        Value::Timestamp(_) => FormatCode::Timestamp,
        Value::Uuid(_) => FormatCode::Uuid,
        Value::Binary(_) => FormatCode::VBin32,
        Value::String(_) => FormatCode::Str32,
        Value::Symbol(_) => FormatCode::Sym32,
        Value::List(_) => FormatCode::List32,
        Value::Map(_) => FormatCode::Map32,
        Value::Array(_) => FormatCode::Array32,
        // nested described constructors are handled by the caller
        Value::Described(_) => return Err(Error::InvalidValue),
    };
    Ok(code)
}

/// Encodes a single value to a fresh byte vector.
pub fn to_vec(value: &Value) -> Result<Vec<u8>, Error> {
    let mut buf = BytesMut::new();
    Encoder::new(&mut buf).write_value(value)?;
    Ok(buf.to_vec())
}

#[cfg(test)]
mod tests {
    use super::to_vec;
    use crate::format_code::FormatCode;
    use crate::primitives::{Array, Symbol};
    use crate::value::Value;

    #[test]
    fn uint_picks_smallest_code() {
        assert_eq!(to_vec(&Value::UInt(0)).unwrap(), vec![0x43]);
        assert_eq!(to_vec(&Value::UInt(0xff)).unwrap(), vec![0x52, 0xff]);
        assert_eq!(
            to_vec(&Value::UInt(0x100)).unwrap(),
            vec![0x70, 0x00, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn booleans_use_zero_width_codes() {
        assert_eq!(to_vec(&Value::Bool(true)).unwrap(), vec![0x41]);
        assert_eq!(to_vec(&Value::Bool(false)).unwrap(), vec![0x42]);
    }

    #[test]
    fn empty_list_is_list0() {
        assert_eq!(to_vec(&Value::List(vec![])).unwrap(), vec![0x45]);
    }

    #[test]
    fn small_list_uses_list8() {
        let buf = to_vec(&Value::List(vec![Value::UInt(1), Value::UInt(2)])).unwrap();
        // list8, size (count byte + two smalluint), count, elements
        assert_eq!(buf, vec![0xc0, 0x05, 0x02, 0x52, 0x01, 0x52, 0x02]);
    }

    #[test]
    fn symbol_array_shares_one_constructor() {
        let array: Array<Value> = vec![
            Value::Symbol(Symbol::from("ANONYMOUS")),
            Value::Symbol(Symbol::from("PLAIN")),
        ]
        .into();
        let buf = to_vec(&Value::Array(array)).unwrap();
        assert_eq!(buf[0], FormatCode::Array8 as u8);
        assert_eq!(buf[2], 2); // count
        assert_eq!(buf[3], FormatCode::Sym32 as u8);
    }

    #[test]
    fn long_string_uses_str32() {
        let long = "x".repeat(300);
        let buf = to_vec(&Value::from(long)).unwrap();
        assert_eq!(buf[0], FormatCode::Str32 as u8);
        assert_eq!(buf.len(), 1 + 4 + 300);
    }
}
