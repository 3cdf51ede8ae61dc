//! Trait and helpers for described composite types.
//!
//! Performatives, messaging sections, terminus types, delivery states, and
//! SASL frame bodies are all described types whose descriptor has a numeric
//! and a symbolic form. List-bodied composites use positional, nullable
//! fields: on encode the list is truncated after the highest non-null
//! field; on decode missing or null trailing fields read as absent and
//! unknown trailing fields are ignored.

use crate::described::{Described, Descriptor};
use crate::error::Error;
use crate::value::Value;

/// A type with a registered descriptor, convertible to and from its
/// described wire form.
pub trait DescribedType: Sized {
    /// Numeric descriptor, `(domain << 32) | id`
    const DESCRIPTOR_CODE: u64;
    /// Symbolic descriptor
    const DESCRIPTOR_SYMBOL: &'static str;

    /// The body of the described value.
    fn to_body(&self) -> Value;

    /// Rebuilds the type from a decoded body.
    fn from_body(value: Value) -> Result<Self, Error>;

    /// Whether a decoded descriptor names this type, in either form.
    fn matches(descriptor: &Descriptor) -> bool {
        match descriptor {
            Descriptor::Code(code) => *code == Self::DESCRIPTOR_CODE,
            Descriptor::Symbol(symbol) => symbol.as_str() == Self::DESCRIPTOR_SYMBOL,
        }
    }

    /// The full described value, with the numeric descriptor.
    fn to_value(&self) -> Value {
        Value::Described(Box::new(Described {
            descriptor: Descriptor::Code(Self::DESCRIPTOR_CODE),
            value: self.to_body(),
        }))
    }

    /// Rebuilds the type from a decoded described value, verifying the
    /// descriptor.
    fn from_described(described: Described<Value>) -> Result<Self, Error> {
        if !Self::matches(&described.descriptor) {
            return Err(Error::InvalidValue);
        }
        Self::from_body(described.value)
    }
}

/// A defaulted field encodes as null when it holds its default, letting
/// the list truncate.
pub fn default_to_null<T: PartialEq>(
    value: T,
    default: T,
    to_value: impl FnOnce(T) -> Value,
) -> Value {
    if value == default {
        Value::Null
    } else {
        to_value(value)
    }
}

/// Truncates a positional field list after the highest non-null field.
pub fn truncate_fields(mut fields: Vec<Value>) -> Vec<Value> {
    while let Some(Value::Null) = fields.last() {
        fields.pop();
    }
    fields
}

/// Converts a list body into a positional field reader.
///
/// A null body reads as an empty list, which some encoders emit for
/// composites with no populated fields.
pub fn body_fields(value: Value) -> Result<FieldReader, Error> {
    match value {
        Value::List(fields) => Ok(FieldReader::new(fields)),
        Value::Null => Ok(FieldReader::new(Vec::new())),
        _ => Err(Error::InvalidValue),
    }
}

/// Positional reader over a composite's decoded field list.
///
/// Fields beyond the reader's consumption are dropped, which is what makes
/// decoders forward compatible with peers that send more fields than this
/// implementation knows about.
#[derive(Debug)]
pub struct FieldReader {
    iter: std::vec::IntoIter<Value>,
}

impl FieldReader {
    /// Creates a reader over a decoded field list.
    pub fn new(fields: Vec<Value>) -> Self {
        Self {
            iter: fields.into_iter(),
        }
    }

    fn next(&mut self) -> Option<Value> {
        self.iter.next()
    }

    /// Reads an optional field; null or missing reads as `None`.
    pub fn optional<T>(&mut self) -> Result<Option<T>, Error>
    where
        T: TryFrom<Value, Error = Error>,
    {
        match self.next() {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::try_from(value).map(Some),
        }
    }

    /// Reads a mandatory field; null or missing is an error naming the
    /// field.
    pub fn required<T>(&mut self, name: &'static str) -> Result<T, Error>
    where
        T: TryFrom<Value, Error = Error>,
    {
        match self.next() {
            None | Some(Value::Null) => Err(Error::MandatoryFieldAbsent(name)),
            Some(value) => T::try_from(value),
        }
    }

    /// Reads a defaulted field; null or missing reads as the default.
    pub fn or_default<T>(&mut self) -> Result<T, Error>
    where
        T: Default + TryFrom<Value, Error = Error>,
    {
        match self.next() {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => T::try_from(value),
        }
    }

    /// Reads an optional field as a raw [`Value`].
    pub fn optional_value(&mut self) -> Option<Value> {
        match self.next() {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{truncate_fields, FieldReader};
    use crate::value::Value;

    #[test]
    fn truncation_drops_trailing_nulls_only() {
        let fields = vec![
            Value::from("a"),
            Value::Null,
            Value::from(1u32),
            Value::Null,
            Value::Null,
        ];
        let truncated = truncate_fields(fields);
        assert_eq!(
            truncated,
            vec![Value::from("a"), Value::Null, Value::from(1u32)]
        );
    }

    #[test]
    fn missing_trailing_fields_read_as_absent() {
        let mut reader = FieldReader::new(vec![Value::from("name")]);
        assert_eq!(reader.required::<String>("name").unwrap(), "name");
        assert_eq!(reader.optional::<u32>().unwrap(), None);
        assert_eq!(reader.or_default::<bool>().unwrap(), false);
    }
}
