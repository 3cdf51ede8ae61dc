use crate::composite::{body_fields, truncate_fields, DescribedType};
use crate::error::Error as CodecError;
use crate::value::Value;

use super::{ErrorCondition, Fields};

/// 2.8.14 Error
///
/// Details of an error.
/// <type name="error" class="composite" source="list">
/// <descriptor name="amqp:error:list" code="0x00000000:0x0000001d"/>
/// </type>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// <field name="condition" type="symbol" requires="error-condition" mandatory="true"/>
    pub condition: ErrorCondition,

    /// <field name="description" type="string"/>
    pub description: Option<String>,

    /// <field name="info" type="fields"/>
    pub info: Option<Fields>,
}

impl Error {
    /// Creates a new [`Error`]
    pub fn new(
        condition: impl Into<ErrorCondition>,
        description: Option<String>,
        info: Option<Fields>,
    ) -> Self {
        Self {
            condition: condition.into(),
            description,
            info,
        }
    }
}

impl<T> From<T> for Error
where
    T: Into<ErrorCondition>,
{
    fn from(condition: T) -> Self {
        Self {
            condition: condition.into(),
            description: None,
            info: None,
        }
    }
}

impl DescribedType for Error {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_001d;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:error:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            self.condition.clone().into(),
            Value::from(self.description.clone()),
            Value::from(self.info.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, CodecError> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            condition: fields.required("condition")?,
            description: fields.optional()?,
            info: fields.optional()?,
        })
    }
}

impl From<Error> for Value {
    fn from(err: Error) -> Self {
        err.to_value()
    }
}

impl TryFrom<Value> for Error {
    type Error = CodecError;

    fn try_from(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Described(d) => Error::from_described(*d),
            _ => Err(CodecError::InvalidValue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::composite::DescribedType;
    use crate::decode::from_slice;
    use crate::definitions::AmqpError;
    use crate::encode::to_vec;

    #[test]
    fn error_round_trip() {
        let expected = Error::new(AmqpError::DecodeError, None, None);
        let buf = to_vec(&expected.to_value()).unwrap();
        let decoded = Error::try_from(from_slice(&buf).unwrap()).unwrap();
        assert_eq!(expected, decoded);
    }

    #[test]
    fn trailing_absent_fields_truncate() {
        let error = Error::new(AmqpError::NotFound, None, None);
        let buf = to_vec(&error.to_value()).unwrap();
        // descriptor (0x00 smallulong 0x1d), then list8 of one field
        assert_eq!(buf[0], 0x00);
        assert_eq!(buf[3], 0xc0);
        assert_eq!(buf[5], 1); // count: only the condition survives
    }
}
