use crate::composite::DescribedType;
use crate::error::Error;
use crate::value::Value;

/// 3.2.8 AMQP Value
///
/// An amqp-value section contains a single AMQP value.
/// <type name="amqp-value" class="restricted" source="*" provides="section">
///     <descriptor name="amqp:amqp-value:*" code="0x00000000:0x00000077"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmqpValue(pub Value);

impl<T> From<T> for AmqpValue
where
    T: Into<Value>,
{
    fn from(val: T) -> Self {
        Self(val.into())
    }
}

impl DescribedType for AmqpValue {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0077;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:amqp-value:*";

    fn to_body(&self) -> Value {
        self.0.clone()
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        Ok(Self(value))
    }
}
