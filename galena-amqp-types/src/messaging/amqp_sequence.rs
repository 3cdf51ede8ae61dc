use crate::composite::DescribedType;
use crate::error::Error;
use crate::value::Value;

/// 3.2.7 AMQP Sequence
///
/// A sequence section contains an arbitrary number of structured data
/// elements.
/// <type name="amqp-sequence" class="restricted" source="list" provides="section">
///     <descriptor name="amqp:amqp-sequence:list" code="0x00000000:0x00000076"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmqpSequence(pub Vec<Value>);

impl From<Vec<Value>> for AmqpSequence {
    fn from(val: Vec<Value>) -> Self {
        Self(val)
    }
}

impl DescribedType for AmqpSequence {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0076;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:amqp-sequence:list";

    fn to_body(&self) -> Value {
        Value::List(self.0.clone())
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        Vec::<Value>::try_from(value).map(Self)
    }
}
