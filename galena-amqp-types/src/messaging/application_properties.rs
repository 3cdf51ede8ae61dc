use crate::composite::DescribedType;
use crate::error::Error;
use crate::primitives::OrderedMap;
use crate::value::Value;

/// 3.2.5 Application Properties
///
/// The application-properties section is a part of the bare message used
/// for structured application data.
/// <type name="application-properties" class="restricted" source="map" provides="section">
///     <descriptor name="amqp:application-properties:map" code="0x00000000:0x00000074"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationProperties(pub OrderedMap<String, Value>);

impl ApplicationProperties {
    /// Creates an empty section
    pub fn new() -> Self {
        Self(OrderedMap::new())
    }
}

impl From<OrderedMap<String, Value>> for ApplicationProperties {
    fn from(val: OrderedMap<String, Value>) -> Self {
        Self(val)
    }
}

impl DescribedType for ApplicationProperties {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0074;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:application-properties:map";

    fn to_body(&self) -> Value {
        Value::from(self.0.clone())
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        OrderedMap::<String, Value>::try_from(value).map(Self)
    }
}
