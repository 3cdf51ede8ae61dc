use crate::composite::DescribedType;
use crate::error::Error;
use crate::primitives::Binary;
use crate::value::Value;

/// 3.2.6 Data
///
/// A data section contains opaque binary data.
/// <type name="data" class="restricted" source="binary" provides="section">
///     <descriptor name="amqp:data:binary" code="0x00000000:0x00000075"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Data(pub Binary);

impl Data {
    /// The payload bytes
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl From<Binary> for Data {
    fn from(val: Binary) -> Self {
        Self(val)
    }
}

impl From<Vec<u8>> for Data {
    fn from(val: Vec<u8>) -> Self {
        Self(Binary::from(val))
    }
}

impl DescribedType for Data {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0075;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:data:binary";

    fn to_body(&self) -> Value {
        Value::Binary(self.0.clone())
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        Binary::try_from(value).map(Self)
    }
}
