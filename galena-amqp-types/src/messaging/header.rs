use crate::composite::{body_fields, default_to_null, truncate_fields, DescribedType};
use crate::definitions::Milliseconds;
use crate::error::Error;
use crate::value::Value;

/// 3.2.1 Header
///
/// Transport headers for a message.
/// <type name="header" class="composite" source="list" provides="section">
///     <descriptor name="amqp:header:list" code="0x00000000:0x00000070"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// <field name="durable" type="boolean" default="false"/>
    pub durable: bool,

    /// <field name="priority" type="ubyte" default="4"/>
    pub priority: Priority,

    /// <field name="ttl" type="milliseconds"/>
    pub ttl: Option<Milliseconds>,

    /// <field name="first-acquirer" type="boolean" default="false"/>
    pub first_acquirer: bool,

    /// <field name="delivery-count" type="uint" default="0"/>
    pub delivery_count: u32,
}

/// Relative message priority, default 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority(pub u8);

impl Default for Priority {
    fn default() -> Self {
        Priority(4)
    }
}

impl From<u8> for Priority {
    fn from(val: u8) -> Self {
        Priority(val)
    }
}

impl From<Priority> for Value {
    fn from(val: Priority) -> Self {
        Value::UByte(val.0)
    }
}

impl TryFrom<Value> for Priority {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        u8::try_from(value).map(Priority)
    }
}

impl DescribedType for Header {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0070;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:header:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            default_to_null(self.durable, false, Value::Bool),
            default_to_null(self.priority.0, 4, Value::UByte),
            Value::from(self.ttl),
            default_to_null(self.first_acquirer, false, Value::Bool),
            default_to_null(self.delivery_count, 0, Value::UInt),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            durable: fields.or_default()?,
            priority: fields.or_default()?,
            ttl: fields.optional()?,
            first_acquirer: fields.or_default()?,
            delivery_count: fields.or_default()?,
        })
    }
}
