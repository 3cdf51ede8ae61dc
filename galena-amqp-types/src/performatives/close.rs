use crate::composite::{body_fields, truncate_fields, DescribedType};
use crate::definitions::Error as WireError;
use crate::error::Error;
use crate::value::Value;

/// 2.7.9 Close
///
/// Signal a connection close.
/// <type name="close" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:close:list" code="0x00000000:0x00000018"/>
/// </type>
#[derive(Debug, Clone, Default)]
pub struct Close {
    /// <field name="error" type="error"/>
    pub error: Option<WireError>,
}

impl DescribedType for Close {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0018;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:close:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![Value::from(self.error.clone())]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            error: fields.optional()?,
        })
    }
}
