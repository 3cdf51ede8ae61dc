use crate::composite::{body_fields, truncate_fields, DescribedType};
use crate::definitions::Error as WireError;
use crate::error::Error;
use crate::value::Value;

/// 2.7.8 End
///
/// End the session.
/// <type name="end" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:end:list" code="0x00000000:0x00000017"/>
/// </type>
#[derive(Debug, Clone, Default)]
pub struct End {
    /// <field name="error" type="error"/>
    pub error: Option<WireError>,
}

impl DescribedType for End {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0017;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:end:list";

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
