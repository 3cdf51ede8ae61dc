use crate::composite::{body_fields, default_to_null, truncate_fields, DescribedType};
use crate::definitions::{Error as WireError, Handle};
use crate::error::Error;
use crate::value::Value;

/// 2.7.7 Detach
///
/// Detach the link endpoint from the session.
/// <type name="detach" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:detach:list" code="0x00000000:0x00000016"/>
/// </type>
#[derive(Debug, Clone)]
pub struct Detach {
    /// <field name="handle" type="handle" mandatory="true"/>
    pub handle: Handle,

    /// <field name="closed" type="boolean" default="false"/>
    ///
    /// A true value indicates the link is being destroyed, not just
    /// detached.
    pub closed: bool,

    /// <field name="error" type="error"/>
    pub error: Option<WireError>,
}

impl DescribedType for Detach {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0016;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:detach:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::from(self.handle),
            default_to_null(self.closed, false, Value::Bool),
            Value::from(self.error.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            handle: fields.required("handle")?,
            closed: fields.or_default()?,
            error: fields.optional()?,
        })
    }
}
