use crate::composite::{body_fields, default_to_null, truncate_fields, DescribedType};
use crate::definitions::{Fields, Handle, TransferNumber};
use crate::error::Error;
use crate::primitives::{Array, Symbol, UInt, UShort};
use crate::value::Value;

/// 2.7.2 Begin
///
/// Begin a session on a channel.
/// <type name="begin" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:begin:list" code="0x00000000:0x00000011"/>
/// </type>
#[derive(Debug, Clone)]
pub struct Begin {
    /// <field name="remote-channel" type="ushort"/>
    ///
    /// Set when the Begin is a response to a remotely initiated session;
    /// carries the channel the remote peer chose.
    pub remote_channel: Option<UShort>,

    /// <field name="next-outgoing-id" type="transfer-number" mandatory="true"/>
    pub next_outgoing_id: TransferNumber,

    /// <field name="incoming-window" type="uint" mandatory="true"/>
    pub incoming_window: UInt,

    /// <field name="outgoing-window" type="uint" mandatory="true"/>
    pub outgoing_window: UInt,

    /// <field name="handle-max" type="handle" default="4294967295"/>
    pub handle_max: Handle,

    /// <field name="offered-capabilities" type="symbol" multiple="true"/>
    pub offered_capabilities: Option<Array<Symbol>>,

    /// <field name="desired-capabilities" type="symbol" multiple="true"/>
    pub desired_capabilities: Option<Array<Symbol>>,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl DescribedType for Begin {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0011;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:begin:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::from(self.remote_channel),
            Value::UInt(self.next_outgoing_id),
            Value::UInt(self.incoming_window),
            Value::UInt(self.outgoing_window),
            default_to_null(self.handle_max, Handle::default(), Value::from),
            Value::from(self.offered_capabilities.clone()),
            Value::from(self.desired_capabilities.clone()),
            Value::from(self.properties.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            remote_channel: fields.optional()?,
            next_outgoing_id: fields.required("next-outgoing-id")?,
            incoming_window: fields.required("incoming-window")?,
            outgoing_window: fields.required("outgoing-window")?,
            handle_max: fields.or_default()?,
            offered_capabilities: fields.optional()?,
            desired_capabilities: fields.optional()?,
            properties: fields.optional()?,
        })
    }
}
