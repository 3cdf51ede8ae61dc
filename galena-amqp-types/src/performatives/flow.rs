use crate::composite::{body_fields, default_to_null, truncate_fields, DescribedType};
use crate::definitions::{Fields, Handle, SequenceNo, TransferNumber};
use crate::error::Error;
use crate::primitives::UInt;
use crate::value::Value;

/// 2.7.4 Flow
///
/// Update link state.
/// <type name="flow" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:flow:list" code="0x00000000:0x00000013"/>
/// </type>
#[derive(Debug, Clone)]
pub struct Flow {
    /// <field name="next-incoming-id" type="transfer-number"/>
    ///
    /// MUST be set if the peer has received the begin frame for the
    /// session, and MUST NOT be set if it has not.
    pub next_incoming_id: Option<TransferNumber>,

    /// <field name="incoming-window" type="uint" mandatory="true"/>
    pub incoming_window: UInt,

    /// <field name="next-outgoing-id" type="transfer-number" mandatory="true"/>
    pub next_outgoing_id: TransferNumber,

    /// <field name="outgoing-window" type="uint" mandatory="true"/>
    pub outgoing_window: UInt,

    /// <field name="handle" type="handle"/>
    ///
    /// If set, the flow frame carries link state for the link endpoint
    /// associated with the handle; if not set, only session state.
    pub handle: Option<Handle>,

    /// <field name="delivery-count" type="sequence-no"/>
    pub delivery_count: Option<SequenceNo>,

    /// <field name="link-credit" type="uint"/>
    ///
    /// Only the receiver endpoint can independently set this value.
    pub link_credit: Option<UInt>,

    /// <field name="available" type="uint"/>
    pub available: Option<UInt>,

    /// <field name="drain" type="boolean" default="false"/>
    ///
    /// From the receiver, the desired drain mode; from the sender, the
    /// actual one.
    pub drain: bool,

    /// <field name="echo" type="boolean" default="false"/>
    pub echo: bool,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl DescribedType for Flow {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0013;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:flow:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::from(self.next_incoming_id),
            Value::UInt(self.incoming_window),
            Value::UInt(self.next_outgoing_id),
            Value::UInt(self.outgoing_window),
            Value::from(self.handle),
            Value::from(self.delivery_count),
            Value::from(self.link_credit),
            Value::from(self.available),
            default_to_null(self.drain, false, Value::Bool),
            default_to_null(self.echo, false, Value::Bool),
            Value::from(self.properties.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            next_incoming_id: fields.optional()?,
            incoming_window: fields.required("incoming-window")?,
            next_outgoing_id: fields.required("next-outgoing-id")?,
            outgoing_window: fields.required("outgoing-window")?,
            handle: fields.optional()?,
            delivery_count: fields.optional()?,
            link_credit: fields.optional()?,
            available: fields.optional()?,
            drain: fields.or_default()?,
            echo: fields.or_default()?,
            properties: fields.optional()?,
        })
    }
}
