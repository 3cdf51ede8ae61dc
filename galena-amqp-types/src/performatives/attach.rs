use crate::composite::{body_fields, default_to_null, truncate_fields, DescribedType};
use crate::definitions::{
    Fields, Handle, ReceiverSettleMode, Role, SenderSettleMode, SequenceNo,
};
use crate::error::Error;
use crate::messaging::{Source, Target};
use crate::primitives::{Array, OrderedMap, Symbol, ULong};
use crate::value::Value;

/// 2.7.3 Attach
///
/// Attach a link to a session.
/// <type name="attach" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:attach:list" code="0x00000000:0x00000012"/>
/// </type>
#[derive(Debug, Clone)]
pub struct Attach {
    /// <field name="name" type="string" mandatory="true"/>
    ///
    /// Link names MUST be unique per direction between the two containers;
    /// the two Attach frames of one link carry the same name.
    pub name: String,

    /// <field name="handle" type="handle" mandatory="true"/>
    pub handle: Handle,

    /// <field name="role" type="role" mandatory="true"/>
    pub role: Role,

    /// <field name="snd-settle-mode" type="sender-settle-mode" default="mixed"/>
    pub snd_settle_mode: SenderSettleMode,

    /// <field name="rcv-settle-mode" type="receiver-settle-mode" default="first"/>
    pub rcv_settle_mode: ReceiverSettleMode,

    /// <field name="source" type="*" requires="source"/>
    pub source: Option<Source>,

    /// <field name="target" type="*" requires="target"/>
    pub target: Option<Target>,

    /// <field name="unsettled" type="map"/>
    pub unsettled: Option<OrderedMap<Value, Value>>,

    /// <field name="incomplete-unsettled" type="boolean" default="false"/>
    pub incomplete_unsettled: bool,

    /// <field name="initial-delivery-count" type="sequence-no"/>
    ///
    /// This MUST NOT be null if role is sender, and it is ignored if the
    /// role is receiver.
    pub initial_delivery_count: Option<SequenceNo>,

    /// <field name="max-message-size" type="ulong"/>
    pub max_message_size: Option<ULong>,

    /// <field name="offered-capabilities" type="symbol" multiple="true"/>
    pub offered_capabilities: Option<Array<Symbol>>,

    /// <field name="desired-capabilities" type="symbol" multiple="true"/>
    pub desired_capabilities: Option<Array<Symbol>>,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl DescribedType for Attach {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0012;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:attach:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::String(self.name.clone()),
            Value::from(self.handle),
            Value::from(self.role),
            default_to_null(self.snd_settle_mode, SenderSettleMode::Mixed, Value::from),
            default_to_null(self.rcv_settle_mode, ReceiverSettleMode::First, Value::from),
            Value::from(self.source.clone()),
            Value::from(self.target.clone()),
            Value::from(self.unsettled.clone()),
            default_to_null(self.incomplete_unsettled, false, Value::Bool),
            Value::from(self.initial_delivery_count),
            Value::from(self.max_message_size),
            Value::from(self.offered_capabilities.clone()),
            Value::from(self.desired_capabilities.clone()),
            Value::from(self.properties.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            name: fields.required("name")?,
            handle: fields.required("handle")?,
            role: fields.required("role")?,
            snd_settle_mode: fields.or_default()?,
            rcv_settle_mode: fields.or_default()?,
            source: fields.optional()?,
            target: fields.optional()?,
            unsettled: fields.optional()?,
            incomplete_unsettled: fields.or_default()?,
            initial_delivery_count: fields.optional()?,
            max_message_size: fields.optional()?,
            offered_capabilities: fields.optional()?,
            desired_capabilities: fields.optional()?,
            properties: fields.optional()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Attach;
    use crate::composite::DescribedType;
    use crate::decode::from_slice;
    use crate::definitions::{Handle, ReceiverSettleMode, Role, SenderSettleMode};
    use crate::encode::to_vec;
    use crate::messaging::{Source, Target};

    #[test]
    fn attach_round_trip() {
        let attach = Attach {
            name: "sender-link-1".to_string(),
            handle: Handle(0),
            role: Role::Sender,
            snd_settle_mode: SenderSettleMode::Mixed,
            rcv_settle_mode: ReceiverSettleMode::First,
            source: Some(Source::default()),
            target: Some(Target::with_address("q1")),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: Some(0),
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        let buf = to_vec(&attach.to_value()).unwrap();
        let decoded =
            Attach::from_described(from_slice(&buf).unwrap().try_into().unwrap()).unwrap();
        assert_eq!(decoded.name, "sender-link-1");
        assert_eq!(decoded.handle, Handle(0));
        assert!(decoded.role.is_sender());
        assert_eq!(decoded.initial_delivery_count, Some(0));
        assert_eq!(
            decoded.target.as_ref().and_then(|t| t.address.as_deref()),
            Some("q1")
        );
    }
}
