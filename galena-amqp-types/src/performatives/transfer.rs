use crate::composite::{body_fields, default_to_null, truncate_fields, DescribedType};
use crate::definitions::{
    DeliveryNumber, DeliveryTag, Handle, MessageFormat, ReceiverSettleMode,
};
use crate::error::Error;
use crate::messaging::DeliveryState;
use crate::value::Value;

/// 2.7.5 Transfer
///
/// Transfer a message.
/// <type name="transfer" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:transfer:list" code="0x00000000:0x00000014"/>
/// </type>
#[derive(Debug, Clone, Default)]
pub struct Transfer {
    /// <field name="handle" type="handle" mandatory="true"/>
    pub handle: Handle,

    /// <field name="delivery-id" type="delivery-number"/>
    ///
    /// MUST be set on the first transfer of a multi-transfer delivery; on
    /// continuation transfers it MAY be omitted or MUST carry the same
    /// value.
    pub delivery_id: Option<DeliveryNumber>,

    /// <field name="delivery-tag" type="delivery-tag"/>
    pub delivery_tag: Option<DeliveryTag>,

    /// <field name="message-format" type="message-format"/>
    pub message_format: Option<MessageFormat>,

    /// <field name="settled" type="boolean"/>
    pub settled: Option<bool>,

    /// <field name="more" type="boolean" default="false"/>
    ///
    /// Further transfer frames for this delivery follow.
    pub more: bool,

    /// <field name="rcv-settle-mode" type="receiver-settle-mode"/>
    pub rcv_settle_mode: Option<ReceiverSettleMode>,

    /// <field name="state" type="*" requires="delivery-state"/>
    pub state: Option<DeliveryState>,

    /// <field name="resume" type="boolean" default="false"/>
    pub resume: bool,

    /// <field name="aborted" type="boolean" default="false"/>
    ///
    /// The delivery is aborted and the receiver MUST discard the message.
    pub aborted: bool,

    /// <field name="batchable" type="boolean" default="false"/>
    pub batchable: bool,
}

impl DescribedType for Transfer {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0014;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:transfer:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::from(self.handle),
            Value::from(self.delivery_id),
            Value::from(self.delivery_tag.clone()),
            Value::from(self.message_format),
            Value::from(self.settled),
            default_to_null(self.more, false, Value::Bool),
            Value::from(self.rcv_settle_mode),
            Value::from(self.state.clone()),
            default_to_null(self.resume, false, Value::Bool),
            default_to_null(self.aborted, false, Value::Bool),
            default_to_null(self.batchable, false, Value::Bool),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            handle: fields.required("handle")?,
            delivery_id: fields.optional()?,
            delivery_tag: fields.optional()?,
            message_format: fields.optional()?,
            settled: fields.optional()?,
            more: fields.or_default()?,
            rcv_settle_mode: fields.optional()?,
            state: fields.optional()?,
            resume: fields.or_default()?,
            aborted: fields.or_default()?,
            batchable: fields.or_default()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Transfer;
    use crate::composite::DescribedType;
    use crate::decode::from_slice;
    use crate::definitions::Handle;
    use crate::encode::{to_vec, Encoder};
    use crate::primitives::Binary;
    use crate::value::Value;

    #[test]
    fn transfer_round_trip() {
        let transfer = Transfer {
            handle: Handle(0),
            delivery_id: Some(0),
            delivery_tag: Some(Binary::from(&b"\x00"[..])),
            message_format: Some(0),
            more: true,
            ..Default::default()
        };
        let buf = to_vec(&transfer.to_value()).unwrap();
        let decoded =
            Transfer::from_described(from_slice(&buf).unwrap().try_into().unwrap()).unwrap();
        assert_eq!(decoded.delivery_id, Some(0));
        assert!(decoded.more);
        assert!(!decoded.aborted);
    }

    #[test]
    fn unknown_trailing_fields_are_ignored() {
        // a transfer list with three extra fields past the spec'd count;
        // batchable=true keeps all eleven positions in the encoded list
        let mut fields = Transfer {
            handle: Handle(2),
            batchable: true,
            ..Default::default()
        }
        .to_body();
        if let Value::List(list) = &mut fields {
            list.extend([Value::Bool(true), Value::UInt(9), Value::from("future")]);
        }
        let described = crate::described::Described::new(Transfer::DESCRIPTOR_CODE, fields);
        let mut buf = bytes::BytesMut::new();
        Encoder::new(&mut buf)
            .write_value(&Value::from(described))
            .unwrap();

        let decoded =
            Transfer::from_described(from_slice(&buf).unwrap().try_into().unwrap()).unwrap();
        assert_eq!(decoded.handle, Handle(2));
    }
}
