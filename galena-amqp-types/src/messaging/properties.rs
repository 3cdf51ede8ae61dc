use crate::composite::{body_fields, truncate_fields, DescribedType};
use crate::definitions::{Milliseconds, SequenceNo};
use crate::error::Error;
use crate::primitives::{Binary, Symbol, Timestamp, Uuid};
use crate::value::Value;

use super::Address;

/// 3.2.4 Properties
///
/// Immutable properties of the message.
/// <type name="properties" class="composite" source="list" provides="section">
///     <descriptor name="amqp:properties:list" code="0x00000000:0x00000073"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    /// <field name="message-id" type="*" requires="message-id"/>
    pub message_id: Option<MessageId>,

    /// <field name="user-id" type="binary"/>
    pub user_id: Option<Binary>,

    /// <field name="to" type="*" requires="address"/>
    pub to: Option<Address>,

    /// <field name="subject" type="string"/>
    pub subject: Option<String>,

    /// <field name="reply-to" type="*" requires="address"/>
    pub reply_to: Option<Address>,

    /// <field name="correlation-id" type="*" requires="message-id"/>
    pub correlation_id: Option<MessageId>,

    /// <field name="content-type" type="symbol"/>
    pub content_type: Option<Symbol>,

    /// <field name="content-encoding" type="symbol"/>
    pub content_encoding: Option<Symbol>,

    /// <field name="absolute-expiry-time" type="timestamp"/>
    pub absolute_expiry_time: Option<Timestamp>,

    /// <field name="creation-time" type="timestamp"/>
    pub creation_time: Option<Timestamp>,

    /// <field name="group-id" type="string"/>
    pub group_id: Option<String>,

    /// <field name="group-sequence" type="sequence-no"/>
    pub group_sequence: Option<SequenceNo>,

    /// <field name="reply-to-group-id" type="string"/>
    pub reply_to_group_id: Option<String>,
}

impl DescribedType for Properties {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0073;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:properties:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::from(self.message_id.clone()),
            Value::from(self.user_id.clone()),
            Value::from(self.to.clone()),
            Value::from(self.subject.clone()),
            Value::from(self.reply_to.clone()),
            Value::from(self.correlation_id.clone()),
            Value::from(self.content_type.clone()),
            Value::from(self.content_encoding.clone()),
            Value::from(self.absolute_expiry_time),
            Value::from(self.creation_time),
            Value::from(self.group_id.clone()),
            Value::from(self.group_sequence),
            Value::from(self.reply_to_group_id.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            message_id: fields.optional()?,
            user_id: fields.optional()?,
            to: fields.optional()?,
            subject: fields.optional()?,
            reply_to: fields.optional()?,
            correlation_id: fields.optional()?,
            content_type: fields.optional()?,
            content_encoding: fields.optional()?,
            absolute_expiry_time: fields.optional()?,
            creation_time: fields.optional()?,
            group_id: fields.optional()?,
            group_sequence: fields.optional()?,
            reply_to_group_id: fields.optional()?,
        })
    }
}

/// 3.2.11 Message ID
///
/// The types of values that can identify a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageId {
    /// message-id-ulong
    ULong(u64),
    /// message-id-uuid
    Uuid(Uuid),
    /// message-id-binary
    Binary(Binary),
    /// message-id-string
    String(String),
}

impl From<u64> for MessageId {
    fn from(val: u64) -> Self {
        Self::ULong(val)
    }
}

impl From<String> for MessageId {
    fn from(val: String) -> Self {
        Self::String(val)
    }
}

impl From<&str> for MessageId {
    fn from(val: &str) -> Self {
        Self::String(val.to_string())
    }
}

impl From<MessageId> for Value {
    fn from(id: MessageId) -> Self {
        match id {
            MessageId::ULong(v) => Value::ULong(v),
            MessageId::Uuid(v) => Value::Uuid(v),
            MessageId::Binary(v) => Value::Binary(v),
            MessageId::String(v) => Value::String(v),
        }
    }
}

impl TryFrom<Value> for MessageId {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let id = match value {
            Value::ULong(v) => MessageId::ULong(v),
            Value::Uuid(v) => MessageId::Uuid(v),
            Value::Binary(v) => MessageId::Binary(v),
            Value::String(v) => MessageId::String(v),
            _ => return Err(Error::InvalidValue),
        };
        Ok(id)
    }
}
