use crate::composite::{body_fields, truncate_fields, DescribedType};
use crate::definitions::{Fields, IetfLanguageTag, Milliseconds};
use crate::error::Error;
use crate::composite::default_to_null;
use crate::primitives::{Array, Symbol, UInt, UShort};
use crate::value::Value;

/// 2.7.1 Open
///
/// Negotiate connection parameters.
/// <type name="open" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:open:list" code="0x00000000:0x00000010"/>
/// </type>
#[derive(Debug, Clone, Default)]
pub struct Open {
    /// <field name="container-id" type="string" mandatory="true"/>
    pub container_id: String,

    /// <field name="hostname" type="string"/>
    pub hostname: Option<String>,

    /// <field name="max-frame-size" type="uint" default="4294967295"/>
    pub max_frame_size: MaxFrameSize,

    /// <field name="channel-max" type="ushort" default="65535"/>
    pub channel_max: ChannelMax,

    /// <field name="idle-time-out" type="milliseconds"/>
    pub idle_time_out: Option<Milliseconds>,

    /// <field name="outgoing-locales" type="ietf-language-tag" multiple="true"/>
    pub outgoing_locales: Option<Array<IetfLanguageTag>>,

    /// <field name="incoming-locales" type="ietf-language-tag" multiple="true"/>
    pub incoming_locales: Option<Array<IetfLanguageTag>>,

    /// <field name="offered-capabilities" type="symbol" multiple="true"/>
    pub offered_capabilities: Option<Array<Symbol>>,

    /// <field name="desired-capabilities" type="symbol" multiple="true"/>
    pub desired_capabilities: Option<Array<Symbol>>,

    /// <field name="properties" type="fields"/>
    pub properties: Option<Fields>,
}

impl DescribedType for Open {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0010;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:open:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::String(self.container_id.clone()),
            Value::from(self.hostname.clone()),
            default_to_null(self.max_frame_size.0, u32::MAX, Value::UInt),
            default_to_null(self.channel_max.0, u16::MAX, Value::UShort),
            Value::from(self.idle_time_out),
            Value::from(self.outgoing_locales.clone()),
            Value::from(self.incoming_locales.clone()),
            Value::from(self.offered_capabilities.clone()),
            Value::from(self.desired_capabilities.clone()),
            Value::from(self.properties.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            container_id: fields.required("container-id")?,
            hostname: fields.optional()?,
            max_frame_size: fields.or_default()?,
            channel_max: fields.or_default()?,
            idle_time_out: fields.optional()?,
            outgoing_locales: fields.optional()?,
            incoming_locales: fields.optional()?,
            offered_capabilities: fields.optional()?,
            desired_capabilities: fields.optional()?,
            properties: fields.optional()?,
        })
    }
}

/// Proposed maximum frame size
///
/// A simple wrapper over u32 with a default value of `u32::MAX`.
///
/// The largest frame size that the sending peer is able to accept on this
/// connection. A peer MUST NOT send frames larger than its partner can
/// handle. A peer that receives an oversized frame MUST close the
/// connection with the framing-error error-code. Both peers MUST accept
/// frames of up to 512 (MIN-MAX-FRAME-SIZE) octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxFrameSize(pub UInt);

impl Default for MaxFrameSize {
    fn default() -> Self {
        MaxFrameSize(u32::MAX)
    }
}

impl From<UInt> for MaxFrameSize {
    fn from(value: UInt) -> Self {
        Self(value)
    }
}

impl From<MaxFrameSize> for UInt {
    fn from(value: MaxFrameSize) -> Self {
        value.0
    }
}

impl From<MaxFrameSize> for usize {
    fn from(value: MaxFrameSize) -> Self {
        value.0 as usize
    }
}

impl TryFrom<Value> for MaxFrameSize {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        UInt::try_from(value).map(Self)
    }
}

/// The maximum channel number that can be used on the connection
///
/// This value plus one is the maximum number of sessions that can be
/// simultaneously active on the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMax(pub UShort);

impl Default for ChannelMax {
    fn default() -> Self {
        Self(u16::MAX)
    }
}

impl From<UShort> for ChannelMax {
    fn from(value: UShort) -> Self {
        Self(value)
    }
}

impl From<ChannelMax> for UShort {
    fn from(value: ChannelMax) -> Self {
        value.0
    }
}

impl TryFrom<Value> for ChannelMax {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        UShort::try_from(value).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::Open;
    use crate::composite::DescribedType;
    use crate::decode::from_slice;
    use crate::encode::to_vec;

    #[test]
    fn open_round_trip() {
        let open = Open {
            container_id: "1234".to_string(),
            hostname: Some("127.0.0.1".to_string()),
            max_frame_size: 4096.into(),
            channel_max: 9.into(),
            idle_time_out: Some(30_000),
            ..Default::default()
        };
        let buf = to_vec(&open.to_value()).unwrap();
        let decoded = Open::from_described(from_slice(&buf).unwrap().try_into().unwrap()).unwrap();
        assert_eq!(decoded.container_id, "1234");
        assert_eq!(decoded.hostname.as_deref(), Some("127.0.0.1"));
        assert_eq!(decoded.max_frame_size.0, 4096);
        assert_eq!(decoded.channel_max.0, 9);
        assert_eq!(decoded.idle_time_out, Some(30_000));
        assert!(decoded.properties.is_none());
    }

    #[test]
    fn default_open_truncates_to_container_id() {
        let open = Open {
            container_id: "c".to_string(),
            ..Default::default()
        };
        let buf = to_vec(&open.to_value()).unwrap();
        // 0x00 smallulong 0x10, list8, size, count=1, str8 "c"
        assert_eq!(buf[5], 1);
    }
}
