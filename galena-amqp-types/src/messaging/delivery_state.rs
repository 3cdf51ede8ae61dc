use crate::composite::{body_fields, truncate_fields, DescribedType};
use crate::definitions::{Error as WireError, Fields};
use crate::error::Error;
use crate::value::Value;

/// 3.4 Delivery State
///
/// The state of a delivery at an endpoint: either a terminal outcome or
/// the partial-transfer `Received` state.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DeliveryState {
    Accepted(Accepted),
    Rejected(Rejected),
    Released(Released),
    Modified(Modified),
    Received(Received),
}

impl DeliveryState {
    /// Whether this state is a terminal outcome.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryState::Received(_))
    }

    /// Whether this state is the accepted outcome.
    pub fn is_accepted(&self) -> bool {
        matches!(self, DeliveryState::Accepted(_))
    }
}

impl From<Outcome> for DeliveryState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Accepted(v) => DeliveryState::Accepted(v),
            Outcome::Rejected(v) => DeliveryState::Rejected(v),
            Outcome::Released(v) => DeliveryState::Released(v),
            Outcome::Modified(v) => DeliveryState::Modified(v),
        }
    }
}

impl From<DeliveryState> for Value {
    fn from(state: DeliveryState) -> Self {
        match state {
            DeliveryState::Accepted(v) => v.to_value(),
            DeliveryState::Rejected(v) => v.to_value(),
            DeliveryState::Released(v) => v.to_value(),
            DeliveryState::Modified(v) => v.to_value(),
            DeliveryState::Received(v) => v.to_value(),
        }
    }
}

impl TryFrom<Value> for DeliveryState {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let described = match value {
            Value::Described(d) => *d,
            _ => return Err(Error::InvalidValue),
        };
        if Received::matches(&described.descriptor) {
            return Received::from_described(described).map(DeliveryState::Received);
        }
        Outcome::try_from(Value::Described(Box::new(described))).map(DeliveryState::from)
    }
}

/// A terminal delivery outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Outcome {
    Accepted(Accepted),
    Rejected(Rejected),
    Released(Released),
    Modified(Modified),
}

impl Outcome {
    /// Whether this outcome is `Accepted`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    /// Returns `Ok(self)` if accepted, otherwise `Err(err)`.
    pub fn accepted_or<E>(self, err: E) -> Result<Self, E> {
        match self.is_accepted() {
            true => Ok(self),
            false => Err(err),
        }
    }
}

impl From<Outcome> for Value {
    fn from(outcome: Outcome) -> Self {
        DeliveryState::from(outcome).into()
    }
}

impl TryFrom<Value> for Outcome {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let described = match value {
            Value::Described(d) => *d,
            _ => return Err(Error::InvalidValue),
        };
        if Accepted::matches(&described.descriptor) {
            Accepted::from_described(described).map(Outcome::Accepted)
        } else if Rejected::matches(&described.descriptor) {
            Rejected::from_described(described).map(Outcome::Rejected)
        } else if Released::matches(&described.descriptor) {
            Released::from_described(described).map(Outcome::Released)
        } else if Modified::matches(&described.descriptor) {
            Modified::from_described(described).map(Outcome::Modified)
        } else {
            Err(Error::InvalidValue)
        }
    }
}

/// 3.4.1 Received
///
/// At the target the received state indicates the furthest point in the
/// payload of the message which the target will not need to have resent.
/// <type name="received" class="composite" source="list" provides="delivery-state">
/// <descriptor name="amqp:received:list" code="0x00000000:0x00000023"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Received {
    /// <field name="section-number" type="uint" mandatory="true"/>
    pub section_number: u32,

    /// <field name="section-offset" type="ulong" mandatory="true"/>
    pub section_offset: u64,
}

impl DescribedType for Received {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0023;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:received:list";

    fn to_body(&self) -> Value {
        Value::List(vec![
            Value::UInt(self.section_number),
            Value::ULong(self.section_offset),
        ])
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            section_number: fields.required("section-number")?,
            section_offset: fields.required("section-offset")?,
        })
    }
}

/// 3.4.2 Accepted
///
/// The accepted outcome.
/// <type name="accepted" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:accepted:list" code="0x00000000:0x00000024"/>
/// </type>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accepted {}

impl DescribedType for Accepted {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0024;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:accepted:list";

    fn to_body(&self) -> Value {
        Value::List(Vec::new())
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        body_fields(value)?;
        Ok(Self {})
    }
}

/// 3.4.3 Rejected
///
/// The rejected outcome.
/// <type name="rejected" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:rejected:list" code="0x00000000:0x00000025"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rejected {
    /// <field name="error" type="error"/>
    pub error: Option<WireError>,
}

impl DescribedType for Rejected {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0025;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:rejected:list";

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

/// 3.4.4 Released
///
/// The released outcome.
/// <type name="released" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:released:list" code="0x00000000:0x00000026"/>
/// </type>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Released {}

impl DescribedType for Released {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0026;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:released:list";

    fn to_body(&self) -> Value {
        Value::List(Vec::new())
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        body_fields(value)?;
        Ok(Self {})
    }
}

/// 3.4.5 Modified
///
/// The modified outcome.
/// <type name="modified" class="composite" source="list" provides="delivery-state, outcome">
///     <descriptor name="amqp:modified:list" code="0x00000000:0x00000027"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modified {
    /// <field name="delivery-failed" type="boolean"/>
    pub delivery_failed: Option<bool>,

    /// <field name="undeliverable-here" type="boolean"/>
    pub undeliverable_here: Option<bool>,

    /// <field name="message-annotations" type="fields"/>
    pub message_annotations: Option<Fields>,
}

impl DescribedType for Modified {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0027;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:modified:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::from(self.delivery_failed),
            Value::from(self.undeliverable_here),
            Value::from(self.message_annotations.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            delivery_failed: fields.optional()?,
            undeliverable_here: fields.optional()?,
            message_annotations: fields.optional()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Accepted, DeliveryState, Modified, Outcome};
    use crate::composite::DescribedType;
    use crate::decode::from_slice;
    use crate::encode::to_vec;
    use crate::format_code::FormatCode;

    #[test]
    fn accepted_round_trip() {
        let buf = to_vec(&Accepted {}.to_value()).unwrap();
        let state = DeliveryState::try_from(from_slice(&buf).unwrap()).unwrap();
        assert!(state.is_accepted());
        assert!(state.is_terminal());
    }

    #[test]
    fn accepted_decodes_from_list8() {
        let buf = vec![
            FormatCode::Described as u8,
            FormatCode::SmallULong as u8,
            0x24,
            FormatCode::List8 as u8,
            1, // size spans the count field
            0, // count
        ];
        let outcome = Outcome::try_from(from_slice(&buf).unwrap()).unwrap();
        assert!(outcome.is_accepted());
    }

    #[test]
    fn accepted_decodes_from_list32() {
        let buf = vec![
            FormatCode::Described as u8,
            FormatCode::SmallULong as u8,
            0x24,
            FormatCode::List32 as u8,
            0,
            0,
            0,
            4, // size spans the count field
            0,
            0,
            0,
            0, // count
        ];
        let outcome = Outcome::try_from(from_slice(&buf).unwrap()).unwrap();
        assert!(outcome.is_accepted());
    }

    #[test]
    fn modified_round_trip() {
        let expected = Modified {
            delivery_failed: Some(true),
            undeliverable_here: None,
            message_annotations: None,
        };
        let buf = to_vec(&expected.to_value()).unwrap();
        let decoded = match DeliveryState::try_from(from_slice(&buf).unwrap()).unwrap() {
            DeliveryState::Modified(m) => m,
            other => panic!("unexpected state {:?}", other),
        };
        assert_eq!(expected, decoded);
    }
}
