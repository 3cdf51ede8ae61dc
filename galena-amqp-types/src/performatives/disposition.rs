use crate::composite::{body_fields, default_to_null, truncate_fields, DescribedType};
use crate::definitions::{DeliveryNumber, Role};
use crate::error::Error;
use crate::messaging::DeliveryState;
use crate::value::Value;

/// 2.7.6 Disposition
///
/// Inform remote peer of delivery state changes.
/// <type name="disposition" class="composite" source="list" provides="frame">
///     <descriptor name="amqp:disposition:list" code="0x00000000:0x00000015"/>
/// </type>
#[derive(Debug, Clone)]
pub struct Disposition {
    /// <field name="role" type="role" mandatory="true"/>
    ///
    /// The role of the sender of the disposition: dispositions about
    /// incoming deliveries carry the receiver role.
    pub role: Role,

    /// <field name="first" type="delivery-number" mandatory="true"/>
    pub first: DeliveryNumber,

    /// <field name="last" type="delivery-number"/>
    ///
    /// Defaults to `first` when not set.
    pub last: Option<DeliveryNumber>,

    /// <field name="settled" type="boolean" default="false"/>
    pub settled: bool,

    /// <field name="state" type="*" requires="delivery-state"/>
    pub state: Option<DeliveryState>,

    /// <field name="batchable" type="boolean" default="false"/>
    pub batchable: bool,
}

impl Disposition {
    /// The inclusive range `[first, last]` this disposition applies to.
    pub fn range(&self) -> std::ops::RangeInclusive<DeliveryNumber> {
        self.first..=self.last.unwrap_or(self.first)
    }
}

impl DescribedType for Disposition {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0015;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:disposition:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::from(self.role),
            Value::UInt(self.first),
            Value::from(self.last),
            default_to_null(self.settled, false, Value::Bool),
            Value::from(self.state.clone()),
            default_to_null(self.batchable, false, Value::Bool),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            role: fields.required("role")?,
            first: fields.required("first")?,
            last: fields.optional()?,
            settled: fields.or_default()?,
            state: fields.optional()?,
            batchable: fields.or_default()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Disposition;
    use crate::composite::DescribedType;
    use crate::decode::from_slice;
    use crate::definitions::Role;
    use crate::encode::to_vec;
    use crate::messaging::{Accepted, DeliveryState};

    #[test]
    fn disposition_round_trip() {
        let disposition = Disposition {
            role: Role::Receiver,
            first: 0,
            last: Some(0),
            settled: true,
            state: Some(DeliveryState::Accepted(Accepted {})),
            batchable: false,
        };
        let buf = to_vec(&disposition.to_value()).unwrap();
        let decoded =
            Disposition::from_described(from_slice(&buf).unwrap().try_into().unwrap()).unwrap();
        assert!(decoded.role.is_receiver());
        assert!(decoded.settled);
        assert_eq!(decoded.range(), 0..=0);
        assert!(matches!(decoded.state, Some(state) if state.is_accepted()));
    }

    #[test]
    fn absent_last_defaults_to_first() {
        let disposition = Disposition {
            role: Role::Sender,
            first: 3,
            last: None,
            settled: false,
            state: None,
            batchable: false,
        };
        assert_eq!(disposition.range(), 3..=3);
    }
}
