use crate::composite::{body_fields, truncate_fields, DescribedType};
use crate::definitions::Seconds;
use crate::error::Error;
use crate::composite::default_to_null;
use crate::primitives::{Array, Symbol};
use crate::value::Value;

use super::{Address, NodeProperties, TerminusDurability, TerminusExpiryPolicy};

/// 3.5.4 Target
///
/// Terminus state of the receiving endpoint of a link.
/// <type name="target" class="composite" source="list" provides="target">
///     <descriptor name="amqp:target:list" code="0x00000000:0x00000029"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Target {
    /// <field name="address" type="*" requires="address"/>
    pub address: Option<Address>,

    /// <field name="durable" type="terminus-durability" default="none"/>
    pub durable: TerminusDurability,

    /// <field name="expiry-policy" type="terminus-expiry-policy" default="session-end"/>
    pub expiry_policy: TerminusExpiryPolicy,

    /// <field name="timeout" type="seconds" default="0"/>
    pub timeout: Seconds,

    /// <field name="dynamic" type="boolean" default="false"/>
    pub dynamic: bool,

    /// <field name="dynamic-node-properties" type="node-properties"/>
    pub dynamic_node_properties: Option<NodeProperties>,

    /// <field name="capabilities" type="symbol" multiple="true"/>
    pub capabilities: Option<Array<Symbol>>,
}

impl Target {
    /// A target with only the address set.
    pub fn with_address(address: impl Into<Address>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }
}

impl<T> From<T> for Target
where
    T: Into<Address>,
{
    fn from(address: T) -> Self {
        Self::with_address(address)
    }
}

impl DescribedType for Target {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0029;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:target:list";

    fn to_body(&self) -> Value {
        Value::List(truncate_fields(vec![
            Value::from(self.address.clone()),
            default_to_null(self.durable, TerminusDurability::None, Value::from),
            default_to_null(
                self.expiry_policy,
                TerminusExpiryPolicy::SessionEnd,
                Value::from,
            ),
            default_to_null(self.timeout, 0, Value::UInt),
            default_to_null(self.dynamic, false, Value::Bool),
            Value::from(self.dynamic_node_properties.clone()),
            Value::from(self.capabilities.clone()),
        ]))
    }

    fn from_body(value: Value) -> Result<Self, Error> {
        let mut fields = body_fields(value)?;
        Ok(Self {
            address: fields.optional()?,
            durable: fields.or_default()?,
            expiry_policy: fields.or_default()?,
            timeout: fields.or_default()?,
            dynamic: fields.or_default()?,
            dynamic_node_properties: fields.optional()?,
            capabilities: fields.optional()?,
        })
    }
}

impl From<Target> for Value {
    fn from(target: Target) -> Self {
        target.to_value()
    }
}

impl TryFrom<Value> for Target {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Error> {
        match value {
            Value::Described(d) => Target::from_described(*d),
            _ => Err(Error::InvalidValue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Target;
    use crate::decode::from_slice;
    use crate::encode::to_vec;
    use crate::messaging::Source;

    #[test]
    fn source_and_target_round_trip() {
        let source = Source::with_address("q1");
        let buf = to_vec(&source.clone().into()).unwrap();
        assert_eq!(Source::try_from(from_slice(&buf).unwrap()).unwrap(), source);

        let target = Target::with_address("q2");
        let buf = to_vec(&target.clone().into()).unwrap();
        assert_eq!(Target::try_from(from_slice(&buf).unwrap()).unwrap(), target);
    }
}
