use crate::composite::{body_fields, truncate_fields, DescribedType};
use crate::definitions::Seconds;
use crate::error::Error;
use crate::composite::default_to_null;
use crate::primitives::{Array, Symbol};
use crate::value::Value;

use super::{
    Address, DistributionMode, FilterSet, NodeProperties, Outcome, TerminusDurability,
    TerminusExpiryPolicy,
};

/// 3.5.3 Source
///
/// Terminus state of the sending endpoint of a link.
/// <type name="source" class="composite" source="list" provides="source">
///     <descriptor name="amqp:source:list" code="0x00000000:0x00000028"/>
/// </type>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Source {
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

    /// <field name="distribution-mode" type="symbol" requires="distribution-mode"/>
    pub distribution_mode: Option<DistributionMode>,

    /// <field name="filter" type="filter-set"/>
    pub filter: Option<FilterSet>,

    /// <field name="default-outcome" type="*" requires="outcome"/>
    pub default_outcome: Option<Outcome>,

    /// <field name="outcomes" type="symbol" multiple="true"/>
    pub outcomes: Option<Array<Symbol>>,

    /// <field name="capabilities" type="symbol" multiple="true"/>
    pub capabilities: Option<Array<Symbol>>,
}

impl Source {
    /// A source with only the address set.
    pub fn with_address(address: impl Into<Address>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }
}

impl<T> From<T> for Source
where
    T: Into<Address>,
{
    fn from(address: T) -> Self {
        Self::with_address(address)
    }
}

impl DescribedType for Source {
    const DESCRIPTOR_CODE: u64 = 0x0000_0000_0000_0028;
    const DESCRIPTOR_SYMBOL: &'static str = "amqp:source:list";

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
            Value::from(self.distribution_mode),
            Value::from(self.filter.clone()),
            Value::from(self.default_outcome.clone()),
            Value::from(self.outcomes.clone()),
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
            distribution_mode: fields.optional()?,
            filter: fields.optional()?,
            default_outcome: fields.optional()?,
            outcomes: fields.optional()?,
            capabilities: fields.optional()?,
        })
    }
}

impl From<Source> for Value {
    fn from(source: Source) -> Self {
        source.to_value()
    }
}

impl TryFrom<Value> for Source {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Error> {
        match value {
            Value::Described(d) => Source::from_described(*d),
            _ => Err(Error::InvalidValue),
        }
    }
}
