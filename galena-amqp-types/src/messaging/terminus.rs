use crate::error::Error;
use crate::primitives::Symbol;
use crate::value::Value;

/// 3.5.5 Terminus Durability
///
/// Durability policy for a terminus.
/// <type name="terminus-durability" class="restricted" source="uint">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminusDurability {
    /// <choice name="none" value="0"/>
    #[default]
    None,
    /// <choice name="configuration" value="1"/>
    Configuration,
    /// <choice name="unsettled-state" value="2"/>
    UnsettledState,
}

impl From<TerminusDurability> for u32 {
    fn from(val: TerminusDurability) -> Self {
        match val {
            TerminusDurability::None => 0,
            TerminusDurability::Configuration => 1,
            TerminusDurability::UnsettledState => 2,
        }
    }
}

impl From<TerminusDurability> for Value {
    fn from(val: TerminusDurability) -> Self {
        Value::UInt(val.into())
    }
}

impl TryFrom<Value> for TerminusDurability {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let val = match u32::try_from(value)? {
            0 => TerminusDurability::None,
            1 => TerminusDurability::Configuration,
            2 => TerminusDurability::UnsettledState,
            _ => return Err(Error::InvalidValue),
        };
        Ok(val)
    }
}

/// 3.5.6 Terminus Expiry Policy
///
/// Expiry policy for a terminus.
/// <type name="terminus-expiry-policy" class="restricted" source="symbol">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminusExpiryPolicy {
    /// <choice name="link-detach" value="link-detach"/>
    LinkDetach,
    /// <choice name="session-end" value="session-end"/>
    #[default]
    SessionEnd,
    /// <choice name="connection-close" value="connection-close"/>
    ConnectionClose,
    /// <choice name="never" value="never"/>
    Never,
}

impl From<TerminusExpiryPolicy> for Symbol {
    fn from(val: TerminusExpiryPolicy) -> Self {
        let s = match val {
            TerminusExpiryPolicy::LinkDetach => "link-detach",
            TerminusExpiryPolicy::SessionEnd => "session-end",
            TerminusExpiryPolicy::ConnectionClose => "connection-close",
            TerminusExpiryPolicy::Never => "never",
        };
        Symbol::from(s)
    }
}

impl From<TerminusExpiryPolicy> for Value {
    fn from(val: TerminusExpiryPolicy) -> Self {
        Value::Symbol(val.into())
    }
}

impl TryFrom<Value> for TerminusExpiryPolicy {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let symbol = Symbol::try_from(value)?;
        let val = match symbol.as_str() {
            "link-detach" => TerminusExpiryPolicy::LinkDetach,
            "session-end" => TerminusExpiryPolicy::SessionEnd,
            "connection-close" => TerminusExpiryPolicy::ConnectionClose,
            "never" => TerminusExpiryPolicy::Never,
            _ => return Err(Error::InvalidValue),
        };
        Ok(val)
    }
}

/// 3.5.7 Standard Distribution Mode
///
/// Link distribution policy.
/// <type name="std-dist-mode" class="restricted" source="symbol" provides="distribution-mode">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionMode {
    /// <choice name="move" value="move"/>
    Move,
    /// <choice name="copy" value="copy"/>
    Copy,
}

impl From<DistributionMode> for Symbol {
    fn from(val: DistributionMode) -> Self {
        let s = match val {
            DistributionMode::Move => "move",
            DistributionMode::Copy => "copy",
        };
        Symbol::from(s)
    }
}

impl From<DistributionMode> for Value {
    fn from(val: DistributionMode) -> Self {
        Value::Symbol(val.into())
    }
}

impl TryFrom<Value> for DistributionMode {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let symbol = Symbol::try_from(value)?;
        let val = match symbol.as_str() {
            "move" => DistributionMode::Move,
            "copy" => DistributionMode::Copy,
            _ => return Err(Error::InvalidValue),
        };
        Ok(val)
    }
}
