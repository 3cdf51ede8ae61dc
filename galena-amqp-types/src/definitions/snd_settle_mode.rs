use crate::error::Error;
use crate::value::Value;

/// 2.8.2 Sender Settle Mode
///
/// Settlement policy for a sender.
/// <type name="sender-settle-mode" class="restricted" source="ubyte">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderSettleMode {
    /// <choice name="unsettled" value="0"/>
    Unsettled,
    /// <choice name="settled" value="1"/>
    Settled,
    /// <choice name="mixed" value="2"/>
    #[default]
    Mixed,
}

impl From<SenderSettleMode> for u8 {
    fn from(mode: SenderSettleMode) -> Self {
        match mode {
            SenderSettleMode::Unsettled => 0,
            SenderSettleMode::Settled => 1,
            SenderSettleMode::Mixed => 2,
        }
    }
}

impl TryFrom<u8> for SenderSettleMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let mode = match value {
            0 => SenderSettleMode::Unsettled,
            1 => SenderSettleMode::Settled,
            2 => SenderSettleMode::Mixed,
            _ => return Err(Error::InvalidValue),
        };
        Ok(mode)
    }
}

impl From<SenderSettleMode> for Value {
    fn from(mode: SenderSettleMode) -> Self {
        Value::UByte(mode.into())
    }
}

impl TryFrom<Value> for SenderSettleMode {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        SenderSettleMode::try_from(u8::try_from(value)?)
    }
}
