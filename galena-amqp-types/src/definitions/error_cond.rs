use crate::error::Error as CodecError;
use crate::primitives::Symbol;
use crate::value::Value;

use super::{AmqpError, ConnectionError, LinkError, SessionError};

/// A symbol that can be carried in the condition field of a wire-level
/// [`Error`](super::Error).
///
/// Conditions outside the taxonomies defined by the core specification
/// decode to [`ErrorCondition::Custom`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ErrorCondition {
    AmqpError(AmqpError),
    ConnectionError(ConnectionError),
    SessionError(SessionError),
    LinkError(LinkError),
    Custom(Symbol),
}

impl ErrorCondition {
    /// The wire symbol of this condition.
    pub fn symbol(&self) -> Symbol {
        match self {
            Self::AmqpError(err) => Symbol::from(*err),
            Self::ConnectionError(err) => Symbol::from(*err),
            Self::SessionError(err) => Symbol::from(*err),
            Self::LinkError(err) => Symbol::from(*err),
            Self::Custom(sym) => sym.clone(),
        }
    }
}

impl From<AmqpError> for ErrorCondition {
    fn from(err: AmqpError) -> Self {
        Self::AmqpError(err)
    }
}

impl From<ConnectionError> for ErrorCondition {
    fn from(err: ConnectionError) -> Self {
        Self::ConnectionError(err)
    }
}

impl From<SessionError> for ErrorCondition {
    fn from(err: SessionError) -> Self {
        Self::SessionError(err)
    }
}

impl From<LinkError> for ErrorCondition {
    fn from(err: LinkError) -> Self {
        Self::LinkError(err)
    }
}

impl From<Symbol> for ErrorCondition {
    fn from(sym: Symbol) -> Self {
        Self::from(sym.as_str())
    }
}

impl From<&str> for ErrorCondition {
    fn from(v: &str) -> Self {
        let v = match AmqpError::try_from(v) {
            Ok(val) => return ErrorCondition::AmqpError(val),
            Err(e) => e,
        };
        let v = match ConnectionError::try_from(v) {
            Ok(val) => return ErrorCondition::ConnectionError(val),
            Err(e) => e,
        };
        let v = match SessionError::try_from(v) {
            Ok(val) => return ErrorCondition::SessionError(val),
            Err(e) => e,
        };
        let v = match LinkError::try_from(v) {
            Ok(val) => return ErrorCondition::LinkError(val),
            Err(e) => e,
        };
        ErrorCondition::Custom(Symbol::from(v))
    }
}

impl From<ErrorCondition> for Value {
    fn from(cond: ErrorCondition) -> Self {
        Value::Symbol(cond.symbol())
    }
}

impl TryFrom<Value> for ErrorCondition {
    type Error = CodecError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Symbol::try_from(value).map(ErrorCondition::from)
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCondition;
    use crate::definitions::{AmqpError, SessionError};
    use crate::primitives::Symbol;

    #[test]
    fn known_symbols_map_to_taxonomy() {
        assert_eq!(
            ErrorCondition::from("amqp:decode-error"),
            ErrorCondition::AmqpError(AmqpError::DecodeError)
        );
        assert_eq!(
            ErrorCondition::from("amqp:session:unattached-handle"),
            ErrorCondition::SessionError(SessionError::UnattachedHandle)
        );
    }

    #[test]
    fn unknown_symbols_are_custom() {
        let cond = ErrorCondition::from("com.example:weird-failure");
        assert_eq!(
            cond,
            ErrorCondition::Custom(Symbol::from("com.example:weird-failure"))
        );
        assert_eq!(cond.symbol().as_str(), "com.example:weird-failure");
    }
}
