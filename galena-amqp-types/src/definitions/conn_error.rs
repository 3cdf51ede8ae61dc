use crate::primitives::Symbol;

/// 2.8.16 Connection Error
///
/// Symbols used to indicate connection error conditions.
/// <type name="connection-error" class="restricted" source="symbol" provides="error-condition">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    /// An operator intervened to close the connection for some reason.
    ConnectionForced,
    /// A valid frame header cannot be formed from the incoming byte stream.
    FramingError,
    /// The container is no longer available on the current connection.
    Redirect,
}

impl From<ConnectionError> for Symbol {
    fn from(value: ConnectionError) -> Self {
        let s = match value {
            ConnectionError::ConnectionForced => "amqp:connection:forced",
            ConnectionError::FramingError => "amqp:connection:framing-error",
            ConnectionError::Redirect => "amqp:connection:redirect",
        };
        Symbol::from(s)
    }
}

impl<'a> TryFrom<&'a str> for ConnectionError {
    type Error = &'a str;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        let val = match value {
            "amqp:connection:forced" => ConnectionError::ConnectionForced,
            "amqp:connection:framing-error" => ConnectionError::FramingError,
            "amqp:connection:redirect" => ConnectionError::Redirect,
            _ => return Err(value),
        };
        Ok(val)
    }
}
