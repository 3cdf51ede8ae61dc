use crate::primitives::Symbol;

/// 2.8.17 Session Error
///
/// Symbols used to indicate session error conditions.
/// <type name="session-error" class="restricted" source="symbol" provides="error-condition">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The peer violated incoming window for the session.
    WindowViolation,
    /// Input was received for a link that was detached with an error.
    ErrantLink,
    /// An attach was received using a handle that is already in use for an
    /// attached link.
    HandleInUse,
    /// A frame (other than attach) was received referencing a handle which
    /// is not currently in use of an attached link.
    UnattachedHandle,
}

impl From<SessionError> for Symbol {
    fn from(value: SessionError) -> Self {
        let s = match value {
            SessionError::WindowViolation => "amqp:session:window-violation",
            SessionError::ErrantLink => "amqp:session:errant-link",
            SessionError::HandleInUse => "amqp:session:handle-in-use",
            SessionError::UnattachedHandle => "amqp:session:unattached-handle",
        };
        Symbol::from(s)
    }
}

impl<'a> TryFrom<&'a str> for SessionError {
    type Error = &'a str;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        let val = match value {
            "amqp:session:window-violation" => SessionError::WindowViolation,
            "amqp:session:errant-link" => SessionError::ErrantLink,
            "amqp:session:handle-in-use" => SessionError::HandleInUse,
            "amqp:session:unattached-handle" => SessionError::UnattachedHandle,
            _ => return Err(value),
        };
        Ok(val)
    }
}
