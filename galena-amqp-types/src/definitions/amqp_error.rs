use crate::primitives::Symbol;

/// 2.8.15 AMQP Error
///
/// Shared error conditions.
/// <type name="amqp-error" class="restricted" source="symbol" provides="error-condition">
/// </type>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmqpError {
    /// An internal error occurred.
    InternalError,
    /// A peer attempted to work with a remote entity that does not exist.
    NotFound,
    /// A peer attempted to work with a remote entity to which it has no access.
    UnauthorizedAccess,
    /// Data could not be decoded.
    DecodeError,
    /// The peer exceeded its resource allocation.
    ResourceLimitExceeded,
    /// The peer tried to use a frame in a manner that is inconsistent with
    /// the semantics defined in the specification.
    NotAllowed,
    /// An invalid field was passed in a frame body.
    InvalidField,
    /// The peer tried to use functionality that is not implemented.
    NotImplemented,
    /// The client attempted to work with a server entity to which it has no
    /// access because another client is working with it.
    ResourceLocked,
    /// The client made a request that was not allowed because some
    /// precondition failed.
    PreconditionFailed,
    /// A server entity the client is working with has been deleted.
    ResourceDeleted,
    /// The peer sent a frame that is not permitted in the current state.
    IllegalState,
    /// The peer cannot send a frame because the smallest encoding of the
    /// performative with the currently valid values would be too large.
    FrameSizeTooSmall,
}

impl From<AmqpError> for Symbol {
    fn from(value: AmqpError) -> Self {
        let s = match value {
            AmqpError::InternalError => "amqp:internal-error",
            AmqpError::NotFound => "amqp:not-found",
            AmqpError::UnauthorizedAccess => "amqp:unauthorized-access",
            AmqpError::DecodeError => "amqp:decode-error",
            AmqpError::ResourceLimitExceeded => "amqp:resource-limit-exceeded",
            AmqpError::NotAllowed => "amqp:not-allowed",
            AmqpError::InvalidField => "amqp:invalid-field",
            AmqpError::NotImplemented => "amqp:not-implemented",
            AmqpError::ResourceLocked => "amqp:resource-locked",
            AmqpError::PreconditionFailed => "amqp:precondition-failed",
            AmqpError::ResourceDeleted => "amqp:resource-deleted",
            AmqpError::IllegalState => "amqp:illegal-state",
            AmqpError::FrameSizeTooSmall => "amqp:frame-size-too-small",
        };
        Symbol::from(s)
    }
}

impl<'a> TryFrom<&'a str> for AmqpError {
    type Error = &'a str;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        let val = match value {
            "amqp:internal-error" => AmqpError::InternalError,
            "amqp:not-found" => AmqpError::NotFound,
            "amqp:unauthorized-access" => AmqpError::UnauthorizedAccess,
            "amqp:decode-error" => AmqpError::DecodeError,
            "amqp:resource-limit-exceeded" => AmqpError::ResourceLimitExceeded,
            "amqp:not-allowed" => AmqpError::NotAllowed,
            "amqp:invalid-field" => AmqpError::InvalidField,
            "amqp:not-implemented" => AmqpError::NotImplemented,
            "amqp:resource-locked" => AmqpError::ResourceLocked,
            "amqp:precondition-failed" => AmqpError::PreconditionFailed,
            "amqp:resource-deleted" => AmqpError::ResourceDeleted,
            "amqp:illegal-state" => AmqpError::IllegalState,
            "amqp:frame-size-too-small" => AmqpError::FrameSizeTooSmall,
            _ => return Err(value),
        };
        Ok(val)
    }
}
