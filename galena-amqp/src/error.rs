//! Engine-level and connection-level errors

use galena_amqp_types::definitions::{
    self, AmqpError, ConnectionError, ErrorCondition, SessionError,
};
use galena_amqp_types::sasl::SaslCode;

use crate::connection::ConnectionState;

/// Fatal errors raised inside an engine task.
///
/// Any of these fails the whole connection: the engine attempts to send a
/// Close carrying the matching condition, transitions every endpoint to
/// its terminal state, and stops.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Transport failure
    #[error("IO error {0:?}")]
    Io(#[from] std::io::Error),

    /// A frame that could not be decoded
    #[error("Decode error")]
    Decode(#[from] galena_amqp_types::Error),

    /// A valid frame header could not be formed
    #[error("Framing error")]
    FramingError,

    /// An incoming frame exceeded the negotiated max frame size
    #[error("Max frame size exceeded")]
    MaxFrameSizeExceeded,

    /// No frame arrived within twice the local idle timeout
    #[error("Idle timeout elapsed")]
    IdleTimeoutElapsed,

    /// The remote protocol header does not match the local one
    #[error("Unexpected protocol header {0:?}")]
    UnexpectedProtocolHeader([u8; 8]),

    /// A frame arrived in a connection state that does not allow it
    #[error("Unexpected connection state {0:?}")]
    UnexpectedConnectionState(ConnectionState),

    /// A frame arrived in a session state that does not allow it
    #[error("Illegal session state")]
    IllegalSessionState,

    /// All channels permitted by the negotiated channel-max are in use
    #[error("Channel max reached")]
    ChannelMaxReached,

    /// All handles permitted by handle-max are in use
    #[error("Handle max reached")]
    HandleMaxReached,

    /// A frame referenced a channel with no mapped session
    #[error("Session not found for channel {0}")]
    SessionNotFound(u16),

    /// A frame referenced a handle with no attached link
    #[error("Unattached handle")]
    UnattachedHandle,

    /// A transfer arrived with a delivery-id that is not the expected
    /// next-incoming-id
    #[error("Delivery id mismatch: expected {expected}, found {found}")]
    DeliveryIdMismatch {
        /// The session's next-incoming-id
        expected: u32,
        /// The delivery-id carried by the transfer
        found: u32,
    },

    /// The remote peer closed the connection with an error
    #[error("Remote closed with error {0:?}")]
    Remote(definitions::Error),

    /// A control or frame channel was dropped while the engine still
    /// needed it
    #[error("Engine control channel closed")]
    ControlChannelClosed,
}

impl EngineError {
    /// The wire condition to carry in the Close frame for this error,
    /// if any.
    pub fn error_condition(&self) -> Option<ErrorCondition> {
        let condition = match self {
            EngineError::Decode(_) => ErrorCondition::AmqpError(AmqpError::DecodeError),
            EngineError::FramingError | EngineError::MaxFrameSizeExceeded => {
                ErrorCondition::ConnectionError(ConnectionError::FramingError)
            }
            EngineError::IdleTimeoutElapsed => {
                ErrorCondition::AmqpError(AmqpError::ResourceLimitExceeded)
            }
            EngineError::UnexpectedConnectionState(_) | EngineError::IllegalSessionState => {
                ErrorCondition::AmqpError(AmqpError::IllegalState)
            }
            EngineError::ChannelMaxReached | EngineError::HandleMaxReached => {
                ErrorCondition::AmqpError(AmqpError::ResourceLimitExceeded)
            }
            EngineError::SessionNotFound(_) => ErrorCondition::AmqpError(AmqpError::NotFound),
            EngineError::UnattachedHandle => {
                ErrorCondition::SessionError(SessionError::UnattachedHandle)
            }
            EngineError::DeliveryIdMismatch { .. } => {
                ErrorCondition::SessionError(SessionError::ErrantLink)
            }
            EngineError::Io(_)
            | EngineError::UnexpectedProtocolHeader(_)
            | EngineError::Remote(_)
            | EngineError::ControlChannelClosed => return None,
        };
        Some(condition)
    }
}

impl From<crate::frames::Error> for EngineError {
    fn from(err: crate::frames::Error) -> Self {
        match err {
            crate::frames::Error::Io(err) => EngineError::Io(err),
            crate::frames::Error::Decode(err) => EngineError::Decode(err),
            crate::frames::Error::FramingError => EngineError::FramingError,
            crate::frames::Error::NotImplemented => EngineError::FramingError,
        }
    }
}

/// Errors opening a connection.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// Transport failure
    #[error("IO error {0:?}")]
    Io(#[from] std::io::Error),

    /// The address could not be parsed or is not an amqp address
    #[error("Invalid address")]
    InvalidAddress,

    /// The url scheme is not supported
    #[error("Unsupported scheme {0:?}")]
    UnsupportedScheme(String),

    /// The remote peer declined every offered SASL mechanism
    #[error("No supported SASL mechanism")]
    SaslMechanismNotSupported,

    /// The SASL outcome was not `ok`
    #[error("SASL outcome {0:?}")]
    SaslDeclined(SaslCode),

    /// Engine failure during the open handshake
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<crate::frames::Error> for OpenError {
    fn from(err: crate::frames::Error) -> Self {
        OpenError::Engine(err.into())
    }
}

/// Errors beginning a session.
#[derive(Debug, thiserror::Error)]
pub enum BeginError {
    /// All channels permitted by the negotiated channel-max are in use
    #[error("Channel max reached")]
    ChannelMaxReached,

    /// The connection engine has stopped
    #[error("Connection engine has stopped")]
    ConnectionClosed,

    /// The remote peer ended the session during the begin handshake
    #[error("Remote ended with error {0:?}")]
    RemoteEnded(Option<definitions::Error>),
}
