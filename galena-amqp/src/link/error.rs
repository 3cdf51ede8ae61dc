//! Link-level errors surfaced through the client facade

use galena_amqp_types::definitions::Error as WireError;

/// Errors attaching a link.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    /// The session engine has stopped
    #[error("Session has ended")]
    SessionEnded,

    /// All handles permitted by handle-max are in use
    #[error("Handle max reached")]
    HandleMaxReached,

    /// A link with the same name is already attached to the session
    #[error("Link name {0:?} is already in use")]
    DuplicateLinkName(String),

    /// The remote peer refused the attach by answering with a null
    /// terminus and detaching
    #[error("Attach refused by remote peer: {0:?}")]
    Refused(Option<WireError>),

    /// The session is not in a state that allows attaching
    #[error("Illegal session state")]
    IllegalState,
}

/// Errors detaching or closing a link.
#[derive(Debug, thiserror::Error)]
pub enum DetachError {
    /// The session engine has stopped
    #[error("Session has ended")]
    SessionEnded,

    /// The link was not attached to begin with
    #[error("Illegal link state")]
    IllegalState,

    /// The remote peer closed the link while a detach was expected
    #[error("Link closed by remote peer")]
    ClosedByRemote,

    /// The remote peer detached the link while a close was expected
    #[error("Link detached by remote peer")]
    DetachedByRemote,

    /// The remote detach carried an error
    #[error("Remote detached with error {0:?}")]
    RemoteError(WireError),
}

/// Errors sending a message.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The link or session has stopped
    #[error("Link has detached")]
    LinkClosed,

    /// The message could not be encoded
    #[error("Encode error: {0}")]
    MessageEncode(#[from] galena_amqp_types::Error),

    /// The remote peer detached the link
    #[error("Detached by remote peer: {0:?}")]
    Detached(Option<WireError>),

    /// The engine dropped the delivery before the remote settled it
    #[error("Delivery settlement was abandoned")]
    SettlementAbandoned,

    /// The link is not attached
    #[error("Illegal link state")]
    IllegalState,

    /// The delivery outcome was not Accepted
    #[error("Outcome was not Accepted")]
    NotAccepted,
}

/// Errors receiving a message.
#[derive(Debug, thiserror::Error)]
pub enum RecvError {
    /// The link or session has stopped
    #[error("Link has detached")]
    LinkClosed,

    /// The message payload could not be decoded
    #[error("Decode error: {0}")]
    MessageDecode(#[from] galena_amqp_types::Error),

    /// The remote peer detached the link
    #[error("Detached by remote peer: {0:?}")]
    Detached(Option<WireError>),

    /// A transfer violated the delivery reassembly rules
    #[error("Illegal transfer: {0}")]
    IllegalTransfer(&'static str),
}

/// Errors applying a disposition.
#[derive(Debug, thiserror::Error)]
pub enum DispositionError {
    /// The link or session has stopped
    #[error("Link has detached")]
    LinkClosed,
}

/// Errors draining link credit.
#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    /// The link or session has stopped
    #[error("Link has detached")]
    LinkClosed,

    /// Drain is not available while an automatic credit window manages
    /// the link credit
    #[error("Credit mode is automatic")]
    AutoCreditMode,

    /// Manual credit operations are refused while a drain is pending
    #[error("A drain is pending")]
    DrainPending,

    /// The remote peer detached the link
    #[error("Detached by remote peer: {0:?}")]
    Detached(Option<WireError>),
}
