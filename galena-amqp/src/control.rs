//! Control messages from handles to the engine tasks

use galena_amqp_types::definitions::{Error as WireError, Handle};
use tokio::sync::{mpsc, oneshot};

use crate::error::BeginError;
use crate::link::LinkFrame;
use crate::session::frame::SessionIncomingItem;

/// Identifier of a session within a connection engine.
pub(crate) type SessionId = usize;

/// Control messages for the connection engine.
pub(crate) enum ConnectionControl {
    /// Send a Close frame and stop once the remote Close arrives
    Close(Option<WireError>),

    /// Allocate an outgoing channel and register the session's incoming
    /// frame channel
    AllocateSession {
        tx: mpsc::Sender<SessionIncomingItem>,
        responder: oneshot::Sender<Result<(u16, SessionId), BeginError>>,
    },

    /// Remove an ended session from the channel maps
    DeallocateSession(SessionId),
}

impl std::fmt::Debug for ConnectionControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Close(err) => f.debug_tuple("Close").field(err).finish(),
            Self::AllocateSession { .. } => f.write_str("AllocateSession"),
            Self::DeallocateSession(id) => f.debug_tuple("DeallocateSession").field(id).finish(),
        }
    }
}

/// Control messages for a session engine.
pub(crate) enum SessionControl {
    /// Send an End frame and stop once the remote End arrives
    End(Option<WireError>),

    /// Allocate an output handle and register the link's incoming frame
    /// channel under its name
    AllocateLink {
        link_name: String,
        tx: mpsc::Sender<LinkFrame>,
        responder: oneshot::Sender<Result<Handle, crate::link::AttachError>>,
    },

    /// Remove a detached link from the handle maps
    DeallocateLink(Handle),
}

impl std::fmt::Debug for SessionControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::End(err) => f.debug_tuple("End").field(err).finish(),
            Self::AllocateLink { link_name, .. } => {
                f.debug_tuple("AllocateLink").field(link_name).finish()
            }
            Self::DeallocateLink(handle) => f.debug_tuple("DeallocateLink").field(handle).finish(),
        }
    }
}
