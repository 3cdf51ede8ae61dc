//! Sender and receiver links.

pub mod builder;
pub mod delivery;
pub mod receiver;
pub mod sender;
pub mod stream;

mod error;
pub use error::{
    AttachError, DetachError, DispositionError, DrainError, RecvError, SendError,
};

use galena_amqp_types::messaging::DeliveryState;
use galena_amqp_types::performatives::{Attach, Detach, Disposition, Flow, Transfer};
use tokio::sync::oneshot;

use crate::Payload;

/// Frames exchanged between a link facade and its session engine, in both
/// directions.
pub(crate) enum LinkFrame {
    /// Attach performative
    Attach(Attach),
    /// Flow performative; outbound link flows have their session fields
    /// filled in by the session engine
    Flow(Flow),
    /// Transfer performative with payload; outbound transfers from an
    /// unsettled sender carry the settlement notifier for their delivery
    Transfer {
        performative: Transfer,
        payload: Payload,
        settlement: Option<oneshot::Sender<DeliveryState>>,
    },
    /// Disposition performative
    Disposition(Disposition),
    /// Detach performative
    Detach(Detach),
}

impl std::fmt::Debug for LinkFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attach(attach) => f.debug_tuple("Attach").field(attach).finish(),
            Self::Flow(flow) => f.debug_tuple("Flow").field(flow).finish(),
            Self::Transfer { performative, .. } => {
                f.debug_tuple("Transfer").field(performative).finish()
            }
            Self::Disposition(disposition) => {
                f.debug_tuple("Disposition").field(disposition).finish()
            }
            Self::Detach(detach) => f.debug_tuple("Detach").field(detach).finish(),
        }
    }
}

/// 2.6.1 Link states (the subset a client endpoint moves through).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkState {
    /// No attach has been exchanged
    Unattached,
    /// Local attach sent, waiting for the remote attach
    AttachSent,
    /// Both attaches exchanged
    Attached,
    /// Local detach sent, waiting for the remote detach
    DetachSent,
    /// Both detaches exchanged
    Detached,
}
