//! The subset of frames exchanged between the connection engine and a
//! session engine.

use galena_amqp_types::performatives::{
    Attach, Begin, Detach, Disposition, End, Flow, Transfer,
};

use crate::Payload;

/// A frame relayed between a session engine and the connection engine.
///
/// For outbound frames `channel` is the session's outgoing channel; for
/// inbound frames it is the channel the frame arrived on.
#[derive(Debug)]
pub struct SessionFrame {
    /// The channel number
    pub channel: u16,
    /// The frame body
    pub body: SessionFrameBody,
}

impl SessionFrame {
    /// Creates a new session frame.
    pub fn new(channel: impl Into<u16>, body: SessionFrameBody) -> Self {
        Self {
            channel: channel.into(),
            body,
        }
    }
}

/// Body of a [`SessionFrame`].
#[derive(Debug)]
pub enum SessionFrameBody {
    /// Begin performative
    Begin(Begin),
    /// Attach performative
    Attach(Attach),
    /// Flow performative
    Flow(Flow),
    /// Transfer performative plus payload
    Transfer {
        /// The performative
        performative: Transfer,
        /// The payload carried by the frame
        payload: Payload,
    },
    /// Disposition performative
    Disposition(Disposition),
    /// Detach performative
    Detach(Detach),
    /// End performative
    End(End),
}

/// Frames a session engine receives from the connection engine.
pub type SessionIncomingItem = SessionFrame;
