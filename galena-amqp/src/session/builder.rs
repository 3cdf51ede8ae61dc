//! Builder for a [`Session`](super::Session)

use galena_amqp_types::definitions::{Fields, Handle};
use tokio::sync::mpsc;

use crate::connection::ConnectionHandle;
use crate::error::BeginError;
use crate::session::engine::SessionEngine;
use crate::session::{Session, SessionHandle, DEFAULT_SESSION_CONTROL_BUFFER, DEFAULT_WINDOW};

/// Builder for a [`Session`]
#[derive(Debug, Clone)]
pub struct Builder {
    /// The incoming and outgoing window in transfer frames
    pub window: u32,
    /// The largest handle that can be assigned to a link on this session
    pub handle_max: Handle,
    /// Session properties
    pub properties: Option<Fields>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            handle_max: Handle::default(),
            properties: None,
        }
    }
}

impl Builder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the incoming/outgoing window in frames.
    pub fn window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }

    /// Sets the handle-max for links on this session.
    pub fn handle_max(mut self, handle_max: impl Into<Handle>) -> Self {
        self.handle_max = handle_max.into();
        self
    }

    /// Sets the session properties.
    pub fn properties(mut self, properties: Fields) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Begins the session: allocates a channel, sends Begin, and resolves
    /// once the remote Begin arrives.
    pub async fn begin(self, connection: &mut ConnectionHandle) -> Result<SessionHandle, BeginError> {
        let (incoming_tx, incoming_rx) = mpsc::channel(DEFAULT_SESSION_CONTROL_BUFFER);
        let (channel, session_id) = connection.allocate_session(incoming_tx).await?;

        let (control_tx, control_rx) = mpsc::channel(DEFAULT_SESSION_CONTROL_BUFFER);
        let (link_tx, link_rx) = mpsc::channel(DEFAULT_SESSION_CONTROL_BUFFER);

        let session = Session::new(channel, self);
        let engine = SessionEngine::new(
            session,
            session_id,
            control_rx,
            incoming_rx,
            link_rx,
            connection,
        );
        let engine = engine.begin().await?;
        let engine_handle = engine.spawn();

        Ok(SessionHandle {
            control: control_tx,
            engine_handle,
            outgoing_link_frames: link_tx,
            registry: connection.registry().clone(),
            ended: false,
        })
    }
}
