//! Connection endpoint and its engine.

pub mod builder;
pub mod engine;
pub(crate) mod heartbeat;

use std::collections::HashMap;
use std::sync::Arc;

use galena_amqp_types::performatives::Open;
use galena_amqp_types::registry::TypeRegistry;
use slab::Slab;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::control::{ConnectionControl, SessionId};
use crate::error::{BeginError, EngineError, OpenError};
use crate::session::frame::{SessionFrame, SessionIncomingItem};

/// 2.4.6 Connection states, including the pipelined intermediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No frames or headers have been exchanged
    Start,
    /// The remote header has arrived
    HeaderReceived,
    /// The local header has been sent
    HeaderSent,
    /// Both headers have been exchanged
    HeaderExchange,
    /// Open sent before the remote header arrived
    OpenPipe,
    /// The remote Open has arrived
    OpenReceived,
    /// The local Open has been sent
    OpenSent,
    /// Close pipelined behind the local Open
    ClosePipe,
    /// Both Opens have been exchanged
    Opened,
    /// The remote Close has arrived
    CloseReceived,
    /// The local Close has been sent
    CloseSent,
    /// The connection is terminal
    End,
}

/// The connection endpoint state owned by the connection engine.
#[derive(Debug)]
pub struct Connection {
    pub(crate) local_state: ConnectionState,
    pub(crate) local_open: Open,
    pub(crate) remote_open: Option<Open>,

    // negotiated down to the lower of the two Opens
    pub(crate) agreed_channel_max: u16,
    pub(crate) agreed_max_frame_size: usize,

    // channel number allocation: the slab key is the outgoing channel
    pub(crate) local_sessions: Slab<mpsc::Sender<SessionIncomingItem>>,
    pub(crate) session_by_incoming_channel: HashMap<u16, SessionId>,
}

impl Connection {
    /// Creates a builder for a [`Connection`].
    pub fn builder() -> builder::Builder {
        builder::Builder::new()
    }

    /// Opens a connection with default configuration.
    ///
    /// The url scheme must be `amqp`; credentials in the url select the
    /// SASL PLAIN profile.
    ///
    /// ```rust,ignore
    /// let mut connection = Connection::open("client-1", "amqp://localhost:5672").await?;
    /// ```
    pub async fn open(
        container_id: impl Into<String>,
        url: impl AsRef<str>,
    ) -> Result<ConnectionHandle, OpenError> {
        Self::builder().container_id(container_id).open(url).await
    }

    pub(crate) fn new(local_state: ConnectionState, local_open: Open) -> Self {
        let agreed_channel_max = local_open.channel_max.0;
        let agreed_max_frame_size = local_open.max_frame_size.0 as usize;
        Self {
            local_state,
            local_open,
            remote_open: None,
            agreed_channel_max,
            agreed_max_frame_size,
            local_sessions: Slab::new(),
            session_by_incoming_channel: HashMap::new(),
        }
    }

    /// Reacting to the remote Open frame.
    pub(crate) fn on_incoming_open(&mut self, open: Open) -> Result<(), EngineError> {
        match self.local_state {
            ConnectionState::HeaderExchange => self.local_state = ConnectionState::OpenReceived,
            ConnectionState::OpenSent => self.local_state = ConnectionState::Opened,
            ConnectionState::ClosePipe => self.local_state = ConnectionState::CloseSent,
            state => return Err(EngineError::UnexpectedConnectionState(state)),
        }

        // negotiate down to mutually acceptable limits
        self.agreed_channel_max = self.local_open.channel_max.0.min(open.channel_max.0);
        self.agreed_max_frame_size =
            (self.local_open.max_frame_size.0.min(open.max_frame_size.0)) as usize;
        self.remote_open = Some(open);
        Ok(())
    }

    /// Allocates the smallest free outgoing channel for a session.
    pub(crate) fn allocate_session(
        &mut self,
        tx: mpsc::Sender<SessionIncomingItem>,
    ) -> Result<(u16, SessionId), BeginError> {
        let entry = self.local_sessions.vacant_entry();
        let key = entry.key();
        if key > self.agreed_channel_max as usize {
            return Err(BeginError::ChannelMaxReached);
        }
        entry.insert(tx);
        Ok((key as u16, key))
    }

    pub(crate) fn deallocate_session(&mut self, session_id: SessionId) {
        if self.local_sessions.contains(session_id) {
            self.local_sessions.remove(session_id);
        }
        self.session_by_incoming_channel
            .retain(|_, id| *id != session_id);
    }
}

/// A handle to an opened connection.
///
/// The connection engine runs on its own task; this handle closes it and
/// hands out channels for beginning sessions.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub(crate) control: mpsc::Sender<ConnectionControl>,
    pub(crate) engine_handle: JoinHandle<Result<(), EngineError>>,
    pub(crate) session_frame_tx: mpsc::Sender<SessionFrame>,
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) max_frame_size: usize,
    closed: bool,
}

impl ConnectionHandle {
    pub(crate) fn new(
        control: mpsc::Sender<ConnectionControl>,
        engine_handle: JoinHandle<Result<(), EngineError>>,
        session_frame_tx: mpsc::Sender<SessionFrame>,
        registry: Arc<TypeRegistry>,
        max_frame_size: usize,
    ) -> Self {
        Self {
            control,
            engine_handle,
            session_frame_tx,
            registry,
            max_frame_size,
            closed: false,
        }
    }

    /// Closes the connection: sends Close and resolves once the remote
    /// Close arrives and the engine stops.
    ///
    /// Closing an already-closed connection is a no-op. If the engine
    /// already failed, the failure is returned here.
    pub async fn close(&mut self) -> Result<(), EngineError> {
        self.close_with_error(None).await
    }

    /// Closes the connection with an error condition.
    pub async fn close_with_error(
        &mut self,
        error: Option<galena_amqp_types::definitions::Error>,
    ) -> Result<(), EngineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // a failed engine has already dropped its control receiver; go
        // straight to collecting its result
        let _ = self.control.send(ConnectionControl::Close(error)).await;
        match (&mut self.engine_handle).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::ControlChannelClosed),
        }
    }

    /// Closes with a timeout. An elapsed timeout leaves the Close
    /// handshake running; the protocol action is not cancelled.
    pub async fn close_with_timeout(
        &mut self,
        duration: std::time::Duration,
    ) -> Result<Result<(), EngineError>, tokio::time::error::Elapsed> {
        tokio::time::timeout(duration, self.close()).await
    }

    /// The negotiated maximum frame size.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    pub(crate) fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub(crate) fn session_frame_tx(&self) -> mpsc::Sender<SessionFrame> {
        self.session_frame_tx.clone()
    }

    pub(crate) fn control_tx(&self) -> mpsc::Sender<ConnectionControl> {
        self.control.clone()
    }

    pub(crate) async fn allocate_session(
        &mut self,
        tx: mpsc::Sender<SessionIncomingItem>,
    ) -> Result<(u16, SessionId), BeginError> {
        let (responder, resp_rx) = oneshot::channel();
        self.control
            .send(ConnectionControl::AllocateSession { tx, responder })
            .await
            .map_err(|_| BeginError::ConnectionClosed)?;
        resp_rx.await.map_err(|_| BeginError::ConnectionClosed)?
    }
}
