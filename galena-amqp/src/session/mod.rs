//! Session endpoint and its multiplexer.

pub mod builder;
pub mod engine;
pub mod frame;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use galena_amqp_types::definitions::{DeliveryNumber, Fields, Handle, TransferNumber};
use galena_amqp_types::messaging::DeliveryState;
use galena_amqp_types::registry::TypeRegistry;
use slab::Slab;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::connection::ConnectionHandle;
use crate::control::SessionControl;
use crate::error::{BeginError, EngineError};
use crate::link::{AttachError, LinkFrame};
use crate::Payload;

/// Default incoming and outgoing window, in transfer frames.
pub const DEFAULT_WINDOW: u32 = 2048;

pub(crate) const DEFAULT_SESSION_CONTROL_BUFFER: usize = 128;

/// 2.5.5 Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Unmapped,
    BeginSent,
    Mapped,
    EndSent,
    Discarding,
}

/// A session endpoint.
///
/// The struct itself is owned by the session engine task; applications
/// interact with it through [`SessionHandle`], obtained from
/// [`Session::begin`].
#[derive(Debug)]
pub struct Session {
    pub(crate) outgoing_channel: u16,
    pub(crate) local_state: SessionState,

    // local session state
    pub(crate) next_outgoing_id: TransferNumber,
    /// Current incoming window, decremented per inbound transfer frame
    pub(crate) incoming_window: u32,
    /// Configured incoming window, restored when the current one runs low
    pub(crate) window: u32,
    pub(crate) outgoing_window: u32,
    pub(crate) handle_max: Handle,
    pub(crate) properties: Option<Fields>,

    // remote session state, learned from the remote Begin and Flows
    pub(crate) incoming_channel: Option<u16>,
    pub(crate) next_incoming_id: TransferNumber,
    pub(crate) remote_incoming_window: u32,
    pub(crate) remote_outgoing_window: u32,

    // link multiplexing
    pub(crate) links: Slab<LinkRelay>,
    pub(crate) link_by_name: HashMap<String, usize>,
    pub(crate) link_by_input_handle: HashMap<u32, usize>,

    // outgoing deliveries awaiting remote settlement
    pub(crate) outgoing_unsettled: BTreeMap<DeliveryNumber, UnsettledDelivery>,

    // transfers held back by an exhausted remote incoming window
    pub(crate) pending_transfers: VecDeque<PendingTransfer>,
}

/// Routing entry for one attached link.
#[derive(Debug)]
pub(crate) struct LinkRelay {
    pub(crate) name: String,
    pub(crate) tx: mpsc::Sender<LinkFrame>,
    pub(crate) input_handle: Option<u32>,
    /// Delivery-id of the partially received delivery on this link
    pub(crate) current_incoming_delivery: Option<DeliveryNumber>,
    /// Delivery-id of the partially sent delivery on this link
    pub(crate) current_outgoing_delivery: Option<DeliveryNumber>,
}

/// An outgoing delivery retained until the remote peer settles it.
pub(crate) struct UnsettledDelivery {
    pub(crate) settlement: oneshot::Sender<DeliveryState>,
}

impl std::fmt::Debug for UnsettledDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnsettledDelivery")
    }
}

/// A transfer chunk waiting for the remote incoming window to reopen.
#[derive(Debug)]
pub(crate) struct PendingTransfer {
    pub(crate) performative: galena_amqp_types::performatives::Transfer,
    pub(crate) payload: Payload,
    pub(crate) settlement: Option<oneshot::Sender<DeliveryState>>,
}

impl Session {
    pub(crate) fn new(outgoing_channel: u16, builder: builder::Builder) -> Self {
        Self {
            outgoing_channel,
            local_state: SessionState::Unmapped,
            next_outgoing_id: 0,
            incoming_window: builder.window,
            window: builder.window,
            outgoing_window: builder.window,
            handle_max: builder.handle_max,
            properties: builder.properties,
            incoming_channel: None,
            next_incoming_id: 0,
            remote_incoming_window: 0,
            remote_outgoing_window: 0,
            links: Slab::new(),
            link_by_name: HashMap::new(),
            link_by_input_handle: HashMap::new(),
            outgoing_unsettled: BTreeMap::new(),
            pending_transfers: VecDeque::new(),
        }
    }

    /// Registers a link under the smallest free handle.
    pub(crate) fn allocate_link(
        &mut self,
        name: String,
        tx: mpsc::Sender<LinkFrame>,
    ) -> Result<Handle, AttachError> {
        if self.link_by_name.contains_key(&name) {
            return Err(AttachError::DuplicateLinkName(name));
        }
        let entry = self.links.vacant_entry();
        let handle = Handle(entry.key() as u32);
        if handle.0 > self.handle_max.0 {
            return Err(AttachError::HandleMaxReached);
        }
        let key = entry.key();
        entry.insert(LinkRelay {
            name: name.clone(),
            tx,
            input_handle: None,
            current_incoming_delivery: None,
            current_outgoing_delivery: None,
        });
        self.link_by_name.insert(name, key);
        Ok(handle)
    }

    /// Removes a link and its handle mappings.
    pub(crate) fn deallocate_link(&mut self, handle: Handle) {
        let key = handle.0 as usize;
        if self.links.contains(key) {
            let relay = self.links.remove(key);
            self.link_by_name.remove(&relay.name);
            if let Some(input) = relay.input_handle {
                self.link_by_input_handle.remove(&input);
            }
        }
    }
}

/// A handle to a begun session.
///
/// Dropping the handle without calling [`end`](SessionHandle::end) leaves
/// the session to be reaped when the connection closes.
#[derive(Debug)]
pub struct SessionHandle {
    pub(crate) control: mpsc::Sender<SessionControl>,
    pub(crate) engine_handle: JoinHandle<Result<(), EngineError>>,
    /// Outgoing frames from links multiplexed on this session
    pub(crate) outgoing_link_frames: mpsc::Sender<LinkFrame>,
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) ended: bool,
}

impl SessionHandle {
    /// Ends the session: sends End and resolves once the remote End
    /// arrives and the session engine stops.
    ///
    /// Ending an already-ended session is a no-op.
    pub async fn end(&mut self) -> Result<(), EngineError> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        // a stopped engine has already dropped its control receiver; go
        // straight to collecting its result
        let _ = self.control.send(SessionControl::End(None)).await;
        match (&mut self.engine_handle).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::ControlChannelClosed),
        }
    }

    /// Ends the session with a timeout; an elapsed timeout leaves the End
    /// handshake running.
    pub async fn end_with_timeout(
        &mut self,
        duration: std::time::Duration,
    ) -> Result<Result<(), EngineError>, tokio::time::error::Elapsed> {
        tokio::time::timeout(duration, self.end()).await
    }

    pub(crate) async fn allocate_link(
        &mut self,
        link_name: String,
        tx: mpsc::Sender<LinkFrame>,
    ) -> Result<Handle, AttachError> {
        let (responder, resp_rx) = oneshot::channel();
        self.control
            .send(SessionControl::AllocateLink {
                link_name,
                tx,
                responder,
            })
            .await
            .map_err(|_| AttachError::SessionEnded)?;
        resp_rx.await.map_err(|_| AttachError::SessionEnded)?
    }

    pub(crate) async fn deallocate_link(&mut self, handle: Handle) {
        let _ = self
            .control
            .send(SessionControl::DeallocateLink(handle))
            .await;
    }
}

impl Session {
    /// Creates a builder for a session.
    pub fn builder() -> builder::Builder {
        builder::Builder::new()
    }

    /// Begins a session on the connection with default configuration.
    ///
    /// ```rust,ignore
    /// let mut session = Session::begin(&mut connection).await?;
    /// ```
    pub async fn begin(connection: &mut ConnectionHandle) -> Result<SessionHandle, BeginError> {
        Self::builder().begin(connection).await
    }
}
