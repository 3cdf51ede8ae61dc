//! The session engine: multiplexes links over one channel and drives the
//! session state machine.
//!
//! The engine owns every piece of session state; link facades and the
//! connection engine only talk to it over channels, so all window,
//! delivery-id, and disposition bookkeeping happens on this single task.

use bytes::BytesMut;
use galena_amqp_types::composite::DescribedType;
use galena_amqp_types::definitions::{AmqpError, Error as WireError, Role};
use galena_amqp_types::encode::Encoder;
use galena_amqp_types::messaging::DeliveryState;
use galena_amqp_types::performatives::{
    Attach, Begin, Detach, Disposition, End, Flow, Transfer,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use crate::connection::ConnectionHandle;
use crate::control::{ConnectionControl, SessionControl, SessionId};
use crate::error::{BeginError, EngineError};
use crate::link::LinkFrame;
use crate::session::frame::{SessionFrame, SessionFrameBody};
use crate::session::{PendingTransfer, Session, SessionState, UnsettledDelivery};
use crate::util::Running;
use crate::Payload;

/// Frame header octets preceding the body, plus margin for the encoded
/// transfer performative growing between chunks.
const TRANSFER_OVERHEAD_MARGIN: usize = 24;

pub(crate) struct SessionEngine {
    session: Session,
    session_id: SessionId,
    control: mpsc::Receiver<SessionControl>,
    incoming: mpsc::Receiver<SessionFrame>,
    link_frames: mpsc::Receiver<LinkFrame>,
    outgoing: mpsc::Sender<SessionFrame>,
    connection_control: mpsc::Sender<ConnectionControl>,
    max_frame_size: usize,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("session_id", &self.session_id)
            .finish()
    }
}

impl SessionEngine {
    pub(crate) fn new(
        session: Session,
        session_id: SessionId,
        control: mpsc::Receiver<SessionControl>,
        incoming: mpsc::Receiver<SessionFrame>,
        link_frames: mpsc::Receiver<LinkFrame>,
        connection: &ConnectionHandle,
    ) -> Self {
        Self {
            session,
            session_id,
            control,
            incoming,
            link_frames,
            outgoing: connection.session_frame_tx(),
            connection_control: connection.control_tx(),
            max_frame_size: connection.max_frame_size(),
        }
    }

    /// Sends Begin and waits for the remote Begin before the event loop
    /// starts.
    pub(crate) async fn begin(mut self) -> Result<Self, BeginError> {
        let begin = Begin {
            remote_channel: None,
            next_outgoing_id: self.session.next_outgoing_id,
            incoming_window: self.session.incoming_window,
            outgoing_window: self.session.outgoing_window,
            handle_max: self.session.handle_max,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: self.session.properties.clone(),
        };
        let frame = SessionFrame::new(
            self.session.outgoing_channel,
            SessionFrameBody::Begin(begin),
        );
        self.outgoing
            .send(frame)
            .await
            .map_err(|_| BeginError::ConnectionClosed)?;
        self.session.local_state = SessionState::BeginSent;

        loop {
            let frame = match self.incoming.recv().await {
                Some(frame) => frame,
                None => return Err(BeginError::ConnectionClosed),
            };
            match frame.body {
                SessionFrameBody::Begin(begin) => {
                    self.on_incoming_begin(frame.channel, begin)
                        .map_err(|_| BeginError::ConnectionClosed)?;
                    return Ok(self);
                }
                SessionFrameBody::End(end) => {
                    return Err(BeginError::RemoteEnded(end.error));
                }
                other => {
                    trace!(?other, "frame before remote Begin is dropped");
                }
            }
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<Result<(), EngineError>> {
        tokio::spawn(self.event_loop())
    }

    async fn event_loop(mut self) -> Result<(), EngineError> {
        let result = loop {
            let result = tokio::select! {
                incoming = self.incoming.recv() => match incoming {
                    Some(frame) => self.on_incoming(frame).await,
                    // the connection engine has stopped
                    None => break Err(EngineError::ControlChannelClosed),
                },
                control = self.control.recv() => match control {
                    Some(control) => self.on_control(control).await,
                    None => break Err(EngineError::ControlChannelClosed),
                },
                frame = self.link_frames.recv() => match frame {
                    Some(frame) => self.on_outgoing_link_frame(frame).await,
                    None => break Err(EngineError::ControlChannelClosed),
                },
            };

            match result {
                Ok(Running::Continue) => {}
                Ok(Running::Stop) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        if let Err(err) = &result {
            error!(session_id = self.session_id, %err, "session engine failed");
            self.end_with_engine_error(err).await;
        }

        // fail every delivery still awaiting remote settlement; dropping
        // the oneshot senders completes the futures with an error
        self.session.outgoing_unsettled.clear();
        // dropping the link relays closes every link facade
        self.session.links.clear();

        let _ = self
            .connection_control
            .send(ConnectionControl::DeallocateSession(self.session_id))
            .await;

        debug!(session_id = self.session_id, "session engine stopped");
        result
    }

    /// Best-effort End carrying the error's condition.
    async fn end_with_engine_error(&mut self, err: &EngineError) {
        if !matches!(self.session.local_state, SessionState::Mapped) {
            return;
        }
        let error = err
            .error_condition()
            .map(|condition| WireError::new(condition, Some(err.to_string()), None));
        let frame = SessionFrame::new(
            self.session.outgoing_channel,
            SessionFrameBody::End(End { error }),
        );
        self.session.local_state = SessionState::Discarding;
        let _ = self.outgoing.send(frame).await;
    }

    /* ------------------------------- incoming ------------------------------ */

    #[instrument(skip_all, fields(channel = frame.channel))]
    async fn on_incoming(&mut self, frame: SessionFrame) -> Result<Running, EngineError> {
        let SessionFrame { channel, body } = frame;
        match body {
            SessionFrameBody::Begin(begin) => {
                self.on_incoming_begin(channel, begin)?;
                Ok(Running::Continue)
            }
            SessionFrameBody::Attach(attach) => self.on_incoming_attach(attach).await,
            SessionFrameBody::Flow(flow) => self.on_incoming_flow(flow).await,
            SessionFrameBody::Transfer {
                performative,
                payload,
            } => self.on_incoming_transfer(performative, payload).await,
            SessionFrameBody::Disposition(disposition) => {
                self.on_incoming_disposition(disposition).await
            }
            SessionFrameBody::Detach(detach) => self.on_incoming_detach(detach).await,
            SessionFrameBody::End(end) => self.on_incoming_end(end).await,
        }
    }

    fn on_incoming_begin(&mut self, channel: u16, begin: Begin) -> Result<(), EngineError> {
        match self.session.local_state {
            SessionState::BeginSent => self.session.local_state = SessionState::Mapped,
            _ => return Err(EngineError::IllegalSessionState),
        }
        self.session.incoming_channel = Some(channel);
        self.session.next_incoming_id = begin.next_outgoing_id;
        self.session.remote_incoming_window = begin.incoming_window;
        self.session.remote_outgoing_window = begin.outgoing_window;
        Ok(())
    }

    async fn on_incoming_attach(&mut self, attach: Attach) -> Result<Running, EngineError> {
        match self.session.link_by_name.get(&attach.name) {
            Some(&key) => {
                let relay = self
                    .session
                    .links
                    .get_mut(key)
                    .ok_or(EngineError::UnattachedHandle)?;
                relay.input_handle = Some(attach.handle.0);
                self.session.link_by_input_handle.insert(attach.handle.0, key);
                if relay.tx.send(LinkFrame::Attach(attach)).await.is_err() {
                    trace!("link facade dropped before remote attach arrived");
                }
            }
            None => {
                // an unsolicited attach: answer with a null terminus and a
                // closing detach carrying not-found
                debug!(name = %attach.name, "refusing attach for unknown link");
                let refusal = Attach {
                    name: attach.name.clone(),
                    handle: attach.handle,
                    role: match attach.role {
                        Role::Sender => Role::Receiver,
                        Role::Receiver => Role::Sender,
                    },
                    snd_settle_mode: Default::default(),
                    rcv_settle_mode: Default::default(),
                    source: None,
                    target: None,
                    unsettled: None,
                    incomplete_unsettled: false,
                    initial_delivery_count: None,
                    max_message_size: None,
                    offered_capabilities: None,
                    desired_capabilities: None,
                    properties: None,
                };
                self.send_to_connection(SessionFrameBody::Attach(refusal))
                    .await?;
                let detach = Detach {
                    handle: attach.handle,
                    closed: true,
                    error: Some(WireError::new(
                        AmqpError::NotFound,
                        Some(format!("no local link named {:?}", attach.name)),
                        None,
                    )),
                };
                self.send_to_connection(SessionFrameBody::Detach(detach))
                    .await?;
            }
        }
        Ok(Running::Continue)
    }

    async fn on_incoming_flow(&mut self, flow: Flow) -> Result<Running, EngineError> {
        // session flow state first
        self.session.remote_outgoing_window = flow.outgoing_window;
        self.session.remote_incoming_window = match flow.next_incoming_id {
            Some(next_incoming_id) => next_incoming_id
                .wrapping_add(flow.incoming_window)
                .wrapping_sub(self.session.next_outgoing_id),
            None => flow.incoming_window,
        };

        match flow.handle {
            Some(handle) => {
                let key = self
                    .session
                    .link_by_input_handle
                    .get(&handle.0)
                    .copied()
                    .ok_or(EngineError::UnattachedHandle)?;
                if let Some(relay) = self.session.links.get(key) {
                    let _ = relay.tx.send(LinkFrame::Flow(flow)).await;
                }
            }
            None => {
                if flow.echo {
                    self.send_session_flow(false).await?;
                }
            }
        }

        // the reopened window may unblock held-back transfers
        self.drain_pending_transfers().await?;
        Ok(Running::Continue)
    }

    async fn on_incoming_transfer(
        &mut self,
        transfer: Transfer,
        payload: Payload,
    ) -> Result<Running, EngineError> {
        let key = self
            .session
            .link_by_input_handle
            .get(&transfer.handle.0)
            .copied()
            .ok_or(EngineError::UnattachedHandle)?;
        let relay = self
            .session
            .links
            .get_mut(key)
            .ok_or(EngineError::UnattachedHandle)?;

        // every transfer frame consumes one transfer-id
        let expected = self.session.next_incoming_id;
        match (relay.current_incoming_delivery, transfer.delivery_id) {
            // first frame of a new delivery must carry the next id
            (None, Some(found)) => {
                if found != expected {
                    return Err(EngineError::DeliveryIdMismatch { expected, found });
                }
            }
            // first frame without a delivery-id is a framing violation
            (None, None) => return Err(EngineError::FramingError),
            // continuation frames may repeat the id, identically
            (Some(open), Some(found)) if found != open => {
                return Err(EngineError::DeliveryIdMismatch {
                    expected: open,
                    found,
                })
            }
            (Some(_), _) => {}
        }
        let delivery_id = transfer
            .delivery_id
            .or(relay.current_incoming_delivery)
            .unwrap_or(expected);
        relay.current_incoming_delivery = match transfer.more && !transfer.aborted {
            true => Some(delivery_id),
            false => None,
        };
        let relay_tx = relay.tx.clone();

        self.session.next_incoming_id = self.session.next_incoming_id.wrapping_add(1);
        self.session.incoming_window = self.session.incoming_window.saturating_sub(1);

        let _ = relay_tx
            .send(LinkFrame::Transfer {
                performative: transfer,
                payload,
                settlement: None,
            })
            .await;

        // replenish the incoming window before it starves the peer
        if self.session.incoming_window <= self.session.window / 2 {
            self.session.incoming_window = self.session.window;
            self.send_session_flow(false).await?;
        }
        Ok(Running::Continue)
    }

    async fn on_incoming_disposition(
        &mut self,
        disposition: Disposition,
    ) -> Result<Running, EngineError> {
        match disposition.role {
            // the remote receiver reports on our outgoing deliveries
            Role::Receiver => {
                let mut needs_echo = false;
                for id in disposition.range() {
                    if let Some(unsettled) = self.session.outgoing_unsettled.remove(&id) {
                        let state = disposition
                            .state
                            .clone()
                            .unwrap_or(DeliveryState::Accepted(Default::default()));
                        if disposition.settled || state.is_terminal() {
                            let _ = unsettled.settlement.send(state);
                            if !disposition.settled {
                                needs_echo = true;
                            }
                        } else {
                            // a non-terminal, unsettled state keeps the
                            // delivery in the unsettled map
                            self.session
                                .outgoing_unsettled
                                .insert(id, unsettled);
                        }
                    }
                }
                // settle on our side so the receiver can forget the range
                if needs_echo {
                    let echo = Disposition {
                        role: Role::Sender,
                        first: disposition.first,
                        last: disposition.last,
                        settled: true,
                        state: disposition.state.clone(),
                        batchable: false,
                    };
                    self.send_to_connection(SessionFrameBody::Disposition(echo))
                        .await?;
                }
            }
            // the remote sender settles its own deliveries; forward to the
            // receiving links so a second-settle-mode receiver can observe
            Role::Sender => {
                for (_, relay) in self.session.links.iter() {
                    let _ = relay
                        .tx
                        .send(LinkFrame::Disposition(disposition.clone()))
                        .await;
                }
            }
        }
        Ok(Running::Continue)
    }

    async fn on_incoming_detach(&mut self, detach: Detach) -> Result<Running, EngineError> {
        let key = self
            .session
            .link_by_input_handle
            .get(&detach.handle.0)
            .copied()
            .ok_or(EngineError::UnattachedHandle)?;
        if let Some(relay) = self.session.links.get(key) {
            let _ = relay.tx.send(LinkFrame::Detach(detach)).await;
        }
        Ok(Running::Continue)
    }

    async fn on_incoming_end(&mut self, end: End) -> Result<Running, EngineError> {
        match self.session.local_state {
            SessionState::Mapped => {
                // remote initiated end: echo an End and stop
                self.session.local_state = SessionState::Unmapped;
                self.send_to_connection(SessionFrameBody::End(End { error: None }))
                    .await?;
            }
            SessionState::EndSent | SessionState::Discarding => {
                self.session.local_state = SessionState::Unmapped;
            }
            _ => return Err(EngineError::IllegalSessionState),
        }
        match end.error {
            Some(error) => Err(EngineError::Remote(error)),
            None => Ok(Running::Stop),
        }
    }

    /* ------------------------------- control ------------------------------- */

    async fn on_control(&mut self, control: SessionControl) -> Result<Running, EngineError> {
        match control {
            SessionControl::End(error) => {
                match self.session.local_state {
                    SessionState::Mapped => {
                        self.session.local_state = match error.is_some() {
                            true => SessionState::Discarding,
                            false => SessionState::EndSent,
                        };
                        self.send_to_connection(SessionFrameBody::End(End { error }))
                            .await?;
                    }
                    // ending an already-ended session is a no-op
                    SessionState::Unmapped => return Ok(Running::Stop),
                    _ => return Err(EngineError::IllegalSessionState),
                }
                Ok(Running::Continue)
            }
            SessionControl::AllocateLink {
                link_name,
                tx,
                responder,
            } => {
                let result = match self.session.local_state {
                    SessionState::Mapped => self.session.allocate_link(link_name, tx),
                    _ => Err(crate::link::AttachError::IllegalState),
                };
                let _ = responder.send(result);
                Ok(Running::Continue)
            }
            SessionControl::DeallocateLink(handle) => {
                self.session.deallocate_link(handle);
                Ok(Running::Continue)
            }
        }
    }

    /* --------------------------- outgoing (links) -------------------------- */

    async fn on_outgoing_link_frame(&mut self, frame: LinkFrame) -> Result<Running, EngineError> {
        match frame {
            LinkFrame::Attach(attach) => {
                self.send_to_connection(SessionFrameBody::Attach(attach))
                    .await?;
            }
            LinkFrame::Flow(mut flow) => {
                self.fill_session_flow_state(&mut flow);
                self.send_to_connection(SessionFrameBody::Flow(flow)).await?;
            }
            LinkFrame::Transfer {
                performative,
                payload,
                settlement,
            } => {
                self.on_outgoing_transfer(performative, payload, settlement)
                    .await?;
            }
            LinkFrame::Disposition(disposition) => {
                self.send_to_connection(SessionFrameBody::Disposition(disposition))
                    .await?;
            }
            LinkFrame::Detach(detach) => {
                self.send_to_connection(SessionFrameBody::Detach(detach))
                    .await?;
            }
        }
        Ok(Running::Continue)
    }

    /// Splits an outgoing delivery into frame-sized transfer chunks and
    /// sends what the remote incoming window allows, queueing the rest.
    async fn on_outgoing_transfer(
        &mut self,
        performative: Transfer,
        payload: Payload,
        settlement: Option<tokio::sync::oneshot::Sender<DeliveryState>>,
    ) -> Result<(), EngineError> {
        let chunks = self.split_transfer(performative, payload)?;
        let mut settlement = settlement;
        for (chunk, chunk_payload) in chunks {
            let pending = PendingTransfer {
                performative: chunk,
                payload: chunk_payload,
                settlement: settlement.take(),
            };
            self.session.pending_transfers.push_back(pending);
        }
        self.drain_pending_transfers().await
    }

    /// Splits a transfer so each resulting frame fits the negotiated max
    /// frame size. Continuation chunks repeat the performative with
    /// `more=true`; only the final chunk carries the original flag.
    fn split_transfer(
        &self,
        performative: Transfer,
        mut payload: Payload,
    ) -> Result<Vec<(Transfer, Payload)>, EngineError> {
        let mut probe = BytesMut::new();
        Encoder::new(&mut probe).write_value(&performative.to_value())?;
        let max_payload = self
            .max_frame_size
            .saturating_sub(probe.len() + TRANSFER_OVERHEAD_MARGIN);
        if max_payload == 0 {
            return Err(EngineError::MaxFrameSizeExceeded);
        }

        if payload.len() <= max_payload {
            return Ok(vec![(performative, payload)]);
        }

        let mut chunks = Vec::with_capacity(payload.len() / max_payload + 1);
        while payload.len() > max_payload {
            let mut chunk = performative.clone();
            chunk.more = true;
            chunks.push((chunk, payload.split_to(max_payload)));
        }
        chunks.push((performative, payload));
        Ok(chunks)
    }

    /// Sends queued transfer chunks while the remote incoming window has
    /// room, assigning delivery-ids and window credits per frame.
    async fn drain_pending_transfers(&mut self) -> Result<(), EngineError> {
        while self.session.remote_incoming_window > 0 {
            let PendingTransfer {
                mut performative,
                payload,
                settlement,
            } = match self.session.pending_transfers.pop_front() {
                Some(pending) => pending,
                None => break,
            };

            let key = performative.handle.0 as usize;
            let relay = self
                .session
                .links
                .get_mut(key)
                .ok_or(EngineError::UnattachedHandle)?;

            let delivery_id = match relay.current_outgoing_delivery {
                Some(open) => open,
                None => self.session.next_outgoing_id,
            };
            performative.delivery_id = Some(delivery_id);
            relay.current_outgoing_delivery = match performative.more {
                true => Some(delivery_id),
                false => None,
            };

            if let Some(settlement) = settlement {
                self.session
                    .outgoing_unsettled
                    .insert(delivery_id, UnsettledDelivery { settlement });
            }

            self.session.next_outgoing_id = self.session.next_outgoing_id.wrapping_add(1);
            self.session.remote_incoming_window -= 1;

            self.send_to_connection(SessionFrameBody::Transfer {
                performative,
                payload,
            })
            .await?;
        }
        Ok(())
    }

    /* ------------------------------- helpers ------------------------------- */

    fn fill_session_flow_state(&self, flow: &mut Flow) {
        flow.next_incoming_id = Some(self.session.next_incoming_id);
        flow.incoming_window = self.session.incoming_window;
        flow.next_outgoing_id = self.session.next_outgoing_id;
        flow.outgoing_window = self.session.outgoing_window;
    }

    async fn send_session_flow(&mut self, echo: bool) -> Result<(), EngineError> {
        let mut flow = Flow {
            next_incoming_id: None,
            incoming_window: 0,
            next_outgoing_id: 0,
            outgoing_window: 0,
            handle: None,
            delivery_count: None,
            link_credit: None,
            available: None,
            drain: false,
            echo,
            properties: None,
        };
        self.fill_session_flow_state(&mut flow);
        self.send_to_connection(SessionFrameBody::Flow(flow)).await
    }

    async fn send_to_connection(&mut self, body: SessionFrameBody) -> Result<(), EngineError> {
        let frame = SessionFrame::new(self.session.outgoing_channel, body);
        self.outgoing
            .send(frame)
            .await
            .map_err(|_| EngineError::ControlChannelClosed)
    }
}
