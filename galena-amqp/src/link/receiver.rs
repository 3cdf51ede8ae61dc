//! The receiver link.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use galena_amqp_types::buffer::CompositePayload;
use galena_amqp_types::definitions::{
    DeliveryNumber, DeliveryTag, Error as WireError, Handle, MessageFormat, ReceiverSettleMode,
    Role, SenderSettleMode, SequenceNo,
};
use galena_amqp_types::messaging::{
    Accepted, DeliveryState, Message, Modified, Rejected, Released, Source, Target,
};
use galena_amqp_types::performatives::{Detach, Disposition, Flow, Transfer};
use galena_amqp_types::registry::TypeRegistry;
use tokio::sync::mpsc;
use tokio::time::{error::Elapsed, timeout};
use tracing::trace;

use crate::control::SessionControl;
use crate::link::builder::ReceiverBuilder;
use crate::link::delivery::Delivery;
use crate::link::{DetachError, DispositionError, DrainError, LinkFrame, LinkState, RecvError};
use crate::session::SessionHandle;
use crate::Payload;

/// Credit management policy of a [`Receiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditMode {
    /// The receiver keeps a window of `n` credits topped up on its own;
    /// manual credit operations are refused
    Auto(u32),
    /// Credit moves only through [`Receiver::set_credit`] and
    /// [`Receiver::add_credit`]
    Manual,
}

impl Default for CreditMode {
    fn default() -> Self {
        // the default credit window is deliberately small; bump it for
        // high-throughput links
        CreditMode::Auto(10)
    }
}

/// An AMQP 1.0 receiver link.
///
/// ```rust,ignore
/// let mut receiver = Receiver::attach(&mut session, "rust-receiver-1", "q1").await?;
/// let delivery = receiver.recv().await?;
/// receiver.accept(&delivery).await?;
/// ```
#[derive(Debug)]
pub struct Receiver {
    pub(crate) name: String,
    pub(crate) output_handle: Option<Handle>,
    pub(crate) snd_settle_mode: SenderSettleMode,
    pub(crate) rcv_settle_mode: ReceiverSettleMode,
    pub(crate) source: Option<Source>,
    pub(crate) target: Option<Target>,

    /// The remote sender's delivery-count, tracked from attach and flows
    pub(crate) delivery_count: SequenceNo,
    pub(crate) link_credit: u32,
    pub(crate) credit_mode: CreditMode,
    pub(crate) auto_accept: bool,

    /// Completed deliveries not yet handed to the application
    pub(crate) buffered: VecDeque<Delivery>,
    /// The delivery currently being reassembled
    pub(crate) partial: Option<PartialDelivery>,
    pub(crate) drain_pending: bool,

    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) outgoing: mpsc::Sender<LinkFrame>,
    pub(crate) incoming: mpsc::Receiver<LinkFrame>,
    pub(crate) session_control: mpsc::Sender<SessionControl>,
    pub(crate) state: LinkState,
}

/// A delivery whose transfers have not all arrived yet.
#[derive(Debug)]
pub(crate) struct PartialDelivery {
    pub(crate) delivery_id: DeliveryNumber,
    pub(crate) delivery_tag: DeliveryTag,
    pub(crate) message_format: Option<MessageFormat>,
    pub(crate) settled: bool,
    pub(crate) payload: CompositePayload,
}

impl Receiver {
    /// Creates a builder for a [`Receiver`].
    pub fn builder() -> ReceiverBuilder {
        ReceiverBuilder::new()
    }

    /// Attaches a receiver link to the session with default
    /// configuration.
    pub async fn attach(
        session: &mut SessionHandle,
        name: impl Into<String>,
        addr: impl Into<galena_amqp_types::messaging::Address>,
    ) -> Result<Receiver, super::AttachError> {
        Self::builder()
            .name(name)
            .source(addr.into())
            .attach(session)
            .await
    }

    /// The link name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current link credit.
    pub fn credit(&self) -> u32 {
        self.link_credit
    }

    /// Receives the next completed delivery.
    ///
    /// With `auto_accept` the delivery is accepted before it is handed
    /// over. With an automatic credit window the window is topped up
    /// according to the window policy.
    pub async fn recv(&mut self) -> Result<Delivery, RecvError> {
        loop {
            if let Some(delivery) = self.buffered.pop_front() {
                return self.on_delivery_ready(delivery).await;
            }
            let frame = self.incoming.recv().await.ok_or(RecvError::LinkClosed)?;
            self.on_incoming_frame(frame).await?;
        }
    }

    /// Receives with a timeout; `Ok(None)` on elapse. The delivery is not
    /// lost: a transfer completing later is picked up by the next call.
    pub async fn recv_with_timeout(
        &mut self,
        duration: Duration,
    ) -> Result<Option<Delivery>, RecvError> {
        match timeout(duration, self.recv()).await {
            Ok(result) => result.map(Some),
            Err(_elapsed) => Ok(None),
        }
    }

    /// Sets the link credit to an absolute value and tells the sender.
    ///
    /// Refused under an automatic credit window.
    pub async fn set_credit(&mut self, credit: u32) -> Result<(), DrainError> {
        if matches!(self.credit_mode, CreditMode::Auto(_)) {
            return Err(DrainError::AutoCreditMode);
        }
        if self.drain_pending {
            return Err(DrainError::DrainPending);
        }
        self.link_credit = credit;
        self.send_flow(Some(credit), false)
            .await
            .map_err(|_| DrainError::LinkClosed)
    }

    /// Grants `credit` more credits on top of the current ones.
    pub async fn add_credit(&mut self, credit: u32) -> Result<(), DrainError> {
        let total = self.link_credit.saturating_add(credit);
        self.set_credit(total).await
    }

    /// Asks the sender to use up or return all outstanding credit, and
    /// resolves when the link credit reaches zero.
    ///
    /// Deliveries arriving while draining are buffered for later `recv`
    /// calls.
    pub async fn drain(&mut self) -> Result<(), DrainError> {
        if matches!(self.credit_mode, CreditMode::Auto(_)) {
            return Err(DrainError::AutoCreditMode);
        }
        if self.link_credit == 0 {
            return Ok(());
        }

        self.drain_pending = true;
        let result = self.drain_inner().await;
        self.drain_pending = false;
        result
    }

    async fn drain_inner(&mut self) -> Result<(), DrainError> {
        self.send_flow(Some(self.link_credit), true)
            .await
            .map_err(|_| DrainError::LinkClosed)?;

        while self.link_credit > 0 {
            let frame = self.incoming.recv().await.ok_or(DrainError::LinkClosed)?;
            match frame {
                LinkFrame::Detach(detach) => {
                    let error = self.on_remote_detach(detach).await;
                    return Err(DrainError::Detached(error));
                }
                frame => self
                    .on_incoming_frame(frame)
                    .await
                    .map_err(|_| DrainError::LinkClosed)?,
            }
        }
        Ok(())
    }

    /* ---------------------------- dispositions ----------------------------- */

    /// Accepts the delivery.
    pub async fn accept(&mut self, delivery: &Delivery) -> Result<(), DispositionError> {
        self.dispose(delivery, DeliveryState::Accepted(Accepted {}))
            .await
    }

    /// Rejects the delivery.
    pub async fn reject(
        &mut self,
        delivery: &Delivery,
        error: impl Into<Option<WireError>>,
    ) -> Result<(), DispositionError> {
        self.dispose(
            delivery,
            DeliveryState::Rejected(Rejected {
                error: error.into(),
            }),
        )
        .await
    }

    /// Releases the delivery.
    pub async fn release(&mut self, delivery: &Delivery) -> Result<(), DispositionError> {
        self.dispose(delivery, DeliveryState::Released(Released {}))
            .await
    }

    /// Returns the delivery as modified.
    pub async fn modify(
        &mut self,
        delivery: &Delivery,
        modified: Modified,
    ) -> Result<(), DispositionError> {
        self.dispose(delivery, DeliveryState::Modified(modified))
            .await
    }

    async fn dispose(
        &mut self,
        delivery: &Delivery,
        state: DeliveryState,
    ) -> Result<(), DispositionError> {
        // a pre-settled delivery needs no disposition at all
        if delivery.settled {
            return Ok(());
        }
        let disposition = Disposition {
            role: Role::Receiver,
            first: delivery.delivery_id,
            last: None,
            settled: matches!(self.rcv_settle_mode, ReceiverSettleMode::First),
            state: Some(state),
            batchable: false,
        };
        self.outgoing
            .send(LinkFrame::Disposition(disposition))
            .await
            .map_err(|_| DispositionError::LinkClosed)
    }

    /* ------------------------------ internals ------------------------------ */

    pub(crate) async fn on_incoming_frame(&mut self, frame: LinkFrame) -> Result<(), RecvError> {
        match frame {
            LinkFrame::Transfer {
                performative,
                payload,
                ..
            } => {
                if let Some(delivery) = self.on_incoming_transfer(performative, payload)? {
                    self.buffered.push_back(delivery);
                }
            }
            LinkFrame::Flow(flow) => self.on_incoming_flow(flow),
            LinkFrame::Detach(detach) => {
                let error = self.on_remote_detach(detach).await;
                return Err(RecvError::Detached(error));
            }
            LinkFrame::Disposition(disposition) => {
                // sender-settled second-mode deliveries need no reaction
                // from a first-mode receiver
                trace!(?disposition, "sender disposition observed");
            }
            LinkFrame::Attach(_) => trace!("duplicate attach ignored"),
        }
        Ok(())
    }

    /// Reassembles multi-transfer deliveries; answers `Some` only when a
    /// delivery completes.
    fn on_incoming_transfer(
        &mut self,
        transfer: Transfer,
        payload: Payload,
    ) -> Result<Option<Delivery>, RecvError> {
        // an aborted delivery is discarded without consuming credit
        if transfer.aborted {
            self.partial = None;
            return Ok(None);
        }

        let partial = match self.partial.take() {
            Some(mut partial) => {
                partial.payload.push(payload);
                partial
            }
            None => {
                let delivery_id = transfer
                    .delivery_id
                    .ok_or(RecvError::IllegalTransfer("first transfer without delivery-id"))?;
                let delivery_tag = transfer
                    .delivery_tag
                    .ok_or(RecvError::IllegalTransfer("first transfer without delivery-tag"))?;
                let mut accumulator = CompositePayload::new();
                accumulator.push(payload);
                PartialDelivery {
                    delivery_id,
                    delivery_tag,
                    message_format: transfer.message_format,
                    settled: transfer.settled.unwrap_or(false),
                    payload: accumulator,
                }
            }
        };

        if transfer.more {
            self.partial = Some(partial);
            return Ok(None);
        }

        let payload = partial.payload.into_payload();
        let message = Message::decode(&self.registry, &payload)?;

        self.link_credit = self.link_credit.saturating_sub(1);
        self.delivery_count = self.delivery_count.wrapping_add(1);

        Ok(Some(Delivery {
            delivery_id: partial.delivery_id,
            delivery_tag: partial.delivery_tag,
            message_format: partial.message_format,
            settled: partial.settled,
            payload,
            message,
        }))
    }

    fn on_incoming_flow(&mut self, flow: Flow) {
        // the sender reporting drained credit zeroes our view too
        if flow.drain {
            if let Some(delivery_count) = flow.delivery_count {
                self.delivery_count = delivery_count;
            }
            self.link_credit = flow.link_credit.unwrap_or(0);
        }
    }

    async fn on_delivery_ready(&mut self, delivery: Delivery) -> Result<Delivery, RecvError> {
        if self.auto_accept {
            self.accept(&delivery)
                .await
                .map_err(|_| RecvError::LinkClosed)?;
        }
        self.top_up_credit().await?;
        Ok(delivery)
    }

    /// The credit-window policy: with window `W`, credit `C`, and `Q`
    /// buffered-but-undelivered messages, grant `W - (C + Q)` more
    /// credits when `C <= W/2` and `C + Q <= 0.7 * W`.
    async fn top_up_credit(&mut self) -> Result<(), RecvError> {
        let window = match self.credit_mode {
            CreditMode::Auto(window) if window > 0 => window,
            _ => return Ok(()),
        };
        let credit = self.link_credit;
        let queued = self.buffered.len() as u32;
        let refill_mark = (window as u64 * 7 / 10) as u32;
        if credit <= window / 2 && credit.saturating_add(queued) <= refill_mark {
            let target = window - queued;
            self.link_credit = target;
            self.send_flow(Some(target), false)
                .await
                .map_err(|_| RecvError::LinkClosed)?;
        }
        Ok(())
    }

    pub(crate) async fn send_flow(
        &mut self,
        link_credit: Option<u32>,
        drain: bool,
    ) -> Result<(), RecvError> {
        let flow = Flow {
            // session fields are filled by the session engine
            next_incoming_id: None,
            incoming_window: 0,
            next_outgoing_id: 0,
            outgoing_window: 0,
            handle: self.output_handle,
            delivery_count: Some(self.delivery_count),
            link_credit,
            available: None,
            drain,
            echo: false,
            properties: None,
        };
        self.outgoing
            .send(LinkFrame::Flow(flow))
            .await
            .map_err(|_| RecvError::LinkClosed)
    }

    pub(crate) async fn on_remote_detach(&mut self, detach: Detach) -> Option<WireError> {
        self.state = LinkState::Detached;
        if let Some(handle) = self.output_handle.take() {
            let echo = Detach {
                handle,
                closed: detach.closed,
                error: None,
            };
            let _ = self.outgoing.send(LinkFrame::Detach(echo)).await;
            let _ = self
                .session_control
                .send(SessionControl::DeallocateLink(handle))
                .await;
        }
        detach.error
    }

    /// Detaches the link without destroying it.
    pub async fn detach(self) -> Result<(), DetachError> {
        self.detach_inner(false, None).await
    }

    /// Closes the link (detach with `closed=true`).
    pub async fn close(self) -> Result<(), DetachError> {
        self.detach_inner(true, None).await
    }

    async fn detach_inner(
        mut self,
        closed: bool,
        error: Option<WireError>,
    ) -> Result<(), DetachError> {
        let handle = self.output_handle.take().ok_or(DetachError::IllegalState)?;
        self.state = LinkState::DetachSent;
        self.outgoing
            .send(LinkFrame::Detach(Detach {
                handle,
                closed,
                error,
            }))
            .await
            .map_err(|_| DetachError::SessionEnded)?;

        let result = loop {
            match self.incoming.recv().await {
                Some(LinkFrame::Detach(remote)) => {
                    if let Some(error) = remote.error {
                        break Err(DetachError::RemoteError(error));
                    }
                    match (closed, remote.closed) {
                        (true, false) => break Err(DetachError::DetachedByRemote),
                        (false, true) => break Err(DetachError::ClosedByRemote),
                        _ => break Ok(()),
                    }
                }
                Some(other) => trace!(?other, "frame dropped while detaching"),
                None => break Err(DetachError::SessionEnded),
            }
        };

        self.state = LinkState::Detached;
        let _ = self
            .session_control
            .send(SessionControl::DeallocateLink(handle))
            .await;
        result
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        if let Some(handle) = self.output_handle.take() {
            let detach = Detach {
                handle,
                closed: true,
                error: None,
            };
            let _ = self.outgoing.try_send(LinkFrame::Detach(detach));
        }
    }
}
