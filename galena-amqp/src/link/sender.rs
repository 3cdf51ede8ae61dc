//! The sender link.

use std::time::Duration;

use galena_amqp_types::definitions::{
    Error as WireError, Handle, ReceiverSettleMode, SenderSettleMode, SequenceNo,
};
use galena_amqp_types::messaging::{Outcome, Source, Target};
use galena_amqp_types::performatives::{Detach, Flow, Transfer};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{error::Elapsed, timeout};
use tracing::trace;

use crate::control::SessionControl;
use crate::link::builder::SenderBuilder;
use crate::link::delivery::{DeliveryFut, Sendable, Settlement};
use crate::link::{DetachError, LinkFrame, LinkState, SendError};
use crate::session::SessionHandle;
use crate::util::DeliveryTagGenerator;
use crate::Payload;

/// An AMQP 1.0 sender link.
///
/// # Attach a sender with default configuration
///
/// ```rust,ignore
/// let mut sender = Sender::attach(
///     &mut session,       // mutable reference to SessionHandle
///     "rust-sender-1",    // link name
///     "q1",               // target address
/// ).await?;
///
/// let outcome = sender.send("hello AMQP").await?;
/// sender.close().await?;
/// ```
#[derive(Debug)]
pub struct Sender {
    pub(crate) name: String,
    pub(crate) output_handle: Option<Handle>,
    pub(crate) snd_settle_mode: SenderSettleMode,
    pub(crate) rcv_settle_mode: ReceiverSettleMode,
    pub(crate) source: Option<Source>,
    pub(crate) target: Option<Target>,

    /// Deliveries attempted on this link
    pub(crate) delivery_count: SequenceNo,
    /// Credit granted by the remote receiver
    pub(crate) link_credit: u32,
    pub(crate) tag_gen: DeliveryTagGenerator,

    pub(crate) outgoing: mpsc::Sender<LinkFrame>,
    pub(crate) incoming: mpsc::Receiver<LinkFrame>,
    pub(crate) session_control: mpsc::Sender<SessionControl>,
    pub(crate) state: LinkState,
}

impl Sender {
    /// Creates a builder for a [`Sender`].
    pub fn builder() -> SenderBuilder {
        SenderBuilder::new()
    }

    /// Attaches a sender link to the session with default configuration.
    pub async fn attach(
        session: &mut SessionHandle,
        name: impl Into<String>,
        addr: impl Into<galena_amqp_types::messaging::Address>,
    ) -> Result<Sender, super::AttachError> {
        Self::builder()
            .name(name)
            .target(addr.into())
            .attach(session)
            .await
    }

    /// The link name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The credit currently granted by the remote receiver.
    pub fn credit(&self) -> u32 {
        self.link_credit
    }

    /// Sends a message and waits for its acknowledgement (disposition).
    pub async fn send(
        &mut self,
        sendable: impl Into<Sendable>,
    ) -> Result<Outcome, SendError> {
        let fut = self.send_batchable(sendable).await?;
        fut.await
    }

    /// Sends with a timeout around both the credit wait and the remote
    /// acknowledgement. An elapsed timeout does not retract the transfer.
    pub async fn send_with_timeout(
        &mut self,
        sendable: impl Into<Sendable>,
        duration: Duration,
    ) -> Result<Result<Outcome, SendError>, Elapsed> {
        timeout(duration, self.send(sendable)).await
    }

    /// Sends a message without waiting for the acknowledgement; the
    /// returned future resolves on remote settlement.
    pub async fn send_batchable(
        &mut self,
        sendable: impl Into<Sendable>,
    ) -> Result<DeliveryFut, SendError> {
        let Sendable {
            message,
            message_format,
            settled,
        } = sendable.into();
        let payload = message.encode()?;
        let settlement = self
            .send_payload(payload, message_format, settled, false)
            .await?;
        Ok(DeliveryFut::from(settlement))
    }

    /// Detaches the link without destroying it.
    pub async fn detach(self) -> Result<(), DetachError> {
        self.detach_inner(false, None).await
    }

    /// Closes the link (detach with `closed=true`).
    pub async fn close(self) -> Result<(), DetachError> {
        self.detach_inner(true, None).await
    }

    /// Closes the link with an error.
    pub async fn close_with_error(self, error: WireError) -> Result<(), DetachError> {
        self.detach_inner(true, Some(error)).await
    }

    pub(crate) async fn send_payload(
        &mut self,
        payload: Payload,
        message_format: u32,
        settled: Option<bool>,
        more: bool,
    ) -> Result<Settlement, SendError> {
        if self.state != LinkState::Attached {
            return Err(SendError::IllegalState);
        }

        // a sender with no credit stalls until the receiver grants some
        while self.link_credit == 0 {
            match self.incoming.recv().await {
                Some(LinkFrame::Flow(flow)) => self.on_incoming_flow(flow).await?,
                Some(LinkFrame::Detach(detach)) => {
                    return Err(self.on_remote_detach(detach).await)
                }
                Some(other) => trace!(?other, "frame ignored while waiting for credit"),
                None => return Err(SendError::LinkClosed),
            }
        }

        let settled = match self.snd_settle_mode {
            SenderSettleMode::Settled => true,
            SenderSettleMode::Unsettled => false,
            SenderSettleMode::Mixed => settled.unwrap_or(false),
        };
        let (settlement, responder) = match settled {
            true => (Settlement::Settled, None),
            false => {
                let (tx, rx) = oneshot::channel();
                (Settlement::Unsettled(rx), Some(tx))
            }
        };

        let transfer = Transfer {
            handle: self.output_handle.ok_or(SendError::IllegalState)?,
            // the session engine assigns the delivery-id
            delivery_id: None,
            delivery_tag: Some(self.tag_gen.next_tag()),
            message_format: Some(message_format),
            settled: Some(settled),
            more,
            ..Default::default()
        };

        self.outgoing
            .send(LinkFrame::Transfer {
                performative: transfer,
                payload,
                settlement: responder,
            })
            .await
            .map_err(|_| SendError::LinkClosed)?;

        self.link_credit -= 1;
        self.delivery_count = self.delivery_count.wrapping_add(1);
        Ok(settlement)
    }

    /// Sends a continuation transfer of a multi-frame delivery.
    pub(crate) async fn send_continuation(
        &mut self,
        payload: Payload,
        more: bool,
    ) -> Result<(), SendError> {
        let transfer = Transfer {
            handle: self.output_handle.ok_or(SendError::IllegalState)?,
            delivery_id: None,
            more,
            ..Default::default()
        };
        self.outgoing
            .send(LinkFrame::Transfer {
                performative: transfer,
                payload,
                settlement: None,
            })
            .await
            .map_err(|_| SendError::LinkClosed)
    }

    /// Applies a flow from the remote receiver: its view of our
    /// delivery-count plus the granted credit define our live credit.
    pub(crate) async fn on_incoming_flow(&mut self, flow: Flow) -> Result<(), SendError> {
        if let Some(link_credit) = flow.link_credit {
            let remote_view = flow.delivery_count.unwrap_or(0);
            self.link_credit = remote_view
                .wrapping_add(link_credit)
                .wrapping_sub(self.delivery_count);
        }

        // drain: use up the remaining credit by advancing delivery-count,
        // then tell the receiver the credit is gone
        if flow.drain {
            self.delivery_count = self.delivery_count.wrapping_add(self.link_credit);
            self.link_credit = 0;
            let echo = Flow {
                next_incoming_id: None,
                incoming_window: 0,
                next_outgoing_id: 0,
                outgoing_window: 0,
                handle: self.output_handle,
                delivery_count: Some(self.delivery_count),
                link_credit: Some(0),
                available: Some(0),
                drain: true,
                echo: false,
                properties: None,
            };
            self.outgoing
                .send(LinkFrame::Flow(echo))
                .await
                .map_err(|_| SendError::LinkClosed)?;
        }
        Ok(())
    }

    pub(crate) async fn on_remote_detach(&mut self, detach: Detach) -> SendError {
        self.state = LinkState::Detached;
        // echo the detach so the handshake completes
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
        SendError::Detached(detach.error)
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

impl Drop for Sender {
    fn drop(&mut self) {
        // best-effort closing detach for a link dropped without close()
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
