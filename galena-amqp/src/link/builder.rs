//! Builders for [`Sender`] and [`Receiver`] links.

use galena_amqp_types::definitions::{Handle, ReceiverSettleMode, Role, SenderSettleMode};
use galena_amqp_types::messaging::{Source, Target};
use galena_amqp_types::performatives::Attach;
use tokio::sync::mpsc;

use crate::link::receiver::{CreditMode, Receiver};
use crate::link::sender::Sender;
use crate::link::{AttachError, LinkFrame, LinkState};
use crate::session::SessionHandle;
use crate::util::DeliveryTagGenerator;

pub(crate) const DEFAULT_LINK_BUFFER: usize = 256;

/// Builder for a [`Sender`] link.
#[derive(Debug, Clone, Default)]
pub struct SenderBuilder {
    /// The link name; unique per direction on the session
    pub name: String,
    /// Settlement policy offered by the sender
    pub snd_settle_mode: SenderSettleMode,
    /// Settlement policy expected of the receiver
    pub rcv_settle_mode: ReceiverSettleMode,
    /// The local source
    pub source: Option<Source>,
    /// The target node
    pub target: Option<Target>,
    /// Proposed max message size
    pub max_message_size: Option<u64>,
}

impl SenderBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self {
            source: Some(Source::default()),
            ..Default::default()
        }
    }

    /// Sets the link name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the target address.
    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the source.
    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the sender settle mode.
    pub fn sender_settle_mode(mut self, mode: SenderSettleMode) -> Self {
        self.snd_settle_mode = mode;
        self
    }

    /// Sets the receiver settle mode.
    pub fn receiver_settle_mode(mut self, mode: ReceiverSettleMode) -> Self {
        self.rcv_settle_mode = mode;
        self
    }

    /// Sets the proposed max message size.
    pub fn max_message_size(mut self, size: u64) -> Self {
        self.max_message_size = Some(size);
        self
    }

    /// Attaches the sender link to the session.
    pub async fn attach(self, session: &mut SessionHandle) -> Result<Sender, AttachError> {
        let (tx, mut incoming) = mpsc::channel(DEFAULT_LINK_BUFFER);
        let output_handle = session.allocate_link(self.name.clone(), tx).await?;
        let outgoing = session.outgoing_link_frames.clone();

        let attach = Attach {
            name: self.name.clone(),
            handle: output_handle,
            role: Role::Sender,
            snd_settle_mode: self.snd_settle_mode,
            rcv_settle_mode: self.rcv_settle_mode,
            source: self.source.clone(),
            target: self.target.clone(),
            unsettled: None,
            incomplete_unsettled: false,
            // a sender must declare its initial delivery-count
            initial_delivery_count: Some(0),
            max_message_size: self.max_message_size,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };

        let remote_attach =
            exchange_attach(output_handle, attach, &outgoing, &mut incoming).await?;

        // the peer communicates refusal with a null target
        if remote_attach.target.is_none() {
            let error = expect_refusal_detach(&mut incoming).await;
            session.deallocate_link(output_handle).await;
            return Err(AttachError::Refused(error));
        }

        Ok(Sender {
            name: self.name,
            output_handle: Some(output_handle),
            snd_settle_mode: self.snd_settle_mode,
            rcv_settle_mode: self.rcv_settle_mode,
            source: remote_attach.source,
            target: remote_attach.target,
            delivery_count: 0,
            link_credit: 0,
            tag_gen: DeliveryTagGenerator::default(),
            outgoing,
            incoming,
            session_control: session.control.clone(),
            state: LinkState::Attached,
        })
    }
}

/// Builder for a [`Receiver`] link.
#[derive(Debug, Clone)]
pub struct ReceiverBuilder {
    /// The link name; unique per direction on the session
    pub name: String,
    /// Settlement policy of this receiver
    pub rcv_settle_mode: ReceiverSettleMode,
    /// The source node
    pub source: Option<Source>,
    /// The local target
    pub target: Option<Target>,
    /// Credit management policy
    pub credit_mode: CreditMode,
    /// Whether received deliveries are accepted before hand-off
    pub auto_accept: bool,
}

impl Default for ReceiverBuilder {
    fn default() -> Self {
        Self {
            name: String::new(),
            rcv_settle_mode: ReceiverSettleMode::First,
            source: None,
            target: Some(Target::default()),
            credit_mode: CreditMode::default(),
            auto_accept: false,
        }
    }
}

impl ReceiverBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the link name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the source address.
    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the target.
    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the receiver settle mode.
    pub fn receiver_settle_mode(mut self, mode: ReceiverSettleMode) -> Self {
        self.rcv_settle_mode = mode;
        self
    }

    /// Sets the credit management policy.
    pub fn credit_mode(mut self, credit_mode: CreditMode) -> Self {
        self.credit_mode = credit_mode;
        self
    }

    /// Accepts deliveries automatically before handing them to the
    /// application.
    pub fn auto_accept(mut self, auto_accept: bool) -> Self {
        self.auto_accept = auto_accept;
        self
    }

    /// Attaches the receiver link to the session.
    pub async fn attach(self, session: &mut SessionHandle) -> Result<Receiver, AttachError> {
        let (tx, mut incoming) = mpsc::channel(DEFAULT_LINK_BUFFER);
        let output_handle = session.allocate_link(self.name.clone(), tx).await?;
        let outgoing = session.outgoing_link_frames.clone();

        let attach = Attach {
            name: self.name.clone(),
            handle: output_handle,
            role: Role::Receiver,
            snd_settle_mode: SenderSettleMode::default(),
            rcv_settle_mode: self.rcv_settle_mode,
            source: self.source.clone(),
            target: self.target.clone(),
            unsettled: None,
            incomplete_unsettled: false,
            initial_delivery_count: None,
            max_message_size: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };

        let remote_attach =
            exchange_attach(output_handle, attach, &outgoing, &mut incoming).await?;

        // the peer communicates refusal with a null source
        if remote_attach.source.is_none() {
            let error = expect_refusal_detach(&mut incoming).await;
            session.deallocate_link(output_handle).await;
            return Err(AttachError::Refused(error));
        }

        let mut receiver = Receiver {
            name: self.name,
            output_handle: Some(output_handle),
            snd_settle_mode: remote_attach.snd_settle_mode,
            rcv_settle_mode: self.rcv_settle_mode,
            source: remote_attach.source,
            target: remote_attach.target,
            delivery_count: remote_attach.initial_delivery_count.unwrap_or(0),
            link_credit: 0,
            credit_mode: self.credit_mode,
            auto_accept: self.auto_accept,
            buffered: Default::default(),
            partial: None,
            drain_pending: false,
            registry: session.registry.clone(),
            outgoing,
            incoming,
            session_control: session.control.clone(),
            state: LinkState::Attached,
        };

        // an automatic credit window grants its first credit at attach
        if let CreditMode::Auto(window) = receiver.credit_mode {
            if window > 0 {
                receiver.send_flow(Some(window), false).await.map_err(|_| {
                    AttachError::SessionEnded
                })?;
            }
        }

        Ok(receiver)
    }
}

/// Sends the local Attach and waits for the remote Attach.
async fn exchange_attach(
    output_handle: Handle,
    attach: Attach,
    outgoing: &mpsc::Sender<LinkFrame>,
    incoming: &mut mpsc::Receiver<LinkFrame>,
) -> Result<Attach, AttachError> {
    outgoing
        .send(LinkFrame::Attach(attach))
        .await
        .map_err(|_| AttachError::SessionEnded)?;

    loop {
        match incoming.recv().await {
            Some(LinkFrame::Attach(remote_attach)) => return Ok(remote_attach),
            // an immediate detach is a refusal without the answering attach
            Some(LinkFrame::Detach(detach)) => {
                let _ = outgoing
                    .send(LinkFrame::Detach(
                        galena_amqp_types::performatives::Detach {
                            handle: output_handle,
                            closed: detach.closed,
                            error: None,
                        },
                    ))
                    .await;
                return Err(AttachError::Refused(detach.error));
            }
            Some(other) => {
                tracing::trace!(?other, "frame before remote attach is dropped");
            }
            None => return Err(AttachError::SessionEnded),
        }
    }
}

/// After a null-terminus attach the peer immediately detaches; pick the
/// error out of that detach.
async fn expect_refusal_detach(
    incoming: &mut mpsc::Receiver<LinkFrame>,
) -> Option<galena_amqp_types::definitions::Error> {
    loop {
        match incoming.recv().await {
            Some(LinkFrame::Detach(detach)) => return detach.error,
            Some(_) => continue,
            None => return None,
        }
    }
}
