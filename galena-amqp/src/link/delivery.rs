//! Outgoing and incoming deliveries.

use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

use galena_amqp_types::definitions::{DeliveryNumber, DeliveryTag, MessageFormat};
use galena_amqp_types::messaging::{Accepted, Body, DeliveryState, Message, Outcome};
use tokio::sync::oneshot;

use crate::link::SendError;
use crate::Payload;

/// A message ready to be handed to [`Sender::send`](crate::Sender::send),
/// with its delivery options.
#[derive(Debug)]
pub struct Sendable {
    pub(crate) message: Message,
    pub(crate) message_format: MessageFormat,
    /// Per-delivery settled override; only meaningful with
    /// `SenderSettleMode::Mixed`
    pub(crate) settled: Option<bool>,
}

impl Sendable {
    /// Creates a builder for [`Sendable`]
    pub fn builder() -> SendableBuilder {
        SendableBuilder::default()
    }
}

impl<T> From<T> for Sendable
where
    T: Into<Message>,
{
    fn from(value: T) -> Self {
        Self {
            message: value.into(),
            message_format: 0,
            settled: None,
        }
    }
}

/// Builder for [`Sendable`].
#[derive(Debug, Default)]
pub struct SendableBuilder {
    message: Option<Message>,
    message_format: MessageFormat,
    settled: Option<bool>,
}

impl SendableBuilder {
    /// Sets the message.
    pub fn message(mut self, message: impl Into<Message>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the message format.
    pub fn message_format(mut self, message_format: MessageFormat) -> Self {
        self.message_format = message_format;
        self
    }

    /// Overrides the settled flag for this delivery.
    pub fn settled(mut self, settled: impl Into<Option<bool>>) -> Self {
        self.settled = settled.into();
        self
    }

    /// Builds the [`Sendable`]; the message defaults to an empty body.
    pub fn build(self) -> Sendable {
        Sendable {
            message: self.message.unwrap_or_default(),
            message_format: self.message_format,
            settled: self.settled,
        }
    }
}

/// How an outgoing delivery settles.
pub(crate) enum Settlement {
    /// Sent pre-settled; there is nothing to wait for
    Settled,
    /// Unsettled; the session engine resolves the channel when the remote
    /// peer reaches a terminal state
    Unsettled(oneshot::Receiver<DeliveryState>),
}

impl std::fmt::Debug for Settlement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Settlement::Settled => f.write_str("Settled"),
            Settlement::Unsettled(_) => f.write_str("Unsettled"),
        }
    }
}

/// A future for the remote settlement of an outgoing delivery.
///
/// Resolves to the delivery's terminal [`Outcome`]. A delivery sent
/// pre-settled resolves immediately with `Accepted`.
#[derive(Debug)]
pub struct DeliveryFut {
    settlement: Settlement,
}

impl From<Settlement> for DeliveryFut {
    fn from(settlement: Settlement) -> Self {
        Self { settlement }
    }
}

impl Future for DeliveryFut {
    type Output = Result<Outcome, SendError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        match &mut self.settlement {
            Settlement::Settled => Poll::Ready(Ok(Outcome::Accepted(Accepted {}))),
            Settlement::Unsettled(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(state)) => {
                    let outcome = match state {
                        DeliveryState::Accepted(v) => Outcome::Accepted(v),
                        DeliveryState::Rejected(v) => Outcome::Rejected(v),
                        DeliveryState::Released(v) => Outcome::Released(v),
                        DeliveryState::Modified(v) => Outcome::Modified(v),
                        // the engine only resolves with terminal states;
                        // a Received here means the peer settled mid-way
                        DeliveryState::Received(_) => {
                            return Poll::Ready(Err(SendError::SettlementAbandoned))
                        }
                    };
                    Poll::Ready(Ok(outcome))
                }
                Poll::Ready(Err(_)) => Poll::Ready(Err(SendError::SettlementAbandoned)),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

/// A completed incoming delivery.
#[derive(Debug)]
pub struct Delivery {
    pub(crate) delivery_id: DeliveryNumber,
    pub(crate) delivery_tag: DeliveryTag,
    pub(crate) message_format: Option<MessageFormat>,
    pub(crate) settled: bool,
    pub(crate) payload: Payload,
    pub(crate) message: Message,
}

impl Delivery {
    /// The delivery-id assigned by the sending session.
    pub fn delivery_id(&self) -> DeliveryNumber {
        self.delivery_id
    }

    /// The delivery-tag assigned by the sending link.
    pub fn delivery_tag(&self) -> &DeliveryTag {
        &self.delivery_tag
    }

    /// The message-format carried on the first transfer.
    pub fn message_format(&self) -> Option<MessageFormat> {
        self.message_format
    }

    /// Whether the sender sent this delivery pre-settled.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// The decoded message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The message body sections.
    pub fn body(&self) -> &Body {
        self.message.body()
    }

    /// The concatenated bytes of a data body, if this message has one.
    pub fn body_data(&self) -> Option<Vec<u8>> {
        self.message.body_data()
    }

    /// The raw reassembled payload, exactly the concatenation of the
    /// transfer slices that carried it.
    pub fn raw_payload(&self) -> &Payload {
        &self.payload
    }
}
