//! Streaming variants of the sender and receiver.
//!
//! A streaming send chunks an arbitrarily large payload into Data
//! sections spread over multiple transfers with `more=true`, closed by a
//! final transfer with `more=false`. A streaming receive hands out the
//! payload slice of each arriving transfer as it lands instead of
//! reassembling the whole delivery first.

use bytes::BytesMut;
use galena_amqp_types::composite::DescribedType;
use galena_amqp_types::encode::Encoder;
use galena_amqp_types::messaging::Data;
use tokio::time::{error::Elapsed, timeout};
use tracing::trace;

use crate::link::delivery::{DeliveryFut, Settlement};
use crate::link::receiver::{PartialDelivery, Receiver};
use crate::link::sender::Sender;
use crate::link::{LinkFrame, RecvError, SendError};
use crate::Payload;

impl Sender {
    /// Starts a streaming delivery on this sender.
    ///
    /// The sender is exclusively borrowed until the stream is finished,
    /// which keeps the delivery's transfers ordered and uninterleaved.
    pub fn open_stream(&mut self) -> StreamSender<'_> {
        StreamSender {
            sender: self,
            started: false,
            settlement: None,
        }
    }
}

/// A byte sink whose chunks become Data sections across multiple
/// transfers of a single delivery.
#[derive(Debug)]
pub struct StreamSender<'a> {
    sender: &'a mut Sender,
    started: bool,
    settlement: Option<Settlement>,
}

impl StreamSender<'_> {
    /// Sends one chunk of the streamed message as a Data section carried
    /// by a transfer with `more=true`.
    pub async fn write_chunk(&mut self, chunk: impl AsRef<[u8]>) -> Result<(), SendError> {
        let payload = encode_data_section(chunk.as_ref())?;
        match self.started {
            false => {
                // the first transfer consumes the delivery's credit and
                // carries the delivery-tag
                let settlement = self.sender.send_payload(payload, 0, None, true).await?;
                self.settlement = Some(settlement);
                self.started = true;
                Ok(())
            }
            true => self.sender.send_continuation(payload, true).await,
        }
    }

    /// Closes the stream: marks the delivery complete with a final
    /// transfer carrying `more=false` and returns the settlement future.
    pub async fn finish(mut self) -> Result<DeliveryFut, SendError> {
        match self.started {
            false => {
                // an empty stream is a single empty transfer
                let payload = encode_data_section(&[])?;
                let settlement = self.sender.send_payload(payload, 0, None, false).await?;
                Ok(DeliveryFut::from(settlement))
            }
            true => {
                self.sender.send_continuation(Payload::new(), false).await?;
                let settlement = self
                    .settlement
                    .take()
                    .unwrap_or(Settlement::Settled);
                Ok(DeliveryFut::from(settlement))
            }
        }
    }
}

fn encode_data_section(chunk: &[u8]) -> Result<Payload, SendError> {
    let mut buf = BytesMut::new();
    Encoder::new(&mut buf).write_value(&Data::from(chunk.to_vec()).to_value())?;
    Ok(buf.freeze())
}

impl Receiver {
    /// Starts a streaming receive on this receiver.
    ///
    /// The receiver is exclusively borrowed until the stream ends; its
    /// buffered deliveries are untouched.
    pub fn recv_stream(&mut self) -> StreamReceiver<'_> {
        StreamReceiver {
            receiver: self,
            done: false,
        }
    }
}

/// A byte source yielding each transfer's payload slice as it arrives.
#[derive(Debug)]
pub struct StreamReceiver<'a> {
    receiver: &'a mut Receiver,
    done: bool,
}

impl StreamReceiver<'_> {
    /// Waits for the next transfer of the streamed delivery and returns
    /// its payload slice; `None` once the final transfer has been
    /// yielded.
    pub async fn next_chunk(&mut self) -> Result<Option<Payload>, RecvError> {
        if self.done {
            return Ok(None);
        }
        loop {
            let frame = self
                .receiver
                .incoming
                .recv()
                .await
                .ok_or(RecvError::LinkClosed)?;
            match frame {
                LinkFrame::Transfer {
                    performative,
                    payload,
                    ..
                } => {
                    if performative.aborted {
                        self.done = true;
                        self.receiver.partial = None;
                        return Err(RecvError::IllegalTransfer("delivery aborted mid-stream"));
                    }
                    // track reassembly metadata without accumulating
                    if self.receiver.partial.is_none() {
                        let delivery_id = performative.delivery_id.ok_or(
                            RecvError::IllegalTransfer("first transfer without delivery-id"),
                        )?;
                        let delivery_tag = performative.delivery_tag.clone().ok_or(
                            RecvError::IllegalTransfer("first transfer without delivery-tag"),
                        )?;
                        self.receiver.partial = Some(PartialDelivery {
                            delivery_id,
                            delivery_tag,
                            message_format: performative.message_format,
                            settled: performative.settled.unwrap_or(false),
                            payload: Default::default(),
                        });
                    }
                    if !performative.more {
                        self.done = true;
                        self.receiver.partial = None;
                        self.receiver.link_credit =
                            self.receiver.link_credit.saturating_sub(1);
                        self.receiver.delivery_count =
                            self.receiver.delivery_count.wrapping_add(1);
                    }
                    return Ok(Some(payload));
                }
                LinkFrame::Detach(detach) => {
                    let error = self.receiver.on_remote_detach(detach).await;
                    return Err(RecvError::Detached(error));
                }
                other => trace!(?other, "frame ignored mid-stream"),
            }
        }
    }

    /// Waits for the next chunk with a timeout.
    pub async fn next_chunk_with_timeout(
        &mut self,
        duration: std::time::Duration,
    ) -> Result<Result<Option<Payload>, RecvError>, Elapsed> {
        timeout(duration, self.next_chunk()).await
    }

    /// Whether the final transfer has been yielded.
    pub fn is_done(&self) -> bool {
        self.done
    }
}
