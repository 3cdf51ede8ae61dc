//! Low level transport framing.
//!
//! Two layer design: layer 0 is `tokio_util`'s `LengthDelimitedCodec`
//! over any `AsyncRead + AsyncWrite`, which enforces the size prefix and
//! the negotiated max frame size; layer 1 is the [`FrameCodec`] that
//! handles the rest of the frame header and the performative body.
//!
//! The transport also owns the inbound idle deadline: if no frame arrives
//! for the configured duration, polling the stream yields
//! [`EngineError::IdleTimeoutElapsed`].

pub mod protocol_header;

use std::task::Poll;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{Future, Sink, SinkExt, Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder, Framed, LengthDelimitedCodec};

use std::sync::Arc;

use galena_amqp_types::registry::TypeRegistry;

use crate::connection::ConnectionState;
use crate::error::EngineError;
use crate::frames::amqp::{Frame, FrameCodec};
use crate::frames::sasl::{SaslFrame, SaslFrameCodec};
use crate::util::IdleTimeout;

use protocol_header::ProtocolHeader;

pin_project! {
    /// A framed AMQP byte pipe over any `AsyncRead + AsyncWrite`.
    #[derive(Debug)]
    pub struct Transport<Io> {
        #[pin]
        framed: Framed<Io, LengthDelimitedCodec>,
        codec: FrameCodec,
        #[pin]
        idle_timeout: Option<IdleTimeout>,
    }
}

fn length_delimited(max_frame_size: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .big_endian()
        .length_field_length(4)
        .max_frame_length(max_frame_size)
        .length_adjustment(-4)
        .new_codec()
}

impl<Io> Transport<Io>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    /// Binds the transport over `io`.
    ///
    /// Prior to explicit negotiation the maximum frame size is 512
    /// (MIN-MAX-FRAME-SIZE).
    pub fn bind(
        io: Io,
        registry: Arc<TypeRegistry>,
        max_frame_size: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let framed = LengthDelimitedCodec::builder()
            .big_endian()
            .length_field_length(4)
            .max_frame_length(max_frame_size)
            .length_adjustment(-4)
            .new_framed(io);
        let idle_timeout = match idle_timeout {
            Some(duration) if !duration.is_zero() => Some(IdleTimeout::new(duration)),
            _ => None,
        };

        Self {
            framed,
            codec: FrameCodec::new(registry),
            idle_timeout,
        }
    }

    /// Writes the local protocol header.
    pub async fn send_proto_header(
        io: &mut Io,
        local_state: &mut ConnectionState,
        proto_header: ProtocolHeader,
    ) -> Result<(), EngineError> {
        let buf: [u8; 8] = proto_header.into();
        match local_state {
            ConnectionState::Start => {
                io.write_all(&buf).await?;
                *local_state = ConnectionState::HeaderSent;
            }
            ConnectionState::HeaderReceived => {
                io.write_all(&buf).await?;
                *local_state = ConnectionState::HeaderExchange;
            }
            state => return Err(EngineError::UnexpectedConnectionState(*state)),
        }
        Ok(())
    }

    /// Reads the remote protocol header and fails on mismatch.
    pub async fn recv_proto_header(
        io: &mut Io,
        local_state: &mut ConnectionState,
        proto_header: &ProtocolHeader,
    ) -> Result<ProtocolHeader, EngineError> {
        let mut inbound = [0u8; 8];
        io.read_exact(&mut inbound).await?;
        let incoming = match ProtocolHeader::try_from(inbound) {
            Ok(header) if header == *proto_header => header,
            _ => {
                *local_state = ConnectionState::End;
                return Err(EngineError::UnexpectedProtocolHeader(inbound));
            }
        };
        match local_state {
            ConnectionState::Start => *local_state = ConnectionState::HeaderReceived,
            ConnectionState::HeaderSent => *local_state = ConnectionState::HeaderExchange,
            state => return Err(EngineError::UnexpectedConnectionState(*state)),
        }
        Ok(incoming)
    }

    /// Exchanges protocol headers: send then receive.
    pub async fn negotiate(
        io: &mut Io,
        local_state: &mut ConnectionState,
        proto_header: ProtocolHeader,
    ) -> Result<ProtocolHeader, EngineError> {
        Self::send_proto_header(io, local_state, proto_header.clone()).await?;
        Self::recv_proto_header(io, local_state, &proto_header).await
    }

    /// Updates the enforced max frame size after Open negotiation.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) -> &mut Self {
        self.framed.codec_mut().set_max_frame_length(max_frame_size);
        self
    }

    /// Arms (or disarms) the inbound idle deadline.
    pub fn set_idle_timeout(&mut self, duration: Duration) -> &mut Self {
        self.idle_timeout = match duration.is_zero() {
            true => None,
            false => Some(IdleTimeout::new(duration)),
        };
        self
    }
}

impl<Io> Sink<Frame> for Transport<Io>
where
    Io: AsyncWrite + Unpin,
{
    type Error = EngineError;

    fn poll_ready(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        let this = self.project();
        this.framed.poll_ready(cx).map_err(Into::into)
    }

    fn start_send(self: std::pin::Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        let this = self.project();
        let mut buf = BytesMut::new();
        this.codec.encode(item, &mut buf)?;
        this.framed
            .start_send(Bytes::from(buf))
            .map_err(Into::into)
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        let this = self.project();
        this.framed.poll_flush(cx).map_err(Into::into)
    }

    fn poll_close(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        let this = self.project();
        this.framed.poll_close(cx).map_err(Into::into)
    }
}

impl<Io> Stream for Transport<Io>
where
    Io: AsyncRead + Unpin,
{
    type Item = Result<Frame, EngineError>;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.framed.poll_next(cx) {
            Poll::Ready(next) => {
                if let Some(mut idle) = this.idle_timeout.as_pin_mut() {
                    idle.reset();
                }

                match next {
                    Some(Ok(mut src)) => {
                        let decoded = this.codec.decode(&mut src).transpose();
                        Poll::Ready(decoded.map(|r| r.map_err(Into::into)))
                    }
                    Some(Err(err)) => {
                        // the only error the length-delimited layer
                        // produces besides IO is an over-long frame
                        let err = match err.kind() {
                            std::io::ErrorKind::InvalidData => EngineError::MaxFrameSizeExceeded,
                            _ => EngineError::Io(err),
                        };
                        Poll::Ready(Some(Err(err)))
                    }
                    None => Poll::Ready(None),
                }
            }
            Poll::Pending => {
                if let Some(idle) = this.idle_timeout.as_pin_mut() {
                    if idle.poll(cx).is_ready() {
                        return Poll::Ready(Some(Err(EngineError::IdleTimeoutElapsed)));
                    }
                }
                Poll::Pending
            }
        }
    }
}

/* ------------------------- SASL header and frames ------------------------- */

/// Performs the client side of the SASL layer over bare `io`, returning
/// the io once the outcome is accepted.
pub async fn negotiate_sasl<Io>(
    io: &mut Io,
    registry: Arc<TypeRegistry>,
    hostname: Option<&str>,
    profile: &mut crate::sasl_profile::SaslProfile,
) -> Result<(), crate::error::OpenError>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    use galena_amqp_types::sasl::{SaslCode, SaslFrameBody};

    use crate::error::OpenError;

    // SASL header exchange
    let mut state = ConnectionState::Start;
    let header = ProtocolHeader::sasl();
    Transport::send_proto_header(io, &mut state, header.clone()).await?;
    Transport::recv_proto_header(io, &mut state, &header).await?;

    let mut framed = Framed::new(io, length_delimited(512));
    let mut codec = SaslFrameCodec::new(registry);

    loop {
        let mut src = match framed.next().await {
            Some(bytes) => bytes.map_err(EngineError::from)?,
            None => return Err(OpenError::Engine(EngineError::ControlChannelClosed)),
        };
        let frame = match codec.decode(&mut src).map_err(EngineError::from)? {
            Some(frame) => frame,
            None => continue,
        };

        let response = match frame.body {
            SaslFrameBody::Mechanisms(mechanisms) => {
                let init = profile
                    .on_mechanisms(&mechanisms, hostname)
                    .ok_or(OpenError::SaslMechanismNotSupported)?;
                SaslFrame::new(SaslFrameBody::Init(init))
            }
            SaslFrameBody::Challenge(challenge) => {
                let response = profile.on_challenge(&challenge);
                SaslFrame::new(SaslFrameBody::Response(response))
            }
            SaslFrameBody::Outcome(outcome) => match outcome.code {
                SaslCode::Ok => return Ok(()),
                code => return Err(OpenError::SaslDeclined(code)),
            },
            // init and response only flow client to server
            SaslFrameBody::Init(_) | SaslFrameBody::Response(_) => {
                return Err(OpenError::Engine(EngineError::FramingError))
            }
        };

        let mut buf = BytesMut::new();
        codec.encode(response, &mut buf).map_err(EngineError::from)?;
        framed.send(Bytes::from(buf)).await.map_err(EngineError::from)?;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures_util::{SinkExt, StreamExt};
    use galena_amqp_types::performatives::Open;
    use galena_amqp_types::registry::TypeRegistry;
    use tokio_test::io::Builder;

    use super::{protocol_header::ProtocolHeader, Transport};
    use crate::connection::ConnectionState;
    use crate::error::EngineError;
    use crate::frames::amqp::{Frame, FrameBody};

    #[tokio::test]
    async fn header_exchange() {
        let mut mock = Builder::new()
            .write(b"AMQP")
            .write(&[0, 1, 0, 0])
            .read(b"AMQP")
            .read(&[0, 1, 0, 0])
            .build();

        let mut local_state = ConnectionState::Start;
        Transport::negotiate(&mut mock, &mut local_state, ProtocolHeader::amqp())
            .await
            .unwrap();
        assert_eq!(local_state, ConnectionState::HeaderExchange);
    }

    #[tokio::test]
    async fn mismatched_header_fails() {
        let mut mock = Builder::new()
            .write(b"AMQP")
            .write(&[0, 1, 0, 0])
            .read(b"AMQP")
            .read(&[3, 1, 0, 0]) // SASL header instead of AMQP
            .build();

        let mut local_state = ConnectionState::Start;
        let result = Transport::negotiate(&mut mock, &mut local_state, ProtocolHeader::amqp()).await;
        assert!(matches!(
            result,
            Err(EngineError::UnexpectedProtocolHeader(_))
        ));
    }

    #[tokio::test]
    async fn send_empty_frame() {
        let mock = Builder::new()
            .write(&[0x00, 0x00, 0x00, 0x08]) // size
            .write(&[0x02, 0x00, 0x00, 0x00]) // doff, type, channel
            .build();
        let mut transport = Transport::bind(mock, Arc::new(TypeRegistry::core()), 512, None);
        transport.send(Frame::empty()).await.unwrap();
    }

    #[tokio::test]
    async fn frame_round_trip_through_duplex() {
        let (client, server) = tokio::io::duplex(1024);
        let registry = Arc::new(TypeRegistry::core());
        let mut a = Transport::bind(client, registry.clone(), 512, None);
        let mut b = Transport::bind(server, registry, 512, None);

        let open = Open {
            container_id: "1234".to_string(),
            ..Default::default()
        };
        a.send(Frame::new(0u16, FrameBody::Open(open))).await.unwrap();

        let frame = b.next().await.unwrap().unwrap();
        match frame.body {
            FrameBody::Open(open) => assert_eq!(open.container_id, "1234"),
            other => panic!("expected Open, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn oversized_frame_is_fatal() {
        let (client, server) = tokio::io::duplex(4096);
        let registry = Arc::new(TypeRegistry::core());
        // sender side allows large frames; receiver enforces 64
        let mut a = Transport::bind(client, registry.clone(), 4096, None);
        let mut b = Transport::bind(server, registry, 64, None);

        let open = Open {
            container_id: "x".repeat(100),
            ..Default::default()
        };
        a.send(Frame::new(0u16, FrameBody::Open(open))).await.unwrap();

        let result = b.next().await.unwrap();
        assert!(matches!(result, Err(EngineError::MaxFrameSizeExceeded)));
    }
}
