//! The AMQP frame codec: `[doff][type][channel][extended][performative][payload]`
//!
//! The 4-byte size prefix is handled by the length-delimited layer in the
//! transport, so the codecs here see the frame from the doff octet on.

use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use galena_amqp_types::composite::DescribedType;
use galena_amqp_types::decode::Decoder as ValueDecoder;
use galena_amqp_types::encode::Encoder as ValueEncoder;
use galena_amqp_types::performatives::{
    Attach, Begin, Close, Detach, Disposition, End, Flow, Open, Performative, Transfer,
};
use galena_amqp_types::registry::TypeRegistry;
use tokio_util::codec::{Decoder, Encoder};

use crate::Payload;

use super::{Error, FRAME_TYPE_AMQP};

/// A decoded AMQP frame: channel plus body.
#[derive(Debug)]
pub struct Frame {
    /// The channel the frame arrived on or goes out on
    pub channel: u16,
    /// The frame body
    pub body: FrameBody,
}

impl Frame {
    /// Creates a new frame.
    pub fn new(channel: impl Into<u16>, body: FrameBody) -> Self {
        Self {
            channel: channel.into(),
            body,
        }
    }

    /// The empty (heartbeat) frame.
    pub fn empty() -> Self {
        Self {
            channel: 0,
            body: FrameBody::Empty,
        }
    }
}

/// The body of an AMQP frame.
#[derive(Debug)]
pub enum FrameBody {
    /// Open performative
    Open(Open),
    /// Begin performative
    Begin(Begin),
    /// Attach performative
    Attach(Attach),
    /// Flow performative
    Flow(Flow),
    /// Transfer performative with its payload
    Transfer {
        /// The performative
        performative: Transfer,
        /// The payload carried after the performative
        payload: Payload,
    },
    /// Disposition performative
    Disposition(Disposition),
    /// Detach performative
    Detach(Detach),
    /// End performative
    End(End),
    /// Close performative
    Close(Close),
    /// An empty frame, used only for heartbeat
    Empty,
}

/// Encoder/decoder for AMQP frames past the size prefix.
///
/// Holds the engine's type registry for descriptor dispatch.
#[derive(Debug)]
pub struct FrameCodec {
    registry: Arc<TypeRegistry>,
}

impl FrameCodec {
    /// Creates a codec decoding through `registry`.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        // AMQP frames never carry an extended header, thus doff is always 2
        dst.put_u8(2);
        dst.put_u8(FRAME_TYPE_AMQP);
        dst.put_u16(item.channel);

        let mut encoder = ValueEncoder::new(dst);
        match item.body {
            FrameBody::Open(performative) => encoder.write_value(&performative.to_value())?,
            FrameBody::Begin(performative) => encoder.write_value(&performative.to_value())?,
            FrameBody::Attach(performative) => encoder.write_value(&performative.to_value())?,
            FrameBody::Flow(performative) => encoder.write_value(&performative.to_value())?,
            FrameBody::Transfer {
                performative,
                payload,
            } => {
                encoder.write_value(&performative.to_value())?;
                dst.put(payload);
            }
            FrameBody::Disposition(performative) => {
                encoder.write_value(&performative.to_value())?
            }
            FrameBody::Detach(performative) => encoder.write_value(&performative.to_value())?,
            FrameBody::End(performative) => encoder.write_value(&performative.to_value())?,
            FrameBody::Close(performative) => encoder.write_value(&performative.to_value())?,
            FrameBody::Empty => {}
        }
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Err(Error::FramingError);
        }
        let doff = src.get_u8();
        let ftype = src.get_u8();
        let channel = src.get_u16();

        if ftype != FRAME_TYPE_AMQP {
            return Err(Error::NotImplemented);
        }
        if doff < 2 {
            return Err(Error::FramingError);
        }
        // skip the extended header, if any
        let extended = (doff as usize - 2) * 4;
        if src.len() < extended {
            return Err(Error::FramingError);
        }
        src.advance(extended);

        if src.is_empty() {
            return Ok(Some(Frame {
                channel,
                body: FrameBody::Empty,
            }));
        }

        let (performative, consumed) = {
            let mut decoder = ValueDecoder::new(src.as_ref());
            let composite = self.registry.read_object(&mut decoder)?;
            let performative = composite
                .into_performative()
                .ok_or(galena_amqp_types::Error::InvalidValue)?;
            (performative, decoder.position())
        };
        src.advance(consumed);

        let body = match performative {
            Performative::Open(performative) => FrameBody::Open(performative),
            Performative::Begin(performative) => FrameBody::Begin(performative),
            Performative::Attach(performative) => FrameBody::Attach(performative),
            Performative::Flow(performative) => FrameBody::Flow(performative),
            Performative::Transfer(performative) => {
                // the rest of the frame is the payload slice
                let payload = src.split().freeze();
                FrameBody::Transfer {
                    performative,
                    payload,
                }
            }
            Performative::Disposition(performative) => FrameBody::Disposition(performative),
            Performative::Detach(performative) => FrameBody::Detach(performative),
            Performative::End(performative) => FrameBody::End(performative),
            Performative::Close(performative) => FrameBody::Close(performative),
        };

        // any non-transfer body must account for the whole frame
        if !matches!(body, FrameBody::Transfer { .. }) && !src.is_empty() {
            src.clear();
        }

        Ok(Some(Frame { channel, body }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::BytesMut;
    use galena_amqp_types::performatives::Open;
    use galena_amqp_types::registry::TypeRegistry;
    use tokio_util::codec::{Decoder, Encoder};

    use super::{Frame, FrameBody, FrameCodec};

    fn codec() -> FrameCodec {
        FrameCodec::new(Arc::new(TypeRegistry::core()))
    }

    #[test]
    fn encode_decode_empty_frame() {
        let mut encoder = codec();
        let mut dst = BytesMut::new();
        encoder.encode(Frame::empty(), &mut dst).unwrap();
        assert_eq!(&dst[..], &[0x02, 0x00, 0x00, 0x00]);

        let frame = encoder.decode(&mut dst).unwrap().unwrap();
        assert!(matches!(frame.body, FrameBody::Empty));
    }

    #[test]
    fn encode_decode_open_frame() {
        let open = Open {
            container_id: "1234".to_string(),
            hostname: Some("127.0.0.1".to_string()),
            max_frame_size: 1000.into(),
            channel_max: 9.into(),
            idle_time_out: Some(10_000),
            ..Default::default()
        };

        let mut encoder = codec();
        let mut dst = BytesMut::new();
        encoder
            .encode(Frame::new(0u16, FrameBody::Open(open)), &mut dst)
            .unwrap();

        let frame = encoder.decode(&mut dst).unwrap().unwrap();
        assert_eq!(frame.channel, 0);
        match frame.body {
            FrameBody::Open(decoded) => {
                assert_eq!(decoded.container_id, "1234");
                assert_eq!(decoded.max_frame_size.0, 1000);
            }
            other => panic!("expected Open, got {:?}", other),
        }
    }

    #[test]
    fn transfer_payload_is_split_off() {
        use galena_amqp_types::definitions::Handle;
        use galena_amqp_types::performatives::Transfer;
        use galena_amqp_types::primitives::Binary;

        let transfer = Transfer {
            handle: Handle(0),
            delivery_id: Some(0),
            delivery_tag: Some(Binary::from(&b"t0"[..])),
            message_format: Some(0),
            ..Default::default()
        };

        let mut encoder = codec();
        let mut dst = BytesMut::new();
        encoder
            .encode(
                Frame::new(
                    0u16,
                    FrameBody::Transfer {
                        performative: transfer,
                        payload: bytes::Bytes::from_static(b"PAYLOAD"),
                    },
                ),
                &mut dst,
            )
            .unwrap();

        let frame = encoder.decode(&mut dst).unwrap().unwrap();
        match frame.body {
            FrameBody::Transfer { payload, .. } => assert_eq!(payload.as_ref(), b"PAYLOAD"),
            other => panic!("expected Transfer, got {:?}", other),
        }
    }

    #[test]
    fn doff_below_two_is_a_framing_error() {
        let mut decoder = codec();
        let mut src = BytesMut::from(&[0x01u8, 0x00, 0x00, 0x00][..]);
        assert!(decoder.decode(&mut src).is_err());
    }
}
