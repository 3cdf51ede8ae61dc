//! The SASL frame codec.
//!
//! SASL frames share the outer layout of AMQP frames but carry frame type
//! `0x01` and always travel on channel zero.

use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use galena_amqp_types::decode::Decoder as ValueDecoder;
use galena_amqp_types::encode::Encoder as ValueEncoder;
use galena_amqp_types::registry::TypeRegistry;
use galena_amqp_types::sasl::SaslFrameBody;
use galena_amqp_types::value::Value;
use tokio_util::codec::{Decoder, Encoder};

use super::{Error, FRAME_TYPE_SASL};

/// A SASL frame.
#[derive(Debug)]
pub struct SaslFrame {
    /// The frame body
    pub body: SaslFrameBody,
}

impl SaslFrame {
    /// Creates a new SASL frame.
    pub fn new(body: impl Into<SaslFrameBody>) -> Self {
        Self { body: body.into() }
    }
}

impl From<SaslFrameBody> for SaslFrame {
    fn from(body: SaslFrameBody) -> Self {
        Self { body }
    }
}

/// Encoder/decoder for SASL frames past the size prefix.
#[derive(Debug)]
pub struct SaslFrameCodec {
    registry: Arc<TypeRegistry>,
}

impl SaslFrameCodec {
    /// Creates a codec decoding through `registry`.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }
}

impl Encoder<SaslFrame> for SaslFrameCodec {
    type Error = Error;

    fn encode(&mut self, item: SaslFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_u8(2); // doff
        dst.put_u8(FRAME_TYPE_SASL);
        dst.put_u16(0); // sasl frames are always on channel 0

        let mut encoder = ValueEncoder::new(dst);
        encoder.write_value(&Value::from(item.body))?;
        Ok(())
    }
}

impl Decoder for SaslFrameCodec {
    type Item = SaslFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Err(Error::FramingError);
        }
        let doff = src.get_u8();
        let ftype = src.get_u8();
        let _channel = src.get_u16();

        if ftype != FRAME_TYPE_SASL {
            return Err(Error::NotImplemented);
        }
        if doff < 2 {
            return Err(Error::FramingError);
        }
        let extended = (doff as usize - 2) * 4;
        if src.len() < extended {
            return Err(Error::FramingError);
        }
        src.advance(extended);

        let (body, consumed) = {
            let mut decoder = ValueDecoder::new(src.as_ref());
            let composite = self.registry.read_object(&mut decoder)?;
            let body = composite
                .into_sasl_body()
                .ok_or(galena_amqp_types::Error::InvalidValue)?;
            (body, decoder.position())
        };
        src.advance(consumed);
        src.clear();

        Ok(Some(SaslFrame { body }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::BytesMut;
    use galena_amqp_types::primitives::{Array, Symbol};
    use galena_amqp_types::registry::TypeRegistry;
    use galena_amqp_types::sasl::{SaslFrameBody, SaslMechanisms};
    use tokio_util::codec::{Decoder, Encoder};

    use super::{SaslFrame, SaslFrameCodec};

    #[test]
    fn mechanisms_round_trip() {
        let mechanisms = SaslMechanisms {
            sasl_server_mechanisms: Array(vec![Symbol::from("PLAIN"), Symbol::from("ANONYMOUS")]),
        };
        let mut codec = SaslFrameCodec::new(Arc::new(TypeRegistry::core()));
        let mut dst = BytesMut::new();
        codec
            .encode(SaslFrame::from(SaslFrameBody::Mechanisms(mechanisms)), &mut dst)
            .unwrap();

        let frame = codec.decode(&mut dst).unwrap().unwrap();
        match frame.body {
            SaslFrameBody::Mechanisms(decoded) => {
                assert_eq!(decoded.sasl_server_mechanisms.len(), 2);
            }
            other => panic!("expected Mechanisms, got {:?}", other),
        }
    }
}
