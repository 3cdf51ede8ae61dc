//! AMQP frame encoding and decoding.
//!
//! Two-layer design, as in the transport module: the outer
//! size-prefixed layer is `tokio_util`'s `LengthDelimitedCodec`; the
//! codecs here handle the rest of the frame header (doff, type, channel)
//! and the performative body.

/// Frame type code of an AMQP frame
pub const FRAME_TYPE_AMQP: u8 = 0x00;
/// Frame type code of a SASL frame
pub const FRAME_TYPE_SASL: u8 = 0x01;

pub mod amqp;
pub mod sasl;

mod error;
pub use error::Error;
