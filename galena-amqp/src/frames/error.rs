use std::io;

/// Errors encoding or decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error from the framed transport
    #[error("IO Error {0:?}")]
    Io(#[from] io::Error),

    /// The frame body could not be decoded
    #[error("Decode Error")]
    Decode(#[from] galena_amqp_types::Error),

    /// The frame header is malformed (doff below 2, undersized frame)
    #[error("Framing Error")]
    FramingError,

    /// The frame type is not one this endpoint handles
    #[error("Not implemented")]
    NotImplemented,
}
