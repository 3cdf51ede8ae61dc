//! Codec error

/// Errors raised while encoding or decoding AMQP values.
///
/// All of these map to `amqp:decode-error` when surfaced onto the wire by
/// the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Custom error with message
    #[error("Message {0}")]
    Message(String),

    /// A format code that is not defined by the specification
    #[error("Invalid format code")]
    InvalidFormatCode,

    /// The value cannot be converted to the requested type
    #[error("Invalid value")]
    InvalidValue,

    /// A described type is found while a primitive type is expected
    #[error("Expecting non-described constructor")]
    IsDescribedType,

    /// Found invalid UTF-8 encoding
    #[error("Invalid UTF-8 encoding")]
    InvalidUtf8Encoding,

    /// Declared size or count does not match the encoded bytes
    #[error("Invalid length")]
    InvalidLength,

    /// Ran past the readable portion of the buffer
    #[error("Unexpected end of buffer")]
    UnexpectedEnd,

    /// A composite list is missing a mandatory field
    #[error("Mandatory field {0} is absent")]
    MandatoryFieldAbsent(&'static str),
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8Encoding
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8Encoding
    }
}
