//! Opaque wrappers over the bytes of the IEEE 754-2008 decimal types.
//!
//! The codec transports the Binary Integer Decimal bytes verbatim; no
//! decimal arithmetic is provided.

use std::convert::TryFrom;

use crate::error::Error;
use crate::fixed_width::{DECIMAL128_WIDTH, DECIMAL32_WIDTH, DECIMAL64_WIDTH};

macro_rules! decimal {
    ($(#[$attr:meta])* $name:ident, $width:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $width]);

        impl $name {
            /// Consume the wrapper into the inner bytes
            pub fn into_inner(self) -> [u8; $width] {
                self.0
            }

            /// Get a reference to the inner bytes
            pub fn as_inner(&self) -> &[u8; $width] {
                &self.0
            }
        }

        impl From<[u8; $width]> for $name {
            fn from(val: [u8; $width]) -> Self {
                Self(val)
            }
        }

        impl From<$name> for [u8; $width] {
            fn from(val: $name) -> Self {
                val.0
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = Error;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                if value.len() != $width {
                    return Err(Error::InvalidLength);
                }
                let mut buf = [0u8; $width];
                buf.copy_from_slice(value);
                Ok(Self(buf))
            }
        }
    };
}

decimal! {
    /// 32-bit decimal number (IEEE 754-2008 decimal32).
    ///
    /// encoding name = "ieee-754", encoding code = 0x74
    /// category = fixed, width = 4
    Dec32, DECIMAL32_WIDTH
}

decimal! {
    /// 64-bit decimal number (IEEE 754-2008 decimal64).
    ///
    /// encoding name = "ieee-754", encoding code = 0x84
    /// category = fixed, width = 8
    Dec64, DECIMAL64_WIDTH
}

decimal! {
    /// 128-bit decimal number (IEEE 754-2008 decimal128).
    ///
    /// encoding name = "ieee-754", encoding code = 0x94
    /// category = fixed, width = 16
    Dec128, DECIMAL128_WIDTH
}
