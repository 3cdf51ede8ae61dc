//! Payload widths of the fixed-width encodings

pub const BOOLEAN_WIDTH: usize = 1;
pub const UBYTE_WIDTH: usize = 1;
pub const USHORT_WIDTH: usize = 2;
pub const UINT_WIDTH: usize = 4;
pub const ULONG_WIDTH: usize = 8;
pub const BYTE_WIDTH: usize = 1;
pub const SHORT_WIDTH: usize = 2;
pub const INT_WIDTH: usize = 4;
pub const LONG_WIDTH: usize = 8;
pub const FLOAT_WIDTH: usize = 4;
pub const DOUBLE_WIDTH: usize = 8;
pub const DECIMAL32_WIDTH: usize = 4;
pub const DECIMAL64_WIDTH: usize = 8;
pub const DECIMAL128_WIDTH: usize = 16;
pub const CHAR_WIDTH: usize = 4;
pub const TIMESTAMP_WIDTH: usize = 8;
pub const UUID_WIDTH: usize = 16;
