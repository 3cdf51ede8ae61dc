//! Byte-cursor and composite-payload buffer types.
//!
//! Shared ownership and retain/release of frame slices is provided by
//! [`bytes::Bytes`]; this module adds the two pieces the codec and the
//! engine need on top of it: a bounds-checked read cursor over a borrowed
//! slice, and a zero-copy accumulator for payloads that arrive split across
//! multiple transfer frames.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Error;

/// A read cursor over a borrowed byte slice.
///
/// Every read is bounds checked; running past the readable portion yields
/// [`Error::UnexpectedEnd`] rather than panicking.
#[derive(Debug)]
pub struct SliceReader<'a> {
    slice: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    /// Creates a reader positioned at the start of `slice`.
    pub fn new(slice: &'a [u8]) -> Self {
        Self { slice, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.slice.len() - self.pos
    }

    /// Returns the next byte without consuming it.
    pub fn peek(&self) -> Result<u8, Error> {
        self.slice.get(self.pos).copied().ok_or(Error::UnexpectedEnd)
    }

    /// Reads `n` bytes as a borrowed sub-slice.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEnd);
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.slice[start..self.pos])
    }

    /// Advances the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), Error> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEnd);
        }
        self.pos += n;
        Ok(())
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = self.peek()?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads a big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a big-endian u64.
    pub fn read_u64(&mut self) -> Result<u64, Error> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    /// Reads a big-endian i8.
    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a big-endian i16.
    pub fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(self.read_u16()? as i16)
    }

    /// Reads a big-endian i32.
    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a big-endian i64.
    pub fn read_i64(&mut self) -> Result<i64, Error> {
        Ok(self.read_u64()? as i64)
    }

    /// Reads a big-endian f32.
    pub fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Reads a big-endian f64.
    pub fn read_f64(&mut self) -> Result<f64, Error> {
        Ok(f64::from_bits(self.read_u64()?))
    }
}

/// Accumulates the payload slices of a multi-transfer delivery without
/// copying, and concatenates them once the delivery completes.
///
/// Each incoming transfer's payload is a [`Bytes`] slice retained from the
/// frame it arrived in; the chunks are only merged when the delivery is
/// complete, so an aborted delivery never pays for a copy.
#[derive(Debug, Default)]
pub struct CompositePayload {
    chunks: Vec<Bytes>,
    len: usize,
}

impl CompositePayload {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one transfer's payload slice.
    pub fn push(&mut self, chunk: Bytes) {
        self.len += chunk.len();
        self.chunks.push(chunk);
    }

    /// Total accumulated length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slices accumulated.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Concatenates the accumulated slices into one contiguous payload.
    ///
    /// A single-chunk payload is returned as-is without copying.
    pub fn into_payload(mut self) -> Bytes {
        match self.chunks.len() {
            0 => Bytes::new(),
            1 => self.chunks.swap_remove(0),
            _ => {
                let mut buf = BytesMut::with_capacity(self.len);
                for chunk in self.chunks {
                    buf.put(chunk);
                }
                buf.freeze()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CompositePayload, SliceReader};
    use bytes::Bytes;

    #[test]
    fn reader_is_bounds_checked() {
        let mut reader = SliceReader::new(&[0x01, 0x02]);
        assert_eq!(reader.read_u16().unwrap(), 0x0102);
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn reader_tracks_position() {
        let mut reader = SliceReader::new(&[0; 10]);
        reader.skip(3).unwrap();
        reader.read_u32().unwrap();
        assert_eq!(reader.position(), 7);
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn composite_payload_concatenates_in_order() {
        let mut payload = CompositePayload::new();
        payload.push(Bytes::from_static(b"AAAAA"));
        payload.push(Bytes::from_static(b"BBBBB"));
        payload.push(Bytes::from_static(b"CCCCC"));
        assert_eq!(payload.len(), 15);
        assert_eq!(payload.into_payload().as_ref(), b"AAAAABBBBBCCCCC");
    }

    #[test]
    fn single_chunk_is_not_copied() {
        let chunk = Bytes::from_static(b"hello");
        let mut payload = CompositePayload::new();
        payload.push(chunk.clone());
        let merged = payload.into_payload();
        // Bytes equality on the same static storage
        assert_eq!(merged, chunk);
    }
}
