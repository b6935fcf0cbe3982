//! Consensus wire encoding: little-endian integers, CompactSize lengths and hashes.

use cropd_consensus::Hash256;
use thiserror::Error;

/// Largest CompactSize accepted when decoding a length or element count.
const MAX_COMPACT_SIZE: u64 = 0x0200_0000;

/// Preallocation cap for decoded vectors; the count itself is untrusted.
const MAX_PREALLOC: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("non-canonical CompactSize")]
    NonCanonicalVarInt,
    #[error("compact size exceeds maximum")]
    SizeTooLarge,
    #[error("trailing bytes after decode")]
    TrailingBytes,
}

pub trait Encodable {
    fn consensus_encode(&self, encoder: &mut Encoder);
}

pub trait Decodable: Sized {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError>;
}

#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

pub struct Decoder<'a> {
    input: &'a [u8],
    cursor: usize,
}

macro_rules! le_int {
    ($($write:ident / $read:ident: $ty:ty),* $(,)?) => {
        impl Encoder {
            $(
                pub fn $write(&mut self, value: $ty) {
                    self.buf.extend_from_slice(&value.to_le_bytes());
                }
            )*
        }

        impl<'a> Decoder<'a> {
            $(
                pub fn $read(&mut self) -> Result<$ty, DecodeError> {
                    Ok(<$ty>::from_le_bytes(self.read_fixed()?))
                }
            )*
        }
    };
}

le_int! {
    write_u8 / read_u8: u8,
    write_u16_le / read_u16_le: u16,
    write_u32_le / read_u32_le: u32,
    write_i32_le / read_i32_le: i32,
    write_u64_le / read_u64_le: u64,
    write_i64_le / read_i64_le: i64,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// CompactSize: one byte below 0xfd, otherwise a marker and a 2, 4 or 8 byte value.
    pub fn write_varint(&mut self, value: u64) {
        match value {
            0..=0xfc => self.write_u8(value as u8),
            0xfd..=0xffff => {
                self.write_u8(0xfd);
                self.write_u16_le(value as u16);
            }
            0x1_0000..=0xffff_ffff => {
                self.write_u8(0xfe);
                self.write_u32_le(value as u32);
            }
            _ => {
                self.write_u8(0xff);
                self.write_u64_le(value);
            }
        }
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    pub fn write_var_str(&mut self, value: &str) {
        self.write_var_bytes(value.as_bytes());
    }

    pub fn write_hash_le(&mut self, hash: &Hash256) {
        self.write_bytes(hash);
    }

    /// Count-prefixed sequence of items.
    pub fn write_vec<T: Encodable>(&mut self, items: &[T]) {
        self.write_varint(items.len() as u64);
        for item in items {
            item.consensus_encode(self);
        }
    }
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .cursor
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or(DecodeError::UnexpectedEof)?;
        let slice = &self.input[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(self.take(len)?.to_vec())
    }

    /// Reads a CompactSize, rejecting encodings longer than necessary.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let (value, minimum) = match self.read_u8()? {
            prefix @ 0..=0xfc => return Ok(u64::from(prefix)),
            0xfd => (u64::from(self.read_u16_le()?), 0xfd),
            0xfe => (u64::from(self.read_u32_le()?), 0x1_0000),
            _ => (self.read_u64_le()?, 0x1_0000_0000),
        };
        if value < minimum {
            return Err(DecodeError::NonCanonicalVarInt);
        }
        if value > MAX_COMPACT_SIZE {
            return Err(DecodeError::SizeTooLarge);
        }
        Ok(value)
    }

    fn read_len(&mut self) -> Result<usize, DecodeError> {
        usize::try_from(self.read_varint()?).map_err(|_| DecodeError::SizeTooLarge)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    pub fn read_hash_le(&mut self) -> Result<Hash256, DecodeError> {
        self.read_fixed()
    }

    pub fn read_vec<T: Decodable>(&mut self) -> Result<Vec<T>, DecodeError> {
        let count = self.read_len()?;
        let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            items.push(T::consensus_decode(self)?);
        }
        Ok(items)
    }
}

pub fn encode<T: Encodable>(value: &T) -> Vec<u8> {
    let mut encoder = Encoder::new();
    value.consensus_encode(&mut encoder);
    encoder.into_inner()
}

/// Decodes exactly one value; leftover input is an error.
pub fn decode<T: Decodable>(bytes: &[u8]) -> Result<T, DecodeError> {
    let mut decoder = Decoder::new(bytes);
    let value = T::consensus_decode(&mut decoder)?;
    if !decoder.is_empty() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_size_uses_shortest_form() {
        let cases: [(u64, &[u8]); 5] = [
            (0xfc, &[0xfc]),
            (0xfd, &[0xfd, 0xfd, 0x00]),
            (0xffff, &[0xfd, 0xff, 0xff]),
            (0x1_0000, &[0xfe, 0x00, 0x00, 0x01, 0x00]),
            (MAX_COMPACT_SIZE, &[0xfe, 0x00, 0x00, 0x00, 0x02]),
        ];
        for (value, expected) in cases {
            let mut encoder = Encoder::new();
            encoder.write_varint(value);
            let bytes = encoder.into_inner();
            assert_eq!(bytes, expected);
            let mut decoder = Decoder::new(&bytes);
            assert_eq!(decoder.read_varint(), Ok(value));
            assert!(decoder.is_empty());
        }
    }

    #[test]
    fn rejects_non_canonical_and_oversized_lengths() {
        let mut decoder = Decoder::new(&[0xfd, 0x10, 0x00]);
        assert_eq!(decoder.read_varint(), Err(DecodeError::NonCanonicalVarInt));

        let mut decoder = Decoder::new(&[0xfe, 0x01, 0x00, 0x00, 0x04]);
        assert_eq!(decoder.read_varint(), Err(DecodeError::SizeTooLarge));

        let mut decoder = Decoder::new(&[0x05, 0x01]);
        assert_eq!(decoder.read_var_bytes(), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn huge_counts_fail_without_allocating() {
        let mut decoder = Decoder::new(&[0xfe, 0x00, 0x00, 0x00, 0x02]);
        assert_eq!(
            decoder.read_vec::<crate::OutPoint>(),
            Err(DecodeError::UnexpectedEof)
        );
    }

    #[test]
    fn integers_are_little_endian() {
        let mut encoder = Encoder::new();
        encoder.write_i32_le(-2);
        encoder.write_u32_le(0x0102_0304);
        encoder.write_i64_le(5);
        let bytes = encoder.into_inner();
        assert_eq!(&bytes[..8], &[0xfe, 0xff, 0xff, 0xff, 0x04, 0x03, 0x02, 0x01]);

        let mut decoder = Decoder::new(&bytes);
        assert_eq!(decoder.read_i32_le(), Ok(-2));
        assert_eq!(decoder.read_u32_le(), Ok(0x0102_0304));
        assert_eq!(decoder.read_i64_le(), Ok(5));
        assert_eq!(decode::<crate::OutPoint>(&[0u8; 37]), Err(DecodeError::TrailingBytes));
    }
}
