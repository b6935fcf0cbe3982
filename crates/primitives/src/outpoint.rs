//! Transaction outpoint type.

use std::fmt;

use cropd_consensus::{hash256_to_hex, Hash256};

use crate::encoding::{Decodable, DecodeError, Decoder, Encodable, Encoder};

/// Reference to a transaction output. Ordering compares the txid bytes, then the index.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct OutPoint {
    pub hash: Hash256,
    pub index: u32,
}

impl OutPoint {
    pub fn new(hash: Hash256, index: u32) -> Self {
        Self { hash, index }
    }

    pub fn null() -> Self {
        Self {
            hash: [0u8; 32],
            index: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX && self.hash == [0u8; 32]
    }

    pub fn txid_hex(&self) -> String {
        hash256_to_hex(&self.hash)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid_hex(), self.index)
    }
}

impl Encodable for OutPoint {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_hash_le(&self.hash);
        encoder.write_u32_le(self.index);
    }
}

impl Decodable for OutPoint {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let hash = decoder.read_hash_le()?;
        let index = decoder.read_u32_le()?;
        Ok(Self { hash, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_uses_txid_bytes_then_index() {
        let mut low = [0u8; 32];
        low[0] = 1;
        let mut high = [0u8; 32];
        high[0] = 2;

        assert!(OutPoint::new(low, 9) < OutPoint::new(high, 0));
        assert!(OutPoint::new(low, 0) < OutPoint::new(low, 1));
    }

    #[test]
    fn display_is_txid_and_index() {
        let mut hash = [0u8; 32];
        hash[0] = 0xab;
        let outpoint = OutPoint::new(hash, 3);
        let text = outpoint.to_string();
        assert!(text.ends_with("ab:3"));
        assert_eq!(text.len(), 64 + 2);
        assert!(OutPoint::null().is_null());
        assert!(!outpoint.is_null());
    }
}
