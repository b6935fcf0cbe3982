//! Digest helpers shared by txids, merkle trees, addresses and signed messages.

use cropd_consensus::Hash256;
use ripemd::{Digest, Ripemd160};
use sha2::Sha256;

fn digest_into<D: Digest, const N: usize>(data: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&D::digest(data));
    out
}

pub fn sha256(data: &[u8]) -> Hash256 {
    digest_into::<Sha256, 32>(data)
}

/// SHA-256 applied twice: txids, merkle nodes, checksums and signed-message digests.
pub fn sha256d(data: &[u8]) -> Hash256 {
    sha256(&sha256(data))
}

/// Double SHA-256 over `left || right`, one merkle tree node.
pub fn sha256d_pair(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    sha256d(&buf)
}

/// RIPEMD-160 of SHA-256; the 20-byte key and script hash behind addresses.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    digest_into::<Ripemd160, 20>(&sha256(data))
}
