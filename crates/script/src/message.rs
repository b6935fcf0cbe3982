//! Bitcoin-style signed message helpers (masternode announcements and pings).

use cropd_consensus::constants::SIGNED_MESSAGE_MAGIC;
use cropd_consensus::Hash256;
use cropd_primitives::encoding::Encoder;
use cropd_primitives::hash::sha256d;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, SecretKey};
use thiserror::Error;

use crate::secp::{secp256k1_sign, secp256k1_verify};

pub const COMPACT_SIGNATURE_SIZE: usize = 65;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignedMessageError {
    #[error("invalid pubkey")]
    InvalidPubkey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid recovery id")]
    InvalidRecoveryId,
    #[error("failed to recover pubkey")]
    RecoverFailed,
    #[error("pubkey mismatch")]
    PubkeyMismatch,
}

/// Digest signed by masternode keys: `sha256d(varstr(magic) || varstr(message))`.
pub fn signed_message_hash(message: &[u8]) -> Hash256 {
    let mut encoder = Encoder::new();
    encoder.write_var_str(SIGNED_MESSAGE_MAGIC);
    encoder.write_var_bytes(message);
    sha256d(&encoder.into_inner())
}

fn digest(message: &[u8]) -> Message {
    Message::from_digest(signed_message_hash(message))
}

/// Header byte of the compact form: `27 + recid`, plus 4 for a compressed key.
const HEADER_BASE: u8 = 27;
const HEADER_COMPRESSED: u8 = 4;

/// Produces the 65-byte compact form: header byte, then r||s.
pub fn sign_message(
    secret: &SecretKey,
    message: &[u8],
    compressed: bool,
) -> [u8; COMPACT_SIGNATURE_SIZE] {
    let (rec_id, rs) = secp256k1_sign()
        .sign_ecdsa_recoverable(&digest(message), secret)
        .serialize_compact();
    let flag = if compressed { HEADER_COMPRESSED } else { 0 };
    let mut out = [0u8; COMPACT_SIGNATURE_SIZE];
    out[0] = HEADER_BASE + flag + rec_id.to_i32() as u8;
    out[1..].copy_from_slice(&rs);
    out
}

pub fn verify_signed_message(
    expected_pubkey: &[u8],
    signature: &[u8],
    message: &[u8],
) -> Result<(), SignedMessageError> {
    if expected_pubkey.is_empty() {
        return Err(SignedMessageError::InvalidPubkey);
    }
    let compact = CompactSignature::parse(signature)?;
    if compact.compressed != (expected_pubkey.len() == 33) {
        return Err(SignedMessageError::PubkeyMismatch);
    }
    let pubkey =
        PublicKey::from_slice(expected_pubkey).map_err(|_| SignedMessageError::InvalidPubkey)?;
    secp256k1_verify()
        .verify_ecdsa(&digest(message), &compact.signature.to_standard(), &pubkey)
        .map_err(|_| SignedMessageError::InvalidSignature)
}

/// Recovers the signer's key, serialized the way the header byte says it was.
pub fn recover_signed_message_pubkey(
    signature: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, SignedMessageError> {
    let compact = CompactSignature::parse(signature)?;
    let pubkey = secp256k1_verify()
        .recover_ecdsa(&digest(message), &compact.signature)
        .map_err(|_| SignedMessageError::RecoverFailed)?;
    Ok(match compact.compressed {
        true => pubkey.serialize().to_vec(),
        false => pubkey.serialize_uncompressed().to_vec(),
    })
}

struct CompactSignature {
    signature: RecoverableSignature,
    compressed: bool,
}

impl CompactSignature {
    fn parse(bytes: &[u8]) -> Result<Self, SignedMessageError> {
        let [header, rs @ ..] = bytes else {
            return Err(SignedMessageError::InvalidSignature);
        };
        if rs.len() != COMPACT_SIGNATURE_SIZE - 1 {
            return Err(SignedMessageError::InvalidSignature);
        }
        let offset = header
            .checked_sub(HEADER_BASE)
            .filter(|offset| *offset < 2 * HEADER_COMPRESSED)
            .ok_or(SignedMessageError::InvalidSignature)?;
        let compressed = offset >= HEADER_COMPRESSED;
        let rec_id = RecoveryId::from_i32(i32::from(offset % HEADER_COMPRESSED))
            .map_err(|_| SignedMessageError::InvalidRecoveryId)?;
        let signature = RecoverableSignature::from_compact(rs, rec_id)
            .map_err(|_| SignedMessageError::InvalidSignature)?;
        Ok(Self {
            signature,
            compressed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(seed: u8) -> (SecretKey, PublicKey) {
        let secret = SecretKey::from_slice(&[seed; 32]).expect("secret");
        let pubkey = PublicKey::from_secret_key(secp256k1_sign(), &secret);
        (secret, pubkey)
    }

    #[test]
    fn verify_signed_message_accepts_valid_compact_signature() {
        let (secret, pubkey) = keypair(1);
        let message = b"203.0.113.7:177201700000000";
        let sig_bytes = sign_message(&secret, message, true);

        verify_signed_message(&pubkey.serialize(), &sig_bytes, message).expect("verify ok");
        let err = verify_signed_message(&pubkey.serialize_uncompressed(), &sig_bytes, message)
            .unwrap_err();
        assert_eq!(err, SignedMessageError::PubkeyMismatch);
    }

    #[test]
    fn verify_rejects_other_key_and_altered_message() {
        let (secret, _) = keypair(1);
        let (_, other) = keypair(2);
        let sig_bytes = sign_message(&secret, b"hello", true);

        assert_eq!(
            verify_signed_message(&other.serialize(), &sig_bytes, b"hello"),
            Err(SignedMessageError::InvalidSignature)
        );
        let (_, pubkey) = keypair(1);
        assert_eq!(
            verify_signed_message(&pubkey.serialize(), &sig_bytes, b"hellp"),
            Err(SignedMessageError::InvalidSignature)
        );
        assert_eq!(
            verify_signed_message(&pubkey.serialize(), &sig_bytes[..64], b"hello"),
            Err(SignedMessageError::InvalidSignature)
        );
    }

    #[test]
    fn header_byte_outside_range_is_rejected() {
        let (secret, pubkey) = keypair(3);
        let mut sig_bytes = sign_message(&secret, b"ping", true);
        assert!((31..=34).contains(&sig_bytes[0]));
        sig_bytes[0] = 35;
        assert_eq!(
            verify_signed_message(&pubkey.serialize(), &sig_bytes, b"ping"),
            Err(SignedMessageError::InvalidSignature)
        );
        sig_bytes[0] = 26;
        assert_eq!(
            recover_signed_message_pubkey(&sig_bytes, b"ping"),
            Err(SignedMessageError::InvalidSignature)
        );
        assert_eq!(
            recover_signed_message_pubkey(&[], b"ping"),
            Err(SignedMessageError::InvalidSignature)
        );
    }

    #[test]
    fn recover_signed_message_pubkey_matches_compact_header() {
        let (secret, pubkey) = keypair(1);
        let message = b"hello";

        let sig_compact = sign_message(&secret, message, true);
        let recovered = recover_signed_message_pubkey(&sig_compact, message).expect("recover");
        assert_eq!(recovered, pubkey.serialize().to_vec());

        let sig_uncompressed = sign_message(&secret, message, false);
        let recovered = recover_signed_message_pubkey(&sig_uncompressed, message).expect("recover");
        assert_eq!(recovered, pubkey.serialize_uncompressed().to_vec());
    }
}
