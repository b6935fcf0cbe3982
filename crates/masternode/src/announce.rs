//! Signed gossip payloads delivered by the transport layer.

use std::net::SocketAddr;

use cropd_primitives::encoding::encode;
use cropd_primitives::OutPoint;
use cropd_script::message::{sign_message, verify_signed_message, SignedMessageError};
use secp256k1::SecretKey;

/// A masternode's signed claim on its collateral and service address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasternodeAnnouncement {
    pub collateral: OutPoint,
    pub address: SocketAddr,
    pub owner_pubkey: Vec<u8>,
    pub operator_pubkey: Vec<u8>,
    pub signature: Vec<u8>,
    pub sig_time: i64,
    pub protocol_version: i32,
    pub reward_address: Option<Vec<u8>>,
    pub reward_share_percent: u8,
}

impl MasternodeAnnouncement {
    /// Bytes covered by the owner signature.
    pub fn signing_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(200);
        message.extend_from_slice(&encode(&self.collateral));
        message.extend_from_slice(self.address.to_string().as_bytes());
        message.extend_from_slice(self.sig_time.to_string().as_bytes());
        message.extend_from_slice(&self.owner_pubkey);
        message.extend_from_slice(&self.operator_pubkey);
        message.extend_from_slice(self.protocol_version.to_string().as_bytes());
        if let Some(script) = &self.reward_address {
            message.extend_from_slice(script);
        }
        message.extend_from_slice(self.reward_share_percent.to_string().as_bytes());
        message
    }

    /// Signs with the collateral owner key; `owner_pubkey` must already be set.
    pub fn sign(&mut self, owner_secret: &SecretKey) {
        let compressed = self.owner_pubkey.len() == 33;
        self.signature = sign_message(owner_secret, &self.signing_message(), compressed).to_vec();
    }

    pub fn verify(&self) -> Result<(), SignedMessageError> {
        verify_signed_message(&self.owner_pubkey, &self.signature, &self.signing_message())
    }
}

/// Periodic proof of life signed by the operator key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LivenessPing {
    pub collateral: OutPoint,
    pub timestamp: i64,
    pub signature: Vec<u8>,
}

impl LivenessPing {
    pub fn new(collateral: OutPoint, timestamp: i64) -> Self {
        Self {
            collateral,
            timestamp,
            signature: Vec::new(),
        }
    }

    pub fn signing_message(&self) -> Vec<u8> {
        format!("{}{}", self.collateral, self.timestamp).into_bytes()
    }

    pub fn sign(&mut self, operator_secret: &SecretKey, compressed: bool) {
        self.signature = sign_message(operator_secret, &self.signing_message(), compressed).to_vec();
    }

    pub fn verify(&self, operator_pubkey: &[u8]) -> Result<(), SignedMessageError> {
        verify_signed_message(operator_pubkey, &self.signature, &self.signing_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{PublicKey, Secp256k1};

    fn keypair(seed: u8) -> (SecretKey, Vec<u8>) {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[seed; 32]).expect("secret");
        let pubkey = PublicKey::from_secret_key(&secp, &secret);
        (secret, pubkey.serialize().to_vec())
    }

    fn announcement() -> (MasternodeAnnouncement, SecretKey) {
        let (owner_secret, owner_pubkey) = keypair(7);
        let (_, operator_pubkey) = keypair(8);
        let mut announcement = MasternodeAnnouncement {
            collateral: OutPoint::new([4u8; 32], 1),
            address: "203.0.113.7:17720".parse().expect("addr"),
            owner_pubkey,
            operator_pubkey,
            signature: Vec::new(),
            sig_time: 1_700_000_000,
            protocol_version: 60_021,
            reward_address: Some(vec![0x76, 0xa9]),
            reward_share_percent: 25,
        };
        announcement.sign(&owner_secret);
        (announcement, owner_secret)
    }

    #[test]
    fn signed_announcement_verifies() {
        let (announcement, _) = announcement();
        announcement.verify().expect("verify");
    }

    #[test]
    fn every_signed_field_is_covered() {
        let (base, _) = announcement();

        let mut changed = base.clone();
        changed.sig_time += 1;
        assert!(changed.verify().is_err());

        let mut changed = base.clone();
        changed.address = "203.0.113.8:17720".parse().expect("addr");
        assert!(changed.verify().is_err());

        let mut changed = base.clone();
        changed.reward_share_percent = 26;
        assert!(changed.verify().is_err());

        let mut changed = base.clone();
        changed.reward_address = None;
        assert!(changed.verify().is_err());

        let mut changed = base.clone();
        changed.operator_pubkey = keypair(9).1;
        assert!(changed.verify().is_err());

        let mut changed = base;
        changed.collateral.index += 1;
        assert!(changed.verify().is_err());
    }

    #[test]
    fn ping_verifies_against_operator_key() {
        let (operator_secret, operator_pubkey) = keypair(8);
        let (_, owner_pubkey) = keypair(7);
        let mut ping = LivenessPing::new(OutPoint::new([4u8; 32], 1), 1_700_000_100);
        ping.sign(&operator_secret, true);

        ping.verify(&operator_pubkey).expect("verify");
        assert!(ping.verify(&owner_pubkey).is_err());

        ping.timestamp += 1;
        assert!(ping.verify(&operator_pubkey).is_err());
    }
}
