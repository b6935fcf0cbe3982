//! Base58Check addresses and keys, encoded with the prefixes of the selected chain.

use cropd_consensus::{Base58Type, ChainParams};
use thiserror::Error;

use crate::hash::sha256d;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid payload length")]
    InvalidLength,
    #[error("invalid base58 character")]
    InvalidCharacter,
    #[error("checksum mismatch")]
    InvalidChecksum,
    #[error("prefix does not belong to this network")]
    UnknownPrefix,
}

/// A decoded pay-to-pubkey-hash or pay-to-script-hash address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Address {
    pub kind: Base58Type,
    pub hash: [u8; 20],
}

pub fn encode_address(kind: Base58Type, hash: &[u8; 20], params: &ChainParams) -> String {
    base58check_encode(&[params.base58_prefix(kind), &hash[..]].concat())
}

pub fn decode_address(address: &str, params: &ChainParams) -> Result<Address, AddressError> {
    let payload = base58check_decode(address)?;
    for kind in [Base58Type::PubkeyAddress, Base58Type::ScriptAddress] {
        let prefix = params.base58_prefix(kind);
        if let Some(body) = payload.strip_prefix(prefix) {
            let hash: [u8; 20] = body.try_into().map_err(|_| AddressError::InvalidLength)?;
            return Ok(Address { kind, hash });
        }
    }
    Err(AddressError::UnknownPrefix)
}

pub fn address_to_script_pubkey(address: &str, params: &ChainParams) -> Result<Vec<u8>, AddressError> {
    let decoded = decode_address(address, params)?;
    Ok(match decoded.kind {
        Base58Type::ScriptAddress => p2sh_script(&decoded.hash),
        _ => p2pkh_script(&decoded.hash),
    })
}

pub fn script_pubkey_to_address(script: &[u8], params: &ChainParams) -> Option<String> {
    let (kind, hash) = p2pkh_hash(script)
        .map(|hash| (Base58Type::PubkeyAddress, hash))
        .or_else(|| p2sh_hash(script).map(|hash| (Base58Type::ScriptAddress, hash)))?;
    Some(encode_address(kind, &hash, params))
}

pub fn secret_key_to_wif(secret: &[u8; 32], params: &ChainParams, compressed: bool) -> String {
    let mut payload = params.base58_prefix(Base58Type::SecretKey).to_vec();
    payload.extend_from_slice(secret);
    if compressed {
        payload.push(COMPRESSED_KEY_FLAG);
    }
    base58check_encode(&payload)
}

/// Returns the secret and whether its public key is serialized compressed.
pub fn wif_to_secret_key(wif: &str, params: &ChainParams) -> Result<([u8; 32], bool), AddressError> {
    let payload = base58check_decode(wif)?;
    let body = payload
        .strip_prefix(params.base58_prefix(Base58Type::SecretKey))
        .ok_or(AddressError::UnknownPrefix)?;
    let (key, compressed) = match body {
        [key @ .., COMPRESSED_KEY_FLAG] if key.len() == 32 => (key, true),
        key => (key, false),
    };
    let secret = key.try_into().map_err(|_| AddressError::InvalidLength)?;
    Ok((secret, compressed))
}

const COMPRESSED_KEY_FLAG: u8 = 0x01;

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const PUSH_20: u8 = 0x14;

pub fn p2pkh_script(hash: &[u8; 20]) -> Vec<u8> {
    [&[OP_DUP, OP_HASH160, PUSH_20][..], &hash[..], &[OP_EQUALVERIFY, OP_CHECKSIG][..]].concat()
}

pub fn p2sh_script(hash: &[u8; 20]) -> Vec<u8> {
    [&[OP_HASH160, PUSH_20][..], &hash[..], &[OP_EQUAL][..]].concat()
}

/// Key hash of an `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG` script.
pub fn p2pkh_hash(script: &[u8]) -> Option<[u8; 20]> {
    match script {
        [OP_DUP, OP_HASH160, PUSH_20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] => {
            hash.try_into().ok()
        }
        _ => None,
    }
}

/// Script hash of an `OP_HASH160 <20> OP_EQUAL` script.
pub fn p2sh_hash(script: &[u8]) -> Option<[u8; 20]> {
    match script {
        [OP_HASH160, PUSH_20, hash @ .., OP_EQUAL] => hash.try_into().ok(),
        _ => None,
    }
}

fn base58check_encode(payload: &[u8]) -> String {
    let checksum = sha256d(payload);
    base58_encode(&[payload, &checksum[..4]].concat())
}

fn base58check_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    let mut bytes = base58_decode(input)?;
    if bytes.len() < 4 {
        return Err(AddressError::InvalidLength);
    }
    let checksum = bytes.split_off(bytes.len() - 4);
    if checksum[..] != sha256d(&bytes)[..4] {
        return Err(AddressError::InvalidChecksum);
    }
    Ok(bytes)
}

/// Reverse lookup from ASCII byte to digit value; 0xff marks bytes outside the alphabet.
const DIGIT_VALUES: [u8; 128] = {
    let mut table = [0xffu8; 128];
    let mut index = 0;
    while index < ALPHABET.len() {
        table[ALPHABET[index] as usize] = index as u8;
        index += 1;
    }
    table
};

/// Multiplies the little-endian big number `limbs` by `from` and adds `carry`,
/// keeping every limb below `to`.
fn mul_add(limbs: &mut Vec<u8>, from: u32, to: u32, mut carry: u32) {
    for limb in limbs.iter_mut() {
        carry += u32::from(*limb) * from;
        *limb = (carry % to) as u8;
        carry /= to;
    }
    while carry > 0 {
        limbs.push((carry % to) as u8);
        carry /= to;
    }
}

fn base58_encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|byte| **byte == 0).count();
    let mut digits = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for byte in &data[zeros..] {
        mul_add(&mut digits, 256, 58, u32::from(*byte));
    }
    let mut out = "1".repeat(zeros);
    out.extend(digits.iter().rev().map(|digit| ALPHABET[usize::from(*digit)] as char));
    out
}

fn base58_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    if input.is_empty() {
        return Err(AddressError::InvalidLength);
    }
    let zeros = input.bytes().take_while(|byte| *byte == b'1').count();
    let mut bytes = Vec::with_capacity(input.len());
    for ch in input.bytes().skip(zeros) {
        let value = DIGIT_VALUES
            .get(usize::from(ch))
            .copied()
            .filter(|value| *value != 0xff)
            .ok_or(AddressError::InvalidCharacter)?;
        mul_add(&mut bytes, 58, 256, u32::from(value));
    }
    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropd_consensus::{chain_params, Network};

    const POOL_DUMMY_HASH: [u8; 20] = [
        0x07, 0x6a, 0x6d, 0xb2, 0x32, 0xab, 0x0b, 0x6c, 0x47, 0x37, 0x55, 0x4c, 0x62, 0x94, 0x6c,
        0x23, 0x64, 0x97, 0xbf, 0x1b,
    ];

    #[test]
    fn darksend_dummy_address_decodes_on_mainnet() {
        let params = chain_params(Network::Mainnet);
        let decoded = decode_address(params.darksend_pool_dummy_address, &params).expect("decode");
        assert_eq!(decoded.kind, Base58Type::PubkeyAddress);
        assert_eq!(decoded.hash, POOL_DUMMY_HASH);
        assert_eq!(
            encode_address(Base58Type::PubkeyAddress, &POOL_DUMMY_HASH, &params),
            params.darksend_pool_dummy_address
        );
    }

    #[test]
    fn mainnet_address_is_foreign_on_testnet() {
        let main = chain_params(Network::Mainnet);
        let test = chain_params(Network::Testnet);
        assert_eq!(
            decode_address(main.darksend_pool_dummy_address, &test),
            Err(AddressError::UnknownPrefix)
        );
    }

    #[test]
    fn script_roundtrip_through_address() {
        let params = chain_params(Network::Testnet);
        let script = p2sh_script(&[0x42; 20]);
        let address = script_pubkey_to_address(&script, &params).expect("p2sh address");
        assert_eq!(address_to_script_pubkey(&address, &params).expect("script"), script);
        assert!(script_pubkey_to_address(&[0x6a], &params).is_none());
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let params = chain_params(Network::Mainnet);
        let mut address = params.darksend_pool_dummy_address.to_string();
        address.pop();
        address.push('D');
        assert_eq!(
            decode_address(&address, &params),
            Err(AddressError::InvalidChecksum)
        );
        assert_eq!(
            decode_address("c25gtaAQYBUNjYrxzZqNdyADSmwPPpWo0C", &params),
            Err(AddressError::InvalidCharacter)
        );
    }
}
