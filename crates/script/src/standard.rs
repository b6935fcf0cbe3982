//! Output script templates recognized by the masternode checks.

use cropd_primitives::address::{p2pkh_hash, p2pkh_script, p2sh_hash};
use cropd_primitives::hash::hash160;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScriptType {
    P2Pk,
    P2Pkh,
    P2Sh,
    NullData,
    Unknown,
}

const OP_RETURN: u8 = 0x6a;
const OP_CHECKSIG: u8 = 0xac;

pub fn classify_script_pubkey(script: &[u8]) -> ScriptType {
    if p2pkh_hash(script).is_some() {
        return ScriptType::P2Pkh;
    }
    if p2sh_hash(script).is_some() {
        return ScriptType::P2Sh;
    }
    match script {
        [OP_RETURN, ..] => ScriptType::NullData,
        [push, key @ .., OP_CHECKSIG] if matches!(*push, 33 | 65) && key.len() == usize::from(*push) => {
            ScriptType::P2Pk
        }
        _ => ScriptType::Unknown,
    }
}

pub fn extract_pubkey_hash(script: &[u8]) -> Option<[u8; 20]> {
    p2pkh_hash(script)
}

pub fn p2pkh_script_for_pubkey(pubkey: &[u8]) -> Vec<u8> {
    p2pkh_script(&hash160(pubkey))
}

/// True when `script` is the pay-to-pubkey-hash output spendable by `pubkey`.
pub fn pays_to_pubkey(script: &[u8], pubkey: &[u8]) -> bool {
    p2pkh_hash(script) == Some(hash160(pubkey))
}
