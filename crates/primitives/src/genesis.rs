//! Construction of the hard-coded genesis block.

use cropd_consensus::GenesisParams;

use crate::block::{Block, BlockHeader};
use crate::outpoint::OutPoint;
use crate::transaction::{Transaction, TxIn, TxOut, SEQUENCE_FINAL};

const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;

/// The coinbase scriptSig: `0 <coinbase_number> <timestamp>`.
pub fn genesis_script_sig(params: &GenesisParams) -> Vec<u8> {
    let mut script = vec![OP_0];
    push_data(&mut script, &script_num(params.coinbase_number));
    push_data(&mut script, params.timestamp.as_bytes());
    script
}

pub fn genesis_coinbase(params: &GenesisParams) -> Transaction {
    Transaction {
        version: params.tx_version,
        time: params.tx_time,
        vin: vec![TxIn {
            prevout: OutPoint::null(),
            script_sig: genesis_script_sig(params),
            sequence: SEQUENCE_FINAL,
        }],
        vout: vec![TxOut::empty()],
        lock_time: 0,
    }
}

/// Rebuilds the genesis block, deriving the merkle root from its single coinbase.
pub fn genesis_block(params: &GenesisParams) -> Block {
    let coinbase = genesis_coinbase(params);
    let header = BlockHeader {
        version: params.version,
        prev_block: [0u8; 32],
        merkle_root: coinbase.txid(),
        time: params.time,
        bits: params.bits,
        nonce: params.nonce,
    };
    Block {
        header,
        transactions: vec![coinbase],
    }
}

fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= u8::MAX as usize {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else {
        script.push(0x4d);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// Minimal little-endian sign-magnitude encoding used for script numbers.
fn script_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let negative = value < 0;
    let mut abs = value.unsigned_abs();
    let mut out = Vec::new();
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropd_consensus::{chain_params, hash256_to_hex, Network};

    #[test]
    fn script_sig_matches_legacy_layout() {
        let params = chain_params(Network::Mainnet).genesis;
        let script = genesis_script_sig(&params);
        assert_eq!(&script[..4], &[0x00, 0x01, 0x2a, 0x25]);
        assert_eq!(&script[4..], params.timestamp.as_bytes());
    }

    #[test]
    fn merkle_root_matches_hard_coded_value() {
        for network in [Network::Mainnet, Network::Testnet] {
            let params = chain_params(network).genesis;
            let block = genesis_block(&params);
            assert_eq!(block.header.merkle_root, params.merkle_root);
            assert_eq!(block.compute_merkle_root(), params.merkle_root);
            assert_eq!(
                hash256_to_hex(&block.header.merkle_root),
                "15f6d741e78cbb850dab1a4ba14d518ef324f0673b3507a9f31fa092187af33d"
            );
            assert!(block.transactions[0].is_coinbase());
        }
    }

    #[test]
    fn tampered_timestamp_changes_merkle_root() {
        let mut params = chain_params(Network::Mainnet).genesis;
        params.timestamp = "New legend is born. 03 February 2018.";
        assert_ne!(genesis_block(&params).header.merkle_root, params.merkle_root);
    }

    #[test]
    fn script_numbers_are_minimal() {
        assert_eq!(script_num(42), vec![0x2a]);
        assert_eq!(script_num(128), vec![0x80, 0x00]);
        assert_eq!(script_num(-1), vec![0x81]);
        assert!(script_num(0).is_empty());
    }
}
