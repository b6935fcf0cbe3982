//! Core block/transaction types, consensus serialization and address encoding.

pub mod address;
pub mod block;
pub mod encoding;
pub mod genesis;
pub mod hash;
pub mod outpoint;
pub mod transaction;

pub use address::{
    address_to_script_pubkey, decode_address, encode_address, p2pkh_hash, p2pkh_script,
    p2sh_hash, p2sh_script, script_pubkey_to_address, secret_key_to_wif, wif_to_secret_key,
    Address, AddressError,
};
pub use block::{compute_merkle_root, Block, BlockHeader};
pub use genesis::{genesis_block, genesis_coinbase};
pub use hash::{hash160, sha256, sha256d};
pub use outpoint::OutPoint;
pub use transaction::{Transaction, TxIn, TxOut};
