//! Genesis identity check run when chain parameters are selected.

use cropd_consensus::{hash256_to_hex, ChainParams, ConfigurationError, Hash256, Network};
use cropd_primitives::genesis::genesis_block;

use crate::validation::{block_hash, check_proof_of_work};

/// Rebuilds the genesis block and confirms it hashes to the hard-coded identity.
pub fn verify_genesis(params: &ChainParams) -> Result<(), ConfigurationError> {
    let genesis = &params.genesis;
    let block = genesis_block(genesis);

    ensure_equal(
        params.network,
        "merkle root",
        &genesis.merkle_root,
        &block.header.merkle_root,
    )?;

    let hash = block_hash(&block.header);
    ensure_equal(params.network, "block hash", &genesis.hash, &hash)?;
    ensure_equal(
        params.network,
        "consensus genesis hash",
        &params.consensus.hash_genesis_block,
        &hash,
    )?;

    check_proof_of_work(&hash, block.header.bits, &params.consensus).map_err(|err| {
        ConfigurationError::GenesisProofOfWork {
            network: params.network,
            reason: err.to_string(),
        }
    })
}

fn ensure_equal(
    network: Network,
    field: &'static str,
    expected: &Hash256,
    computed: &Hash256,
) -> Result<(), ConfigurationError> {
    if expected == computed {
        return Ok(());
    }
    Err(ConfigurationError::GenesisMismatch {
        network,
        field,
        expected: hash256_to_hex(expected),
        computed: hash256_to_hex(computed),
    })
}
