use cropd_consensus::{ConsensusParams, Hash256};
use cropd_primitives::block::BlockHeader;
use primitive_types::U256;
use thiserror::Error;

use crate::difficulty::{compact_to_u256, hash_meets_target, CompactError};
use crate::neoscrypt::neoscrypt;

#[derive(Debug, Error)]
pub enum PowError {
    #[error("{0}")]
    InvalidBits(&'static str),
    #[error("pow hash does not meet target")]
    HashMismatch,
    #[error(transparent)]
    Compact(#[from] CompactError),
}

/// The block identity: NeoScrypt over the 80-byte header.
pub fn block_hash(header: &BlockHeader) -> Hash256 {
    neoscrypt(&header.header_bytes())
}

pub fn check_proof_of_work(
    hash: &Hash256,
    bits: u32,
    params: &ConsensusParams,
) -> Result<(), PowError> {
    let target = compact_to_u256(bits)?;
    if target.is_zero() {
        return Err(PowError::InvalidBits("pow target is zero"));
    }

    if target > U256::from_little_endian(&params.pow_limit) {
        return Err(PowError::InvalidBits("pow target above limit"));
    }

    if !hash_meets_target(hash, &target.to_little_endian()) {
        return Err(PowError::HashMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropd_consensus::{consensus_params, Network};

    #[test]
    fn target_above_limit_is_rejected() {
        let params = consensus_params(Network::Mainnet);
        let err = check_proof_of_work(&[0u8; 32], 0x1f0f_ffff, &params).unwrap_err();
        assert!(matches!(err, PowError::InvalidBits("pow target above limit")));

        let testnet = consensus_params(Network::Testnet);
        assert!(check_proof_of_work(&[0u8; 32], 0x1f00_ffff, &testnet).is_ok());
    }

    #[test]
    fn hash_above_target_is_rejected() {
        let params = consensus_params(Network::Mainnet);
        let err = check_proof_of_work(&[0xffu8; 32], 0x1e0f_ffff, &params).unwrap_err();
        assert!(matches!(err, PowError::HashMismatch));
        let err = check_proof_of_work(&[0u8; 32], 0, &params).unwrap_err();
        assert!(matches!(err, PowError::InvalidBits("pow target is zero")));
    }
}
