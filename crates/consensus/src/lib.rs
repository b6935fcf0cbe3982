//! Consensus constants, chain parameters, and the height-keyed reward schedule.

pub mod constants;
pub mod eras;
pub mod money;
pub mod params;
pub mod rewards;

pub use eras::{Era, EraTable};
pub use params::{
    active, chain_params, consensus_params, hash256_from_hex, hash256_to_hex, select,
    Base58Prefixes, Base58Type, ChainParams, ConfigurationError, ConsensusParams, GenesisParams,
    Hash256, HexError, MasternodeParams, Network, TierTable,
};
pub use rewards::{
    is_pos_allowed, is_pow_allowed, masternode_payments_active, masternode_reward,
    masternode_tier,
};
