//! Masternode tier and reward schedule helpers.

use crate::money::Amount;
use crate::params::{ConsensusParams, MasternodeParams};

/// Highest tier whose minimum collateral is covered by `collateral` at `height`.
pub fn masternode_tier(collateral: Amount, height: i32, params: &MasternodeParams) -> Option<u8> {
    let tiers = params.tiers.at(height)?;
    tiers
        .iter()
        .filter(|(_, minimum)| collateral >= **minimum)
        .max_by_key(|(_, minimum)| **minimum)
        .map(|(tier, _)| *tier)
}

pub fn masternode_reward(tier: u8, height: i32, params: &MasternodeParams) -> Option<Amount> {
    params.rewards.at(height)?.get(&tier).copied()
}

pub fn masternode_payments_active(height: i32, params: &MasternodeParams) -> bool {
    height >= params.payment_start_height
}

pub fn is_pow_allowed(height: i32, params: &ConsensusParams) -> bool {
    height <= params.last_pow_height
}

pub fn is_pos_allowed(height: i32, params: &ConsensusParams) -> bool {
    height >= params.pos_start_height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        MASTERNODE_REWARDS_REDUCTION_BLOCK, MASTERNODE_TIERS_REBASE_BLOCK,
        TIERED_MASTERNODES_START_BLOCK,
    };
    use crate::money::COIN;
    use crate::params::{chain_params, Network};

    #[test]
    fn single_tier_before_tiered_schedule() {
        let params = chain_params(Network::Mainnet).masternode;
        let height = TIERED_MASTERNODES_START_BLOCK - 1;

        assert_eq!(masternode_tier(2_500 * COIN, height, &params), Some(1));
        assert_eq!(masternode_tier(50_000 * COIN, height, &params), Some(1));
        assert_eq!(masternode_tier(2_499 * COIN, height, &params), None);
        assert_eq!(masternode_reward(1, height, &params), Some(25 * COIN));
        assert_eq!(masternode_reward(2, height, &params), None);
    }

    #[test]
    fn tier_rebase_at_157_000() {
        let params = chain_params(Network::Mainnet).masternode;
        let rebase = MASTERNODE_TIERS_REBASE_BLOCK;

        assert_eq!(masternode_tier(10_000 * COIN, rebase - 1, &params), Some(3));
        assert_eq!(masternode_tier(10_000 * COIN, rebase, &params), Some(1));
        assert_eq!(masternode_tier(20_000 * COIN, rebase - 1, &params), Some(4));
        assert_eq!(masternode_tier(20_000 * COIN, rebase, &params), Some(2));
        assert_eq!(masternode_tier(5_000 * COIN, rebase, &params), None);

        assert_eq!(masternode_reward(3, rebase - 1, &params), Some(140 * COIN));
        assert_eq!(masternode_reward(1, rebase, &params), Some(100 * COIN));
        assert_eq!(masternode_reward(4, rebase, &params), None);
    }

    #[test]
    fn rewards_halve_at_242_600_with_tiers_unchanged() {
        let params = chain_params(Network::Mainnet).masternode;
        let reduction = MASTERNODE_REWARDS_REDUCTION_BLOCK;

        assert_eq!(masternode_reward(1, reduction - 1, &params), Some(100 * COIN));
        assert_eq!(masternode_reward(1, reduction, &params), Some(50 * COIN));
        assert_eq!(masternode_reward(2, reduction, &params), Some(105 * COIN));
        assert_eq!(masternode_reward(3, reduction, &params), Some(150 * COIN));
        assert_eq!(
            masternode_tier(30_000 * COIN, reduction - 1, &params),
            masternode_tier(30_000 * COIN, reduction, &params)
        );
    }

    #[test]
    fn tiered_era_maps_each_threshold() {
        let params = chain_params(Network::Testnet).masternode;
        let height = TIERED_MASTERNODES_START_BLOCK;

        assert_eq!(masternode_tier(2_500 * COIN, height, &params), Some(1));
        assert_eq!(masternode_tier(4_999 * COIN, height, &params), Some(1));
        assert_eq!(masternode_tier(5_000 * COIN, height, &params), Some(2));
        assert_eq!(masternode_tier(19_999 * COIN, height, &params), Some(3));
        assert_eq!(masternode_tier(1_000_000 * COIN, height, &params), Some(4));
        assert_eq!(masternode_reward(4, height, &params), Some(300 * COIN));
    }

    #[test]
    fn height_gates() {
        let main = chain_params(Network::Mainnet);
        let test = chain_params(Network::Testnet);

        assert!(!masternode_payments_active(49, &main.masternode));
        assert!(masternode_payments_active(50, &main.masternode));
        assert!(is_pow_allowed(20_000, &main.consensus));
        assert!(!is_pow_allowed(20_001, &main.consensus));
        assert!(is_pow_allowed(5_000_000, &test.consensus));
        assert!(!is_pos_allowed(0, &main.consensus));
        assert!(is_pos_allowed(1, &main.consensus));
    }

    #[test]
    fn chain_params_helpers_delegate_to_schedule() {
        let params = chain_params(Network::Mainnet);
        assert_eq!(params.tier_of(30_000 * COIN, 200_000), Some(3));
        assert_eq!(params.reward_of(3, 200_000), Some(300 * COIN));
        assert_eq!(params.reward_of(3, 300_000), Some(150 * COIN));
    }
}
