//! Deterministic choice of the masternode paid in a block.
//!
//! Every node holding the same registry snapshot and the same chain must pick
//! the same winner, so the ordering depends only on collateral references, a
//! block hash buried `score_offset` blocks deep, and payment history.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use cropd_consensus::constants::MASTERNODE_MIN_CONFIRMATIONS;
use cropd_consensus::money::Amount;
use cropd_consensus::{ChainParams, Hash256};
use cropd_primitives::encoding::encode;
use cropd_primitives::{sha256d, OutPoint};
use cropd_script::standard::p2pkh_script_for_pubkey;
use primitive_types::U256;

use crate::error::ElectionError;
use crate::oracle::BlockHeightOracle;
use crate::registry::{RegistrySnapshot, SnapshotEntry};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ElectionConfig {
    /// Cooldown length as a percentage of the eligible masternodes in a tier.
    pub cooldown_percent: u32,
    /// How many blocks below the target the seed hash is taken from.
    pub score_offset: i32,
    pub min_collateral_age: i32,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            cooldown_percent: 100,
            score_offset: 100,
            min_collateral_age: MASTERNODE_MIN_CONFIRMATIONS,
        }
    }
}

pub trait ScoreFunction: Send + Sync {
    fn score(&self, collateral: &OutPoint, seed: &Hash256) -> U256;
}

/// `|sha256d(collateral) - sha256d(seed)|` as 256-bit integers.
#[derive(Clone, Copy, Debug, Default)]
pub struct DistanceScore;

impl ScoreFunction for DistanceScore {
    fn score(&self, collateral: &OutPoint, seed: &Hash256) -> U256 {
        let node = U256::from_little_endian(&sha256d(&encode(collateral)));
        let seed = U256::from_little_endian(&sha256d(seed));
        if node > seed {
            node - seed
        } else {
            seed - node
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payout {
    pub total: Amount,
    pub payee_script: Vec<u8>,
    pub payee_amount: Amount,
    pub reward_script: Option<Vec<u8>>,
    pub reward_amount: Amount,
}

impl Payout {
    fn split(total: Amount, payee_script: Vec<u8>, reward: Option<(&[u8], u8)>) -> Self {
        let (reward_script, reward_amount) = match reward {
            Some((script, percent)) if percent > 0 => {
                (Some(script.to_vec()), total * Amount::from(percent) / 100)
            }
            _ => (None, 0),
        };
        Self {
            total,
            payee_script,
            payee_amount: total - reward_amount,
            reward_script,
            reward_amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionResult {
    pub winner: OutPoint,
    pub tier: u8,
    pub election_score: U256,
    pub target_height: i32,
    pub payout: Payout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedCandidate<'a> {
    pub entry: &'a SnapshotEntry,
    /// Tier at the target height.
    pub tier: u8,
    pub score: U256,
}

pub struct PaymentElection {
    config: ElectionConfig,
    scorer: Box<dyn ScoreFunction>,
}

impl PaymentElection {
    pub fn new(config: ElectionConfig) -> Self {
        Self::with_scorer(config, Box::new(DistanceScore))
    }

    pub fn with_scorer(config: ElectionConfig, scorer: Box<dyn ScoreFunction>) -> Self {
        Self { config, scorer }
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn select_winner<O: BlockHeightOracle + ?Sized>(
        &self,
        snapshot: &RegistrySnapshot,
        target_height: i32,
        params: &ChainParams,
        oracle: &O,
    ) -> Result<ElectionResult, ElectionError> {
        let ranking = self.ranking(snapshot, target_height, params, oracle)?;
        let Some(winner) = ranking.into_iter().next() else {
            return Err(ElectionError::NoEligibleMasternode { target_height });
        };

        let record = &winner.entry.record;
        let total = params
            .reward_of(winner.tier, target_height)
            .ok_or(ElectionError::UnknownReward {
                tier: winner.tier,
                height: target_height,
            })?;
        let reward = record
            .reward_address
            .as_deref()
            .map(|script| (script, record.reward_share_percent));
        let payout = Payout::split(total, p2pkh_script_for_pubkey(&record.owner_pubkey), reward);

        Ok(ElectionResult {
            winner: record.collateral,
            tier: winner.tier,
            election_score: winner.score,
            target_height,
            payout,
        })
    }

    /// 1-based position of `collateral` in the payment order, if it is a candidate.
    pub fn rank_of<O: BlockHeightOracle + ?Sized>(
        &self,
        snapshot: &RegistrySnapshot,
        collateral: &OutPoint,
        target_height: i32,
        params: &ChainParams,
        oracle: &O,
    ) -> Result<Option<usize>, ElectionError> {
        let ranking = self.ranking(snapshot, target_height, params, oracle)?;
        Ok(ranking
            .iter()
            .position(|candidate| &candidate.entry.record.collateral == collateral)
            .map(|index| index + 1))
    }

    /// Candidates for `target_height`, best first.
    pub fn ranking<'a, O: BlockHeightOracle + ?Sized>(
        &self,
        snapshot: &'a RegistrySnapshot,
        target_height: i32,
        params: &ChainParams,
        oracle: &O,
    ) -> Result<Vec<RankedCandidate<'a>>, ElectionError> {
        let start_height = params.masternode.payment_start_height;
        if target_height < start_height {
            return Err(ElectionError::PaymentsNotStarted {
                target_height,
                start_height,
            });
        }

        let eligible = self.eligible(snapshot, target_height, params);
        if eligible.is_empty() {
            return Err(ElectionError::NoEligibleMasternode { target_height });
        }
        let candidates = self.apply_cooldown(eligible, target_height);

        let seed_height = target_height.saturating_sub(self.config.score_offset).max(0);
        let seed = oracle
            .block_hash(seed_height)
            .ok_or(ElectionError::OracleUnavailable {
                height: seed_height,
            })?;

        let mut ranked: Vec<RankedCandidate<'a>> = candidates
            .into_iter()
            .map(|(entry, tier)| RankedCandidate {
                entry,
                tier,
                score: self.scorer.score(&entry.record.collateral, &seed),
            })
            .collect();
        ranked.sort_by(compare_candidates);
        Ok(ranked)
    }

    fn eligible<'a>(
        &self,
        snapshot: &'a RegistrySnapshot,
        target_height: i32,
        params: &ChainParams,
    ) -> Vec<(&'a SnapshotEntry, u8)> {
        snapshot
            .entries
            .iter()
            .filter(|entry| {
                entry.record.is_enabled() && entry.collateral_age >= self.config.min_collateral_age
            })
            .filter_map(|entry| {
                params
                    .tier_of(entry.record.collateral_value, target_height)
                    .map(|tier| (entry, tier))
            })
            .collect()
    }

    /// Drops recently paid masternodes. A tier of `n` eligible masternodes
    /// waits `n * cooldown_percent / 100` blocks between payments.
    fn apply_cooldown<'a>(
        &self,
        eligible: Vec<(&'a SnapshotEntry, u8)>,
        target_height: i32,
    ) -> Vec<(&'a SnapshotEntry, u8)> {
        let mut per_tier: BTreeMap<u8, i64> = BTreeMap::new();
        for (_, tier) in &eligible {
            *per_tier.entry(*tier).or_insert(0) += 1;
        }

        let rested: Vec<(&SnapshotEntry, u8)> = eligible
            .iter()
            .copied()
            .filter(|(entry, tier)| {
                let last_paid = entry.record.last_paid_height;
                if last_paid <= 0 {
                    return true;
                }
                let count = per_tier.get(tier).copied().unwrap_or(0);
                let cooldown = count * i64::from(self.config.cooldown_percent) / 100;
                i64::from(target_height) - i64::from(last_paid) >= cooldown
            })
            .collect();

        if rested.is_empty() {
            eligible
        } else {
            rested
        }
    }
}

fn compare_candidates(a: &RankedCandidate<'_>, b: &RankedCandidate<'_>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.entry.record.collateral.cmp(&b.entry.record.collateral))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample_record;
    use cropd_consensus::money::COIN;
    use cropd_consensus::{chain_params, Network};

    struct FixedScore(Vec<(OutPoint, u64)>);

    impl ScoreFunction for FixedScore {
        fn score(&self, collateral: &OutPoint, _seed: &Hash256) -> U256 {
            self.0
                .iter()
                .find(|(outpoint, _)| outpoint == collateral)
                .map_or(U256::zero(), |(_, score)| U256::from(*score))
        }
    }

    struct Hashes;

    impl BlockHeightOracle for Hashes {
        fn block_hash(&self, height: i32) -> Option<Hash256> {
            let mut hash = [0u8; 32];
            hash[..4].copy_from_slice(&height.to_le_bytes());
            Some(hash)
        }

        fn best_height(&self) -> i32 {
            1_000_000
        }
    }

    fn entry(index: u32, coins: i64) -> SnapshotEntry {
        let mut record = sample_record(index);
        record.collateral_value = coins * COIN;
        SnapshotEntry {
            record,
            collateral_age: 100,
        }
    }

    #[test]
    fn distance_score_is_deterministic_per_collateral() {
        let collateral = OutPoint::new([9u8; 32], 3);
        let seed = [5u8; 32];
        let score = DistanceScore.score(&collateral, &seed);
        assert!(!score.is_zero());
        assert_eq!(score, DistanceScore.score(&collateral, &seed));
        let other = OutPoint::new([9u8; 32], 4);
        assert_ne!(score, DistanceScore.score(&other, &seed));
    }

    #[test]
    fn cooldown_is_proportional_to_tier_population() {
        let params = chain_params(Network::Mainnet);
        let mut paid = entry(1, 10_000);
        paid.record.last_paid_height = 199_998;
        let fresh = entry(2, 10_000);
        let snapshot = RegistrySnapshot {
            height: 200_000,
            entries: vec![paid, fresh],
        };
        let scores = FixedScore(vec![
            (OutPoint::new([1u8; 32], 1), 50),
            (OutPoint::new([2u8; 32], 2), 10),
        ]);
        let election = PaymentElection::with_scorer(ElectionConfig::default(), Box::new(scores));

        // Two tier-1 nodes, 100%: paid two blocks ago is just rested.
        let result = election
            .select_winner(&snapshot, 200_000, &params, &Hashes)
            .expect("winner");
        assert_eq!(result.winner, OutPoint::new([1u8; 32], 1));

        let result = election
            .select_winner(&snapshot, 199_999, &params, &Hashes)
            .expect("winner");
        assert_eq!(result.winner, OutPoint::new([2u8; 32], 2));
    }

    #[test]
    fn payout_split_rounds_toward_payee() {
        let payout = Payout::split(101, vec![1], Some((&[2u8][..], 33)));
        assert_eq!(payout.reward_amount, 33);
        assert_eq!(payout.payee_amount, 68);
        assert_eq!(payout.reward_script, Some(vec![2]));

        let payout = Payout::split(100, vec![1], Some((&[2u8][..], 0)));
        assert_eq!(payout.reward_script, None);
        assert_eq!(payout.payee_amount, 100);
    }
}
