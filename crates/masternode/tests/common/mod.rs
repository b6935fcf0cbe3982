#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use cropd_consensus::money::COIN;
use cropd_consensus::Hash256;
use cropd_masternode::{
    BlockHeightOracle, CollateralSource, LivenessPing, MasternodeAnnouncement, NetworkClock,
};
use cropd_primitives::{sha256d, OutPoint, TxOut};
use cropd_script::standard::p2pkh_script_for_pubkey;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

pub const START_TIME: i64 = 1_700_000_000;

#[derive(Default)]
struct ChainState {
    best_height: i32,
    time: i64,
    outputs: HashMap<OutPoint, (TxOut, i32)>,
    missing_hashes: HashSet<i32>,
    confirmation_queries: usize,
}

/// Active chain stand-in: outputs remember the height they were mined at.
pub struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new(best_height: i32) -> Self {
        Self {
            state: Mutex::new(ChainState {
                best_height,
                time: START_TIME,
                ..ChainState::default()
            }),
        }
    }

    pub fn fund(&self, collateral: OutPoint, owner_pubkey: &[u8], coins: i64, mined_at: i32) {
        let output = TxOut {
            value: coins * COIN,
            script_pubkey: p2pkh_script_for_pubkey(owner_pubkey),
        };
        self.state
            .lock()
            .expect("chain")
            .outputs
            .insert(collateral, (output, mined_at));
    }

    pub fn spend(&self, collateral: &OutPoint) {
        self.state.lock().expect("chain").outputs.remove(collateral);
    }

    pub fn set_best_height(&self, height: i32) {
        self.state.lock().expect("chain").best_height = height;
    }

    pub fn advance(&self, blocks: i32) {
        self.state.lock().expect("chain").best_height += blocks;
    }

    pub fn hide_block_hash(&self, height: i32) {
        self.state
            .lock()
            .expect("chain")
            .missing_hashes
            .insert(height);
    }

    pub fn confirmation_queries(&self) -> usize {
        self.state.lock().expect("chain").confirmation_queries
    }

    /// Confirmations straight from the mined height, bypassing any cache.
    pub fn recompute_confirmations(&self, collateral: &OutPoint) -> Option<i32> {
        let state = self.state.lock().expect("chain");
        state
            .outputs
            .get(collateral)
            .map(|(_, mined_at)| state.best_height - mined_at + 1)
    }
}

impl BlockHeightOracle for MockChain {
    fn block_hash(&self, height: i32) -> Option<Hash256> {
        let state = self.state.lock().expect("chain");
        if height < 0 || height > state.best_height || state.missing_hashes.contains(&height) {
            return None;
        }
        Some(sha256d(&height.to_le_bytes()))
    }

    fn best_height(&self) -> i32 {
        self.state.lock().expect("chain").best_height
    }
}

impl NetworkClock for MockChain {
    fn adjusted_time(&self) -> i64 {
        self.state.lock().expect("chain").time
    }
}

impl CollateralSource for MockChain {
    fn collateral_output(&self, outpoint: &OutPoint) -> Option<TxOut> {
        let state = self.state.lock().expect("chain");
        state.outputs.get(outpoint).map(|(output, _)| output.clone())
    }

    fn confirmations(&self, outpoint: &OutPoint) -> Option<i32> {
        let mut state = self.state.lock().expect("chain");
        state.confirmation_queries += 1;
        let best = state.best_height;
        state
            .outputs
            .get(outpoint)
            .map(|(_, mined_at)| best - mined_at + 1)
    }
}

pub fn keypair(seed: u64) -> (SecretKey, Vec<u8>) {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&seed.wrapping_add(1).to_be_bytes());
    let secret = SecretKey::from_slice(&bytes).expect("secret");
    let pubkey = PublicKey::from_secret_key(&Secp256k1::new(), &secret);
    (secret, pubkey.serialize().to_vec())
}

/// Keys and collateral of one test masternode.
pub struct Node {
    pub collateral: OutPoint,
    pub owner_secret: SecretKey,
    pub owner_pubkey: Vec<u8>,
    pub operator_secret: SecretKey,
    pub operator_pubkey: Vec<u8>,
}

impl Node {
    pub fn new(id: u8) -> Self {
        let mut txid = [0u8; 32];
        txid[0] = id;
        txid[31] = 0x5a;
        let (owner_secret, owner_pubkey) = keypair(u64::from(id) * 2);
        let (operator_secret, operator_pubkey) = keypair(u64::from(id) * 2 + 1);
        Self {
            collateral: OutPoint::new(txid, 0),
            owner_secret,
            owner_pubkey,
            operator_secret,
            operator_pubkey,
        }
    }

    /// Funds the collateral on `chain` with `coins`, mined at `mined_at`.
    pub fn fund(&self, chain: &MockChain, coins: i64, mined_at: i32) {
        chain.fund(self.collateral, &self.owner_pubkey, coins, mined_at);
    }

    pub fn announcement(&self, sig_time: i64) -> MasternodeAnnouncement {
        let mut announcement = MasternodeAnnouncement {
            collateral: self.collateral,
            address: "198.51.100.20:17720".parse().expect("addr"),
            owner_pubkey: self.owner_pubkey.clone(),
            operator_pubkey: self.operator_pubkey.clone(),
            signature: Vec::new(),
            sig_time,
            protocol_version: cropd_consensus::constants::PROTOCOL_VERSION,
            reward_address: None,
            reward_share_percent: 0,
        };
        announcement.sign(&self.owner_secret);
        announcement
    }

    pub fn announcement_with_reward(
        &self,
        sig_time: i64,
        reward_script: Vec<u8>,
        percent: u8,
    ) -> MasternodeAnnouncement {
        let mut announcement = self.announcement(sig_time);
        announcement.reward_address = Some(reward_script);
        announcement.reward_share_percent = percent;
        announcement.sign(&self.owner_secret);
        announcement
    }

    pub fn ping(&self, timestamp: i64) -> LivenessPing {
        let mut ping = LivenessPing::new(self.collateral, timestamp);
        ping.sign(&self.operator_secret, true);
        ping
    }
}

/// Small deterministic generator for randomized cases.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 11
    }

    pub fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

impl MockChain {
    pub fn recompute_height(&self) -> i32 {
        self.state.lock().expect("chain").best_height
    }
}
