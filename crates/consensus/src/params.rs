//! Chain parameter definitions and the process-wide network selection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use thiserror::Error;

use crate::constants::{
    MAINNET_DEFAULT_PORT, MASTERNODE_REWARDS_REDUCTION_BLOCK, MASTERNODE_TIERS_REBASE_BLOCK,
    TIERED_MASTERNODES_START_BLOCK,
};
use crate::eras::EraTable;
use crate::money::{Amount, COIN};

pub type Hash256 = [u8; 32];

/// Tier number → amount (minimum collateral or reward, depending on the table).
pub type TierTable = BTreeMap<u8, Amount>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "main",
            Self::Testnet => "test",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigurationError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Self::Mainnet),
            "test" | "testnet" => Ok(Self::Testnet),
            other => Err(ConfigurationError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown network '{0}'")]
    UnknownNetwork(String),
    #[error("network {active} already selected; refusing to switch to {requested}")]
    AlreadySelected { active: Network, requested: Network },
    #[error("genesis {field} mismatch on {network}: expected {expected}, computed {computed}")]
    GenesisMismatch {
        network: Network,
        field: &'static str,
        expected: String,
        computed: String,
    },
    #[error("genesis proof of work invalid on {network}: {reason}")]
    GenesisProofOfWork {
        network: Network,
        reason: String,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Base58Type {
    PubkeyAddress,
    ScriptAddress,
    SecretKey,
    StealthAddress,
    ExtPublicKey,
    ExtSecretKey,
}

impl Base58Type {
    pub const ALL: [Base58Type; 6] = [
        Base58Type::PubkeyAddress,
        Base58Type::ScriptAddress,
        Base58Type::SecretKey,
        Base58Type::StealthAddress,
        Base58Type::ExtPublicKey,
        Base58Type::ExtSecretKey,
    ];
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Base58Prefixes {
    pub pubkey_address: &'static [u8],
    pub script_address: &'static [u8],
    pub secret_key: &'static [u8],
    pub stealth_address: &'static [u8],
    pub ext_public_key: &'static [u8],
    pub ext_secret_key: &'static [u8],
}

impl Base58Prefixes {
    pub fn get(&self, kind: Base58Type) -> &'static [u8] {
        match kind {
            Base58Type::PubkeyAddress => self.pubkey_address,
            Base58Type::ScriptAddress => self.script_address,
            Base58Type::SecretKey => self.secret_key,
            Base58Type::StealthAddress => self.stealth_address,
            Base58Type::ExtPublicKey => self.ext_public_key,
            Base58Type::ExtSecretKey => self.ext_secret_key,
        }
    }
}

/// Inputs needed to rebuild the genesis block and the identity it must hash to.
#[derive(Clone, Debug)]
pub struct GenesisParams {
    pub timestamp: &'static str,
    pub coinbase_number: i64,
    pub tx_version: i32,
    pub tx_time: u32,
    pub version: i32,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
    pub hash: Hash256,
    pub merkle_root: Hash256,
}

#[derive(Clone, Debug)]
pub struct ConsensusParams {
    pub network: Network,
    pub hash_genesis_block: Hash256,
    pub pow_limit: Hash256,
    pub last_pow_height: i32,
    pub pos_start_height: i32,
}

#[derive(Clone, Debug)]
pub struct MasternodeParams {
    pub payment_start_height: i32,
    /// Minimum collateral per tier, by activation height.
    pub tiers: EraTable<TierTable>,
    /// Reward per tier, by activation height.
    pub rewards: EraTable<TierTable>,
}

#[derive(Clone, Debug)]
pub struct ChainParams {
    pub network: Network,
    pub consensus: ConsensusParams,
    pub genesis: GenesisParams,
    pub masternode: MasternodeParams,
    pub base58_prefixes: Base58Prefixes,
    pub message_start: [u8; 4],
    pub alert_pubkey: &'static str,
    pub default_port: u16,
    pub rpc_port: u16,
    pub dns_seeds: &'static [&'static str],
    pub fixed_seeds: &'static [&'static str],
    pub data_dir_suffix: Option<&'static str>,
    pub pool_max_transactions: u32,
    pub darksend_pool_dummy_address: &'static str,
}

impl ChainParams {
    pub fn accepts_magic(&self, magic: &[u8; 4]) -> bool {
        &self.message_start == magic
    }

    pub fn base58_prefix(&self, kind: Base58Type) -> &'static [u8] {
        self.base58_prefixes.get(kind)
    }

    /// Tier earned by `collateral` under the tier table active at `height`.
    pub fn tier_of(&self, collateral: Amount, height: i32) -> Option<u8> {
        crate::rewards::masternode_tier(collateral, height, &self.masternode)
    }

    /// Reward paid to a masternode of `tier` under the reward table active at `height`.
    pub fn reward_of(&self, tier: u8, height: i32) -> Option<Amount> {
        crate::rewards::masternode_reward(tier, height, &self.masternode)
    }
}

#[derive(Debug)]
pub enum HexError {
    InvalidLength,
    InvalidHex,
}

/// Parses a big-endian display hex string into little-endian hash bytes.
pub fn hash256_from_hex(input: &str) -> Result<Hash256, HexError> {
    let mut hex = input.trim();
    if let Some(stripped) = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")) {
        hex = stripped;
    }
    if !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(HexError::InvalidHex);
    }
    if hex.is_empty() || hex.len() > 64 {
        return Err(HexError::InvalidLength);
    }

    let padded = format!("{hex:0>64}");
    let mut bytes = [0u8; 32];
    for (i, byte_out) in bytes.iter_mut().enumerate() {
        let start = i * 2;
        *byte_out =
            u8::from_str_radix(&padded[start..start + 2], 16).map_err(|_| HexError::InvalidHex)?;
    }
    bytes.reverse();
    Ok(bytes)
}

/// Renders little-endian hash bytes in the usual big-endian display order.
pub fn hash256_to_hex(hash: &Hash256) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(64);
    for byte in hash.iter().rev() {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

static ACTIVE_PARAMS: OnceLock<ChainParams> = OnceLock::new();

/// Selects the process-wide parameters for `network`.
///
/// `verify` runs against the candidate parameters before they are installed;
/// callers pass the genesis check here so a mismatched ledger never becomes
/// active. Re-selecting the installed network returns it unchanged, selecting a
/// different one fails.
pub fn select<F>(network: Network, verify: F) -> Result<&'static ChainParams, ConfigurationError>
where
    F: FnOnce(&ChainParams) -> Result<(), ConfigurationError>,
{
    if let Some(current) = ACTIVE_PARAMS.get() {
        return ensure_network(current, network);
    }
    let candidate = chain_params(network);
    verify(&candidate)?;
    let installed = ACTIVE_PARAMS.get_or_init(move || candidate);
    ensure_network(installed, network)
}

/// The parameters installed by [`select`], if any.
pub fn active() -> Option<&'static ChainParams> {
    ACTIVE_PARAMS.get()
}

fn ensure_network(
    current: &'static ChainParams,
    requested: Network,
) -> Result<&'static ChainParams, ConfigurationError> {
    if current.network == requested {
        Ok(current)
    } else {
        Err(ConfigurationError::AlreadySelected {
            active: current.network,
            requested,
        })
    }
}

pub fn consensus_params(network: Network) -> ConsensusParams {
    match network {
        Network::Mainnet => mainnet_consensus_params(),
        Network::Testnet => testnet_consensus_params(),
    }
}

pub fn chain_params(network: Network) -> ChainParams {
    match network {
        Network::Mainnet => mainnet_chain_params(),
        Network::Testnet => testnet_chain_params(),
    }
}

const GENESIS_HASH: &str = "0000074d7678e79efb00bbdef7a4724403823110f28ef8263b879f39b8d372b7";
const GENESIS_MERKLE_ROOT: &str =
    "15f6d741e78cbb850dab1a4ba14d518ef324f0673b3507a9f31fa092187af33d";

fn genesis_params() -> GenesisParams {
    GenesisParams {
        timestamp: "New legend is born. 02 February 2018.",
        coinbase_number: 42,
        tx_version: 1,
        tx_time: 1_517_569_200,
        version: 1,
        time: 1_517_569_200,
        bits: 0x1e0f_ffff,
        nonce: 111_638,
        hash: hash256_from_hex(GENESIS_HASH).expect("genesis hash"),
        merkle_root: hash256_from_hex(GENESIS_MERKLE_ROOT).expect("genesis merkle root"),
    }
}

fn mainnet_consensus_params() -> ConsensusParams {
    ConsensusParams {
        network: Network::Mainnet,
        hash_genesis_block: hash256_from_hex(GENESIS_HASH).expect("mainnet genesis hash"),
        pow_limit: hash256_from_hex(
            "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        )
        .expect("mainnet pow limit"),
        last_pow_height: 20_000,
        pos_start_height: 1,
    }
}

fn testnet_consensus_params() -> ConsensusParams {
    ConsensusParams {
        network: Network::Testnet,
        hash_genesis_block: hash256_from_hex(GENESIS_HASH).expect("testnet genesis hash"),
        pow_limit: hash256_from_hex(
            "0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        )
        .expect("testnet pow limit"),
        last_pow_height: i32::MAX,
        pos_start_height: 1,
    }
}

fn tier_table(entries: &[(u8, i64)]) -> TierTable {
    entries
        .iter()
        .map(|(tier, coins)| (*tier, *coins * COIN))
        .collect()
}

fn masternode_params() -> MasternodeParams {
    MasternodeParams {
        payment_start_height: 50,
        tiers: EraTable::new([
            (0, tier_table(&[(1, 2_500)])),
            (
                TIERED_MASTERNODES_START_BLOCK,
                tier_table(&[(1, 2_500), (2, 5_000), (3, 10_000), (4, 20_000)]),
            ),
            (
                MASTERNODE_TIERS_REBASE_BLOCK,
                tier_table(&[(1, 10_000), (2, 20_000), (3, 30_000)]),
            ),
        ]),
        rewards: EraTable::new([
            (0, tier_table(&[(1, 25)])),
            (
                TIERED_MASTERNODES_START_BLOCK,
                tier_table(&[(1, 25), (2, 60), (3, 140), (4, 300)]),
            ),
            (
                MASTERNODE_TIERS_REBASE_BLOCK,
                tier_table(&[(1, 100), (2, 210), (3, 300)]),
            ),
            (
                MASTERNODE_REWARDS_REDUCTION_BLOCK,
                tier_table(&[(1, 50), (2, 105), (3, 150)]),
            ),
        ]),
    }
}

const ALERT_PUBKEY: &str = "0323740193a8560083f057e3bf354ce8b5739d4242cd9992d1fb95ebe9d0c626cd";

const MAINNET_DNS_SEEDS: [&str; 10] = [
    "dns0.cropcoin.net",
    "dns1.cropcoin.net",
    "dns2.cropcoin.net",
    "dns3.cropcoin.net",
    "dns4.cropcoin.net",
    "dns5.cropcoin.net",
    "dns6.cropcoin.net",
    "dns7.cropcoin.net",
    "dns8.cropcoin.net",
    "dns9.cropcoin.net",
];

const MAINNET_FIXED_SEEDS: [&str; 0] = [];
const TESTNET_DNS_SEEDS: [&str; 0] = [];
const TESTNET_FIXED_SEEDS: [&str; 0] = [];

fn mainnet_chain_params() -> ChainParams {
    ChainParams {
        network: Network::Mainnet,
        consensus: mainnet_consensus_params(),
        genesis: genesis_params(),
        masternode: masternode_params(),
        base58_prefixes: Base58Prefixes {
            pubkey_address: &[87],
            script_address: &[85],
            secret_key: &[153],
            stealth_address: &[40],
            ext_public_key: &[0x04, 0x88, 0xB2, 0x1E],
            ext_secret_key: &[0x04, 0x88, 0xAD, 0xE4],
        },
        message_start: [0x11, 0xc3, 0xb1, 0xde],
        alert_pubkey: ALERT_PUBKEY,
        default_port: MAINNET_DEFAULT_PORT,
        rpc_port: 17_721,
        dns_seeds: &MAINNET_DNS_SEEDS,
        fixed_seeds: &MAINNET_FIXED_SEEDS,
        data_dir_suffix: None,
        pool_max_transactions: 3,
        darksend_pool_dummy_address: "c25gtaAQYBUNjYrxzZqNdyADSmwPPpWoLC",
    }
}

fn testnet_chain_params() -> ChainParams {
    ChainParams {
        network: Network::Testnet,
        consensus: testnet_consensus_params(),
        genesis: genesis_params(),
        masternode: masternode_params(),
        base58_prefixes: Base58Prefixes {
            pubkey_address: &[215],
            script_address: &[196],
            secret_key: &[239],
            stealth_address: &[40],
            ext_public_key: &[0x04, 0x35, 0x87, 0xCF],
            ext_secret_key: &[0x04, 0x35, 0x83, 0x94],
        },
        message_start: [0x11, 0xc3, 0xb1, 0xdf],
        alert_pubkey: ALERT_PUBKEY,
        default_port: 27_720,
        rpc_port: 27_721,
        dns_seeds: &TESTNET_DNS_SEEDS,
        fixed_seeds: &TESTNET_FIXED_SEEDS,
        data_dir_suffix: Some("testnet"),
        pool_max_transactions: 3,
        darksend_pool_dummy_address: "c25gtaAQYBUNjYrxzZqNdyADSmwPPpWoLC",
    }
}
