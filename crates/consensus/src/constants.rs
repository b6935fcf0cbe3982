//! Consensus-wide constants shared by the masternode subsystem.

/// Minimum confirmations a collateral output needs before its masternode is accepted.
pub const MASTERNODE_MIN_CONFIRMATIONS: i32 = 15;
/// Oldest liveness ping (relative to adjusted time) that is still accepted.
pub const MASTERNODE_MIN_DSEEP_SECONDS: i64 = 30 * 60;
/// Minimum spacing between relayed announcements for the same collateral.
pub const MASTERNODE_MIN_DSEE_SECONDS: i64 = 5 * 60;
/// How often a running masternode is expected to ping.
pub const MASTERNODE_PING_SECONDS: i64 = 60;
/// A masternode not seen for this long is marked expired.
pub const MASTERNODE_EXPIRATION_SECONDS: i64 = 65 * 60;
/// A masternode not seen for this long is dropped from the registry.
pub const MASTERNODE_REMOVAL_SECONDS: i64 = 70 * 60;
/// Announcements signed further than this into the future are rejected.
pub const MASTERNODE_MAX_FUTURE_SECONDS: i64 = 60 * 60;

/// First block of the multi-tier collateral schedule.
pub const TIERED_MASTERNODES_START_BLOCK: i32 = 59_000;
/// Collateral tiers were re-based at this height.
pub const MASTERNODE_TIERS_REBASE_BLOCK: i32 = 157_000;
/// Tier rewards were halved at this height.
pub const MASTERNODE_REWARDS_REDUCTION_BLOCK: i32 = 242_600;

/// Current network protocol version.
pub const PROTOCOL_VERSION: i32 = 60_021;
/// Masternodes announcing an older protocol are not admitted.
pub const MIN_MASTERNODE_PROTOCOL_VERSION: i32 = 60_020;

/// Message magic used for `SignMessage`/`VerifyMessage` style signatures.
pub const SIGNED_MESSAGE_MAGIC: &str = "Cropcoin Signed Message:\n";

/// Masternodes on mainnet must listen here; testnet masternodes must not.
pub const MAINNET_DEFAULT_PORT: u16 = 17_720;
