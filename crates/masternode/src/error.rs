use cropd_consensus::money::Amount;
use cropd_consensus::Network;
use cropd_primitives::OutPoint;
use cropd_script::message::SignedMessageError;
use thiserror::Error;

/// Why an announcement or registry mutation was refused. Rejections never
/// disturb the stored record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("stale announcement: sig_time {received} is not newer than {stored}")]
    StaleAnnouncement { stored: i64, received: i64 },
    #[error("insufficient confirmations: have {have}, need {need}")]
    InsufficientConfirmations { have: i32, need: i32 },
    #[error("collateral {0} is unknown or already spent")]
    UnknownCollateral(OutPoint),
    #[error("collateral {0} has been spent")]
    CollateralSpent(OutPoint),
    #[error("collateral value {value} matches no tier at height {height}")]
    CollateralTooSmall { value: Amount, height: i32 },
    #[error("sig_time {sig_time} is too far ahead of adjusted time {now}")]
    FutureTimestamp { sig_time: i64, now: i64 },
    #[error("reward share {0}% exceeds 100%")]
    InvalidRewardShare(u8),
    #[error("port {port} is not allowed on {network}")]
    InvalidPort { port: u16, network: Network },
    #[error("protocol version {version} is older than {minimum}")]
    ProtocolTooOld { version: i32, minimum: i32 },
    #[error("masternode {0} is not registered")]
    UnknownMasternode(OutPoint),
    #[error("registry lock poisoned")]
    LockPoisoned,
}

impl From<SignedMessageError> for RegistryError {
    fn from(err: SignedMessageError) -> Self {
        RegistryError::InvalidSignature(err.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ElectionError {
    #[error("no eligible masternode for height {target_height}")]
    NoEligibleMasternode { target_height: i32 },
    #[error("block hash at height {height} unavailable")]
    OracleUnavailable { height: i32 },
    #[error("masternode payments start at {start_height}, requested {target_height}")]
    PaymentsNotStarted { target_height: i32, start_height: i32 },
    #[error("no reward for tier {tier} at height {height}")]
    UnknownReward { tier: u8, height: i32 },
}

impl ElectionError {
    /// The same request may succeed once the chain catches up.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ElectionError::OracleUnavailable { .. })
    }
}
