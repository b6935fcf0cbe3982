//! Masternode registry and deterministic payment election.

pub mod announce;
pub mod election;
pub mod error;
pub mod oracle;
pub mod record;
pub mod registry;

pub use announce::{LivenessPing, MasternodeAnnouncement};
pub use election::{
    DistanceScore, ElectionConfig, ElectionResult, PaymentElection, Payout, RankedCandidate,
    ScoreFunction,
};
pub use error::{ElectionError, RegistryError};
pub use oracle::{BlockHeightOracle, ChainView, CollateralSource, NetworkClock};
pub use record::{CollateralAge, MasternodeRecord, MasternodeState};
pub use registry::{
    MasternodeRegistry, PingOutcome, RegistrySnapshot, SnapshotEntry, SweepReport, UpsertOutcome,
};
