//! Masternode bookkeeping as seen from block processing.

use std::collections::BTreeMap;

use cropd_consensus::ChainParams;
use cropd_masternode::{
    ChainView, ElectionConfig, ElectionError, ElectionResult, LivenessPing,
    MasternodeAnnouncement, MasternodeRegistry, NetworkClock, PaymentElection, PingOutcome,
    RegistryError, SweepReport, UpsertOutcome,
};
use cropd_primitives::OutPoint;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Election(#[from] ElectionError),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Election(err) if err.is_retryable())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryStatus {
    pub total: usize,
    pub enabled: usize,
    pub enabled_by_tier: BTreeMap<u8, usize>,
}

pub struct MasternodeService {
    registry: MasternodeRegistry,
    election: PaymentElection,
}

impl MasternodeService {
    pub fn new(params: ChainParams, election: ElectionConfig) -> Self {
        Self {
            registry: MasternodeRegistry::new(params),
            election: PaymentElection::new(election),
        }
    }

    pub fn registry(&self) -> &MasternodeRegistry {
        &self.registry
    }

    pub fn election(&self) -> &PaymentElection {
        &self.election
    }

    /// The masternode owed the payout of the block at `height`.
    pub fn block_payee<C: ChainView + ?Sized>(
        &self,
        height: i32,
        chain: &C,
    ) -> Result<ElectionResult, ServiceError> {
        let snapshot = self.registry.snapshot(chain)?;
        let result =
            self.election
                .select_winner(&snapshot, height, self.registry.params(), chain)?;
        log_debug!(
            "Block {height} payee {} (tier {}, {} candidates)",
            result.winner,
            result.tier,
            snapshot.len()
        );
        Ok(result)
    }

    /// Records the payee of a connected block so its cooldown starts.
    pub fn block_connected(
        &self,
        height: i32,
        time: i64,
        payee: &OutPoint,
    ) -> Result<(), ServiceError> {
        if !self.registry.record_payment(payee, height, time)? {
            log_debug!("Block {height} paid unregistered masternode {payee}");
        }
        Ok(())
    }

    /// Admits a gossiped announcement as of the network-adjusted time.
    pub fn accept_announcement<C: ChainView + ?Sized>(
        &self,
        announcement: MasternodeAnnouncement,
        chain: &C,
    ) -> Result<UpsertOutcome, ServiceError> {
        Ok(self
            .registry
            .upsert(announcement, chain.adjusted_time(), chain)?)
    }

    pub fn accept_ping<T: NetworkClock + ?Sized>(
        &self,
        ping: &LivenessPing,
        clock: &T,
    ) -> Result<PingOutcome, ServiceError> {
        Ok(self
            .registry
            .record_liveness_ping(ping, clock.adjusted_time())?)
    }

    pub fn sweep<T: NetworkClock + ?Sized>(&self, clock: &T) -> Result<SweepReport, ServiceError> {
        let report = self.registry.sweep_expired(clock.adjusted_time())?;
        if !report.is_empty() {
            log_info!(
                "Masternode sweep: {} expired, {} removed",
                report.expired.len(),
                report.removed.len()
            );
        }
        Ok(report)
    }

    pub fn status(&self, height: i32) -> Result<RegistryStatus, ServiceError> {
        Ok(RegistryStatus {
            total: self.registry.len()?,
            enabled: self.registry.count_enabled()?,
            enabled_by_tier: self.registry.count_by_tier(height)?,
        })
    }
}
