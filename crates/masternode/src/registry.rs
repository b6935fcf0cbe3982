//! In-memory masternode table.
//!
//! Every mutation and snapshot happens under a single mutex. Chain queries
//! (collateral lookups, confirmations) are made before or after taking the lock,
//! never while holding it, so a slow oracle cannot stall gossip handling.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use cropd_consensus::constants::{
    MAINNET_DEFAULT_PORT, MASTERNODE_EXPIRATION_SECONDS, MASTERNODE_MAX_FUTURE_SECONDS,
    MASTERNODE_MIN_CONFIRMATIONS, MASTERNODE_MIN_DSEEP_SECONDS, MASTERNODE_REMOVAL_SECONDS,
    MIN_MASTERNODE_PROTOCOL_VERSION,
};
use cropd_consensus::{ChainParams, Network};
use cropd_log::{log_debug, log_info};
use cropd_primitives::OutPoint;
use cropd_script::standard::pays_to_pubkey;

use crate::announce::{LivenessPing, MasternodeAnnouncement};
use crate::error::RegistryError;
use crate::oracle::{ChainView, CollateralSource};
use crate::record::{CollateralAge, MasternodeRecord, MasternodeState};

type RecordTable = BTreeMap<OutPoint, MasternodeRecord>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Why a ping was accepted or quietly dropped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PingOutcome {
    Accepted,
    /// Accepted, and the record moved from Expired back to Enabled.
    Revived,
    UnknownMasternode,
    Inactive(MasternodeState),
    TooOld,
    FromFuture,
    NotNewer,
}

impl PingOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, PingOutcome::Accepted | PingOutcome::Revived)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: Vec<OutPoint>,
    /// Dropped records, each tagged `Removed`.
    pub removed: Vec<MasternodeRecord>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.removed.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub record: MasternodeRecord,
    /// Collateral confirmations at the snapshot height; zero when unknown.
    pub collateral_age: i32,
}

/// Enabled records as of one lock acquisition, ordered by collateral.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub height: i32,
    pub entries: Vec<SnapshotEntry>,
}

impl RegistrySnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, collateral: &OutPoint) -> Option<&SnapshotEntry> {
        self.entries
            .iter()
            .find(|entry| &entry.record.collateral == collateral)
    }

    /// The longest-confirmed masternode of `tier`; equal ages go to the smaller collateral.
    pub fn oldest_in_tier(&self, tier: u8) -> Option<&SnapshotEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.record.tier == tier)
            .max_by(|a, b| {
                a.collateral_age
                    .cmp(&b.collateral_age)
                    .then_with(|| b.record.collateral.cmp(&a.record.collateral))
            })
    }
}

pub struct MasternodeRegistry {
    params: ChainParams,
    records: Mutex<RecordTable>,
}

impl MasternodeRegistry {
    pub fn new(params: ChainParams) -> Self {
        Self {
            params,
            records: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Admits a new masternode or replaces an older announcement for the same collateral.
    pub fn upsert<C: ChainView + ?Sized>(
        &self,
        announcement: MasternodeAnnouncement,
        now: i64,
        chain: &C,
    ) -> Result<UpsertOutcome, RegistryError> {
        let collateral = announcement.collateral;
        let address = announcement.address;
        let result = self.try_upsert(announcement, now, chain);
        match &result {
            Ok(UpsertOutcome::Inserted) => {
                log_info!("Masternode {collateral} registered at {address}");
            }
            Ok(UpsertOutcome::Updated) => {
                log_info!("Masternode {collateral} re-announced at {address}");
            }
            Err(err) => {
                log_debug!("Rejected masternode announcement {collateral}: {err}");
            }
        }
        result
    }

    fn try_upsert<C: ChainView + ?Sized>(
        &self,
        announcement: MasternodeAnnouncement,
        now: i64,
        chain: &C,
    ) -> Result<UpsertOutcome, RegistryError> {
        self.check_announcement_fields(&announcement, now)?;
        announcement.verify()?;
        {
            let records = self.lock()?;
            check_against_stored(records.get(&announcement.collateral), &announcement)?;
        }

        let collateral = announcement.collateral;
        let output = chain
            .collateral_output(&collateral)
            .ok_or(RegistryError::UnknownCollateral(collateral))?;
        if !pays_to_pubkey(&output.script_pubkey, &announcement.owner_pubkey) {
            return Err(RegistryError::InvalidSignature(
                "collateral is not paid to the announcing key".to_string(),
            ));
        }
        let confirmations = chain.confirmations(&collateral).unwrap_or(0);
        if confirmations < MASTERNODE_MIN_CONFIRMATIONS {
            return Err(RegistryError::InsufficientConfirmations {
                have: confirmations,
                need: MASTERNODE_MIN_CONFIRMATIONS,
            });
        }
        let best_height = chain.best_height();
        let tier = self.params.tier_of(output.value, best_height).ok_or(
            RegistryError::CollateralTooSmall {
                value: output.value,
                height: best_height,
            },
        )?;

        let mut records = self.lock()?;
        let previous = records.get(&collateral);
        // Another announcement may have landed while the chain was queried.
        check_against_stored(previous, &announcement)?;
        let (outcome, last_paid_height, last_paid_time, validation_error_count) = match previous {
            Some(record) => (
                UpsertOutcome::Updated,
                record.last_paid_height,
                record.last_paid_time,
                record.validation_error_count,
            ),
            None => (UpsertOutcome::Inserted, 0, 0, 0),
        };
        let record = MasternodeRecord {
            collateral,
            address: announcement.address,
            is_port_open: true,
            owner_pubkey: announcement.owner_pubkey,
            operator_pubkey: announcement.operator_pubkey,
            signature: announcement.signature,
            state: MasternodeState::Enabled,
            sig_time: announcement.sig_time,
            last_ping: now,
            last_seen: now,
            collateral_age: Some(CollateralAge::new(confirmations, best_height)),
            reward_address: announcement.reward_address,
            reward_share_percent: announcement.reward_share_percent,
            tier,
            collateral_value: output.value,
            protocol_version: announcement.protocol_version,
            last_paid_height,
            last_paid_time,
            validation_error_count,
        };
        records.insert(collateral, record);
        Ok(outcome)
    }

    fn check_announcement_fields(
        &self,
        announcement: &MasternodeAnnouncement,
        now: i64,
    ) -> Result<(), RegistryError> {
        if announcement.protocol_version < MIN_MASTERNODE_PROTOCOL_VERSION {
            return Err(RegistryError::ProtocolTooOld {
                version: announcement.protocol_version,
                minimum: MIN_MASTERNODE_PROTOCOL_VERSION,
            });
        }
        if announcement.sig_time > now.saturating_add(MASTERNODE_MAX_FUTURE_SECONDS) {
            return Err(RegistryError::FutureTimestamp {
                sig_time: announcement.sig_time,
                now,
            });
        }
        if announcement.reward_share_percent > 100 {
            return Err(RegistryError::InvalidRewardShare(
                announcement.reward_share_percent,
            ));
        }
        let port = announcement.address.port();
        let port_ok = match self.params.network {
            Network::Mainnet => port == self.params.default_port,
            Network::Testnet => port != MAINNET_DEFAULT_PORT,
        };
        if !port_ok {
            return Err(RegistryError::InvalidPort {
                port,
                network: self.params.network,
            });
        }
        Ok(())
    }

    /// Applies a signed liveness ping. Pings that are merely late, early or for
    /// an unknown masternode come back as an outcome; a forged signature is an error.
    pub fn record_liveness_ping(
        &self,
        ping: &LivenessPing,
        now: i64,
    ) -> Result<PingOutcome, RegistryError> {
        if ping.timestamp > now {
            return Ok(PingOutcome::FromFuture);
        }
        if ping.timestamp < now.saturating_sub(MASTERNODE_MIN_DSEEP_SECONDS) {
            return Ok(PingOutcome::TooOld);
        }

        let operator_pubkey = {
            let records = self.lock()?;
            match ping_precheck(records.get(&ping.collateral), ping) {
                Ok(record) => record.operator_pubkey.clone(),
                Err(outcome) => return Ok(outcome),
            }
        };
        if let Err(err) = ping.verify(&operator_pubkey) {
            log_debug!("Bad liveness ping signature for {}: {err}", ping.collateral);
            return Err(err.into());
        }

        let mut records = self.lock()?;
        if let Err(outcome) = ping_precheck(records.get(&ping.collateral), ping) {
            return Ok(outcome);
        }
        let Some(record) = records.get_mut(&ping.collateral) else {
            return Ok(PingOutcome::UnknownMasternode);
        };
        if record.operator_pubkey != operator_pubkey {
            ping.verify(&record.operator_pubkey)?;
        }
        let revived = record.state == MasternodeState::Expired;
        record.last_ping = ping.timestamp;
        record.last_seen = now;
        record.state = MasternodeState::Enabled;
        if revived {
            log_info!("Masternode {} revived by liveness ping", ping.collateral);
            Ok(PingOutcome::Revived)
        } else {
            Ok(PingOutcome::Accepted)
        }
    }

    /// Expires silent masternodes and drops long-silent or spent ones. Running
    /// it again with the same `now` changes nothing.
    pub fn sweep_expired(&self, now: i64) -> Result<SweepReport, RegistryError> {
        let mut report = SweepReport::default();
        {
            let mut records = self.lock()?;
            records.retain(|collateral, record| {
                let idle = now.saturating_sub(record.last_seen);
                if record.state == MasternodeState::CollateralSpent
                    || idle > MASTERNODE_REMOVAL_SECONDS
                {
                    let mut removed = record.clone();
                    removed.state = MasternodeState::Removed;
                    report.removed.push(removed);
                    return false;
                }
                if record.state == MasternodeState::Enabled && idle > MASTERNODE_EXPIRATION_SECONDS
                {
                    record.state = MasternodeState::Expired;
                    report.expired.push(*collateral);
                }
                true
            });
        }

        for collateral in &report.expired {
            log_info!("Masternode {collateral} expired");
        }
        for record in &report.removed {
            log_info!("Masternode {} removed", record.collateral);
        }
        Ok(report)
    }

    /// Returns whether a registered masternode changed state.
    pub fn mark_collateral_spent(&self, collateral: &OutPoint) -> Result<bool, RegistryError> {
        let mut records = self.lock()?;
        let Some(record) = records.get_mut(collateral) else {
            return Ok(false);
        };
        if record.state == MasternodeState::CollateralSpent {
            return Ok(false);
        }
        record.state = MasternodeState::CollateralSpent;
        log_info!("Masternode {collateral} collateral spent");
        Ok(true)
    }

    /// Suspends an Enabled masternode until it re-announces.
    pub fn mark_validation_error(&self, collateral: &OutPoint) -> Result<bool, RegistryError> {
        let mut records = self.lock()?;
        let Some(record) = records.get_mut(collateral) else {
            return Ok(false);
        };
        if record.state != MasternodeState::Enabled {
            return Ok(false);
        }
        record.state = MasternodeState::ValidationError;
        record.validation_error_count = record.validation_error_count.saturating_add(1);
        log_info!(
            "Masternode {collateral} failed validation ({} total)",
            record.validation_error_count
        );
        Ok(true)
    }

    pub fn set_port_status(&self, collateral: &OutPoint, open: bool) -> Result<bool, RegistryError> {
        let mut records = self.lock()?;
        let Some(record) = records.get_mut(collateral) else {
            return Ok(false);
        };
        if record.is_port_open != open {
            log_debug!("Masternode {collateral} port open: {open}");
        }
        record.is_port_open = open;
        Ok(true)
    }

    /// Notes a connected block's payee so the cooldown applies to it.
    pub fn record_payment(
        &self,
        collateral: &OutPoint,
        height: i32,
        time: i64,
    ) -> Result<bool, RegistryError> {
        let mut records = self.lock()?;
        let Some(record) = records.get_mut(collateral) else {
            return Ok(false);
        };
        if height > record.last_paid_height {
            record.last_paid_height = height;
            record.last_paid_time = time;
        }
        Ok(true)
    }

    pub fn get(&self, collateral: &OutPoint) -> Result<Option<MasternodeRecord>, RegistryError> {
        Ok(self.lock()?.get(collateral).cloned())
    }

    pub fn len(&self) -> Result<usize, RegistryError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.lock()?.is_empty())
    }

    pub fn count_enabled(&self) -> Result<usize, RegistryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|record| record.is_enabled())
            .count())
    }

    /// Enabled masternodes per tier, with tiers resolved under the table active at `height`.
    pub fn count_by_tier(&self, height: i32) -> Result<BTreeMap<u8, usize>, RegistryError> {
        let records = self.lock()?;
        let mut counts = BTreeMap::new();
        for record in records.values().filter(|record| record.is_enabled()) {
            if let Some(tier) = self.params.tier_of(record.collateral_value, height) {
                *counts.entry(tier).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    /// Confirmations of a registered masternode's collateral at the chain's best height.
    pub fn collateral_age<C: ChainView + ?Sized>(
        &self,
        collateral: &OutPoint,
        chain: &C,
    ) -> Result<Option<i32>, RegistryError> {
        let height = chain.best_height();
        {
            let records = self.lock()?;
            let Some(record) = records.get(collateral) else {
                return Ok(None);
            };
            if let Some(age) = record.collateral_age {
                return Ok(Some(age.at(height)));
            }
        }

        let Some(confirmations) = chain.confirmations(collateral) else {
            return Ok(None);
        };
        let age = CollateralAge::new(confirmations, height);
        let mut records = self.lock()?;
        if let Some(record) = records.get_mut(collateral) {
            let cached = *record.collateral_age.get_or_insert(age);
            return Ok(Some(cached.at(height)));
        }
        Ok(Some(age.at(height)))
    }

    /// Enabled records with collateral ages resolved at the chain's best height.
    pub fn snapshot<C: ChainView + ?Sized>(
        &self,
        chain: &C,
    ) -> Result<RegistrySnapshot, RegistryError> {
        let height = chain.best_height();
        let missing: Vec<OutPoint> = self
            .lock()?
            .values()
            .filter(|record| {
                record.state == MasternodeState::Enabled && record.collateral_age.is_none()
            })
            .map(|record| record.collateral)
            .collect();
        let fetched = fetch_ages(chain, missing, height);

        let mut records = self.lock()?;
        for (collateral, age) in fetched {
            if let Some(record) = records.get_mut(&collateral) {
                record.collateral_age.get_or_insert(age);
            }
        }
        let entries = records
            .values()
            .filter(|record| record.state == MasternodeState::Enabled)
            .map(|record| SnapshotEntry {
                collateral_age: record.collateral_age.map_or(0, |age| age.at(height)),
                record: record.clone(),
            })
            .collect();
        Ok(RegistrySnapshot { height, entries })
    }

    fn lock(&self) -> Result<MutexGuard<'_, RecordTable>, RegistryError> {
        self.records.lock().map_err(|_| RegistryError::LockPoisoned)
    }
}

fn fetch_ages<C: CollateralSource + ?Sized>(
    chain: &C,
    collaterals: Vec<OutPoint>,
    height: i32,
) -> Vec<(OutPoint, CollateralAge)> {
    collaterals
        .into_iter()
        .filter_map(|collateral| {
            chain
                .confirmations(&collateral)
                .map(|confirmations| (collateral, CollateralAge::new(confirmations, height)))
        })
        .collect()
}

fn check_against_stored(
    stored: Option<&MasternodeRecord>,
    announcement: &MasternodeAnnouncement,
) -> Result<(), RegistryError> {
    let Some(stored) = stored else {
        return Ok(());
    };
    if stored.state == MasternodeState::CollateralSpent {
        return Err(RegistryError::CollateralSpent(stored.collateral));
    }
    if announcement.sig_time <= stored.sig_time {
        return Err(RegistryError::StaleAnnouncement {
            stored: stored.sig_time,
            received: announcement.sig_time,
        });
    }
    Ok(())
}

fn ping_precheck<'a>(
    stored: Option<&'a MasternodeRecord>,
    ping: &LivenessPing,
) -> Result<&'a MasternodeRecord, PingOutcome> {
    let Some(record) = stored else {
        return Err(PingOutcome::UnknownMasternode);
    };
    if !matches!(
        record.state,
        MasternodeState::Enabled | MasternodeState::Expired
    ) {
        return Err(PingOutcome::Inactive(record.state));
    }
    if ping.timestamp <= record.last_ping {
        return Err(PingOutcome::NotNewer);
    }
    Ok(record)
}
