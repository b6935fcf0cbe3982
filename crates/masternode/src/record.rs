//! Registry-owned masternode state.

use std::fmt;
use std::net::SocketAddr;

use cropd_consensus::money::Amount;
use cropd_primitives::OutPoint;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MasternodeState {
    Enabled,
    Expired,
    CollateralSpent,
    Removed,
    ValidationError,
}

impl MasternodeState {
    /// Status string reported to operators.
    pub fn as_str(self) -> &'static str {
        match self {
            MasternodeState::Enabled => "ENABLED",
            MasternodeState::Expired => "EXPIRED",
            MasternodeState::CollateralSpent => "VIN_SPENT",
            MasternodeState::Removed => "REMOVE",
            MasternodeState::ValidationError => "POS_ERROR",
        }
    }

    /// Terminal states are never revived by an announcement or ping.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MasternodeState::CollateralSpent | MasternodeState::Removed
        )
    }
}

impl fmt::Display for MasternodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmations observed at a known best height. Later heights advance the
/// count without asking the chain again.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CollateralAge {
    pub confirmations: i32,
    pub observed_at_height: i32,
}

impl CollateralAge {
    pub fn new(confirmations: i32, observed_at_height: i32) -> Self {
        Self {
            confirmations,
            observed_at_height,
        }
    }

    pub fn at(&self, height: i32) -> i32 {
        let advanced = self
            .confirmations
            .saturating_add(height.saturating_sub(self.observed_at_height));
        advanced.max(0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasternodeRecord {
    pub collateral: OutPoint,
    pub address: SocketAddr,
    pub is_port_open: bool,
    pub owner_pubkey: Vec<u8>,
    pub operator_pubkey: Vec<u8>,
    pub signature: Vec<u8>,
    pub state: MasternodeState,
    pub sig_time: i64,
    pub last_ping: i64,
    pub last_seen: i64,
    pub collateral_age: Option<CollateralAge>,
    pub reward_address: Option<Vec<u8>>,
    pub reward_share_percent: u8,
    pub tier: u8,
    pub collateral_value: Amount,
    pub protocol_version: i32,
    pub last_paid_height: i32,
    pub last_paid_time: i64,
    pub validation_error_count: u32,
}

impl MasternodeRecord {
    /// Eligible for payment and relay: reachable and in the Enabled state.
    pub fn is_enabled(&self) -> bool {
        self.is_port_open && self.state == MasternodeState::Enabled
    }

    pub fn status(&self) -> &'static str {
        self.state.as_str()
    }

    /// Seconds since the last recorded payment, or since the announcement when
    /// the masternode has never been paid.
    pub fn seconds_since_payment(&self, now: i64) -> i64 {
        let since = if self.last_paid_time > 0 {
            self.last_paid_time
        } else {
            self.sig_time
        };
        now.saturating_sub(since).max(0)
    }

    pub fn updated_within(&self, seconds: i64, now: i64) -> bool {
        now.saturating_sub(self.last_seen) < seconds
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_record(index: u32) -> MasternodeRecord {
        MasternodeRecord {
            collateral: OutPoint::new([index as u8; 32], index),
            address: "203.0.113.7:17720".parse().expect("addr"),
            is_port_open: true,
            owner_pubkey: vec![2; 33],
            operator_pubkey: vec![3; 33],
            signature: Vec::new(),
            state: MasternodeState::Enabled,
            sig_time: 1_700_000_000,
            last_ping: 1_700_000_000,
            last_seen: 1_700_000_000,
            collateral_age: None,
            reward_address: None,
            reward_share_percent: 0,
            tier: 1,
            collateral_value: 0,
            protocol_version: 60_021,
            last_paid_height: 0,
            last_paid_time: 0,
            validation_error_count: 0,
        }
    }

    #[test]
    fn collateral_age_advances_with_height() {
        let age = CollateralAge::new(20, 1_000);
        assert_eq!(age.at(1_000), 20);
        assert_eq!(age.at(1_005), 25);
        // Reorg below the observation height.
        assert_eq!(age.at(990), 10);
        assert_eq!(age.at(900), 0);
    }

    #[test]
    fn enabled_requires_open_port() {
        let mut record = sample_record(1);
        assert!(record.is_enabled());
        record.is_port_open = false;
        assert!(!record.is_enabled());
        record.is_port_open = true;
        record.state = MasternodeState::Expired;
        assert!(!record.is_enabled());
        assert_eq!(record.status(), "EXPIRED");
    }

    #[test]
    fn payment_and_update_windows() {
        let mut record = sample_record(1);
        assert_eq!(record.seconds_since_payment(1_700_000_600), 600);
        record.last_paid_time = 1_700_000_500;
        assert_eq!(record.seconds_since_payment(1_700_000_600), 100);

        assert!(record.updated_within(60, 1_700_000_059));
        assert!(!record.updated_within(60, 1_700_000_060));
    }
}
