//! Network-adjusted time: the local clock plus the median offset reported by peers.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use cropd_masternode::NetworkClock;

/// Samples kept; later peers do not move the offset.
const MAX_SAMPLES: usize = 200;
/// Peers needed before any correction is applied.
const MIN_SAMPLES: usize = 5;
/// Larger median offsets are treated as a broken local clock and ignored.
pub const MAX_ADJUSTMENT_SECS: i64 = 70 * 60;

pub fn unix_now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

pub struct PeerTimeClock {
    offset: AtomicI64,
    samples: Mutex<Vec<i64>>,
}

impl Default for PeerTimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerTimeClock {
    pub fn new() -> Self {
        Self {
            offset: AtomicI64::new(0),
            samples: Mutex::new(Vec::new()),
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset.load(Ordering::Relaxed)
    }

    /// Records `peer_time − local_time` from a version handshake and returns the offset now in use.
    pub fn add_sample(&self, offset_secs: i64) -> i64 {
        let Ok(mut samples) = self.samples.lock() else {
            return self.offset();
        };
        if samples.len() >= MAX_SAMPLES {
            return self.offset();
        }
        samples.push(offset_secs);
        // Even counts keep the previous offset, so one late peer cannot flip it.
        if samples.len() < MIN_SAMPLES || samples.len() % 2 == 0 {
            return self.offset();
        }

        let mut sorted = samples.clone();
        sorted.sort_unstable();
        let median = sorted[sorted.len() / 2];
        let offset = if median.abs() <= MAX_ADJUSTMENT_SECS {
            median
        } else {
            log_warn!(
                "Peer time median {median}s exceeds {MAX_ADJUSTMENT_SECS}s; check the system clock"
            );
            0
        };
        if offset != self.offset() {
            log_info!("Network time offset now {offset}s ({} samples)", sorted.len());
        }
        self.offset.store(offset, Ordering::Relaxed);
        offset
    }
}

impl NetworkClock for PeerTimeClock {
    fn adjusted_time(&self) -> i64 {
        unix_now_secs() + self.offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_waits_for_five_peers_then_follows_odd_medians() {
        let clock = PeerTimeClock::new();
        for sample in [100, 120, -20, 110] {
            assert_eq!(clock.add_sample(sample), 0);
        }
        assert_eq!(clock.add_sample(90), 100);
        assert_eq!(clock.add_sample(500), 100);
        assert_eq!(clock.add_sample(600), 110);

        let now = unix_now_secs();
        let adjusted = clock.adjusted_time();
        assert!((adjusted - now - 110).abs() <= 1);
    }

    #[test]
    fn implausible_median_leaves_clock_unadjusted() {
        let clock = PeerTimeClock::new();
        for _ in 0..5 {
            clock.add_sample(MAX_ADJUSTMENT_SECS + 1);
        }
        assert_eq!(clock.offset(), 0);
    }
}
