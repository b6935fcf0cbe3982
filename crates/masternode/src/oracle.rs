//! Chain queries the registry and election consume but do not implement.

use cropd_consensus::Hash256;
use cropd_primitives::{OutPoint, TxOut};

pub trait BlockHeightOracle: Send + Sync {
    /// Hash of the active-chain block at `height`, if known.
    fn block_hash(&self, height: i32) -> Option<Hash256>;
    fn best_height(&self) -> i32;
}

/// Source of the `now` used for liveness: wall clock corrected by the peer-median offset.
pub trait NetworkClock: Send + Sync {
    /// Network-adjusted unix time in seconds.
    fn adjusted_time(&self) -> i64;
}

pub trait CollateralSource: Send + Sync {
    /// The unspent output at `outpoint`, or `None` if it is unknown or spent.
    fn collateral_output(&self, outpoint: &OutPoint) -> Option<TxOut>;
    /// Confirmations of the transaction holding `outpoint`, as of the best block.
    fn confirmations(&self, outpoint: &OutPoint) -> Option<i32>;
}

/// Everything the registry asks of the chain.
pub trait ChainView: BlockHeightOracle + CollateralSource + NetworkClock {}

impl<T: BlockHeightOracle + CollateralSource + NetworkClock + ?Sized> ChainView for T {}
