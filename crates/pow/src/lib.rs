//! NeoScrypt block hashing, compact targets and proof-of-work checks.

pub mod difficulty;
pub mod genesis;
pub mod neoscrypt;
pub mod validation;

pub use genesis::verify_genesis;
pub use neoscrypt::neoscrypt;
pub use validation::{block_hash, check_proof_of_work, PowError};
