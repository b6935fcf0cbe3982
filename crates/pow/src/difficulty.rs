//! Compact (`nBits`) target encoding.
//!
//! The compact form is a one-byte length followed by a three-byte mantissa whose
//! top bit is a sign flag. Targets are 256-bit little-endian numbers.

use cropd_consensus::Hash256;
use primitive_types::U256;
use thiserror::Error;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompactError {
    #[error("compact target has negative sign bit")]
    Negative,
    #[error("compact target overflows 256-bit range")]
    Overflow,
}

pub fn compact_to_u256(bits: u32) -> Result<U256, CompactError> {
    let exponent = bits >> 24;
    let mantissa = bits & MANTISSA_MASK;
    if mantissa == 0 {
        return Ok(U256::zero());
    }
    if bits & SIGN_BIT != 0 {
        return Err(CompactError::Negative);
    }
    if exponent <= 3 {
        return Ok(U256::from(mantissa >> (8 * (3 - exponent))));
    }
    // Significant mantissa bytes plus the shift must fit in 32 bytes.
    let significant = 4 - mantissa.leading_zeros() / 8;
    if exponent - 3 + significant > 32 {
        return Err(CompactError::Overflow);
    }
    Ok(U256::from(mantissa) << (8 * (exponent - 3)))
}

pub fn u256_to_compact(value: U256) -> u32 {
    let mut exponent = value.bits().div_ceil(8) as u32;
    let mut mantissa = if exponent <= 3 {
        value.low_u32() << (8 * (3 - exponent))
    } else {
        (value >> (8 * (exponent - 3))).low_u32()
    };
    // Keep the sign bit clear by moving one byte into the exponent.
    if mantissa & SIGN_BIT != 0 {
        mantissa >>= 8;
        exponent += 1;
    }
    (exponent << 24) | mantissa
}

pub fn compact_to_target(bits: u32) -> Result<Hash256, CompactError> {
    compact_to_u256(bits).map(|target| target.to_little_endian())
}

pub fn target_to_compact(target: &Hash256) -> u32 {
    u256_to_compact(U256::from_little_endian(target))
}

pub fn hash_meets_target(hash: &Hash256, target: &Hash256) -> bool {
    U256::from_little_endian(hash) <= U256::from_little_endian(target)
}
