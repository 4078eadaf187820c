//! Fixed-point amounts and the scaling constants shared by every accumulator.
//!
//! Token amounts are `u128` integers with 18 fractional decimal digits
//! ("wei-scale"). No floating point is used anywhere in the protocol.
//! Reward accumulators are [`U256`] so they cannot outgrow a dust stake.

pub use primitive_types::U256;

/// One whole token in raw units (10^18).
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Scale applied to reward-per-share accumulators.
pub const PRECISION: u128 = 1_000_000_000_000;

/// Denominator for basis-point ratios (10_000 = 100%).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Convert a whole-token count to raw units. `None` on overflow.
pub fn to_wad(whole: u128) -> Option<u128> {
    whole.checked_mul(WAD)
}

/// Compute `a * b / denominator` with a 256-bit intermediate product.
///
/// Rounds toward zero. Returns `None` when `denominator == 0` or the
/// quotient does not fit in a `u128`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    // Two u128 factors always fit in 256 bits.
    let product = U256::from(a) * U256::from(b);
    narrow(product / U256::from(denominator))
}

/// Convert back to `u128`, `None` if the value needs more than 128 bits.
pub fn narrow(value: U256) -> Option<u128> {
    if value.bits() > 128 {
        None
    } else {
        Some(value.low_u128())
    }
}

/// Apply a basis-point ratio to an amount, rounding down.
pub fn apply_bps(amount: u128, bps: u32) -> Option<u128> {
    mul_div(amount, bps as u128, BPS_DENOMINATOR as u128)
}
