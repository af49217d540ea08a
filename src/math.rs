//! # Fixed-Point Helpers
//!
//! Overflow-safe `(x * y) / denominator` using a 256-bit intermediate.
//! Every division truncates toward zero so that amounts match integer
//! ledger arithmetic exactly.

use uint::construct_uint;

use crate::errors::{PoolError, PoolResult};

construct_uint! {
    pub struct U256(4);
}

/// Basis-point denominator (`10_000` = 100%).
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Performs `(x * y) / denominator`, truncated.
///
/// Fails with [`PoolError::Overflow`] when the denominator is zero or the
/// quotient does not fit in 128 bits.
///
/// # Example
///
/// ```ignore
/// // 12% of 100 USDC (6 decimals)
/// let interest = mul_div(100_000_000, 1_200, 10_000)?;
/// assert_eq!(interest, 12_000_000);
/// ```
pub fn mul_div(x: u128, y: u128, denominator: u128) -> PoolResult<u128> {
    if denominator == 0 {
        return Err(PoolError::Overflow);
    }
    let result = U256::from(x) * U256::from(y) / U256::from(denominator);
    if result > U256::from(u128::MAX) {
        return Err(PoolError::Overflow);
    }
    Ok(result.as_u128())
}

/// Applies a whole-number percentage, truncated.
pub fn percent_of(amount: u128, percent: u8) -> PoolResult<u128> {
    mul_div(amount, percent as u128, 100)
}
