//! # Accrual Engine
//!
//! Pure yield computation over a single [`DepositRecord`]. Yield accrues
//! linearly at the record's snapshotted rate from the claim watermark up to
//! maturity:
//!
//! ```text
//! accrued(a, b) = principal * rate_bps * (b - a) / (10_000 * SECONDS_PER_YEAR)
//! ```
//!
//! When the principal or the rate changes mid-window, the yield accrued so
//! far is frozen into the record's carried amounts and the new terms apply
//! from `accrual_checkpoint` on, so history is never repriced.
//!
//! What part of it is claimable depends on the [`UnlockPolicy`]. Nothing in
//! this module touches contract state.

use near_sdk::json_types::{U128, U64};
use schemars::JsonSchema;
use serde::Serialize;

use crate::config::UnlockPolicy;
use crate::errors::{PoolError, PoolResult};
use crate::ledger::DepositRecord;
use crate::math::{mul_div, BPS_DENOMINATOR};

/// 365 days.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Yield accrued on `principal` between `from` and `to`, truncated.
pub fn accrued(principal: u128, rate_bps: u32, from: u64, to: u64) -> PoolResult<u128> {
    if to <= from || principal == 0 {
        return Ok(0);
    }
    let elapsed = (to - from) as u128;
    mul_div(
        principal,
        rate_bps as u128 * elapsed,
        BPS_DENOMINATOR * SECONDS_PER_YEAR as u128,
    )
}

/// Snapshot of a deposit's yield position at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accrual {
    /// `min(now, maturity)`.
    pub horizon: u64,
    /// Claimable yield covers the window `[watermark, unlocked_until)`.
    pub unlocked_until: u64,
    pub unlocked: u128,
    pub locked: u128,
    pub cycles_elapsed: u32,
    pub cycles_left: u32,
    /// Earliest time at which a claim would find unlocked yield.
    pub next_unlock_time: u64,
}

impl Accrual {
    /// Whether a claim would settle anything: a new unlock boundary or
    /// carried yield that is already claimable.
    pub fn has_unlocked(&self, watermark: u64) -> bool {
        self.unlocked_until > watermark || self.unlocked > 0
    }
}

/// Everything the deposit has accrued up to `until`, claimable or not.
pub fn accrued_total(record: &DepositRecord, until: u64) -> PoolResult<u128> {
    let checkpoint = record.accrual_checkpoint.max(record.last_claim_time);
    let fresh = accrued(record.principal, record.rate_bps, checkpoint, until)?;
    record
        .carried_unlocked
        .checked_add(record.carried_locked)
        .and_then(|carried| carried.checked_add(fresh))
        .ok_or(PoolError::Overflow)
}

pub fn accrue(record: &DepositRecord, policy: UnlockPolicy, now: u64) -> PoolResult<Accrual> {
    let watermark = record.last_claim_time;
    let checkpoint = record.accrual_checkpoint.max(watermark);
    let maturity = record.maturity();
    let cycle = record.cycle_length();
    let horizon = now.min(maturity).max(checkpoint);
    let matured = now >= maturity;

    let (unlocked_until, cycles_elapsed) = match policy {
        UnlockPolicy::CycleBoundary => {
            let full = (horizon - watermark) / cycle;
            if matured {
                (maturity, ceil_div(maturity - watermark, cycle))
            } else {
                (watermark + full * cycle, full)
            }
        }
        UnlockPolicy::Continuous { .. } => {
            let elapsed = horizon - watermark;
            let cycles = if matured {
                ceil_div(elapsed, cycle)
            } else {
                elapsed / cycle
            };
            (horizon, cycles)
        }
    };

    // Carried locked yield ends at the checkpoint and unlocks with the
    // boundary that reaches it.
    let carried = if unlocked_until >= checkpoint {
        record.carried_unlocked.checked_add(record.carried_locked)
    } else {
        Some(record.carried_unlocked)
    }
    .ok_or(PoolError::Overflow)?;
    let fresh = accrued(record.principal, record.rate_bps, checkpoint, unlocked_until)?;
    let unlocked = carried.checked_add(fresh).ok_or(PoolError::Overflow)?;
    let total = accrued_total(record, horizon)?;

    let next_unlock_time = if unlocked_until > watermark || unlocked > 0 || matured {
        unlocked_until
    } else {
        match policy {
            UnlockPolicy::CycleBoundary => watermark.saturating_add(cycle).min(maturity),
            UnlockPolicy::Continuous { .. } => watermark.saturating_add(1).min(maturity),
        }
    };

    Ok(Accrual {
        horizon,
        unlocked_until,
        unlocked,
        locked: total.saturating_sub(unlocked),
        cycles_elapsed: clamp_u32(cycles_elapsed),
        cycles_left: clamp_u32(ceil_div(maturity.saturating_sub(unlocked_until), cycle)),
        next_unlock_time,
    })
}

fn ceil_div(value: u64, divisor: u64) -> u64 {
    value.div_ceil(divisor.max(1))
}

fn clamp_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}

/// Response of `yield_claim_details`.
#[derive(Serialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct YieldDetails {
    pub balance: U128,
    pub claimed_yield: U128,
    pub unlocked_yield: U128,
    pub locked_yield: U128,
    pub cycles_elapsed: u32,
    pub cycles_left: u32,
    /// Seconds until maturity, zero once matured.
    pub time_left: U64,
    pub unlocked_until: U64,
    /// Earliest time a claim passes every timing gate.
    pub next_eligible_time: U64,
}

impl YieldDetails {
    pub fn new(record: &DepositRecord, accrual: &Accrual, next_eligible_time: u64, now: u64) -> Self {
        Self {
            balance: U128(record.principal),
            claimed_yield: U128(record.claimed_yield),
            unlocked_yield: U128(accrual.unlocked),
            locked_yield: U128(accrual.locked),
            cycles_elapsed: accrual.cycles_elapsed,
            cycles_left: accrual.cycles_left,
            time_left: U64(record.maturity().saturating_sub(now)),
            unlocked_until: U64(accrual.unlocked_until),
            next_eligible_time: U64(next_eligible_time),
        }
    }
}
