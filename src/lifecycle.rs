//! # Lifecycle Controller
//!
//! State transitions of a single deposit:
//!
//! ```text
//! NonExistent ──open──> Active ──claim──> Active
//!                         │ ├──reinvest / transfer_out──> Active
//!                         │ ├──withdraw───────────> Withdrawn
//!                         │ └──emergency_withdraw─> EmergencyWithdrawn
//! ```
//!
//! Every function validates all of its preconditions before mutating the
//! record, and returns a [`Transition`] describing the custody movement the
//! caller must settle. Nothing here touches contract storage.

use near_sdk::json_types::U128;

use crate::accrual::{accrue, accrued, accrued_total, Accrual};
use crate::assets::Asset;
use crate::config::{LockChoice, PoolConfig, UnlockPolicy};
use crate::errors::{PoolError, PoolResult};
use crate::ledger::{DepositRecord, DepositStatus};
use crate::math::{mul_div, percent_of, BPS_DENOMINATOR};

/// Custody effect of a transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    /// Principal leaving the asset's active total.
    pub released: u128,
    /// Amount owed to the depositor.
    pub payout: u128,
    /// Yield included in `payout`.
    pub yield_paid: u128,
    /// Penalty or claim fee kept in the reserve.
    pub retained: u128,
}

/// Builds a new active record. The ledger assigns the id.
pub fn open(
    config: &PoolConfig,
    asset_index: u32,
    asset: &Asset,
    amount: u128,
    lock: LockChoice,
    frequency: Option<u32>,
    now: u64,
) -> PoolResult<DepositRecord> {
    if amount == 0 {
        return Err(PoolError::InvalidDepositAmount);
    }
    if amount < asset.min_deposit {
        return Err(PoolError::BelowMinimumDeposit {
            amount: U128(amount),
            minimum: U128(asset.min_deposit),
        });
    }
    let lock_duration = config.lock_duration(lock)?;
    let cycles = config.cycles(frequency)?;
    if cycles as u64 > lock_duration {
        return Err(PoolError::InvalidFrequency { frequency: cycles });
    }

    Ok(DepositRecord {
        id: 0,
        asset_index,
        principal: amount,
        lock,
        lock_duration,
        cycles,
        rate_bps: config.base_rate_bps,
        start_time: now,
        last_claim_time: now,
        accrual_checkpoint: now,
        carried_unlocked: 0,
        carried_locked: 0,
        last_claimed_at: None,
        claimed_yield: 0,
        transferred_out: 0,
        status: DepositStatus::Active,
    })
}

/// Earliest time at which `claim` passes the hot period, the cooldown and
/// the unlock boundary.
pub fn next_eligible_time(record: &DepositRecord, config: &PoolConfig, accrual: &Accrual) -> u64 {
    let hot_until = record.start_time.saturating_add(config.hot_period);
    let cooldown_until = record
        .last_claimed_at
        .map(|at| at.saturating_add(config.cooldown_period))
        .unwrap_or_default();
    accrual.next_unlock_time.max(hot_until).max(cooldown_until)
}

/// Settles the unlocked yield and advances the watermark to the unlock
/// boundary, never to `now` under the cycle-boundary policy.
pub fn claim(record: &mut DepositRecord, config: &PoolConfig, now: u64) -> PoolResult<Transition> {
    record.ensure_active()?;

    let hot_until = record.start_time.saturating_add(config.hot_period);
    if now < hot_until {
        return Err(PoolError::HotPeriodActive { until: hot_until });
    }
    if let Some(at) = record.last_claimed_at {
        let cooldown_until = at.saturating_add(config.cooldown_period);
        if now < cooldown_until {
            return Err(PoolError::CooldownActive {
                until: cooldown_until,
            });
        }
    }

    let accrual = accrue(record, config.unlock_policy, now)?;
    if !accrual.has_unlocked(record.last_claim_time) {
        return Err(PoolError::NotEnoughTimePassed {
            next_eligible_time: next_eligible_time(record, config, &accrual),
        });
    }

    let fee = match config.unlock_policy {
        UnlockPolicy::CycleBoundary => 0,
        UnlockPolicy::Continuous { claim_fee_bps } => {
            mul_div(accrual.unlocked, claim_fee_bps as u128, BPS_DENOMINATOR)?
        }
    };
    let payout = accrual.unlocked - fee;

    let checkpoint = record.accrual_checkpoint.max(record.last_claim_time);
    record.last_claim_time = accrual.unlocked_until;
    record.carried_unlocked = 0;
    if accrual.unlocked_until >= checkpoint {
        record.carried_locked = 0;
        record.accrual_checkpoint = accrual.unlocked_until;
    }
    record.last_claimed_at = Some(now);
    record.claimed_yield = record
        .claimed_yield
        .checked_add(payout)
        .ok_or(PoolError::Overflow)?;

    // The part of the open cycle already elapsed keeps the old rate; only
    // time from now on accrues at the rate in force now.
    if record.rate_bps != config.base_rate_bps {
        let elapsed = accrued(
            record.principal,
            record.rate_bps,
            record.accrual_checkpoint,
            accrual.horizon,
        )?;
        record.carried_locked = record
            .carried_locked
            .checked_add(elapsed)
            .ok_or(PoolError::Overflow)?;
        record.accrual_checkpoint = accrual.horizon;
        record.rate_bps = config.base_rate_bps;
    }

    Ok(Transition {
        released: 0,
        payout,
        yield_paid: payout,
        retained: fee,
    })
}

/// Terminates a matured deposit, paying principal plus all unsettled yield.
pub fn withdraw(record: &mut DepositRecord, now: u64) -> PoolResult<Transition> {
    record.ensure_active()?;
    let maturity = record.maturity();
    if now < maturity {
        return Err(PoolError::LockNotExpired { maturity });
    }

    let final_yield = accrued_total(record, maturity)?;
    let released = record.principal;
    let payout = released
        .checked_add(final_yield)
        .ok_or(PoolError::Overflow)?;

    record.principal = 0;
    record.last_claim_time = maturity;
    clear_carry(record, maturity);
    record.claimed_yield = record
        .claimed_yield
        .checked_add(final_yield)
        .ok_or(PoolError::Overflow)?;
    record.status = DepositStatus::Withdrawn;

    Ok(Transition {
        released,
        payout,
        yield_paid: final_yield,
        retained: 0,
    })
}

/// Terminates an immature deposit at a principal penalty. All unsettled
/// yield is forfeited.
pub fn emergency_withdraw(
    record: &mut DepositRecord,
    penalty_percent: u8,
    now: u64,
) -> PoolResult<Transition> {
    record.ensure_active()?;
    let maturity = record.maturity();
    if now >= maturity {
        return Err(PoolError::LockExpired { maturity });
    }

    let released = record.principal;
    let payout = percent_of(released, 100u8.saturating_sub(penalty_percent))?;

    record.principal = 0;
    let watermark = record.last_claim_time;
    clear_carry(record, watermark);
    record.status = DepositStatus::EmergencyWithdrawn;

    Ok(Transition {
        released,
        payout,
        yield_paid: 0,
        retained: released - payout,
    })
}

/// Rolls `amount` of matured principal into a fresh term at the current
/// base rate. The rest of the principal and the unsettled yield go to the
/// depositor.
pub fn reinvest(
    record: &mut DepositRecord,
    amount: u128,
    base_rate_bps: u32,
    now: u64,
) -> PoolResult<Transition> {
    record.ensure_active()?;
    let maturity = record.maturity();
    if now < maturity {
        return Err(PoolError::LockNotExpired { maturity });
    }
    check_amount(amount, record.principal)?;

    let final_yield = accrued_total(record, maturity)?;
    let released = record.principal - amount;
    let payout = released
        .checked_add(final_yield)
        .ok_or(PoolError::Overflow)?;

    record.principal = amount;
    record.start_time = now;
    record.last_claim_time = now;
    clear_carry(record, now);
    record.last_claimed_at = None;
    record.rate_bps = base_rate_bps;
    record.claimed_yield = record
        .claimed_yield
        .checked_add(final_yield)
        .ok_or(PoolError::Overflow)?;

    Ok(Transition {
        released,
        payout,
        yield_paid: final_yield,
        retained: 0,
    })
}

/// Moves `amount` of principal out of the deposit for off-pool deployment.
/// The deposit stays active; yield accrued on the old principal is kept.
pub fn transfer_out(
    record: &mut DepositRecord,
    amount: u128,
    policy: UnlockPolicy,
    now: u64,
) -> PoolResult<()> {
    record.ensure_active()?;
    check_amount(amount, record.principal)?;
    freeze_accrual(record, policy, now)?;
    record.principal -= amount;
    record.transferred_out = record
        .transferred_out
        .checked_add(amount)
        .ok_or(PoolError::Overflow)?;
    Ok(())
}

/// Puts `amount` of deployed principal back into an active deposit.
pub fn restore_principal(
    record: &mut DepositRecord,
    amount: u128,
    policy: UnlockPolicy,
    now: u64,
) -> PoolResult<()> {
    record.ensure_active()?;
    freeze_accrual(record, policy, now)?;
    record.principal = record
        .principal
        .checked_add(amount)
        .ok_or(PoolError::Overflow)?;
    record.transferred_out = record.transferred_out.saturating_sub(amount);
    Ok(())
}

/// Carries everything accrued up to `now` at the current terms, so the
/// caller can change principal or rate without repricing it.
fn freeze_accrual(record: &mut DepositRecord, policy: UnlockPolicy, now: u64) -> PoolResult<()> {
    let accrual = accrue(record, policy, now)?;
    record.carried_unlocked = accrual.unlocked;
    record.carried_locked = accrual.locked;
    record.last_claim_time = accrual.unlocked_until;
    record.accrual_checkpoint = accrual.horizon;
    Ok(())
}

fn clear_carry(record: &mut DepositRecord, checkpoint: u64) {
    record.carried_unlocked = 0;
    record.carried_locked = 0;
    record.accrual_checkpoint = checkpoint;
}

fn check_amount(amount: u128, max: u128) -> PoolResult<()> {
    if amount == 0 || amount > max {
        return Err(PoolError::InvalidAmount {
            amount: U128(amount),
            max: U128(max),
        });
    }
    Ok(())
}
