//! # Pool Configuration
//!
//! A single [`PoolConfig`] parameterizes every pool generation: fixed tenure
//! buckets or a continuous locking range, the payout frequencies on offer,
//! claim spacing, the emergency-exit penalty and the unlock policy.
//!
//! Changes apply prospectively. Deposits snapshot their lock duration, cycle
//! count and rate when they are opened, so a setter never rewrites yield that
//! has already unlocked.

use near_sdk::{env, near};

use crate::errors::{PoolError, PoolResult};
use crate::math::BPS_DENOMINATOR;
use crate::roles::Role;
use crate::{Contract, ContractExt};

/// How depositors choose their lock.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TenureMode {
    /// Discrete tenure options, selected 1-based (`1..=durations.len()`).
    Buckets { durations: Vec<u64> },
    /// Any locking period within `[min_locking_period, max_locking_period]`.
    Range {
        min_locking_period: u64,
        max_locking_period: u64,
    },
}

/// When accrued yield becomes claimable.
#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnlockPolicy {
    /// Yield unlocks one full cycle at a time; claims advance the watermark
    /// to the last elapsed cycle boundary.
    CycleBoundary,
    /// Yield is claimable as it accrues, less a per-claim fee that stays in
    /// the pool reserve.
    Continuous { claim_fee_bps: u32 },
}

/// A depositor's lock selection.
#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LockChoice {
    Tenure(u8),
    Duration(u64),
}

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub pool_id: u64,
    pub tenure: TenureMode,
    /// Annual reward rate in basis points.
    pub base_rate_bps: u32,
    /// Cycles per lock on offer; the first entry is the default.
    pub frequencies: Vec<u32>,
    /// Seconds between a deposit and its first claim.
    pub hot_period: u64,
    /// Seconds between two claims on the same deposit.
    pub cooldown_period: u64,
    pub withdraw_penalty_percent: u8,
    pub unlock_policy: UnlockPolicy,
}

impl PoolConfig {
    pub fn validate(&self) -> PoolResult<()> {
        let shortest_lock = match &self.tenure {
            TenureMode::Buckets { durations } => {
                if durations.is_empty() || durations.len() > u8::MAX as usize {
                    return Err(invalid("tenure buckets must hold between 1 and 255 options"));
                }
                if durations.contains(&0) {
                    return Err(invalid("tenure durations must be positive"));
                }
                durations.iter().copied().min().unwrap_or_default()
            }
            TenureMode::Range {
                min_locking_period,
                max_locking_period,
            } => {
                if *min_locking_period == 0 || min_locking_period > max_locking_period {
                    return Err(invalid("locking range must satisfy 0 < min <= max"));
                }
                *min_locking_period
            }
        };

        if self.frequencies.is_empty() {
            return Err(invalid("at least one frequency is required"));
        }
        if self
            .frequencies
            .iter()
            .any(|&f| f == 0 || f as u64 > shortest_lock)
        {
            return Err(invalid(
                "frequencies must be at least 1 and no larger than the shortest lock in seconds",
            ));
        }
        if self.withdraw_penalty_percent > 100 {
            return Err(invalid("withdraw penalty cannot exceed 100 percent"));
        }
        if let UnlockPolicy::Continuous { claim_fee_bps } = self.unlock_policy {
            if claim_fee_bps as u128 > BPS_DENOMINATOR {
                return Err(invalid("claim fee cannot exceed 10000 basis points"));
            }
        }
        Ok(())
    }

    /// Resolves a lock choice to its duration in seconds.
    pub fn lock_duration(&self, choice: LockChoice) -> PoolResult<u64> {
        match (&self.tenure, choice) {
            (TenureMode::Buckets { durations }, LockChoice::Tenure(option)) => {
                let available = durations.len() as u8;
                if option == 0 || option > available {
                    return Err(PoolError::InvalidTenureOption { option, available });
                }
                Ok(durations[option as usize - 1])
            }
            (TenureMode::Buckets { durations }, LockChoice::Duration(_)) => {
                Err(PoolError::InvalidTenureOption {
                    option: 0,
                    available: durations.len() as u8,
                })
            }
            (
                TenureMode::Range {
                    min_locking_period,
                    max_locking_period,
                },
                LockChoice::Duration(duration),
            ) => {
                if duration < *min_locking_period || duration > *max_locking_period {
                    return Err(PoolError::InvalidLockDuration {
                        duration,
                        min: *min_locking_period,
                        max: *max_locking_period,
                    });
                }
                Ok(duration)
            }
            (
                TenureMode::Range {
                    min_locking_period,
                    max_locking_period,
                },
                LockChoice::Tenure(_),
            ) => Err(PoolError::InvalidLockDuration {
                duration: 0,
                min: *min_locking_period,
                max: *max_locking_period,
            }),
        }
    }

    /// Resolves the requested cycles-per-lock, falling back to the default.
    pub fn cycles(&self, frequency: Option<u32>) -> PoolResult<u32> {
        match frequency {
            None => self
                .frequencies
                .first()
                .copied()
                .ok_or(PoolError::InvalidFrequency { frequency: 0 }),
            Some(frequency) if self.frequencies.contains(&frequency) => Ok(frequency),
            Some(frequency) => Err(PoolError::InvalidFrequency { frequency }),
        }
    }
}

fn invalid(reason: &str) -> PoolError {
    PoolError::InvalidConfig {
        reason: reason.to_string(),
    }
}

#[near]
impl Contract {
    /// Replaces the whole pool configuration. Pool manager only.
    #[handle_result]
    pub fn set_contract_variables(&mut self, config: PoolConfig) -> Result<(), PoolError> {
        let caller = self.require_role(Role::PoolManager)?;
        config.validate()?;
        env::log_str(&format!(
            "config_updated pool_id={} by={}",
            config.pool_id, caller
        ));
        self.config = config;
        Ok(())
    }

    /// Changes the annual reward rate for accrual windows opened from now on.
    #[handle_result]
    pub fn change_base_rate(&mut self, rate_bps: u32) -> Result<(), PoolError> {
        let caller = self.require_role(Role::PoolManager)?;
        env::log_str(&format!(
            "base_rate_changed from={} to={} by={}",
            self.config.base_rate_bps, rate_bps, caller
        ));
        self.config.base_rate_bps = rate_bps;
        Ok(())
    }

    #[handle_result]
    pub fn set_withdraw_penalty(&mut self, percent: u8) -> Result<(), PoolError> {
        self.require_role(Role::PoolManager)?;
        let mut config = self.config.clone();
        config.withdraw_penalty_percent = percent;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    #[handle_result]
    pub fn set_unlock_policy(&mut self, policy: UnlockPolicy) -> Result<(), PoolError> {
        self.require_role(Role::PoolManager)?;
        let mut config = self.config.clone();
        config.unlock_policy = policy;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn get_config(&self) -> PoolConfig {
        self.config.clone()
    }
}
