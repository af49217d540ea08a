//! # Pool Errors
//!
//! Every failing precondition of the pool maps to exactly one [`PoolError`]
//! variant. Public methods return `Result<T, PoolError>` under
//! `#[handle_result]`; an `Err` aborts the receipt, so no partial state is
//! ever persisted.

use std::fmt;

use near_sdk::json_types::U128;
use near_sdk::{env, near, AccountId, FunctionError};

use crate::ledger::DepositStatus;
use crate::roles::Role;

pub type PoolResult<T> = Result<T, PoolError>;

/// Coarse grouping used by callers that only care about the kind of failure.
#[near(serializers = [json])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Unauthorized,
    InvalidInput,
    TimingViolation,
    InsufficientAllowance,
    InvalidState,
    InsufficientFunds,
}

#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolError {
    // Access
    Unauthorized { account_id: AccountId, role: Role },
    NotWhitelisted { account_id: AccountId },
    Paused,

    // Input validation
    InvalidDepositAmount,
    InvalidTenureOption { option: u8, available: u8 },
    InvalidLockDuration { duration: u64, min: u64, max: u64 },
    InvalidFrequency { frequency: u32 },
    InvalidTokenId { index: u32 },
    UnknownAsset { token_id: AccountId },
    AssetAlreadyRegistered { token_id: AccountId },
    BelowMinimumDeposit { amount: U128, minimum: U128 },
    InvalidAmount { amount: U128, max: U128 },
    InvalidConfig { reason: String },
    InvalidMessage { reason: String },

    // Time gating
    NotEnoughTimePassed { next_eligible_time: u64 },
    HotPeriodActive { until: u64 },
    CooldownActive { until: u64 },
    LockNotExpired { maturity: u64 },
    LockExpired { maturity: u64 },

    InsufficientAllowance { required: U128, available: U128 },

    // Deposit state
    DepositNotFound { account_id: AccountId, deposit_id: u32 },
    DepositNotActive { deposit_id: u32, status: DepositStatus },

    // Custody
    InsufficientPoolBalance { required: U128, available: U128 },
    Overflow,
}

impl PoolError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized { .. } | Self::NotWhitelisted { .. } | Self::Paused => {
                ErrorClass::Unauthorized
            }
            Self::InvalidDepositAmount
            | Self::InvalidTenureOption { .. }
            | Self::InvalidLockDuration { .. }
            | Self::InvalidFrequency { .. }
            | Self::InvalidTokenId { .. }
            | Self::UnknownAsset { .. }
            | Self::AssetAlreadyRegistered { .. }
            | Self::BelowMinimumDeposit { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidConfig { .. }
            | Self::InvalidMessage { .. } => ErrorClass::InvalidInput,
            Self::NotEnoughTimePassed { .. }
            | Self::HotPeriodActive { .. }
            | Self::CooldownActive { .. }
            | Self::LockNotExpired { .. }
            | Self::LockExpired { .. } => ErrorClass::TimingViolation,
            Self::InsufficientAllowance { .. } => ErrorClass::InsufficientAllowance,
            Self::DepositNotFound { .. } | Self::DepositNotActive { .. } => {
                ErrorClass::InvalidState
            }
            Self::InsufficientPoolBalance { .. } | Self::Overflow => {
                ErrorClass::InsufficientFunds
            }
        }
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { account_id, role } => {
                write!(f, "Unauthorized: {account_id} does not have the {role} role")
            }
            Self::NotWhitelisted { account_id } => {
                write!(f, "Unauthorized: {account_id} is not whitelisted")
            }
            Self::Paused => write!(f, "Contract is paused"),
            Self::InvalidDepositAmount => {
                write!(f, "Invalid deposit amount: deposit amount must be greater than zero")
            }
            Self::InvalidTenureOption { option, available } => write!(
                f,
                "Invalid tenure: option {option} is not between 1 and {available}"
            ),
            Self::InvalidLockDuration { duration, min, max } => write!(
                f,
                "Invalid tenure: locking period {duration}s is outside [{min}s, {max}s]"
            ),
            Self::InvalidFrequency { frequency } => {
                write!(f, "Invalid frequency: {frequency} is not offered by this pool")
            }
            Self::InvalidTokenId { index } => write!(f, "Invalid token id: {index}"),
            Self::UnknownAsset { token_id } => {
                write!(f, "Invalid token: {token_id} is not an accepted asset")
            }
            Self::AssetAlreadyRegistered { token_id } => {
                write!(f, "Invalid token: {token_id} is already registered")
            }
            Self::BelowMinimumDeposit { amount, minimum } => write!(
                f,
                "Invalid deposit amount: {} is below the minimum of {}",
                amount.0, minimum.0
            ),
            Self::InvalidAmount { amount, max } => write!(
                f,
                "Invalid amount: {} must be greater than zero and at most {}",
                amount.0, max.0
            ),
            Self::InvalidConfig { reason } => write!(f, "Invalid configuration: {reason}"),
            Self::InvalidMessage { reason } => write!(f, "Invalid transfer message: {reason}"),
            Self::NotEnoughTimePassed { next_eligible_time } => write!(
                f,
                "Not enough time passed: no yield cycle has unlocked yet, next at {next_eligible_time}"
            ),
            Self::HotPeriodActive { until } => {
                write!(f, "Not enough time passed: hot period active until {until}")
            }
            Self::CooldownActive { until } => write!(
                f,
                "Not enough time passed since last claim: cooldown active until {until}"
            ),
            Self::LockNotExpired { maturity } => {
                write!(f, "Tenure is not over: deposit matures at {maturity}")
            }
            Self::LockExpired { maturity } => write!(
                f,
                "Tenure is over since {maturity}: use withdraw instead of emergency withdraw"
            ),
            Self::InsufficientAllowance { required, available } => write!(
                f,
                "Allowance check: pool not authorized to take {}, only {} escrowed",
                required.0, available.0
            ),
            Self::DepositNotFound {
                account_id,
                deposit_id,
            } => write!(f, "Deposit {deposit_id} of {account_id} does not exist"),
            Self::DepositNotActive { deposit_id, status } => {
                write!(f, "Deposit {deposit_id} is not active: {status:?}")
            }
            Self::InsufficientPoolBalance {
                required,
                available,
            } => write!(
                f,
                "Insufficient pool balance: {} required, {} available",
                required.0, available.0
            ),
            Self::Overflow => write!(f, "Arithmetic overflow"),
        }
    }
}

impl FunctionError for PoolError {
    fn panic(&self) -> ! {
        env::panic_str(&self.to_string())
    }
}
