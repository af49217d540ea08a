//! # Tenure Pool Contract
//!
//! A NEAR smart contract that custodies NEP-141 deposits for a chosen tenure
//! and pays time-proportional yield on a cycle schedule.
//!
//! - **Deposits**: whitelisted accounts lock an accepted asset for a tenure
//!   bucket or a locking period within the configured range
//! - **Yield**: accrues linearly at the rate snapshotted on the deposit and
//!   unlocks cycle by cycle
//! - **Exits**: normal withdrawal after maturity, or an emergency exit before
//!   it at a principal penalty with all yield forfeited
//! - **Fund management**: fund managers deploy principal off-pool and roll
//!   matured principal into a new term
//!
//! ## Architecture
//!
//! - [`roles`]: access registry consulted by every gated call
//! - [`config`]: pool parameters and their privileged setters
//! - [`assets`]: accepted assets and per-asset custody accounting
//! - [`ledger`]: per-depositor deposit slots
//! - [`accrual`]: pure yield computation
//! - [`lifecycle`]: pure state transitions of a single deposit
//! - [`pool`]: public depositor and fund-manager methods
//! - [`settlement`]: inbound `ft_on_transfer` handling and outbound transfers
//! - [`events`]: structured event logs

use near_sdk::{
    borsh::{BorshDeserialize, BorshSerialize},
    env, near,
    store::LookupMap,
    AccountId, BorshStorageKey, FunctionError, PanicOnDefault,
};

pub mod accrual;
pub mod assets;
pub mod config;
pub mod errors;
mod events;
pub mod ledger;
pub mod lifecycle;
mod math;
mod pool;
pub mod roles;
mod settlement;
mod upgrade;

#[cfg(test)]
pub mod test_utils;

pub use accrual::YieldDetails;
pub use assets::{Asset, AssetInit, AssetView};
pub use config::{LockChoice, PoolConfig, TenureMode, UnlockPolicy};
pub use errors::{ErrorClass, PoolError, PoolResult};
pub use ledger::{DepositStatus, DepositView};
pub use roles::Role;
pub use settlement::{FtTransferAction, PayoutKind};

use assets::EscrowKey;
use ledger::DepositLedger;
use roles::AccessRegistry;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Storage keys for NEAR SDK collections.
#[derive(BorshSerialize, BorshDeserialize, BorshStorageKey)]
#[borsh(crate = "near_sdk::borsh")]
pub enum StorageKey {
    Hr,
    PoolManagers,
    FundManagers,
    Verifiers,
    Whitelist,
    /// Deposit slots by depositor.
    Deposits,
    /// Pre-authorized (escrowed) balances by depositor and asset.
    Escrow,
}

#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct Contract {
    pub access: AccessRegistry,
    /// Whether depositor and fund-manager operations are blocked.
    pub is_paused: bool,
    pub config: PoolConfig,
    /// Accepted assets; a deposit refers to its asset by index.
    pub assets: Vec<Asset>,
    pub ledger: DepositLedger,
    pub escrow: LookupMap<EscrowKey, u128>,
}

#[near]
impl Contract {
    /// Initializes the pool.
    ///
    /// # Arguments
    ///
    /// * `owner_id` - Account holding every administrative role
    /// * `config` - Initial pool parameters
    /// * `assets` - Ordered list of accepted NEP-141 assets
    ///
    /// # Panics
    ///
    /// Panics if the configuration or the asset list is invalid.
    #[init]
    #[private]
    pub fn init(owner_id: AccountId, config: PoolConfig, assets: Vec<AssetInit>) -> Self {
        config.validate().unwrap_or_else(|err| err.panic());

        let mut contract = Self {
            access: AccessRegistry::new(owner_id),
            is_paused: false,
            config,
            assets: Vec::new(),
            ledger: DepositLedger::new(StorageKey::Deposits),
            escrow: LookupMap::new(StorageKey::Escrow),
        };
        for asset in assets {
            contract
                .push_asset(asset)
                .unwrap_or_else(|err| err.panic());
        }
        contract
    }

    /// Pauses depositor and fund-manager operations. Owner only.
    #[handle_result]
    pub fn pause(&mut self) -> Result<(), PoolError> {
        self.require_role(Role::Owner)?;
        self.is_paused = true;
        env::log_str("paused");
        Ok(())
    }

    #[handle_result]
    pub fn unpause(&mut self) -> Result<(), PoolError> {
        self.require_role(Role::Owner)?;
        self.is_paused = false;
        env::log_str("unpaused");
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }
}

impl Contract {
    pub(crate) fn require_not_paused(&self) -> PoolResult<()> {
        if self.is_paused {
            return Err(PoolError::Paused);
        }
        Ok(())
    }
}

/// Current block time in whole seconds.
pub(crate) fn now_secs() -> u64 {
    env::block_timestamp() / NANOS_PER_SECOND
}
