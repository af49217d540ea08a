//! # Test Helpers Module
//!
//! Common infrastructure for pool scenario tests. Every call runs against
//! the mocked NEAR VM (`testing_env!`) with an explicit caller and block
//! time, so scenarios can move the clock across lock and cycle boundaries.
//!
//! ## Modules
//!
//! - [`test_builder`]: Builder pattern for constructing test scenarios
//!
//! ## Key Functions
//!
//! - [`set_ctx`]: Sets caller and block time
//! - [`set_failed_callback_ctx`]: Sets up a `resolve_payout` call whose
//!   transfer failed
//! - [`assert_conserved`]: Checks the custody invariants of an asset

#![allow(dead_code)]

use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
use near_sdk::json_types::U128;
use near_sdk::test_utils::VMContextBuilder;
use near_sdk::{testing_env, AccountId, PromiseResult, RuntimeFeesConfig};
use tenure_pool::{Contract, DepositStatus, PoolConfig, TenureMode, UnlockPolicy};

pub mod test_builder;

// ============================================================================
// Constants
// ============================================================================

pub const POOL_ID: &str = "pool.test";
pub const USDC_ID: &str = "usdc.test";

pub const DAY: u64 = 86_400;
pub const MONTH: u64 = 30 * DAY;
pub const YEAR: u64 = 365 * DAY;
/// Scenario start time, in seconds.
pub const T0: u64 = 1_700_000_000;

/// One USDC (6 decimals).
pub const USDC: u128 = 1_000_000;

// ============================================================================
// Context Helpers
// ============================================================================

pub fn account(id: &str) -> AccountId {
    id.parse().unwrap()
}

fn context(predecessor: &str, now_secs: u64) -> VMContextBuilder {
    let mut builder = VMContextBuilder::new();
    builder
        .current_account_id(account(POOL_ID))
        .predecessor_account_id(account(predecessor))
        .block_timestamp(now_secs * 1_000_000_000);
    builder
}

/// Sets the caller and the block time in seconds.
pub fn set_ctx(predecessor: &str, now_secs: u64) {
    testing_env!(context(predecessor, now_secs).build());
}

/// Prepares a `resolve_payout` callback whose `ft_transfer` failed.
pub fn set_failed_callback_ctx(now_secs: u64) {
    testing_env!(
        context(POOL_ID, now_secs).build(),
        near_sdk::test_vm_config(),
        RuntimeFeesConfig::test(),
        Default::default(),
        vec![PromiseResult::Failed],
    );
}

/// Three monthly tenure buckets at 12% a year with one or three cycles.
pub fn default_config() -> PoolConfig {
    PoolConfig {
        pool_id: 7,
        tenure: TenureMode::Buckets {
            durations: vec![MONTH, 2 * MONTH, 3 * MONTH],
        },
        base_rate_bps: 1_200,
        frequencies: vec![1, 3],
        hot_period: 0,
        cooldown_period: 0,
        withdraw_penalty_percent: 10,
        unlock_policy: UnlockPolicy::CycleBoundary,
    }
}

/// Simulates `ft_transfer_call` from `token` carrying `msg`.
pub fn ft_transfer_call(
    contract: &mut Contract,
    token: &str,
    sender: &str,
    amount: u128,
    msg: &str,
    now_secs: u64,
) {
    set_ctx(token, now_secs);
    let _ = contract.ft_on_transfer(account(sender), U128(amount), msg.to_string());
}

pub fn deposit_msg(tenure: u8, frequency: Option<u32>) -> String {
    match frequency {
        Some(f) => format!(r#"{{"deposit":{{"lock":{{"tenure":{tenure}}},"frequency":{f}}}}}"#),
        None => format!(r#"{{"deposit":{{"lock":{{"tenure":{tenure}}}}}}}"#),
    }
}

// ============================================================================
// Invariants
// ============================================================================

/// Checks `custody == inflow - paid_out - deployed`,
/// `principal + escrowed <= custody`, and that the asset's principal equals
/// the sum of the active principals of `depositors`.
pub fn assert_conserved(contract: &Contract, asset_index: u32, depositors: &[&str]) {
    let asset = &contract.assets[asset_index as usize];
    assert_eq!(
        asset.custody,
        asset.inflow - asset.paid_out - asset.deployed,
        "custody must equal inflow minus outflows"
    );
    assert!(
        asset.principal + asset.escrowed <= asset.custody,
        "principal and escrow must be covered by custody"
    );

    let active: u128 = depositors
        .iter()
        .flat_map(|d| contract.get_deposits(account(d), None, None))
        .filter(|d| d.asset_index == asset_index && d.status == DepositStatus::Active)
        .map(|d| d.principal.0)
        .sum();
    assert_eq!(asset.principal, active, "asset principal must match ledger");
}
