//! # Pool Events
//!
//! Structured event logging for pool operations. Events are emitted as JSON
//! logs prefixed with `EVENT_JSON:`:
//!
//! ```json
//! {
//!   "standard": "tenure_pool",
//!   "version": "1.0.0",
//!   "event": "yield_claim",
//!   "data": [{ ... }]
//! }
//! ```

use near_sdk::json_types::U128;
use near_sdk::serde::Serialize;
use near_sdk::{env, AccountIdRef};

// ============================================================================
// Event Wrapper
// ============================================================================

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
#[serde(tag = "standard")]
#[must_use = "don't forget to `.emit()` this event"]
#[serde(rename_all = "snake_case")]
pub(crate) enum NearEvent<'a> {
    TenurePool(PoolEvent<'a>),
}

impl NearEvent<'_> {
    fn to_json_string(&self) -> String {
        #[allow(clippy::redundant_closure)]
        serde_json::to_string(self)
            .ok()
            .unwrap_or_else(|| env::abort())
    }

    fn to_json_event_string(&self) -> String {
        format!("EVENT_JSON:{}", self.to_json_string())
    }

    pub(crate) fn emit(self) {
        env::log_str(&self.to_json_event_string());
    }
}

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
pub(crate) struct PoolEvent<'a> {
    version: &'static str,
    #[serde(flatten)]
    event_kind: PoolEventKind<'a>,
}

#[derive(Serialize, Debug)]
#[serde(crate = "near_sdk::serde")]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
enum PoolEventKind<'a> {
    PoolDeposit(&'a [PoolDeposit<'a>]),
    YieldClaim(&'a [YieldClaim<'a>]),
    PoolWithdraw(&'a [PoolWithdraw<'a>]),
    EmergencyWithdraw(&'a [EmergencyWithdraw<'a>]),
    Reinvest(&'a [Reinvest<'a>]),
    CapitalDeployed(&'a [CapitalDeployed<'a>]),
    CapitalReturned(&'a [CapitalReturned<'a>]),
    RewardsFunded(&'a [RewardsFunded<'a>]),
    PayoutFailed(&'a [PayoutFailed<'a>]),
}

fn new_v1(event_kind: PoolEventKind) -> NearEvent {
    NearEvent::TenurePool(PoolEvent {
        version: "1.0.0",
        event_kind,
    })
}

// ============================================================================
// Depositor Events
// ============================================================================

#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct PoolDeposit<'a> {
    pub account_id: &'a AccountIdRef,
    pub deposit_id: u32,
    pub token_id: &'a AccountIdRef,
    pub amount: U128,
    pub lock_duration: u64,
    pub cycles: u32,
    pub rate_bps: u32,
}

impl PoolDeposit<'_> {
    pub fn emit(self) {
        new_v1(PoolEventKind::PoolDeposit(&[self])).emit()
    }
}

#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct YieldClaim<'a> {
    pub account_id: &'a AccountIdRef,
    pub deposit_id: u32,
    pub amount: U128,
    #[serde(skip_serializing_if = "is_zero")]
    pub fee: U128,
    /// New claim watermark.
    pub unlocked_until: u64,
}

impl YieldClaim<'_> {
    pub fn emit(self) {
        new_v1(PoolEventKind::YieldClaim(&[self])).emit()
    }
}

#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct PoolWithdraw<'a> {
    pub account_id: &'a AccountIdRef,
    pub deposit_id: u32,
    pub principal: U128,
    pub yield_amount: U128,
}

impl PoolWithdraw<'_> {
    pub fn emit(self) {
        new_v1(PoolEventKind::PoolWithdraw(&[self])).emit()
    }
}

#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct EmergencyWithdraw<'a> {
    pub account_id: &'a AccountIdRef,
    pub deposit_id: u32,
    pub amount: U128,
    pub penalty: U128,
}

impl EmergencyWithdraw<'_> {
    pub fn emit(self) {
        new_v1(PoolEventKind::EmergencyWithdraw(&[self])).emit()
    }
}

// ============================================================================
// Fund Manager Events
// ============================================================================

#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct Reinvest<'a> {
    pub fund_manager_id: &'a AccountIdRef,
    pub account_id: &'a AccountIdRef,
    pub deposit_id: u32,
    /// Principal of the new term.
    pub amount: U128,
    /// Released principal and final yield paid to the depositor.
    pub payout: U128,
}

impl Reinvest<'_> {
    pub fn emit(self) {
        new_v1(PoolEventKind::Reinvest(&[self])).emit()
    }
}

#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct CapitalDeployed<'a> {
    pub fund_manager_id: &'a AccountIdRef,
    pub account_id: &'a AccountIdRef,
    pub deposit_id: u32,
    pub receiver_id: &'a AccountIdRef,
    pub amount: U128,
}

impl CapitalDeployed<'_> {
    pub fn emit(self) {
        new_v1(PoolEventKind::CapitalDeployed(&[self])).emit()
    }
}

#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct CapitalReturned<'a> {
    pub fund_manager_id: &'a AccountIdRef,
    pub token_id: &'a AccountIdRef,
    pub amount: U128,
}

impl CapitalReturned<'_> {
    pub fn emit(self) {
        new_v1(PoolEventKind::CapitalReturned(&[self])).emit()
    }
}

// ============================================================================
// Custody Events
// ============================================================================

#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct RewardsFunded<'a> {
    pub sender_id: &'a AccountIdRef,
    pub token_id: &'a AccountIdRef,
    pub amount: U128,
}

impl RewardsFunded<'_> {
    pub fn emit(self) {
        new_v1(PoolEventKind::RewardsFunded(&[self])).emit()
    }
}

#[must_use]
#[derive(Serialize, Debug, Clone)]
#[serde(crate = "near_sdk::serde")]
pub struct PayoutFailed<'a> {
    pub receiver_id: &'a AccountIdRef,
    pub token_id: &'a AccountIdRef,
    pub amount: U128,
    /// Where the funds were re-credited: `escrow`, `principal` or `reserve`.
    pub credited_to: &'a str,
}

impl PayoutFailed<'_> {
    pub fn emit(self) {
        new_v1(PoolEventKind::PayoutFailed(&[self])).emit()
    }
}

fn is_zero(value: &U128) -> bool {
    value.0 == 0
}
