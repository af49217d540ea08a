//! # Deposit Ledger
//!
//! Per-depositor deposit slots. Ids are sequential per depositor starting at
//! zero and double as the slot's index, so creation order is the id order.
//! Slots are never removed; a terminated deposit keeps its record with a
//! terminal [`DepositStatus`] and zero principal.

use near_sdk::json_types::{U128, U64};
use near_sdk::store::IterableMap;
use near_sdk::{near, AccountId, IntoStorageKey};

use crate::config::LockChoice;
use crate::errors::{PoolError, PoolResult};
use crate::{Contract, ContractExt};

const DEFAULT_PAGE_SIZE: u32 = 50;

#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepositStatus {
    Active,
    Withdrawn,
    EmergencyWithdrawn,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositRecord {
    pub id: u32,
    pub asset_index: u32,
    pub principal: u128,
    pub lock: LockChoice,
    /// Seconds from `start_time` to maturity.
    pub lock_duration: u64,
    pub cycles: u32,
    /// Annual rate snapshotted when the current accrual window opened.
    pub rate_bps: u32,
    pub start_time: u64,
    /// Yield before this time has been claimed or carried.
    pub last_claim_time: u64,
    /// `principal` and `rate_bps` apply from here on. Never before
    /// `last_claim_time`.
    pub accrual_checkpoint: u64,
    /// Yield accrued under earlier terms that is already claimable.
    pub carried_unlocked: u128,
    /// Yield accrued under earlier terms over
    /// `[last_claim_time, accrual_checkpoint)`, claimable once the unlock
    /// boundary passes the checkpoint.
    pub carried_locked: u128,
    pub last_claimed_at: Option<u64>,
    pub claimed_yield: u128,
    pub transferred_out: u128,
    pub status: DepositStatus,
}

impl DepositRecord {
    pub fn maturity(&self) -> u64 {
        self.start_time.saturating_add(self.lock_duration)
    }

    /// Length of one unlock cycle. Never zero for a validated configuration.
    pub fn cycle_length(&self) -> u64 {
        (self.lock_duration / self.cycles.max(1) as u64).max(1)
    }

    pub fn is_active(&self) -> bool {
        self.status == DepositStatus::Active
    }

    pub fn ensure_active(&self) -> PoolResult<()> {
        if !self.is_active() {
            return Err(PoolError::DepositNotActive {
                deposit_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct DepositView {
    pub id: u32,
    pub asset_index: u32,
    pub principal: U128,
    pub lock_duration: U64,
    pub cycles: u32,
    pub rate_bps: u32,
    pub start_time: U64,
    pub maturity: U64,
    pub last_claim_time: U64,
    pub claimed_yield: U128,
    pub transferred_out: U128,
    /// Yield frozen under earlier principal or rate, not yet claimed.
    pub carried_yield: U128,
    pub status: DepositStatus,
}

impl From<&DepositRecord> for DepositView {
    fn from(record: &DepositRecord) -> Self {
        DepositView {
            id: record.id,
            asset_index: record.asset_index,
            principal: U128(record.principal),
            lock_duration: U64(record.lock_duration),
            cycles: record.cycles,
            rate_bps: record.rate_bps,
            start_time: U64(record.start_time),
            maturity: U64(record.maturity()),
            last_claim_time: U64(record.last_claim_time),
            claimed_yield: U128(record.claimed_yield),
            transferred_out: U128(record.transferred_out),
            carried_yield: U128(record.carried_unlocked.saturating_add(record.carried_locked)),
            status: record.status,
        }
    }
}

#[near(serializers = [borsh])]
pub struct DepositLedger {
    by_account: IterableMap<AccountId, Vec<DepositRecord>>,
}

impl DepositLedger {
    pub fn new<S: IntoStorageKey>(prefix: S) -> Self {
        Self {
            by_account: IterableMap::new(prefix),
        }
    }

    pub fn next_id(&self, account_id: &AccountId) -> u32 {
        self.by_account
            .get(account_id)
            .map(|slots| slots.len() as u32)
            .unwrap_or_default()
    }

    /// Appends `record` under the next id and returns that id.
    pub fn insert(&mut self, account_id: &AccountId, mut record: DepositRecord) -> u32 {
        let slots = self.by_account.entry(account_id.clone()).or_default();
        let id = slots.len() as u32;
        record.id = id;
        slots.push(record);
        id
    }

    pub fn get(&self, account_id: &AccountId, deposit_id: u32) -> PoolResult<&DepositRecord> {
        self.by_account
            .get(account_id)
            .and_then(|slots| slots.get(deposit_id as usize))
            .ok_or_else(|| PoolError::DepositNotFound {
                account_id: account_id.clone(),
                deposit_id,
            })
    }

    pub fn replace(&mut self, account_id: &AccountId, record: DepositRecord) -> PoolResult<()> {
        let deposit_id = record.id;
        let slot = self
            .by_account
            .get_mut(account_id)
            .and_then(|slots| slots.get_mut(deposit_id as usize))
            .ok_or_else(|| PoolError::DepositNotFound {
                account_id: account_id.clone(),
                deposit_id,
            })?;
        *slot = record;
        Ok(())
    }

    pub fn records(&self, account_id: &AccountId) -> &[DepositRecord] {
        self.by_account
            .get(account_id)
            .map(|slots| slots.as_slice())
            .unwrap_or_default()
    }

    pub fn active_ids(&self, account_id: &AccountId) -> Vec<u32> {
        self.records(account_id)
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.id)
            .collect()
    }

    pub fn depositors(&self) -> impl Iterator<Item = &AccountId> {
        self.by_account.keys()
    }
}

#[near]
impl Contract {
    #[handle_result]
    pub fn get_deposit(&self, account_id: AccountId, deposit_id: u32) -> Result<DepositView, PoolError> {
        self.ledger.get(&account_id, deposit_id).map(DepositView::from)
    }

    /// Paginated deposits of `account_id` in creation order.
    pub fn get_deposits(
        &self,
        account_id: AccountId,
        from_index: Option<u32>,
        limit: Option<u32>,
    ) -> Vec<DepositView> {
        self.ledger
            .records(&account_id)
            .iter()
            .skip(from_index.unwrap_or_default() as usize)
            .take(limit.unwrap_or(DEFAULT_PAGE_SIZE) as usize)
            .map(DepositView::from)
            .collect()
    }

    /// Ids of non-terminated deposits, earliest first.
    pub fn get_active_deposit_ids(&self, account_id: AccountId) -> Vec<u32> {
        self.ledger.active_ids(&account_id)
    }

    /// Number of deposit slots ever opened by `account_id`.
    pub fn total_user_deposits(&self, account_id: AccountId) -> u32 {
        self.ledger.next_id(&account_id)
    }

    pub fn get_depositors(&self, from_index: Option<u32>, limit: Option<u32>) -> Vec<AccountId> {
        self.ledger
            .depositors()
            .skip(from_index.unwrap_or_default() as usize)
            .take(limit.unwrap_or(DEFAULT_PAGE_SIZE) as usize)
            .cloned()
            .collect()
    }
}
