//! # Pool Operations
//!
//! Public depositor and fund-manager methods. Each one follows the same
//! sequence:
//!
//! 1. **Checks**: pause switch, role, deposit lookup
//! 2. **Transition**: the lifecycle function runs on a copy of the record
//! 3. **Effects**: custody is settled, then the record is written back
//! 4. **Interactions**: the payout transfer is scheduled
//!
//! A failure in steps 1 to 3 returns before any storage write.

use near_sdk::json_types::U128;
use near_sdk::{env, near, AccountId};

use crate::accrual::{accrue, YieldDetails};
use crate::config::LockChoice;
use crate::errors::{PoolError, PoolResult};
use crate::events::{CapitalDeployed, EmergencyWithdraw, PoolDeposit, PoolWithdraw, Reinvest, YieldClaim};
use crate::ledger::DepositRecord;
use crate::lifecycle::{self, Transition};
use crate::roles::Role;
use crate::settlement::PayoutKind;
use crate::{now_secs, Contract, ContractExt};

impl Contract {
    /// Validates a new deposit without touching state.
    pub(crate) fn prepare_deposit(
        &self,
        asset_index: u32,
        amount: u128,
        lock: LockChoice,
        frequency: Option<u32>,
    ) -> PoolResult<DepositRecord> {
        let asset = self.asset(asset_index)?;
        lifecycle::open(
            &self.config,
            asset_index,
            asset,
            amount,
            lock,
            frequency,
            now_secs(),
        )
    }

    /// Books a validated deposit whose funds are already in custody.
    pub(crate) fn commit_deposit(
        &mut self,
        account_id: &AccountId,
        record: DepositRecord,
    ) -> PoolResult<u32> {
        let asset = self.asset_mut(record.asset_index)?;
        asset.lock_principal(record.principal)?;
        let token_id = asset.token_id.clone();

        let (amount, lock_duration, cycles, rate_bps) =
            (record.principal, record.lock_duration, record.cycles, record.rate_bps);
        let deposit_id = self.ledger.insert(account_id, record);

        PoolDeposit {
            account_id,
            deposit_id,
            token_id: &token_id,
            amount: U128(amount),
            lock_duration,
            cycles,
            rate_bps,
        }
        .emit();
        Ok(deposit_id)
    }

    /// Settles `transition` against custody and stores `record`.
    fn apply(
        &mut self,
        account_id: &AccountId,
        record: DepositRecord,
        transition: &Transition,
    ) -> PoolResult<()> {
        self.asset_mut(record.asset_index)?
            .settle(transition.released, transition.payout)?;
        self.ledger.replace(account_id, record)
    }

    fn deposit_of(&self, account_id: &AccountId, deposit_id: u32) -> PoolResult<DepositRecord> {
        self.ledger.get(account_id, deposit_id).cloned()
    }
}

#[near]
impl Contract {
    /// Opens a deposit funded from the caller's escrowed balance.
    ///
    /// # Arguments
    ///
    /// * `asset_index` - Index into the accepted asset list
    /// * `amount` - Principal in the asset's base units
    /// * `lock` - Tenure option or locking period, depending on the pool
    /// * `frequency` - Cycles per lock; defaults to the pool's first offer
    ///
    /// # Returns
    ///
    /// The new deposit id.
    #[handle_result]
    pub fn deposit(
        &mut self,
        asset_index: u32,
        amount: U128,
        lock: LockChoice,
        frequency: Option<u32>,
    ) -> Result<u32, PoolError> {
        self.require_not_paused()?;
        let account_id = self.require_role(Role::Whitelisted)?;
        let record = self.prepare_deposit(asset_index, amount.0, lock, frequency)?;

        let escrowed = self.escrow_of(&account_id, asset_index);
        if escrowed < amount.0 {
            return Err(PoolError::InsufficientAllowance {
                required: amount,
                available: U128(escrowed),
            });
        }
        self.asset_mut(asset_index)?.debit_escrow(amount.0)?;
        self.set_escrow(&account_id, asset_index, escrowed - amount.0);
        self.commit_deposit(&account_id, record)
    }

    /// Claims the unlocked yield of one of the caller's deposits.
    #[handle_result]
    pub fn claim(&mut self, deposit_id: u32) -> Result<U128, PoolError> {
        self.require_not_paused()?;
        let account_id = env::predecessor_account_id();
        let mut record = self.deposit_of(&account_id, deposit_id)?;
        let asset_index = record.asset_index;

        let transition = lifecycle::claim(&mut record, &self.config, now_secs())?;
        let unlocked_until = record.last_claim_time;
        self.apply(&account_id, record, &transition)?;

        env::log_str(&format!(
            "claim account={} deposit_id={} amount={} fee={}",
            account_id, deposit_id, transition.payout, transition.retained
        ));
        YieldClaim {
            account_id: &account_id,
            deposit_id,
            amount: U128(transition.payout),
            fee: U128(transition.retained),
            unlocked_until,
        }
        .emit();

        self.pay(asset_index, account_id, transition.payout, PayoutKind::Depositor)?;
        Ok(U128(transition.payout))
    }

    /// Withdraws a matured deposit: principal plus all unsettled yield.
    #[handle_result]
    pub fn withdraw(&mut self, deposit_id: u32) -> Result<U128, PoolError> {
        self.require_not_paused()?;
        let account_id = env::predecessor_account_id();
        let mut record = self.deposit_of(&account_id, deposit_id)?;
        let asset_index = record.asset_index;

        let transition = lifecycle::withdraw(&mut record, now_secs())?;
        self.apply(&account_id, record, &transition)?;

        PoolWithdraw {
            account_id: &account_id,
            deposit_id,
            principal: U128(transition.released),
            yield_amount: U128(transition.yield_paid),
        }
        .emit();

        self.pay(asset_index, account_id, transition.payout, PayoutKind::Depositor)?;
        Ok(U128(transition.payout))
    }

    /// Exits before maturity at the configured principal penalty. All
    /// unsettled yield is forfeited.
    #[handle_result]
    pub fn emergency_withdraw(&mut self, deposit_id: u32) -> Result<U128, PoolError> {
        self.require_not_paused()?;
        let account_id = env::predecessor_account_id();
        let mut record = self.deposit_of(&account_id, deposit_id)?;
        let asset_index = record.asset_index;

        let transition = lifecycle::emergency_withdraw(
            &mut record,
            self.config.withdraw_penalty_percent,
            now_secs(),
        )?;
        self.apply(&account_id, record, &transition)?;

        EmergencyWithdraw {
            account_id: &account_id,
            deposit_id,
            amount: U128(transition.payout),
            penalty: U128(transition.retained),
        }
        .emit();

        self.pay(asset_index, account_id, transition.payout, PayoutKind::Depositor)?;
        Ok(U128(transition.payout))
    }

    /// Rolls `amount` of a matured deposit's principal into a new term at
    /// the current base rate. The remaining principal and the final yield
    /// are paid to the depositor. Fund manager only.
    #[handle_result]
    pub fn reinvest(
        &mut self,
        account_id: AccountId,
        deposit_id: u32,
        amount: U128,
    ) -> Result<U128, PoolError> {
        self.require_not_paused()?;
        let fund_manager = self.require_role(Role::FundManager)?;
        let mut record = self.deposit_of(&account_id, deposit_id)?;
        let asset_index = record.asset_index;

        let transition =
            lifecycle::reinvest(&mut record, amount.0, self.config.base_rate_bps, now_secs())?;
        self.apply(&account_id, record, &transition)?;

        Reinvest {
            fund_manager_id: &fund_manager,
            account_id: &account_id,
            deposit_id,
            amount,
            payout: U128(transition.payout),
        }
        .emit();

        self.pay(asset_index, account_id, transition.payout, PayoutKind::Depositor)?;
        Ok(U128(transition.payout))
    }

    /// Sends up to a deposit's principal to `receiver_id` for off-pool
    /// deployment. The deposit stays active with reduced principal. Fund
    /// manager only.
    ///
    /// Nothing obliges the capital to come back before the depositor
    /// withdraws; `deployed` and `returned` on the asset track the exposure.
    #[handle_result]
    pub fn transfer_principal(
        &mut self,
        account_id: AccountId,
        deposit_id: u32,
        amount: U128,
        receiver_id: AccountId,
    ) -> Result<(), PoolError> {
        self.require_not_paused()?;
        let fund_manager = self.require_role(Role::FundManager)?;
        let mut record = self.deposit_of(&account_id, deposit_id)?;
        let asset_index = record.asset_index;

        lifecycle::transfer_out(
            &mut record,
            amount.0,
            self.config.unlock_policy,
            now_secs(),
        )?;
        self.asset_mut(asset_index)?.deploy(amount.0)?;
        self.ledger.replace(&account_id, record)?;

        CapitalDeployed {
            fund_manager_id: &fund_manager,
            account_id: &account_id,
            deposit_id,
            receiver_id: &receiver_id,
            amount,
        }
        .emit();

        self.pay(
            asset_index,
            receiver_id,
            amount.0,
            PayoutKind::Deployment {
                account_id,
                deposit_id,
            },
        )?;
        Ok(())
    }

    /// Current yield position of a deposit, including the earliest time a
    /// claim passes every timing gate.
    #[handle_result]
    pub fn yield_claim_details(
        &self,
        account_id: AccountId,
        deposit_id: u32,
    ) -> Result<YieldDetails, PoolError> {
        let record = self.ledger.get(&account_id, deposit_id)?;
        let now = now_secs();
        let accrual = accrue(record, self.config.unlock_policy, now)?;
        let next_eligible = lifecycle::next_eligible_time(record, &self.config, &accrual);
        Ok(YieldDetails::new(record, &accrual, next_eligible, now))
    }
}
