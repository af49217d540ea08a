//! # Settlement
//!
//! Asset movement between the pool's custody and the outside world.
//!
//! Inbound funds arrive through NEP-141 `ft_transfer_call`. The `msg` selects
//! what the transfer is for:
//!
//! ```json
//! {"deposit": {"lock": {"tenure": 2}, "frequency": 3}}
//! {"escrow": {}}
//! {"fund_rewards": {}}
//! {"return_capital": {}}
//! ```
//!
//! An empty `msg` escrows the funds. Any failure panics, which makes the
//! token contract refund the full transfer.
//!
//! Outbound funds leave through `ft_transfer` followed by `resolve_payout`,
//! which puts a failed transfer back on the books.

use near_contract_standards::fungible_token::core::ext_ft_core;
use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
use near_sdk::json_types::U128;
use near_sdk::{
    env, ext_contract, near, AccountId, FunctionError, Gas, NearToken, Promise, PromiseOrValue,
};

use crate::config::LockChoice;
use crate::errors::{PoolError, PoolResult};
use crate::events::{CapitalReturned, PayoutFailed, RewardsFunded};
use crate::lifecycle;
use crate::roles::Role;
use crate::{now_secs, Contract, ContractExt};

/// Gas for the outbound `ft_transfer`.
pub const GAS_FOR_FT_TRANSFER: Gas = Gas::from_tgas(30);
/// Gas for the `resolve_payout` callback.
pub const GAS_FOR_RESOLVE_PAYOUT: Gas = Gas::from_tgas(10);

#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FtTransferAction {
    /// Opens a deposit for exactly the transferred amount.
    Deposit(DepositMessage),
    /// Credits the sender's pre-authorized balance.
    Escrow {},
    /// Tops up the reward reserve.
    FundRewards {},
    /// Fund manager sends deployed capital back.
    ReturnCapital {},
}

#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositMessage {
    pub lock: LockChoice,
    pub frequency: Option<u32>,
}

impl FtTransferAction {
    pub fn parse(msg: &str) -> PoolResult<Self> {
        if msg.trim().is_empty() {
            return Ok(Self::Escrow {});
        }
        serde_json::from_str(msg).map_err(|err| PoolError::InvalidMessage {
            reason: err.to_string(),
        })
    }
}

/// Who an outbound transfer was for, so a failure can be re-credited.
#[near(serializers = [json])]
#[derive(Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
    Depositor,
    Deployment {
        account_id: AccountId,
        deposit_id: u32,
    },
}

#[ext_contract(ext_self)]
pub trait _ExtSelf {
    fn resolve_payout(
        &mut self,
        asset_index: u32,
        receiver_id: AccountId,
        amount: U128,
        kind: PayoutKind,
    ) -> U128;
}

impl Contract {
    /// Sends `amount` of the asset at `asset_index` to `receiver_id`.
    ///
    /// Custody counters must already reflect the transfer; `resolve_payout`
    /// reverses them if the token contract rejects it. Zero amounts schedule
    /// nothing.
    pub(crate) fn pay(
        &self,
        asset_index: u32,
        receiver_id: AccountId,
        amount: u128,
        kind: PayoutKind,
    ) -> PoolResult<Option<Promise>> {
        if amount == 0 {
            return Ok(None);
        }
        let token_id = self.asset(asset_index)?.token_id.clone();
        let promise = ext_ft_core::ext(token_id)
            .with_attached_deposit(NearToken::from_yoctonear(1))
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(receiver_id.clone(), U128(amount), None)
            .then(
                ext_self::ext(env::current_account_id())
                    .with_static_gas(GAS_FOR_RESOLVE_PAYOUT)
                    .resolve_payout(asset_index, receiver_id, U128(amount), kind),
            );
        Ok(Some(promise))
    }

    fn handle_transfer(
        &mut self,
        token_id: &AccountId,
        sender_id: AccountId,
        amount: u128,
        msg: &str,
    ) -> PoolResult<()> {
        let asset_index = self.asset_index_of(token_id)?;
        let action = FtTransferAction::parse(msg)?;
        if amount == 0 {
            return Err(PoolError::InvalidDepositAmount);
        }

        match action {
            FtTransferAction::Deposit(DepositMessage { lock, frequency }) => {
                self.require_not_paused()?;
                self.access.require(Role::Whitelisted, &sender_id)?;
                let record = self.prepare_deposit(asset_index, amount, lock, frequency)?;
                self.asset_mut(asset_index)?.receive(amount)?;
                self.commit_deposit(&sender_id, record)?;
            }
            FtTransferAction::Escrow {} => {
                self.require_not_paused()?;
                let balance = self
                    .escrow_of(&sender_id, asset_index)
                    .checked_add(amount)
                    .ok_or(PoolError::Overflow)?;
                let asset = self.asset_mut(asset_index)?;
                asset.receive(amount)?;
                asset.credit_escrow(amount)?;
                self.set_escrow(&sender_id, asset_index, balance);
                env::log_str(&format!(
                    "escrow_credited account={} asset_index={} amount={} balance={}",
                    sender_id, asset_index, amount, balance
                ));
            }
            FtTransferAction::FundRewards {} => {
                self.asset_mut(asset_index)?.receive(amount)?;
                RewardsFunded {
                    sender_id: &sender_id,
                    token_id,
                    amount: U128(amount),
                }
                .emit();
            }
            FtTransferAction::ReturnCapital {} => {
                self.access.require(Role::FundManager, &sender_id)?;
                let asset = self.asset_mut(asset_index)?;
                asset.receive(amount)?;
                asset.returned = asset
                    .returned
                    .checked_add(amount)
                    .ok_or(PoolError::Overflow)?;
                CapitalReturned {
                    fund_manager_id: &sender_id,
                    token_id,
                    amount: U128(amount),
                }
                .emit();
            }
        }
        Ok(())
    }

    fn restore_failed_payout(
        &mut self,
        asset_index: u32,
        receiver_id: &AccountId,
        amount: u128,
        kind: &PayoutKind,
    ) -> PoolResult<&'static str> {
        match kind {
            PayoutKind::Depositor => {
                let balance = self
                    .escrow_of(receiver_id, asset_index)
                    .checked_add(amount)
                    .ok_or(PoolError::Overflow)?;
                let asset = self.asset_mut(asset_index)?;
                asset.restore_payout(amount)?;
                asset.credit_escrow(amount)?;
                self.set_escrow(receiver_id, asset_index, balance);
                Ok("escrow")
            }
            PayoutKind::Deployment {
                account_id,
                deposit_id,
            } => {
                self.asset_mut(asset_index)?.restore_deployment(amount)?;
                let mut record = self.ledger.get(account_id, *deposit_id)?.clone();
                if !record.is_active() {
                    return Ok("reserve");
                }
                lifecycle::restore_principal(
                    &mut record,
                    amount,
                    self.config.unlock_policy,
                    now_secs(),
                )?;
                self.asset_mut(asset_index)?.lock_principal(amount)?;
                self.ledger.replace(account_id, record)?;
                Ok("principal")
            }
        }
    }
}

#[near]
impl FungibleTokenReceiver for Contract {
    fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> PromiseOrValue<U128> {
        let token_id = env::predecessor_account_id();
        if let Err(err) = self.handle_transfer(&token_id, sender_id, amount.0, &msg) {
            err.panic();
        }
        PromiseOrValue::Value(U128(0))
    }
}

#[near]
impl Contract {
    /// Returns unused escrowed balance to the caller. Withdraws everything
    /// when `amount` is omitted.
    #[handle_result]
    pub fn withdraw_escrow(&mut self, asset_index: u32, amount: Option<U128>) -> Result<U128, PoolError> {
        let account_id = env::predecessor_account_id();
        let balance = self.escrow_of(&account_id, asset_index);
        self.asset(asset_index)?;
        let amount = amount.map(|a| a.0).unwrap_or(balance);
        if amount == 0 || amount > balance {
            return Err(PoolError::InvalidAmount {
                amount: U128(amount),
                max: U128(balance),
            });
        }

        let asset = self.asset_mut(asset_index)?;
        asset.debit_escrow(amount)?;
        asset.settle(0, amount)?;
        self.set_escrow(&account_id, asset_index, balance - amount);
        env::log_str(&format!(
            "escrow_withdrawn account={} asset_index={} amount={}",
            account_id, asset_index, amount
        ));
        self.pay(asset_index, account_id, amount, PayoutKind::Depositor)?;
        Ok(U128(amount))
    }

    /// Finalizes an outbound transfer. A failed transfer is re-credited:
    /// depositor payouts to the depositor's escrow, deployments to the
    /// deposit's principal while it is active and to the reserve otherwise.
    #[private]
    #[handle_result]
    pub fn resolve_payout(
        &mut self,
        asset_index: u32,
        receiver_id: AccountId,
        amount: U128,
        kind: PayoutKind,
    ) -> Result<U128, PoolError> {
        match env::promise_result(0) {
            near_sdk::PromiseResult::Successful(_) => Ok(amount),
            _ => {
                let credited_to =
                    self.restore_failed_payout(asset_index, &receiver_id, amount.0, &kind)?;
                let token_id = self.asset(asset_index)?.token_id.clone();
                PayoutFailed {
                    receiver_id: &receiver_id,
                    token_id: &token_id,
                    amount,
                    credited_to,
                }
                .emit();
                Ok(U128(0))
            }
        }
    }
}
