//! # Accepted Assets and Custody
//!
//! The pool accepts an ordered list of NEP-141 assets. Each entry carries its
//! own decimals and the counters that make up the pool's custody position:
//!
//! ```text
//! custody  = inflow - paid_out - deployed
//! reserve  = custody - principal - escrowed
//! ```
//!
//! `principal + escrowed <= custody` holds after every operation; yield and
//! fees are always paid out of the reserve.

use near_sdk::json_types::U128;
use near_sdk::{env, near, AccountId};

use crate::errors::{PoolError, PoolResult};
use crate::roles::Role;
use crate::{Contract, ContractExt};

/// Escrowed balances are keyed by depositor and asset index.
pub type EscrowKey = (AccountId, u32);

/// Asset registration arguments.
#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct AssetInit {
    pub token_id: AccountId,
    pub decimals: u8,
    /// Minimum deposit in whole tokens, scaled by `decimals`.
    pub min_deposit_units: Option<U128>,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    pub token_id: AccountId,
    pub decimals: u8,
    pub min_deposit: u128,
    pub custody: u128,
    /// Sum of the principal of all active deposits.
    pub principal: u128,
    pub escrowed: u128,
    pub inflow: u128,
    pub paid_out: u128,
    pub deployed: u128,
    pub returned: u128,
}

impl Asset {
    pub fn new(init: AssetInit) -> PoolResult<Self> {
        let units = init.min_deposit_units.map(|u| u.0).unwrap_or_default();
        let scale = 10u128
            .checked_pow(init.decimals as u32)
            .ok_or(PoolError::Overflow)?;
        let min_deposit = units.checked_mul(scale).ok_or(PoolError::Overflow)?;
        Ok(Self {
            token_id: init.token_id,
            decimals: init.decimals,
            min_deposit,
            custody: 0,
            principal: 0,
            escrowed: 0,
            inflow: 0,
            paid_out: 0,
            deployed: 0,
            returned: 0,
        })
    }

    /// Funds available for yield, fees and penalties.
    pub fn reserve(&self) -> u128 {
        self.custody
            .saturating_sub(self.principal)
            .saturating_sub(self.escrowed)
    }

    /// Capital sent out by fund managers and not yet returned.
    pub fn outstanding_deployment(&self) -> u128 {
        self.deployed.saturating_sub(self.returned)
    }

    pub fn receive(&mut self, amount: u128) -> PoolResult<()> {
        self.custody = self.custody.checked_add(amount).ok_or(PoolError::Overflow)?;
        self.inflow = self.inflow.checked_add(amount).ok_or(PoolError::Overflow)?;
        Ok(())
    }

    pub fn lock_principal(&mut self, amount: u128) -> PoolResult<()> {
        self.principal = self
            .principal
            .checked_add(amount)
            .ok_or(PoolError::Overflow)?;
        Ok(())
    }

    pub fn credit_escrow(&mut self, amount: u128) -> PoolResult<()> {
        self.escrowed = self.escrowed.checked_add(amount).ok_or(PoolError::Overflow)?;
        Ok(())
    }

    pub fn debit_escrow(&mut self, amount: u128) -> PoolResult<()> {
        self.escrowed = self.escrowed.checked_sub(amount).ok_or(PoolError::Overflow)?;
        Ok(())
    }

    /// Releases `released` principal and pays `payout` out of custody.
    ///
    /// Fails without touching any counter when the payout exceeds what is
    /// left once the released principal has joined the reserve.
    pub fn settle(&mut self, released: u128, payout: u128) -> PoolResult<()> {
        let principal = self
            .principal
            .checked_sub(released)
            .ok_or(PoolError::Overflow)?;
        let available = self
            .custody
            .saturating_sub(principal)
            .saturating_sub(self.escrowed);
        if payout > available {
            return Err(PoolError::InsufficientPoolBalance {
                required: U128(payout),
                available: U128(available),
            });
        }
        self.principal = principal;
        self.custody -= payout;
        self.paid_out = self.paid_out.checked_add(payout).ok_or(PoolError::Overflow)?;
        Ok(())
    }

    /// Moves principal out of custody for off-pool deployment.
    pub fn deploy(&mut self, amount: u128) -> PoolResult<()> {
        let principal = self
            .principal
            .checked_sub(amount)
            .ok_or(PoolError::Overflow)?;
        let custody = self.custody.checked_sub(amount).ok_or(PoolError::Overflow)?;
        self.principal = principal;
        self.custody = custody;
        self.deployed = self.deployed.checked_add(amount).ok_or(PoolError::Overflow)?;
        Ok(())
    }

    /// Puts a failed payout back into custody.
    pub fn restore_payout(&mut self, amount: u128) -> PoolResult<()> {
        self.custody = self.custody.checked_add(amount).ok_or(PoolError::Overflow)?;
        self.paid_out = self.paid_out.checked_sub(amount).ok_or(PoolError::Overflow)?;
        Ok(())
    }

    /// Puts a failed deployment back into custody.
    pub fn restore_deployment(&mut self, amount: u128) -> PoolResult<()> {
        self.custody = self.custody.checked_add(amount).ok_or(PoolError::Overflow)?;
        self.deployed = self.deployed.checked_sub(amount).ok_or(PoolError::Overflow)?;
        Ok(())
    }
}

#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct AssetView {
    pub index: u32,
    pub token_id: AccountId,
    pub decimals: u8,
    pub min_deposit: U128,
    pub custody: U128,
    pub principal: U128,
    pub escrowed: U128,
    pub reserve: U128,
    pub deployed: U128,
    pub returned: U128,
    pub paid_out: U128,
}

impl AssetView {
    fn new(index: u32, asset: &Asset) -> Self {
        Self {
            index,
            token_id: asset.token_id.clone(),
            decimals: asset.decimals,
            min_deposit: U128(asset.min_deposit),
            custody: U128(asset.custody),
            principal: U128(asset.principal),
            escrowed: U128(asset.escrowed),
            reserve: U128(asset.reserve()),
            deployed: U128(asset.deployed),
            returned: U128(asset.returned),
            paid_out: U128(asset.paid_out),
        }
    }
}

impl Contract {
    pub(crate) fn push_asset(&mut self, init: AssetInit) -> PoolResult<u32> {
        if self.assets.iter().any(|a| a.token_id == init.token_id) {
            return Err(PoolError::AssetAlreadyRegistered {
                token_id: init.token_id,
            });
        }
        let index = self.assets.len() as u32;
        self.assets.push(Asset::new(init)?);
        Ok(index)
    }

    pub(crate) fn asset(&self, index: u32) -> PoolResult<&Asset> {
        self.assets
            .get(index as usize)
            .ok_or(PoolError::InvalidTokenId { index })
    }

    pub(crate) fn asset_mut(&mut self, index: u32) -> PoolResult<&mut Asset> {
        self.assets
            .get_mut(index as usize)
            .ok_or(PoolError::InvalidTokenId { index })
    }

    pub(crate) fn asset_index_of(&self, token_id: &AccountId) -> PoolResult<u32> {
        self.assets
            .iter()
            .position(|a| &a.token_id == token_id)
            .map(|i| i as u32)
            .ok_or_else(|| PoolError::UnknownAsset {
                token_id: token_id.clone(),
            })
    }

    pub(crate) fn escrow_of(&self, account_id: &AccountId, asset_index: u32) -> u128 {
        self.escrow
            .get(&(account_id.clone(), asset_index))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn set_escrow(&mut self, account_id: &AccountId, asset_index: u32, amount: u128) {
        let key = (account_id.clone(), asset_index);
        if amount == 0 {
            self.escrow.remove(&key);
        } else {
            self.escrow.insert(key, amount);
        }
    }
}

#[near]
impl Contract {
    /// Appends an accepted asset. Pool manager only.
    #[handle_result]
    pub fn register_asset(&mut self, asset: AssetInit) -> Result<u32, PoolError> {
        let caller = self.require_role(Role::PoolManager)?;
        let token_id = asset.token_id.clone();
        let index = self.push_asset(asset)?;
        env::log_str(&format!(
            "asset_registered index={} token={} by={}",
            index, token_id, caller
        ));
        Ok(index)
    }

    pub fn get_assets(&self) -> Vec<AssetView> {
        self.assets
            .iter()
            .enumerate()
            .map(|(i, asset)| AssetView::new(i as u32, asset))
            .collect()
    }

    #[handle_result]
    pub fn get_asset(&self, index: u32) -> Result<AssetView, PoolError> {
        Ok(AssetView::new(index, self.asset(index)?))
    }

    /// Pre-authorized balance that `deposit` may draw from.
    pub fn escrow_balance_of(&self, account_id: AccountId, asset_index: u32) -> U128 {
        U128(self.escrow_of(&account_id, asset_index))
    }
}
