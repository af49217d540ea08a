//! # Access Registry
//!
//! Role membership consulted by every privileged or depositor operation.
//! Roles form a management chain:
//!
//! ```text
//! owner ──> hr ──> pool_manager | fund_manager | verifier
//!                                                  └──> whitelisted
//! ```
//!
//! Each role is granted and revoked only by the role above it. The owner
//! implicitly holds every administrative role; whitelist membership is never
//! implicit and must be granted explicitly.

use std::fmt;

use near_sdk::store::IterableSet;
use near_sdk::{env, near, AccountId};

use crate::errors::{PoolError, PoolResult};
use crate::{Contract, ContractExt, StorageKey};

#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Owner,
    Hr,
    PoolManager,
    FundManager,
    Verifier,
    Whitelisted,
}

impl Role {
    /// The role allowed to grant and revoke `self`.
    pub fn manager(self) -> Role {
        match self {
            Role::Owner | Role::Hr => Role::Owner,
            Role::PoolManager | Role::FundManager | Role::Verifier => Role::Hr,
            Role::Whitelisted => Role::Verifier,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "owner",
            Role::Hr => "hr",
            Role::PoolManager => "pool_manager",
            Role::FundManager => "fund_manager",
            Role::Verifier => "verifier",
            Role::Whitelisted => "whitelisted",
        };
        f.write_str(name)
    }
}

#[near(serializers = [borsh])]
pub struct AccessRegistry {
    pub owner_id: AccountId,
    hr: IterableSet<AccountId>,
    pool_managers: IterableSet<AccountId>,
    fund_managers: IterableSet<AccountId>,
    verifiers: IterableSet<AccountId>,
    whitelist: IterableSet<AccountId>,
}

impl AccessRegistry {
    pub fn new(owner_id: AccountId) -> Self {
        Self {
            owner_id,
            hr: IterableSet::new(StorageKey::Hr),
            pool_managers: IterableSet::new(StorageKey::PoolManagers),
            fund_managers: IterableSet::new(StorageKey::FundManagers),
            verifiers: IterableSet::new(StorageKey::Verifiers),
            whitelist: IterableSet::new(StorageKey::Whitelist),
        }
    }

    fn members(&self, role: Role) -> Option<&IterableSet<AccountId>> {
        match role {
            Role::Owner => None,
            Role::Hr => Some(&self.hr),
            Role::PoolManager => Some(&self.pool_managers),
            Role::FundManager => Some(&self.fund_managers),
            Role::Verifier => Some(&self.verifiers),
            Role::Whitelisted => Some(&self.whitelist),
        }
    }

    fn members_mut(&mut self, role: Role) -> Option<&mut IterableSet<AccountId>> {
        match role {
            Role::Owner => None,
            Role::Hr => Some(&mut self.hr),
            Role::PoolManager => Some(&mut self.pool_managers),
            Role::FundManager => Some(&mut self.fund_managers),
            Role::Verifier => Some(&mut self.verifiers),
            Role::Whitelisted => Some(&mut self.whitelist),
        }
    }

    /// Explicit membership, without the owner's implicit privileges.
    pub fn is_member(&self, role: Role, account_id: &AccountId) -> bool {
        match self.members(role) {
            Some(set) => set.contains(account_id),
            None => &self.owner_id == account_id,
        }
    }

    /// Capability check used by every gated operation.
    pub fn has_role(&self, role: Role, account_id: &AccountId) -> bool {
        if role != Role::Whitelisted && &self.owner_id == account_id {
            return true;
        }
        self.is_member(role, account_id)
    }

    pub fn require(&self, role: Role, account_id: &AccountId) -> PoolResult<()> {
        if self.has_role(role, account_id) {
            return Ok(());
        }
        if role == Role::Whitelisted {
            return Err(PoolError::NotWhitelisted {
                account_id: account_id.clone(),
            });
        }
        Err(PoolError::Unauthorized {
            account_id: account_id.clone(),
            role,
        })
    }

    pub fn grant(&mut self, caller: &AccountId, role: Role, account_id: AccountId) -> PoolResult<bool> {
        self.require(role.manager(), caller)?;
        match self.members_mut(role) {
            Some(set) => Ok(set.insert(account_id)),
            None => Err(PoolError::Unauthorized {
                account_id: caller.clone(),
                role: Role::Owner,
            }),
        }
    }

    pub fn revoke(&mut self, caller: &AccountId, role: Role, account_id: &AccountId) -> PoolResult<bool> {
        self.require(role.manager(), caller)?;
        match self.members_mut(role) {
            Some(set) => Ok(set.remove(account_id)),
            None => Err(PoolError::Unauthorized {
                account_id: caller.clone(),
                role: Role::Owner,
            }),
        }
    }

    pub fn list(&self, role: Role) -> Vec<AccountId> {
        match self.members(role) {
            Some(set) => set.iter().cloned().collect(),
            None => vec![self.owner_id.clone()],
        }
    }
}

impl Contract {
    /// Asserts that the caller holds `role`, with the owner passing every
    /// administrative check.
    pub(crate) fn require_role(&self, role: Role) -> PoolResult<AccountId> {
        let caller = env::predecessor_account_id();
        self.access.require(role, &caller)?;
        Ok(caller)
    }
}

#[near]
impl Contract {
    /// Grants `role` to `account_id`. The caller must hold the managing role.
    #[handle_result]
    pub fn grant_role(&mut self, role: Role, account_id: AccountId) -> Result<bool, PoolError> {
        let caller = env::predecessor_account_id();
        let added = self.access.grant(&caller, role, account_id.clone())?;
        env::log_str(&format!(
            "role_granted role={} account={} by={}",
            role, account_id, caller
        ));
        Ok(added)
    }

    #[handle_result]
    pub fn revoke_role(&mut self, role: Role, account_id: AccountId) -> Result<bool, PoolError> {
        let caller = env::predecessor_account_id();
        let removed = self.access.revoke(&caller, role, &account_id)?;
        env::log_str(&format!(
            "role_revoked role={} account={} by={}",
            role, account_id, caller
        ));
        Ok(removed)
    }

    /// Whitelists several depositors at once. Verifier only.
    #[handle_result]
    pub fn whitelist_addresses(&mut self, account_ids: Vec<AccountId>) -> Result<u32, PoolError> {
        let caller = env::predecessor_account_id();
        let requested = account_ids.len();
        let mut added = 0;
        for account_id in account_ids {
            if self.access.grant(&caller, Role::Whitelisted, account_id)? {
                added += 1;
            }
        }
        env::log_str(&format!(
            "whitelist_updated requested={} added={} by={}",
            requested, added, caller
        ));
        Ok(added)
    }

    /// Hands ownership to `new_owner`. Owner only.
    #[handle_result]
    pub fn transfer_ownership(&mut self, new_owner: AccountId) -> Result<(), PoolError> {
        let caller = self.require_role(Role::Owner)?;
        env::log_str(&format!(
            "ownership_transferred from={} to={}",
            caller, new_owner
        ));
        self.access.owner_id = new_owner;
        Ok(())
    }

    // ==================== View Methods ====================

    pub fn owner(&self) -> AccountId {
        self.access.owner_id.clone()
    }

    pub fn is_hr(&self, account_id: AccountId) -> bool {
        self.access.is_member(Role::Hr, &account_id)
    }

    pub fn is_pool_manager(&self, account_id: AccountId) -> bool {
        self.access.is_member(Role::PoolManager, &account_id)
    }

    pub fn is_fund_manager(&self, account_id: AccountId) -> bool {
        self.access.is_member(Role::FundManager, &account_id)
    }

    pub fn is_verifier(&self, account_id: AccountId) -> bool {
        self.access.is_member(Role::Verifier, &account_id)
    }

    pub fn is_whitelisted(&self, account_id: AccountId) -> bool {
        self.access.is_member(Role::Whitelisted, &account_id)
    }

    pub fn get_role_members(&self, role: Role) -> Vec<AccountId> {
        self.access.list(role)
    }
}
