//! # Contract Upgrade
//!
//! The new WASM code is passed as the raw function input, not as a JSON
//! argument:
//!
//! ```bash
//! near call <pool_id> update_contract --base64-file <path_to_wasm> --accountId <owner_id>
//! ```
//!
//! State layout must stay borsh-compatible across upgrades; there is no
//! migration hook.

use near_sdk::{env, near, Promise};

use crate::errors::PoolError;
use crate::roles::Role;
use crate::{Contract, ContractExt};

#[near]
impl Contract {
    /// Deploys new code to the pool account. Owner only.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the caller is not the owner
    /// - `InvalidMessage` if no code was provided
    #[handle_result]
    pub fn update_contract(&self) -> Result<Promise, PoolError> {
        let caller = self.require_role(Role::Owner)?;
        let code = env::input()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| PoolError::InvalidMessage {
                reason: "no contract code provided".to_string(),
            })?;

        env::log_str(&format!(
            "contract_upgrade by={} code_len={}",
            caller,
            code.len()
        ));
        Ok(Promise::new(env::current_account_id())
            .deploy_contract(code)
            .as_return())
    }
}
