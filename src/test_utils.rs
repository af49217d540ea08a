//! # Test Utilities
//!
//! Helper functions and builders for unit testing the contract. They handle
//! NEAR SDK context initialization, block time and pool configuration.
//!
//! ## Modules
//!
//! - [`helpers`]: Low-level context setup and funding
//! - [`builders`]: Builder pattern for flexible contract configuration

/// Helper functions for test context and contract funding.
#[cfg(test)]
pub mod helpers {
    use crate::config::{PoolConfig, TenureMode, UnlockPolicy};
    use crate::Contract;
    use near_contract_standards::fungible_token::receiver::FungibleTokenReceiver;
    use near_sdk::json_types::U128;
    use near_sdk::test_utils::VMContextBuilder;
    use near_sdk::{testing_env, NearToken};

    pub const DAY: u64 = 86_400;
    pub const MONTH: u64 = 30 * DAY;
    /// Block time used by the builder, in seconds.
    pub const T0: u64 = 1_700_000_000;

    /// Initializes the NEAR VM context for testing at block time [`T0`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// init_ctx("alice.test", 1); // Alice calls with 1 yoctoNEAR
    /// contract.some_method();
    /// ```
    pub fn init_ctx(predecessor: &str, deposit_yocto: u128) {
        let mut builder = VMContextBuilder::new();
        builder
            .predecessor_account_id(predecessor.parse().unwrap())
            .attached_deposit(NearToken::from_yoctonear(deposit_yocto))
            .block_timestamp(T0 * 1_000_000_000);
        testing_env!(builder.build());
    }

    /// Sets the caller and the block time in seconds.
    pub fn ctx_at(predecessor: &str, now_secs: u64) {
        let mut builder = VMContextBuilder::new();
        builder
            .predecessor_account_id(predecessor.parse().unwrap())
            .block_timestamp(now_secs * 1_000_000_000);
        testing_env!(builder.build());
    }

    /// Simulates `ft_transfer_call` from `token` at block time [`T0`].
    pub fn fund(contract: &mut Contract, token: &str, sender: &str, amount: u128, msg: &str) {
        ctx_at(token, T0);
        let _ = contract.ft_on_transfer(sender.parse().unwrap(), U128(amount), msg.to_string());
    }

    /// Three monthly tenure buckets at 12% a year, one cycle per lock.
    pub fn bucket_config() -> PoolConfig {
        PoolConfig {
            pool_id: 1,
            tenure: TenureMode::Buckets {
                durations: vec![MONTH, 2 * MONTH, 3 * MONTH],
            },
            base_rate_bps: 1_200,
            frequencies: vec![1],
            hot_period: 0,
            cooldown_period: 0,
            withdraw_penalty_percent: 10,
            unlock_policy: UnlockPolicy::CycleBoundary,
        }
    }
}

/// Builder pattern for flexible contract configuration in tests.
#[cfg(test)]
pub mod builders {
    use crate::assets::AssetInit;
    use crate::config::PoolConfig;
    use crate::roles::Role;
    use crate::test_utils::helpers::{bucket_config, init_ctx};
    use crate::Contract;
    use near_sdk::json_types::U128;

    /// Builder for test `Contract` instances.
    ///
    /// Defaults to [`bucket_config`] and a single 6-decimal `usdc.test`
    /// asset with a 1 token minimum. The owner stays the predecessor after
    /// `build`.
    ///
    /// ```ignore
    /// let contract = ContractBuilder::new("owner.test")
    ///     .whitelist("alice.test")
    ///     .fund_manager("fm.test")
    ///     .build();
    /// ```
    pub struct ContractBuilder {
        owner: String,
        config: PoolConfig,
        assets: Vec<AssetInit>,
        whitelist: Vec<String>,
        fund_managers: Vec<String>,
    }

    impl ContractBuilder {
        pub fn new(owner: &str) -> Self {
            Self {
                owner: owner.to_string(),
                config: bucket_config(),
                assets: vec![AssetInit {
                    token_id: "usdc.test".parse().unwrap(),
                    decimals: 6,
                    min_deposit_units: Some(U128(1)),
                }],
                whitelist: Vec::new(),
                fund_managers: Vec::new(),
            }
        }

        pub fn config(mut self, config: PoolConfig) -> Self {
            self.config = config;
            self
        }

        /// Appends an accepted asset after the default one.
        pub fn asset(mut self, token_id: &str, decimals: u8) -> Self {
            self.assets.push(AssetInit {
                token_id: token_id.parse().unwrap(),
                decimals,
                min_deposit_units: None,
            });
            self
        }

        pub fn whitelist(mut self, account: &str) -> Self {
            self.whitelist.push(account.to_string());
            self
        }

        pub fn fund_manager(mut self, account: &str) -> Self {
            self.fund_managers.push(account.to_string());
            self
        }

        pub fn build(self) -> Contract {
            init_ctx(&self.owner, 0);
            let mut c = Contract::init(self.owner.parse().unwrap(), self.config, self.assets);
            if !self.whitelist.is_empty() {
                c.whitelist_addresses(self.whitelist.iter().map(|a| a.parse().unwrap()).collect())
                    .unwrap();
            }
            for account in self.fund_managers {
                c.grant_role(Role::FundManager, account.parse().unwrap())
                    .unwrap();
            }
            c
        }
    }
}
