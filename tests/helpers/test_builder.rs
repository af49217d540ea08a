// Test builder pattern for scenario tests
// Wraps a contract together with the scenario clock

use near_sdk::json_types::U128;
use tenure_pool::{AssetInit, Contract, PoolConfig, Role};

use super::*;

pub struct TestScenarioBuilder {
    owner: String,
    config: PoolConfig,
    assets: Vec<AssetInit>,
    hr: Option<String>,
    fund_managers: Vec<String>,
    verifiers: Vec<String>,
    whitelist: Vec<String>,
}

impl TestScenarioBuilder {
    pub fn new() -> Self {
        Self {
            owner: "owner.test".to_string(),
            config: default_config(),
            assets: vec![AssetInit {
                token_id: account(USDC_ID),
                decimals: 6,
                min_deposit_units: Some(U128(1)),
            }],
            hr: None,
            fund_managers: Vec::new(),
            verifiers: Vec::new(),
            whitelist: Vec::new(),
        }
    }

    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn asset(mut self, token_id: &str, decimals: u8, min_deposit_units: u128) -> Self {
        self.assets.push(AssetInit {
            token_id: account(token_id),
            decimals,
            min_deposit_units: Some(U128(min_deposit_units)),
        });
        self
    }

    pub fn hr(mut self, name: &str) -> Self {
        self.hr = Some(name.to_string());
        self
    }

    pub fn fund_manager(mut self, name: &str) -> Self {
        self.fund_managers.push(name.to_string());
        self
    }

    pub fn verifier(mut self, name: &str) -> Self {
        self.verifiers.push(name.to_string());
        self
    }

    pub fn whitelist(mut self, name: &str) -> Self {
        self.whitelist.push(name.to_string());
        self
    }

    /// Initializes the pool at [`T0`] and walks the role chain: owner adds
    /// HR, HR adds operational roles, the first verifier (or the owner)
    /// whitelists depositors.
    pub fn build(self) -> Scenario {
        set_ctx(&self.owner, T0);
        let mut contract = Contract::init(account(&self.owner), self.config, self.assets);

        let hr = self.hr.unwrap_or_else(|| self.owner.clone());
        if hr != self.owner {
            contract.grant_role(Role::Hr, account(&hr)).unwrap();
        }

        set_ctx(&hr, T0);
        for fm in &self.fund_managers {
            contract.grant_role(Role::FundManager, account(fm)).unwrap();
        }
        for verifier in &self.verifiers {
            contract.grant_role(Role::Verifier, account(verifier)).unwrap();
        }

        let verifier = self
            .verifiers
            .first()
            .cloned()
            .unwrap_or_else(|| self.owner.clone());
        set_ctx(&verifier, T0);
        contract
            .whitelist_addresses(self.whitelist.iter().map(|w| account(w)).collect())
            .unwrap();

        Scenario {
            contract,
            owner: self.owner,
            now: T0,
        }
    }
}

/// A pool under test plus the scenario clock.
pub struct Scenario {
    pub contract: Contract,
    pub owner: String,
    pub now: u64,
}

impl Scenario {
    /// Sets `caller` as predecessor at the current scenario time.
    pub fn call_as(&mut self, caller: &str) -> &mut Contract {
        set_ctx(caller, self.now);
        &mut self.contract
    }

    pub fn advance(&mut self, secs: u64) {
        self.now += secs;
    }

    pub fn transfer(&mut self, token: &str, sender: &str, amount: u128, msg: &str) {
        ft_transfer_call(&mut self.contract, token, sender, amount, msg, self.now);
    }

    /// Funds the USDC reward reserve from the owner.
    pub fn fund_rewards(&mut self, amount: u128) {
        let owner = self.owner.clone();
        self.transfer(USDC_ID, &owner, amount, r#"{"fund_rewards":{}}"#);
    }
}
