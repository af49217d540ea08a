// Tests for fund-manager reinvestment, capital deployment and payout failures

mod helpers;

use helpers::test_builder::{Scenario, TestScenarioBuilder};
use helpers::*;
use near_sdk::json_types::U128;
use tenure_pool::{DepositStatus, PayoutKind, PoolError, Role};

const ALICE: &str = "alice.test";
const FM: &str = "fm.test";
const DESK: &str = "desk.test";

fn yield_for(principal: u128, secs: u64) -> u128 {
    principal * 1_200 * secs as u128 / (10_000 * YEAR as u128)
}

fn pool_with_deposit(tenure: u8) -> Scenario {
    let mut s = TestScenarioBuilder::new()
        .hr("hr.test")
        .fund_manager(FM)
        .whitelist(ALICE)
        .build();
    s.fund_rewards(100 * USDC);
    s.transfer(USDC_ID, ALICE, 100 * USDC, &deposit_msg(tenure, None));
    s
}

#[test]
fn test_reinvest_rolls_matured_principal_into_new_term() {
    let mut s = pool_with_deposit(1);

    s.advance(MONTH / 2);
    assert!(matches!(
        s.call_as(FM).reinvest(account(ALICE), 0, U128(60 * USDC)),
        Err(PoolError::LockNotExpired { .. })
    ));

    s.advance(MONTH / 2 + DAY);
    let owner = s.owner.clone();
    s.call_as(&owner).change_base_rate(900).unwrap();
    let paid = s
        .call_as(FM)
        .reinvest(account(ALICE), 0, U128(60 * USDC))
        .unwrap();
    assert_eq!(paid, U128(40 * USDC + yield_for(100 * USDC, MONTH)));

    let deposit = s.contract.get_deposit(account(ALICE), 0).unwrap();
    assert_eq!(deposit.status, DepositStatus::Active);
    assert_eq!(deposit.principal, U128(60 * USDC));
    assert_eq!(deposit.start_time.0, s.now);
    assert_eq!(deposit.maturity.0, s.now + MONTH);
    assert_eq!(deposit.rate_bps, 900);
    assert_conserved(&s.contract, 0, &[ALICE]);

    // The new term must run out before the depositor can leave normally
    assert!(matches!(
        s.call_as(ALICE).withdraw(0),
        Err(PoolError::LockNotExpired { .. })
    ));
}

#[test]
fn test_reinvest_rejects_bad_amounts_and_callers() {
    let mut s = pool_with_deposit(1);
    s.advance(MONTH);

    assert!(matches!(
        s.call_as(FM).reinvest(account(ALICE), 0, U128(0)),
        Err(PoolError::InvalidAmount { .. })
    ));
    assert!(matches!(
        s.call_as(FM).reinvest(account(ALICE), 0, U128(101 * USDC)),
        Err(PoolError::InvalidAmount { .. })
    ));
    assert_eq!(
        s.call_as(ALICE).reinvest(account(ALICE), 0, U128(USDC)),
        Err(PoolError::Unauthorized {
            account_id: account(ALICE),
            role: Role::FundManager
        })
    );
}

#[test]
fn test_transfer_and_return_capital() {
    let mut s = pool_with_deposit(1);

    s.advance(DAY);
    s.call_as(FM)
        .transfer_principal(account(ALICE), 0, U128(40 * USDC), account(DESK))
        .unwrap();
    assert_conserved(&s.contract, 0, &[ALICE]);

    let asset = s.contract.get_asset(0).unwrap();
    assert_eq!(asset.deployed, U128(40 * USDC));
    assert_eq!(asset.custody, U128(160 * USDC));

    s.advance(MONTH);
    s.transfer(USDC_ID, FM, 40 * USDC, r#"{"return_capital":{}}"#);
    let asset = s.contract.get_asset(0).unwrap();
    assert_eq!(asset.returned, U128(40 * USDC));
    assert_eq!(asset.reserve, U128(140 * USDC));

    // The first day accrued on the full principal, the rest on what is left
    let paid = s.call_as(ALICE).withdraw(0).unwrap();
    assert_eq!(
        paid,
        U128(60 * USDC + yield_for(100 * USDC, DAY) + yield_for(60 * USDC, MONTH - DAY))
    );
    assert_conserved(&s.contract, 0, &[ALICE]);
}

#[test]
fn test_transfer_after_unlock_keeps_claimable_yield() {
    let mut s = TestScenarioBuilder::new()
        .fund_manager(FM)
        .whitelist(ALICE)
        .build();
    s.fund_rewards(100 * USDC);
    s.transfer(USDC_ID, ALICE, 100 * USDC, &deposit_msg(3, Some(3)));

    s.advance(MONTH + DAY);
    let before = s.contract.yield_claim_details(account(ALICE), 0).unwrap();
    assert_eq!(before.unlocked_yield, U128(986_301));

    s.call_as(FM)
        .transfer_principal(account(ALICE), 0, U128(90 * USDC), account(DESK))
        .unwrap();
    let after = s.contract.yield_claim_details(account(ALICE), 0).unwrap();
    assert_eq!(after.unlocked_yield, before.unlocked_yield);
    assert_eq!(after.locked_yield, before.locked_yield);
    assert_eq!(after.balance, U128(10 * USDC));
    assert_eq!(
        s.contract.get_deposit(account(ALICE), 0).unwrap().carried_yield.0,
        before.unlocked_yield.0 + before.locked_yield.0
    );

    assert_eq!(s.call_as(ALICE).claim(0), Ok(U128(986_301)));
    assert_conserved(&s.contract, 0, &[ALICE]);

    // The extra day stays priced on the old principal
    s.advance(MONTH - DAY);
    let second = s.call_as(ALICE).claim(0).unwrap();
    assert_eq!(
        second.0,
        before.locked_yield.0 + yield_for(10 * USDC, MONTH - DAY)
    );
}

#[test]
#[should_panic(expected = "does not have the fund_manager role")]
fn test_return_capital_requires_fund_manager() {
    let mut s = pool_with_deposit(1);
    s.transfer(USDC_ID, ALICE, USDC, r#"{"return_capital":{}}"#);
}

#[test]
fn test_failed_claim_payout_is_escrowed() {
    let mut s = pool_with_deposit(1);
    s.advance(MONTH);
    let paid = s.call_as(ALICE).claim(0).unwrap();

    set_failed_callback_ctx(s.now);
    let delivered = s
        .contract
        .resolve_payout(0, account(ALICE), paid, PayoutKind::Depositor)
        .unwrap();
    assert_eq!(delivered, U128(0));
    assert_eq!(s.contract.escrow_balance_of(account(ALICE), 0), paid);
    assert_conserved(&s.contract, 0, &[ALICE]);

    let refunded = s.call_as(ALICE).withdraw_escrow(0, None).unwrap();
    assert_eq!(refunded, paid);
    assert_eq!(s.contract.escrow_balance_of(account(ALICE), 0), U128(0));
    assert_conserved(&s.contract, 0, &[ALICE]);
}

#[test]
fn test_failed_deployment_restores_principal() {
    let mut s = pool_with_deposit(2);
    s.call_as(FM)
        .transfer_principal(account(ALICE), 0, U128(30 * USDC), account(DESK))
        .unwrap();

    set_failed_callback_ctx(s.now);
    s.contract
        .resolve_payout(
            0,
            account(DESK),
            U128(30 * USDC),
            PayoutKind::Deployment {
                account_id: account(ALICE),
                deposit_id: 0,
            },
        )
        .unwrap();

    let deposit = s.contract.get_deposit(account(ALICE), 0).unwrap();
    assert_eq!(deposit.principal, U128(100 * USDC));
    assert_eq!(deposit.transferred_out, U128(0));
    assert_eq!(s.contract.get_asset(0).unwrap().deployed, U128(0));
    assert_conserved(&s.contract, 0, &[ALICE]);
}

#[test]
fn test_failed_deployment_of_closed_deposit_goes_to_reserve() {
    let mut s = pool_with_deposit(2);
    s.call_as(FM)
        .transfer_principal(account(ALICE), 0, U128(30 * USDC), account(DESK))
        .unwrap();
    s.advance(DAY);
    assert_eq!(
        s.call_as(ALICE).emergency_withdraw(0).unwrap(),
        U128(63 * USDC)
    );

    let reserve_before = s.contract.get_asset(0).unwrap().reserve;
    set_failed_callback_ctx(s.now);
    s.contract
        .resolve_payout(
            0,
            account(DESK),
            U128(30 * USDC),
            PayoutKind::Deployment {
                account_id: account(ALICE),
                deposit_id: 0,
            },
        )
        .unwrap();

    let asset = s.contract.get_asset(0).unwrap();
    assert_eq!(asset.reserve, U128(reserve_before.0 + 30 * USDC));
    assert_eq!(
        s.contract.get_deposit(account(ALICE), 0).unwrap().status,
        DepositStatus::EmergencyWithdrawn
    );
    assert_conserved(&s.contract, 0, &[ALICE]);
}
