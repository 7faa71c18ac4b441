// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

mod common;

use alloy_primitives::U256;
use common::*;
use gravity_types::{
    error::GravityError,
    event::GravityEvent,
    system_addresses::{BLOCK_ADDRESS, GOVERNANCE_ADDRESS},
};

/// Pool balance conservation: active stake plus unpaid pending equals the
/// pool's ledger balance.
fn assert_conservation(system: &gravity_framework::GravitySystem, pool: alloy_primitives::Address) {
    assert_eq!(
        system.get_active_stake(pool).unwrap() + system.get_total_pending(pool).unwrap(),
        system.balance_of(pool)
    );
}

#[test]
fn test_pool_lifecycle() {
    let mut system = system_at(T0);
    let roles = roles(10);
    let pool = create_pool(&mut system, &roles, ether(10));

    assert!(system.is_pool(pool));
    assert_eq!(system.get_active_stake(pool).unwrap(), ether(10));
    assert_eq!(system.get_voting_power_now(pool).unwrap(), ether(10));
    assert_eq!(system.get_locked_until(pool).unwrap(), T0 + LOCKUP);
    assert_conservation(&system, pool);

    system.unstake(roles.staker, pool, ether(5)).unwrap();
    assert_eq!(system.get_active_stake(pool).unwrap(), ether(5));
    assert_eq!(system.get_total_pending(pool).unwrap(), ether(5));
    assert_eq!(system.get_pending_bucket_count(pool).unwrap(), 1);
    let bucket = system.get_pending_bucket(pool, 0).unwrap().unwrap();
    assert_eq!(bucket.locked_until, T0 + LOCKUP);
    assert_eq!(bucket.cumulative_amount, ether(5));
    assert_conservation(&system, pool);

    // At exactly lockup + unbonding delay nothing is claimable yet.
    set_time(&mut system, T0 + LOCKUP + UNBONDING);
    assert_eq!(system.get_claimable_amount(pool).unwrap(), U256::ZERO);
    assert_eq!(
        system
            .withdraw_available(roles.staker, pool, addr(99))
            .unwrap(),
        U256::ZERO
    );

    // One microsecond past the boundary the full bucket is out.
    set_time(&mut system, T0 + LOCKUP + UNBONDING + 1);
    assert_eq!(system.get_claimable_amount(pool).unwrap(), ether(5));
    let withdrawn = system
        .withdraw_available(roles.staker, pool, addr(99))
        .unwrap();
    assert_eq!(withdrawn, ether(5));
    assert_eq!(system.get_claimed_amount(pool).unwrap(), ether(5));
    assert_eq!(system.balance_of(addr(99)), ether(5));
    assert_conservation(&system, pool);

    let events = system.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        GravityEvent::WithdrawalClaimed { pool: p, recipient, amount }
            if *p == pool && *recipient == addr(99) && *amount == ether(5)
    )));
}

#[test]
fn test_bucket_merge_vs_split() {
    let mut system = system_at(T0);
    let roles = roles(10);
    let pool = create_pool(&mut system, &roles, ether(10));

    system.unstake(roles.staker, pool, ether(5)).unwrap();
    // The lockup is unchanged, so a second unstake merges.
    system.unstake(roles.staker, pool, ether(3)).unwrap();
    assert_eq!(system.get_pending_bucket_count(pool).unwrap(), 1);
    let bucket = system.get_pending_bucket(pool, 0).unwrap().unwrap();
    assert_eq!(bucket.cumulative_amount, ether(8));

    // Renewal moves the lockup; the next unstake opens a second bucket.
    system.renew_lock_until(roles.staker, pool, LOCKUP).unwrap();
    assert_eq!(system.get_locked_until(pool).unwrap(), T0 + 2 * LOCKUP);
    system.unstake(roles.staker, pool, ether(2)).unwrap();
    assert_eq!(system.get_pending_bucket_count(pool).unwrap(), 2);
    let second = system.get_pending_bucket(pool, 1).unwrap().unwrap();
    assert_eq!(second.locked_until, T0 + 2 * LOCKUP);
    assert_eq!(second.cumulative_amount, ether(10));
    assert_conservation(&system, pool);
}

#[test]
fn test_unstake_and_withdraw_combined() {
    let mut system = system_at(T0);
    let roles = roles(10);
    let pool = create_pool(&mut system, &roles, ether(10));

    system.unstake(roles.staker, pool, ether(4)).unwrap();
    set_time(&mut system, T0 + LOCKUP + UNBONDING + 1);

    // The freshly unstaked amount is bound to a renewed lockup and stays
    // pending; only the matured bucket pays out.
    system.renew_lock_until(roles.staker, pool, 2 * LOCKUP).unwrap();
    let withdrawn = system
        .unstake_and_withdraw(roles.staker, pool, ether(6), addr(99))
        .unwrap();
    assert_eq!(withdrawn, ether(4));
    assert_eq!(system.get_total_pending(pool).unwrap(), ether(6));
    assert_eq!(system.balance_of(addr(99)), ether(4));
    assert_conservation(&system, pool);
}

#[test]
fn test_create_pool_validation() {
    let mut system = system_at(T0);
    let roles = roles(10);
    assert_eq!(
        system.create_pool(
            roles.owner,
            roles.owner,
            roles.staker,
            roles.operator,
            roles.voter,
            T0 + LOCKUP,
            ether(1) - U256::from(1u64),
        ),
        Err(GravityError::InsufficientStakeForPoolCreation)
    );
    assert_eq!(
        system.create_pool(
            roles.owner,
            roles.owner,
            roles.staker,
            roles.operator,
            roles.voter,
            T0 + LOCKUP - 1,
            ether(1),
        ),
        Err(GravityError::LockupDurationTooShort)
    );
}

#[test]
fn test_role_checks() {
    let mut system = system_at(T0);
    let roles = roles(10);
    let pool = create_pool(&mut system, &roles, ether(10));
    let outsider = addr(99);

    assert_eq!(
        system.unstake(outsider, pool, ether(1)),
        Err(GravityError::NotStaker)
    );
    assert_eq!(
        system.add_stake(roles.owner, pool, ether(1)),
        Err(GravityError::NotStaker)
    );
    assert_eq!(
        system.set_operator(roles.staker, pool, outsider),
        Err(GravityError::NotOwner)
    );
    assert_eq!(
        system.unstake(roles.staker, addr(77), ether(1)),
        Err(GravityError::InvalidPool(addr(77)))
    );
}

#[test]
fn test_role_setters_and_two_step_ownership() {
    let mut system = system_at(T0);
    let roles = roles(10);
    let pool = create_pool(&mut system, &roles, ether(10));

    system.set_operator(roles.owner, pool, addr(50)).unwrap();
    system.set_voter(roles.owner, pool, addr(51)).unwrap();
    system.set_staker(roles.owner, pool, addr(52)).unwrap();
    assert_eq!(system.get_pool_operator(pool).unwrap(), addr(50));
    assert_eq!(system.get_pool_voter(pool).unwrap(), addr(51));
    assert_eq!(system.get_pool_staker(pool).unwrap(), addr(52));

    // Two-step transfer: proposing does not change the owner yet.
    system.transfer_ownership(roles.owner, pool, addr(60)).unwrap();
    assert_eq!(system.get_pool_owner(pool).unwrap(), roles.owner);
    assert_eq!(
        system.accept_ownership(addr(61), pool),
        Err(GravityError::NotOwner)
    );
    system.accept_ownership(addr(60), pool).unwrap();
    assert_eq!(system.get_pool_owner(pool).unwrap(), addr(60));

    // The old owner lost the role.
    assert_eq!(
        system.set_operator(roles.owner, pool, addr(1)),
        Err(GravityError::NotOwner)
    );

    let events = system.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        GravityEvent::OwnershipTransferred { new_owner, .. } if *new_owner == addr(60)
    )));
}

#[test]
fn test_add_stake_extends_lockup_and_power() {
    let mut system = system_at(T0);
    let roles = roles(10);
    let pool = create_pool(&mut system, &roles, ether(10));

    set_time(&mut system, T0 + 3 * DAY);
    system.add_stake(roles.staker, pool, ether(5)).unwrap();
    assert_eq!(system.get_active_stake(pool).unwrap(), ether(15));
    assert_eq!(system.get_locked_until(pool).unwrap(), T0 + 3 * DAY + LOCKUP);
    assert_eq!(system.get_voting_power_now(pool).unwrap(), ether(15));
    assert_conservation(&system, pool);
}

#[test]
fn test_no_user_mutation_during_transition() {
    let mut system = system_at(T0);
    let roles = roles(10);
    let pool = create_pool(&mut system, &roles, ether(10));

    // Freeze the system mid-transition and probe every user mutation.
    system.reconfiguration.begin(T0);
    assert!(system.is_transition_in_progress());
    assert_eq!(
        system.add_stake(roles.staker, pool, ether(1)),
        Err(GravityError::ReconfigurationInProgress)
    );
    assert_eq!(
        system.unstake(roles.staker, pool, ether(1)),
        Err(GravityError::ReconfigurationInProgress)
    );
    assert_eq!(
        system.withdraw_available(roles.staker, pool, addr(99)),
        Err(GravityError::ReconfigurationInProgress)
    );
    assert_eq!(
        system.renew_lock_until(roles.staker, pool, LOCKUP),
        Err(GravityError::ReconfigurationInProgress)
    );
    assert_eq!(
        system.create_pool(
            roles.owner,
            roles.owner,
            roles.staker,
            roles.operator,
            roles.voter,
            T0 + LOCKUP,
            ether(1)
        ),
        Err(GravityError::ReconfigurationInProgress)
    );
    assert_eq!(
        system.join_validator_set(roles.operator, pool),
        Err(GravityError::ReconfigurationInProgress)
    );
    system.reconfiguration.finish();

    system.add_stake(roles.staker, pool, ether(1)).unwrap();
}

#[test]
fn test_reconfigure_dedup_and_epoch_counter() {
    let mut system = system_at(T0);
    set_time(&mut system, T0 + 1);
    system.reconfigure(BLOCK_ADDRESS).unwrap();
    assert_eq!(system.current_epoch(), 1);

    // Same timestamp: silently deduplicated.
    system.reconfigure(GOVERNANCE_ADDRESS).unwrap();
    assert_eq!(system.current_epoch(), 1);

    set_time(&mut system, T0 + 2);
    system.reconfigure(BLOCK_ADDRESS).unwrap();
    assert_eq!(system.current_epoch(), 2);

    // Only Block or Governance may trigger it.
    assert!(system.reconfigure(addr(5)).is_err());

    let events = system.drain_events();
    let epochs: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            GravityEvent::NewEpoch { epoch } => Some(*epoch),
            _ => None,
        })
        .collect();
    assert_eq!(epochs, vec![1, 2]);
}

#[test]
fn test_staged_config_applies_at_epoch_boundary() {
    let mut system = system_at(T0);
    let mut next = genesis_config();
    next.min_stake = ether(5);

    system
        .set_config_for_next_epoch(GOVERNANCE_ADDRESS, next)
        .unwrap();
    // Still the active record before the boundary.
    assert_eq!(system.config.min_stake(), ether(1));

    run_epoch(&mut system);
    assert_eq!(system.config.min_stake(), ether(5));
    assert!(system.config.pending().is_none());

    // The new minimum now gates pool creation.
    let roles = roles(10);
    assert_eq!(
        system.create_pool(
            roles.owner,
            roles.owner,
            roles.staker,
            roles.operator,
            roles.voter,
            system.now_us() + LOCKUP,
            ether(4),
        ),
        Err(GravityError::InsufficientStakeForPoolCreation)
    );
}

#[test]
fn test_lockup_never_decreases() {
    let mut system = system_at(T0);
    let roles = roles(10);
    let pool = create_pool(&mut system, &roles, ether(10));

    let mut last = system.get_locked_until(pool).unwrap();
    system.unstake(roles.staker, pool, ether(1)).unwrap();
    assert!(system.get_locked_until(pool).unwrap() >= last);

    set_time(&mut system, T0 + 5 * DAY);
    system.add_stake(roles.staker, pool, ether(1)).unwrap();
    let now_locked = system.get_locked_until(pool).unwrap();
    assert!(now_locked >= last);
    last = now_locked;

    system.renew_lock_until(roles.staker, pool, LOCKUP).unwrap();
    assert!(system.get_locked_until(pool).unwrap() >= last);

    assert_eq!(
        system.renew_lock_until(roles.staker, pool, 0),
        Err(GravityError::InvalidLockupExtension)
    );
}

#[test]
fn test_pool_registry_views() {
    let mut system = system_at(T0);
    let first = create_pool(&mut system, &roles(10), ether(1));
    let second = create_pool(&mut system, &roles(20), ether(2));

    assert_eq!(system.get_pool_count(), 2);
    assert_eq!(system.get_pool_nonce(), 2);
    assert_eq!(system.get_pool(0).unwrap(), first);
    assert_eq!(system.get_pool(1).unwrap(), second);
    assert_eq!(system.get_all_pools(), vec![first, second]);
    assert_eq!(
        system.get_pool(2),
        Err(GravityError::PoolIndexOutOfBounds { index: 2, count: 2 })
    );
}
