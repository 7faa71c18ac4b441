// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

// Not every test binary uses every helper.
#![allow(dead_code)]

use alloy_primitives::{Address, U256};
use gravity_framework::GravitySystem;
use gravity_types::{
    config::StakingConfig,
    system_addresses::{BLOCK_ADDRESS, GENESIS_ADDRESS},
    validator::CONSENSUS_PUBKEY_LENGTH,
};

/// 14 days in microseconds.
pub const LOCKUP: u64 = 1_209_600_000_000;
/// 7 days in seconds / microseconds.
pub const UNBONDING_SECS: u64 = 604_800;
pub const UNBONDING: u64 = 604_800_000_000;
pub const DAY: u64 = 86_400_000_000;
pub const T0: u64 = 1_000_000_000_000_000;

pub fn addr(n: u8) -> Address {
    Address::with_last_byte(n)
}

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

pub fn pubkey(n: u8) -> Vec<u8> {
    vec![n; CONSENSUS_PUBKEY_LENGTH]
}

pub fn genesis_config() -> StakingConfig {
    StakingConfig {
        min_bond: ether(1),
        max_bond: ether(1_000_000),
        unbonding_delay_secs: UNBONDING_SECS,
        allow_validator_set_change: true,
        voting_power_increase_limit_pct: 20,
        max_validator_set_size: 100,
        min_stake: ether(1),
        lockup_duration_micros: LOCKUP,
        min_proposal_stake: ether(1),
    }
}

/// A freshly initialized system with the clock at `now`.
pub fn system_at(now: u64) -> GravitySystem {
    let mut system = GravitySystem::default();
    system.initialize(GENESIS_ADDRESS, genesis_config()).unwrap();
    system.update_global_time(BLOCK_ADDRESS, now).unwrap();
    system
}

pub fn set_time(system: &mut GravitySystem, now: u64) {
    system.update_global_time(BLOCK_ADDRESS, now).unwrap();
}

/// Advances the clock one microsecond (reconfigurations at an unchanged
/// timestamp deduplicate) and runs an epoch transition.
pub fn run_epoch(system: &mut GravitySystem) {
    let now = system.now_us() + 1;
    set_time(system, now);
    system.reconfigure(BLOCK_ADDRESS).unwrap();
}

/// Conventional role addresses for a pool keyed by a small id.
pub struct Roles {
    pub owner: Address,
    pub staker: Address,
    pub operator: Address,
    pub voter: Address,
}

pub fn roles(n: u8) -> Roles {
    Roles {
        owner: addr(n),
        staker: addr(n + 1),
        operator: addr(n + 2),
        voter: addr(n + 3),
    }
}

/// Creates a pool with `value` attached, locked one full lockup from now.
pub fn create_pool(system: &mut GravitySystem, roles: &Roles, value: U256) -> Address {
    let locked_until = system.now_us() + LOCKUP;
    system
        .create_pool(
            roles.owner,
            roles.owner,
            roles.staker,
            roles.operator,
            roles.voter,
            locked_until,
            value,
        )
        .unwrap()
}

/// Registers and queues a validator for `pool`, keyed by `key`.
pub fn register_and_join(system: &mut GravitySystem, roles: &Roles, pool: Address, key: u8) {
    system
        .register_validator(
            roles.operator,
            pool,
            format!("validator-{key}"),
            pubkey(key),
            vec![key],
            vec![],
            vec![],
        )
        .unwrap();
    system.join_validator_set(roles.operator, pool).unwrap();
}
