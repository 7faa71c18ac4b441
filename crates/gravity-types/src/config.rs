// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{
    base_types::MICROS_PER_SECOND,
    error::{GravityError, GravityResult},
};

/// Validator and staking parameters. One active record is in force at any
/// time; governance stages a replacement that the reconfiguration applies
/// atomically at the next epoch boundary.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct StakingConfig {
    /// Lower bound on a validator's bond, checked at registration, at join,
    /// and re-checked when a pending validator activates.
    pub min_bond: U256,

    /// Upper bound on consensus voting power. A pool may hold more stake,
    /// but the bond snapshot is capped here at every epoch boundary.
    pub max_bond: U256,

    /// Delay, in seconds, between an unstake request's lockup expiry and the
    /// moment the funds become claimable.
    pub unbonding_delay_secs: u64,

    /// Whether validators may join or leave the set voluntarily.
    pub allow_validator_set_change: bool,

    /// Per-epoch cap on newly added voting power, as a percentage of the
    /// previous epoch's total. Valid range 1..=50.
    pub voting_power_increase_limit_pct: u64,

    /// Hard cap on `|active| + |pending_active|`.
    pub max_validator_set_size: u64,

    /// Minimum value required to create a stake pool.
    pub min_stake: U256,

    /// Length of one lockup period in microseconds. Pool lockups must always
    /// cover at least one period from "now" when set or extended.
    pub lockup_duration_micros: u64,

    /// Minimum voting power a pool needs to create a governance proposal.
    pub min_proposal_stake: U256,
}

impl StakingConfig {
    /// Every path that installs a config record goes through this check.
    pub fn validate(&self) -> GravityResult<()> {
        if self.voting_power_increase_limit_pct == 0 || self.voting_power_increase_limit_pct > 50 {
            return Err(GravityError::InvalidConfig(
                "voting power increase limit must be in 1..=50",
            ));
        }
        if self.min_bond > self.max_bond {
            return Err(GravityError::InvalidConfig(
                "minimum bond exceeds maximum bond",
            ));
        }
        if self.max_validator_set_size == 0 {
            return Err(GravityError::InvalidConfig(
                "validator set size must be non-zero",
            ));
        }
        Ok(())
    }

    pub fn unbonding_delay_micros(&self) -> u64 {
        self.unbonding_delay_secs * MICROS_PER_SECOND
    }
}
