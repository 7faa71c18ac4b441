// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, U256};
use gravity_types::{
    config::StakingConfig,
    error::{GravityError, GravityResult},
    system_addresses::{SystemIdentity, assert_caller},
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Active validator/staking parameters plus an optional record staged for
/// the next epoch boundary. Readers only ever see the active record; the
/// staged one supersedes it atomically inside the epoch transition.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ConfigStore {
    active: StakingConfig,
    pending: Option<StakingConfig>,
    initialized: bool,
}

impl ConfigStore {
    /// Genesis-only, once.
    pub fn initialize(&mut self, caller: Address, genesis_config: StakingConfig) -> GravityResult<()> {
        assert_caller(SystemIdentity::Genesis, caller)?;
        if self.initialized {
            return Err(GravityError::AlreadyInitialized);
        }
        genesis_config.validate()?;
        self.active = genesis_config;
        self.initialized = true;
        Ok(())
    }

    pub fn active(&self) -> &StakingConfig {
        &self.active
    }

    pub fn pending(&self) -> Option<&StakingConfig> {
        self.pending.as_ref()
    }

    /// Governance-only. Replaces any previously staged record; takes effect
    /// at the next epoch boundary.
    pub fn set_for_next_epoch(
        &mut self,
        caller: Address,
        config: StakingConfig,
    ) -> GravityResult<()> {
        assert_caller(SystemIdentity::Governance, caller)?;
        config.validate()?;
        self.pending = Some(config);
        Ok(())
    }

    /// Reconfiguration-only. Swaps the staged record into place and clears
    /// the staging slot; a no-op when nothing is staged.
    pub fn apply_pending_config(&mut self, caller: Address) -> GravityResult<()> {
        assert_caller(SystemIdentity::Reconfiguration, caller)?;
        self.apply_pending_unchecked();
        Ok(())
    }

    pub(crate) fn apply_pending_unchecked(&mut self) {
        if let Some(pending) = self.pending.take() {
            info!("applying staged staking config");
            self.active = pending;
        }
    }

    // === Field getters (active record only) ===

    pub fn min_bond(&self) -> U256 {
        self.active.min_bond
    }

    pub fn max_bond(&self) -> U256 {
        self.active.max_bond
    }

    pub fn unbonding_delay_secs(&self) -> u64 {
        self.active.unbonding_delay_secs
    }

    pub fn unbonding_delay_micros(&self) -> u64 {
        self.active.unbonding_delay_micros()
    }

    pub fn allow_validator_set_change(&self) -> bool {
        self.active.allow_validator_set_change
    }

    pub fn voting_power_increase_limit_pct(&self) -> u64 {
        self.active.voting_power_increase_limit_pct
    }

    pub fn max_validator_set_size(&self) -> u64 {
        self.active.max_validator_set_size
    }

    pub fn min_stake(&self) -> U256 {
        self.active.min_stake
    }

    pub fn lockup_duration_micros(&self) -> u64 {
        self.active.lockup_duration_micros
    }

    pub fn min_proposal_stake(&self) -> U256 {
        self.active.min_proposal_stake
    }
}
