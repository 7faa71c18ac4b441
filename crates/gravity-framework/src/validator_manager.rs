// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, U256};
use gravity_types::{
    base_types::{EpochId, TimestampUs},
    config::StakingConfig,
    error::{GravityError, GravityResult},
    event::GravityEvent,
    validator::{
        CONSENSUS_PUBKEY_LENGTH, MAX_MONIKER_LENGTH, VALIDATOR_INDEX_NONE, ValidatorConsensusInfo,
        ValidatorRecord, ValidatorStatus,
    },
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::staking::StakingRegistry;

/// The validator set a pending epoch transition would install: continuing
/// validators first (in current index order), then the pending-active
/// candidates admitted under the voting-power throttle (in enqueue order),
/// each with its fresh bond capped at the maximum.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NextEpochPlan {
    pub survivors: Vec<(Address, U256)>,
    pub admitted: Vec<(Address, U256)>,
}

impl NextEpochPlan {
    fn members(&self) -> impl Iterator<Item = &(Address, U256)> {
        self.survivors.iter().chain(self.admitted.iter())
    }
}

/// Validator registry layered on the stake pools: one record per pool,
/// a global consensus-key set, the active array plus the two pending queues,
/// and the per-epoch aggregates.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct ValidatorManager {
    records: BTreeMap<Address, ValidatorRecord>,
    /// Consensus pubkeys of all non-Inactive records. Insert-or-fail under
    /// uniqueness is the only mutation pattern.
    consensus_keys: BTreeSet<Vec<u8>>,
    /// Current epoch's validators in index order. Includes PendingInactive
    /// records, which keep validating until the next boundary.
    active: Vec<Address>,
    pending_active: Vec<Address>,
    pending_inactive: Vec<Address>,
    total_voting_power: U256,
    total_joining_power: U256,
    current_epoch: EpochId,
    last_reconfiguration_time: TimestampUs,
}

impl ValidatorManager {
    // === Registration and lifecycle ===

    /// Creates an Inactive record for `pool`. The consensus key must not be
    /// bound to any non-Inactive record; the pool's stake must already meet
    /// the minimum bond.
    #[allow(clippy::too_many_arguments)]
    pub fn register_validator(
        &mut self,
        pool: Address,
        pool_owner: Address,
        bond: U256,
        moniker: String,
        consensus_pubkey: Vec<u8>,
        consensus_pop: Vec<u8>,
        network_addresses: Vec<u8>,
        fullnode_addresses: Vec<u8>,
        min_bond: U256,
    ) -> GravityResult<()> {
        if moniker.len() > MAX_MONIKER_LENGTH {
            return Err(GravityError::MonikerTooLong(moniker.len()));
        }
        if consensus_pubkey.len() != CONSENSUS_PUBKEY_LENGTH {
            return Err(GravityError::InvalidConsensusPubkeyLength(
                consensus_pubkey.len(),
            ));
        }
        if consensus_pop.is_empty() {
            return Err(GravityError::InvalidConsensusPopLength);
        }
        if self.records.contains_key(&pool) {
            return Err(GravityError::ValidatorAlreadyExists(pool));
        }
        if bond < min_bond {
            return Err(GravityError::InsufficientBond);
        }
        if self.consensus_keys.contains(&consensus_pubkey) {
            return Err(GravityError::DuplicateConsensusPubkey);
        }
        debug!(pool = %pool, moniker = %moniker, "registered validator");
        self.records.insert(
            pool,
            ValidatorRecord {
                validator: pool,
                moniker,
                status: ValidatorStatus::Inactive,
                bond,
                consensus_pubkey,
                consensus_pop,
                network_addresses,
                fullnode_addresses,
                fee_recipient: pool_owner,
                pending_fee_recipient: Address::ZERO,
                validator_index: VALIDATOR_INDEX_NONE,
            },
        );
        Ok(())
    }

    /// Queues an Inactive validator for activation at the next boundary.
    /// `pool_stake` is the pool's current active stake; it becomes the bond
    /// snapshot and must lie within the configured bond range. Claims the
    /// consensus key and accounts the bond into the per-epoch joining power.
    pub fn join_validator_set(
        &mut self,
        pool: Address,
        pool_stake: U256,
        config: &StakingConfig,
    ) -> GravityResult<()> {
        if !config.allow_validator_set_change {
            return Err(GravityError::ValidatorSetChangesDisabled);
        }
        let record = self
            .records
            .get_mut(&pool)
            .ok_or(GravityError::ValidatorNotFound(pool))?;
        if record.status != ValidatorStatus::Inactive {
            return Err(GravityError::InvalidStatus {
                expected: ValidatorStatus::Inactive,
                actual: record.status,
            });
        }
        if pool_stake < config.min_bond {
            return Err(GravityError::InsufficientBond);
        }
        if pool_stake > config.max_bond {
            return Err(GravityError::ExceedsMaximumBond);
        }
        if (self.active.len() + self.pending_active.len()) as u64 >= config.max_validator_set_size {
            return Err(GravityError::MaxValidatorSetSizeReached);
        }
        if self.consensus_keys.contains(&record.consensus_pubkey) {
            return Err(GravityError::DuplicateConsensusPubkey);
        }

        record.bond = pool_stake;
        record.status = ValidatorStatus::PendingActive;
        self.consensus_keys.insert(record.consensus_pubkey.clone());
        self.pending_active.push(pool);
        self.total_joining_power += pool_stake;
        debug!(pool = %pool, bond = %pool_stake, "validator queued to join");
        Ok(())
    }

    /// Takes a validator out of the set: a PendingActive one reverts to
    /// Inactive immediately, an Active one is queued and keeps validating
    /// until the boundary. Voluntary leaves may not empty the active set;
    /// the governance-forced variant may.
    pub fn leave_validator_set(
        &mut self,
        pool: Address,
        force: bool,
        config: &StakingConfig,
    ) -> GravityResult<ValidatorStatus> {
        if !config.allow_validator_set_change {
            return Err(GravityError::ValidatorSetChangesDisabled);
        }
        let record = self
            .records
            .get_mut(&pool)
            .ok_or(GravityError::ValidatorNotFound(pool))?;
        match record.status {
            ValidatorStatus::PendingActive => {
                record.status = ValidatorStatus::Inactive;
                self.consensus_keys.remove(&record.consensus_pubkey);
                self.total_joining_power = self.total_joining_power.saturating_sub(record.bond);
                self.pending_active.retain(|a| *a != pool);
                Ok(ValidatorStatus::Inactive)
            }
            ValidatorStatus::Active => {
                if !force && self.active.len() < 2 {
                    return Err(GravityError::CannotRemoveLastValidator);
                }
                record.status = ValidatorStatus::PendingInactive;
                self.pending_inactive.push(pool);
                Ok(ValidatorStatus::PendingInactive)
            }
            actual => Err(GravityError::InvalidStatus {
                expected: ValidatorStatus::Active,
                actual,
            }),
        }
    }

    /// Swaps the consensus key under the global uniqueness constraint. A
    /// non-Inactive record releases its old key and claims the new one.
    pub fn rotate_consensus_key(
        &mut self,
        pool: Address,
        new_pubkey: Vec<u8>,
        new_pop: Vec<u8>,
    ) -> GravityResult<()> {
        if new_pubkey.len() != CONSENSUS_PUBKEY_LENGTH {
            return Err(GravityError::InvalidConsensusPubkeyLength(new_pubkey.len()));
        }
        if new_pop.is_empty() {
            return Err(GravityError::InvalidConsensusPopLength);
        }
        let record = self
            .records
            .get_mut(&pool)
            .ok_or(GravityError::ValidatorNotFound(pool))?;
        if new_pubkey != record.consensus_pubkey {
            if self.consensus_keys.contains(&new_pubkey) {
                return Err(GravityError::DuplicateConsensusPubkey);
            }
            if record.status != ValidatorStatus::Inactive {
                self.consensus_keys.remove(&record.consensus_pubkey);
                self.consensus_keys.insert(new_pubkey.clone());
            }
            record.consensus_pubkey = new_pubkey;
        }
        record.consensus_pop = new_pop;
        debug!(pool = %pool, pubkey = hex::encode(&record.consensus_pubkey), "rotated consensus key");
        Ok(())
    }

    /// Stages a fee-recipient change, applied at the next boundary while
    /// the record is in the active set.
    pub fn stage_fee_recipient(&mut self, pool: Address, new_recipient: Address) -> GravityResult<()> {
        let record = self
            .records
            .get_mut(&pool)
            .ok_or(GravityError::ValidatorNotFound(pool))?;
        record.pending_fee_recipient = new_recipient;
        Ok(())
    }

    // === Epoch transition ===

    /// Verdict on whether a candidate's bond still fits the remaining
    /// per-epoch voting-power budget. `budget` is `None` while the set is
    /// empty, in which case the throttle is off.
    fn check_joining_power(
        budget: Option<U256>,
        consumed: U256,
        bond: U256,
    ) -> GravityResult<()> {
        match budget {
            Some(budget) if consumed + bond > budget => {
                Err(GravityError::VotingPowerIncreaseLimitExceeded)
            }
            _ => Ok(()),
        }
    }

    fn fresh_bond(&self, staking: &StakingRegistry, pool: Address, max_bond: U256) -> U256 {
        staking
            .pool(pool)
            .map(|p| p.active_stake())
            .unwrap_or(U256::ZERO)
            .min(max_bond)
    }

    /// Computes the set an epoch transition would install right now. Shared
    /// between `on_new_epoch` and the next-epoch consensus-info view so the
    /// two can never disagree.
    pub fn plan_next_epoch(
        &self,
        staking: &StakingRegistry,
        config: &StakingConfig,
    ) -> NextEpochPlan {
        let leaving: BTreeSet<Address> = self.pending_inactive.iter().copied().collect();

        let mut survivors = Vec::new();
        let mut existing_increase = U256::ZERO;
        for pool in &self.active {
            if leaving.contains(pool) {
                continue;
            }
            let Some(record) = self.records.get(pool) else {
                continue;
            };
            let fresh = self.fresh_bond(staking, *pool, config.max_bond);
            if fresh > record.bond {
                existing_increase += fresh - record.bond;
            }
            survivors.push((*pool, fresh));
        }

        // Budget for newly added power this boundary; bond growth on
        // continuing validators consumes it first.
        let budget = (!self.total_voting_power.is_zero()).then(|| {
            self.total_voting_power * U256::from(config.voting_power_increase_limit_pct)
                / U256::from(100u64)
        });
        let mut consumed = existing_increase;
        let mut admitted = Vec::new();
        for pool in &self.pending_active {
            let Some(record) = self.records.get(pool) else {
                continue;
            };
            if record.consensus_pubkey.is_empty() {
                continue;
            }
            let stake = staking
                .pool(*pool)
                .map(|p| p.active_stake())
                .unwrap_or(U256::ZERO);
            if stake < config.min_bond {
                continue;
            }
            let fresh = stake.min(config.max_bond);
            if Self::check_joining_power(budget, consumed, fresh).is_err() {
                continue;
            }
            consumed += fresh;
            admitted.push((*pool, fresh));
        }

        NextEpochPlan {
            survivors,
            admitted,
        }
    }

    /// Applies the queued membership changes: drains the pending-inactive
    /// queue, activates the throttle-passing pending-active validators,
    /// reassigns contiguous indices, refreshes bonds from the pools, applies
    /// staged fee recipients and recomputes the aggregates.
    pub fn on_new_epoch(
        &mut self,
        staking: &StakingRegistry,
        config: &StakingConfig,
        now: TimestampUs,
        events: &mut Vec<GravityEvent>,
    ) {
        let plan = self.plan_next_epoch(staking, config);
        let new_epoch = self.current_epoch + 1;

        // Deactivate first: indices cleared, consensus keys released.
        for pool in std::mem::take(&mut self.pending_inactive) {
            if let Some(record) = self.records.get_mut(&pool) {
                record.status = ValidatorStatus::Inactive;
                record.validator_index = VALIDATOR_INDEX_NONE;
                self.consensus_keys.remove(&record.consensus_pubkey);
                events.push(GravityEvent::ValidatorDeactivated { pool });
            }
        }

        // Install the planned set with fresh indices and bonds.
        let admitted: BTreeSet<Address> = plan.admitted.iter().map(|(a, _)| *a).collect();
        let mut active = Vec::with_capacity(plan.survivors.len() + plan.admitted.len());
        let mut total_voting_power = U256::ZERO;
        for (index, (pool, bond)) in plan.members().enumerate() {
            if let Some(record) = self.records.get_mut(pool) {
                if record.status == ValidatorStatus::PendingActive {
                    record.status = ValidatorStatus::Active;
                    events.push(GravityEvent::ValidatorActivated {
                        pool: *pool,
                        epoch: new_epoch,
                        voting_power: *bond,
                    });
                }
                record.validator_index = index as u64;
                record.bond = *bond;
                total_voting_power += *bond;
                active.push(*pool);
            }
        }
        self.pending_active.retain(|pool| !admitted.contains(pool));

        // Staged fee recipients take effect for the records entering the
        // new epoch's active set.
        for pool in &active {
            if let Some(record) = self.records.get_mut(pool) {
                if record.pending_fee_recipient != Address::ZERO {
                    record.fee_recipient = record.pending_fee_recipient;
                    record.pending_fee_recipient = Address::ZERO;
                    events.push(GravityEvent::FeeRecipientUpdated {
                        pool: *pool,
                        new_recipient: record.fee_recipient,
                    });
                }
            }
        }

        self.active = active;
        self.total_voting_power = total_voting_power;
        self.total_joining_power = U256::ZERO;
        self.current_epoch = new_epoch;
        self.last_reconfiguration_time = now;
        info!(
            epoch = new_epoch,
            active_count = self.active.len(),
            total_voting_power = %self.total_voting_power,
            "processed validator set for new epoch"
        );
        events.push(GravityEvent::EpochProcessed {
            epoch: new_epoch,
            active_count: self.active.len() as u64,
            total_voting_power: self.total_voting_power,
        });
    }

    // === Views ===

    pub fn record(&self, pool: Address) -> Option<&ValidatorRecord> {
        self.records.get(&pool)
    }

    pub fn get_validator(&self, pool: Address) -> GravityResult<ValidatorRecord> {
        self.records
            .get(&pool)
            .cloned()
            .ok_or(GravityError::ValidatorNotFound(pool))
    }

    pub fn is_validator(&self, pool: Address) -> bool {
        self.records.contains_key(&pool)
    }

    pub fn validator_status(&self, pool: Address) -> GravityResult<ValidatorStatus> {
        self.records
            .get(&pool)
            .map(|r| r.status)
            .ok_or(GravityError::ValidatorNotFound(pool))
    }

    pub fn active_validator_count(&self) -> u64 {
        self.active.len() as u64
    }

    pub fn total_voting_power(&self) -> U256 {
        self.total_voting_power
    }

    pub fn total_joining_power(&self) -> U256 {
        self.total_joining_power
    }

    pub fn current_epoch(&self) -> EpochId {
        self.current_epoch
    }

    pub fn last_reconfiguration_time(&self) -> TimestampUs {
        self.last_reconfiguration_time
    }

    pub fn active_validator_by_index(&self, index: u64) -> GravityResult<ValidatorConsensusInfo> {
        self.active
            .get(index as usize)
            .and_then(|pool| self.records.get(pool))
            .map(|record| record.consensus_info())
            .ok_or(GravityError::ValidatorIndexOutOfBounds {
                index,
                count: self.active_validator_count(),
            })
    }

    fn infos(&self, pools: &[Address]) -> Vec<ValidatorConsensusInfo> {
        pools
            .iter()
            .filter_map(|pool| self.records.get(pool))
            .map(|record| record.consensus_info())
            .collect()
    }

    /// The in-flight epoch's committee, in index order. PendingInactive
    /// members are included; they validate until the boundary.
    pub fn cur_validator_consensus_infos(&self) -> Vec<ValidatorConsensusInfo> {
        self.infos(&self.active)
    }

    pub fn pending_active_consensus_infos(&self) -> Vec<ValidatorConsensusInfo> {
        self.infos(&self.pending_active)
    }

    pub fn pending_inactive_consensus_infos(&self) -> Vec<ValidatorConsensusInfo> {
        self.infos(&self.pending_inactive)
    }

    /// The committee `on_new_epoch` would install if it ran now, with fresh
    /// bonds and fresh indices `0..M`.
    pub fn next_validator_consensus_infos(
        &self,
        staking: &StakingRegistry,
        config: &StakingConfig,
    ) -> Vec<ValidatorConsensusInfo> {
        let plan = self.plan_next_epoch(staking, config);
        plan.members()
            .enumerate()
            .filter_map(|(index, (pool, bond))| {
                self.records.get(pool).map(|record| {
                    let mut info = record.consensus_info();
                    info.voting_power = *bond;
                    info.validator_index = index as u64;
                    info
                })
            })
            .collect()
    }
}
