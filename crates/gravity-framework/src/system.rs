// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, B256, U256};
use gravity_types::{
    base_types::{EpochId, TimestampUs},
    config::StakingConfig,
    error::{GravityError, GravityResult},
    event::GravityEvent,
    governance::ProposalState,
    system_addresses::{SystemIdentity, assert_caller},
    validator::{ValidatorConsensusInfo, ValidatorRecord, ValidatorStatus},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config_store::ConfigStore,
    governance::{Governance, GovernanceResolver},
    ledger::Ledger,
    reconfiguration::Reconfiguration,
    stake_pool::PendingBucket,
    staking::StakingRegistry,
    timestamp::GlobalClock,
    validator_manager::ValidatorManager,
    voting::{Proposal, VotingEngine},
};

/// The Gravity core state machine behind a single facade. Owns one instance
/// of every component plus the ledger and the event buffer, takes the caller
/// address as the first argument of every entry point, and enforces the two
/// cross-cutting rules: system-caller identities and the "no user mutation
/// during an epoch transition" gate.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GravitySystem {
    pub clock: GlobalClock,
    pub config: ConfigStore,
    pub ledger: Ledger,
    pub staking: StakingRegistry,
    pub validators: ValidatorManager,
    pub reconfiguration: Reconfiguration,
    pub voting: VotingEngine,
    pub governance: Governance,
    pub events: Vec<GravityEvent>,
}

impl GravitySystem {
    /// Genesis-only, once: installs the genesis staking config.
    pub fn initialize(&mut self, caller: Address, genesis_config: StakingConfig) -> GravityResult<()> {
        self.config.initialize(caller, genesis_config)
    }

    /// Drains the buffered events in emission order.
    pub fn drain_events(&mut self) -> Vec<GravityEvent> {
        std::mem::take(&mut self.events)
    }

    fn assert_no_transition(&self) -> GravityResult<()> {
        if self.reconfiguration.is_transition_in_progress() {
            return Err(GravityError::ReconfigurationInProgress);
        }
        Ok(())
    }

    // === System callers ===

    /// Block-only: monotone clock update.
    pub fn update_global_time(&mut self, caller: Address, now_us: TimestampUs) -> GravityResult<()> {
        self.clock.update_global_time(caller, now_us)
    }

    /// Governance-only: stages a config record for the next epoch boundary.
    pub fn set_config_for_next_epoch(
        &mut self,
        caller: Address,
        config: StakingConfig,
    ) -> GravityResult<()> {
        self.config.set_for_next_epoch(caller, config)
    }

    /// Reconfiguration-only: swaps the staged config into place.
    pub fn apply_pending_config(&mut self, caller: Address) -> GravityResult<()> {
        self.config.apply_pending_config(caller)
    }

    /// Reconfiguration-only: runs the validator-set epoch processing.
    pub fn process_new_epoch(&mut self, caller: Address) -> GravityResult<()> {
        assert_caller(SystemIdentity::Reconfiguration, caller)?;
        let config = self.config.active().clone();
        let now = self.clock.now_us();
        self.validators
            .on_new_epoch(&self.staking, &config, now, &mut self.events);
        Ok(())
    }

    /// Block- or Governance-only. Serializes the epoch transition: applies
    /// the staged config, drains the validator queues, bumps the epoch.
    /// A second request at an unchanged reconfiguration timestamp is
    /// silently deduplicated.
    pub fn reconfigure(&mut self, caller: Address) -> GravityResult<()> {
        if caller != SystemIdentity::Block.address()
            && caller != SystemIdentity::Governance.address()
        {
            return Err(GravityError::Unauthorized(SystemIdentity::Block));
        }
        self.assert_no_transition()?;
        let now = self.clock.now_us();
        if self.reconfiguration.is_duplicate(now) {
            return Ok(());
        }

        self.reconfiguration.begin(now);
        self.config.apply_pending_unchecked();
        let config = self.config.active().clone();
        self.validators
            .on_new_epoch(&self.staking, &config, now, &mut self.events);
        let epoch = self.reconfiguration.finish();
        info!(epoch, "reconfiguration complete");
        self.events.push(GravityEvent::NewEpoch { epoch });
        Ok(())
    }

    // === Staking factory ===

    /// Payable: `value` is the attached stake, deposited to the new pool's
    /// derived address.
    #[allow(clippy::too_many_arguments)]
    pub fn create_pool(
        &mut self,
        caller: Address,
        owner: Address,
        staker: Address,
        operator: Address,
        voter: Address,
        locked_until: TimestampUs,
        value: U256,
    ) -> GravityResult<Address> {
        self.assert_no_transition()?;
        let now = self.clock.now_us();
        let pool = self.staking.create_pool(
            owner,
            staker,
            operator,
            voter,
            locked_until,
            value,
            now,
            self.config.min_stake(),
            self.config.lockup_duration_micros(),
        )?;
        self.ledger.deposit(pool, value);
        self.events.push(GravityEvent::PoolCreated {
            creator: caller,
            pool,
            owner,
            staker,
            pool_index: self.staking.pool_count() - 1,
        });
        Ok(pool)
    }

    // === StakePool operations ===

    /// Staker-only, payable.
    pub fn add_stake(&mut self, caller: Address, pool: Address, value: U256) -> GravityResult<()> {
        self.assert_no_transition()?;
        let now = self.clock.now_us();
        let lockup_duration = self.config.lockup_duration_micros();
        let pool_state = self.staking.pool_mut(pool)?;
        pool_state.assert_staker(caller)?;
        pool_state.add_stake(value, now, lockup_duration)?;
        let active_stake = pool_state.active_stake();
        self.ledger.deposit(pool, value);
        self.events.push(GravityEvent::StakeAdded {
            pool,
            amount: value,
            active_stake,
        });
        Ok(())
    }

    /// Staker-only. A pool backing an Active or PendingInactive validator
    /// must keep at least the minimum bond.
    pub fn unstake(&mut self, caller: Address, pool: Address, amount: U256) -> GravityResult<()> {
        self.assert_no_transition()?;
        let pool_state = self.staking.pool(pool)?;
        pool_state.assert_staker(caller)?;
        if amount.is_zero() {
            return Err(GravityError::ZeroAmount);
        }
        if amount > pool_state.active_stake() {
            return Err(GravityError::InsufficientAvailableStake);
        }
        let bonded = self
            .validators
            .record(pool)
            .is_some_and(|record| record.status.in_active_set());
        if bonded && pool_state.active_stake() - amount < self.config.min_bond() {
            return Err(GravityError::WithdrawalWouldBreachMinimumBond);
        }
        let locked_until = self.staking.pool_mut(pool)?.unstake(amount)?;
        self.events.push(GravityEvent::Unstaked {
            pool,
            amount,
            locked_until,
        });
        Ok(())
    }

    /// Staker-only. Pays out every bucket whose unbonding delay elapsed;
    /// the claim pointer commits before the outbound transfer.
    pub fn withdraw_available(
        &mut self,
        caller: Address,
        pool: Address,
        to: Address,
    ) -> GravityResult<U256> {
        self.assert_no_transition()?;
        let now = self.clock.now_us();
        let unbonding_delay = self.config.unbonding_delay_micros();
        let pool_state = self.staking.pool_mut(pool)?;
        pool_state.assert_staker(caller)?;
        let amount = pool_state.withdraw_available(now, unbonding_delay);
        if !amount.is_zero() {
            self.ledger.transfer(pool, to, amount)?;
        }
        self.events.push(GravityEvent::WithdrawalClaimed {
            pool,
            recipient: to,
            amount,
        });
        Ok(amount)
    }

    /// `unstake` followed by `withdraw_available` in a single call.
    pub fn unstake_and_withdraw(
        &mut self,
        caller: Address,
        pool: Address,
        amount: U256,
        to: Address,
    ) -> GravityResult<U256> {
        self.unstake(caller, pool, amount)?;
        self.withdraw_available(caller, pool, to)
    }

    /// Staker-only. Lockups only ever grow.
    pub fn renew_lock_until(
        &mut self,
        caller: Address,
        pool: Address,
        extension_micros: u64,
    ) -> GravityResult<()> {
        self.assert_no_transition()?;
        let now = self.clock.now_us();
        let lockup_duration = self.config.lockup_duration_micros();
        let pool_state = self.staking.pool_mut(pool)?;
        pool_state.assert_staker(caller)?;
        let locked_until = pool_state.renew_lock_until(extension_micros, now, lockup_duration)?;
        self.events.push(GravityEvent::LockupRenewed { pool, locked_until });
        Ok(())
    }

    /// Owner-only.
    pub fn set_operator(
        &mut self,
        caller: Address,
        pool: Address,
        new_operator: Address,
    ) -> GravityResult<()> {
        self.assert_no_transition()?;
        let pool_state = self.staking.pool_mut(pool)?;
        pool_state.assert_owner(caller)?;
        let old_operator = pool_state.set_operator(new_operator);
        self.events.push(GravityEvent::OperatorChanged {
            pool,
            old_operator,
            new_operator,
        });
        Ok(())
    }

    /// Owner-only.
    pub fn set_voter(
        &mut self,
        caller: Address,
        pool: Address,
        new_voter: Address,
    ) -> GravityResult<()> {
        self.assert_no_transition()?;
        let pool_state = self.staking.pool_mut(pool)?;
        pool_state.assert_owner(caller)?;
        let old_voter = pool_state.set_voter(new_voter);
        self.events.push(GravityEvent::VoterChanged {
            pool,
            old_voter,
            new_voter,
        });
        Ok(())
    }

    /// Owner-only.
    pub fn set_staker(
        &mut self,
        caller: Address,
        pool: Address,
        new_staker: Address,
    ) -> GravityResult<()> {
        self.assert_no_transition()?;
        let pool_state = self.staking.pool_mut(pool)?;
        pool_state.assert_owner(caller)?;
        let old_staker = pool_state.set_staker(new_staker);
        self.events.push(GravityEvent::StakerChanged {
            pool,
            old_staker,
            new_staker,
        });
        Ok(())
    }

    /// Owner-only: first half of the two-step ownership transfer.
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        pool: Address,
        new_owner: Address,
    ) -> GravityResult<()> {
        self.assert_no_transition()?;
        let pool_state = self.staking.pool_mut(pool)?;
        pool_state.assert_owner(caller)?;
        pool_state.transfer_ownership(new_owner);
        Ok(())
    }

    /// Proposed-owner-only: second half of the transfer.
    pub fn accept_ownership(&mut self, caller: Address, pool: Address) -> GravityResult<()> {
        self.assert_no_transition()?;
        let pool_state = self.staking.pool_mut(pool)?;
        let old_owner = pool_state.accept_ownership(caller)?;
        self.events.push(GravityEvent::OwnershipTransferred {
            pool,
            old_owner,
            new_owner: caller,
        });
        Ok(())
    }

    // === Validator management ===

    /// Operator-only.
    pub fn register_validator(
        &mut self,
        caller: Address,
        pool: Address,
        moniker: String,
        consensus_pubkey: Vec<u8>,
        consensus_pop: Vec<u8>,
        network_addresses: Vec<u8>,
        fullnode_addresses: Vec<u8>,
    ) -> GravityResult<()> {
        self.assert_no_transition()?;
        let pool_state = self.staking.pool(pool)?;
        pool_state.assert_operator(caller)?;
        let owner = pool_state.owner();
        let bond = pool_state.active_stake();
        self.validators.register_validator(
            pool,
            owner,
            bond,
            moniker.clone(),
            consensus_pubkey,
            consensus_pop,
            network_addresses,
            fullnode_addresses,
            self.config.min_bond(),
        )?;
        self.events
            .push(GravityEvent::ValidatorRegistered { pool, moniker });
        Ok(())
    }

    /// Operator-only: queue for activation at the next boundary.
    pub fn join_validator_set(&mut self, caller: Address, pool: Address) -> GravityResult<()> {
        self.assert_no_transition()?;
        let pool_state = self.staking.pool(pool)?;
        pool_state.assert_operator(caller)?;
        let stake = pool_state.active_stake();
        self.validators
            .join_validator_set(pool, stake, self.config.active())?;
        self.events.push(GravityEvent::ValidatorJoinRequested { pool });
        Ok(())
    }

    /// Operator-only: queue for deactivation (or revert a pending join).
    pub fn leave_validator_set(&mut self, caller: Address, pool: Address) -> GravityResult<()> {
        self.assert_no_transition()?;
        self.staking.pool(pool)?.assert_operator(caller)?;
        self.validators
            .leave_validator_set(pool, false, self.config.active())?;
        self.events.push(GravityEvent::ValidatorLeaveRequested { pool });
        Ok(())
    }

    /// Governance-only: like a voluntary leave, but may empty the set.
    pub fn force_leave_validator_set(
        &mut self,
        caller: Address,
        pool: Address,
    ) -> GravityResult<()> {
        assert_caller(SystemIdentity::Governance, caller)?;
        self.assert_no_transition()?;
        self.validators
            .leave_validator_set(pool, true, self.config.active())?;
        self.events
            .push(GravityEvent::ValidatorForceLeaveRequested { pool });
        Ok(())
    }

    /// Operator-only.
    pub fn rotate_consensus_key(
        &mut self,
        caller: Address,
        pool: Address,
        new_pubkey: Vec<u8>,
        new_pop: Vec<u8>,
    ) -> GravityResult<()> {
        self.assert_no_transition()?;
        self.staking.pool(pool)?.assert_operator(caller)?;
        self.validators
            .rotate_consensus_key(pool, new_pubkey.clone(), new_pop)?;
        self.events.push(GravityEvent::ConsensusKeyRotated {
            pool,
            new_pubkey,
        });
        Ok(())
    }

    /// Owner-only. Staged; takes effect at the next epoch boundary.
    pub fn set_fee_recipient(
        &mut self,
        caller: Address,
        pool: Address,
        new_recipient: Address,
    ) -> GravityResult<()> {
        self.assert_no_transition()?;
        self.staking.pool(pool)?.assert_owner(caller)?;
        self.validators.stage_fee_recipient(pool, new_recipient)
    }

    // === Governance ===

    /// Voter-only for `pool`. The pool must carry at least the minimum
    /// proposal stake and stay locked past the proposal's expiration.
    pub fn create_proposal(
        &mut self,
        caller: Address,
        pool: Address,
        execution_hash: B256,
        metadata_uri: String,
        min_vote_threshold: u128,
        voting_duration_micros: u64,
    ) -> GravityResult<u64> {
        self.assert_no_transition()?;
        let now = self.clock.now_us();
        let pool_state = self.staking.pool(pool)?;
        pool_state.assert_voter(caller)?;
        if pool_state.voting_power(now) < self.config.min_proposal_stake() {
            return Err(GravityError::InsufficientStake);
        }
        let expiration_time = now.saturating_add(voting_duration_micros);
        if pool_state.locked_until() < expiration_time {
            return Err(GravityError::InsufficientLockup);
        }
        let proposal_id = self.voting.create_proposal(
            caller,
            execution_hash,
            metadata_uri,
            min_vote_threshold,
            voting_duration_micros,
            now,
        );
        self.events.push(GravityEvent::ProposalCreated {
            proposal_id,
            proposer: caller,
            execution_hash,
            expiration_time,
        });
        Ok(proposal_id)
    }

    /// Voter-only for `pool`. Credits the unused remainder of the pool's
    /// current voting power; repeat votes only add what the pool gained
    /// since the last vote.
    pub fn vote(
        &mut self,
        caller: Address,
        pool: Address,
        proposal_id: u64,
        support: bool,
    ) -> GravityResult<()> {
        self.assert_no_transition()?;
        let now = self.clock.now_us();
        let pool_state = self.staking.pool(pool)?;
        pool_state.assert_voter(caller)?;
        let proposal = self.voting.proposal(proposal_id)?;
        if pool_state.locked_until() < proposal.expiration_time {
            return Err(GravityError::InsufficientLockup);
        }
        let current_power = pool_state.voting_power(now);
        let remaining = self.governance.remaining_power(caller, proposal_id, current_power);
        self.voting
            .vote(proposal_id, remaining.saturating_to::<u128>(), support, now)?;
        self.governance.mark_spent(caller, proposal_id, current_power);
        self.events.push(GravityEvent::VoteCast {
            proposal_id,
            voter: caller,
            voting_power: remaining.saturating_to::<u128>(),
            support,
        });
        Ok(())
    }

    /// Permissionless. Resolution must land strictly after the last vote, so
    /// a vote and the resolution can never share a transaction. A passing
    /// proposal's execution hash is handed to the resolver.
    pub fn resolve_proposal(
        &mut self,
        proposal_id: u64,
        resolver: &mut dyn GovernanceResolver,
    ) -> GravityResult<ProposalState> {
        self.assert_no_transition()?;
        let now = self.clock.now_us();
        let proposal = self.voting.proposal(proposal_id)?;
        if proposal.last_vote_time >= now {
            return Err(GravityError::ResolutionTooEarly);
        }
        let execution_hash = proposal.execution_hash;
        let state = self.voting.resolve(proposal_id, now)?;
        let resolved = self.voting.proposal(proposal_id)?;
        self.events.push(GravityEvent::ProposalResolved {
            proposal_id,
            state,
            yes_votes: resolved.yes_votes,
            no_votes: resolved.no_votes,
        });
        if state == ProposalState::Executed {
            resolver.execute(proposal_id, execution_hash);
        }
        Ok(state)
    }

    /// Timelock-only.
    pub fn set_early_resolution_threshold(
        &mut self,
        caller: Address,
        proposal_id: u64,
        threshold: u128,
    ) -> GravityResult<()> {
        assert_caller(SystemIdentity::Timelock, caller)?;
        self.assert_no_transition()?;
        self.voting
            .set_early_resolution_threshold(proposal_id, threshold)
    }

    // === Views ===

    pub fn now_us(&self) -> TimestampUs {
        self.clock.now_us()
    }

    pub fn balance_of(&self, address: Address) -> U256 {
        self.ledger.balance(address)
    }

    pub fn is_transition_in_progress(&self) -> bool {
        self.reconfiguration.is_transition_in_progress()
    }

    pub fn current_epoch(&self) -> EpochId {
        self.reconfiguration.epoch()
    }

    // Staking views. The aggregate helpers fail `InvalidPool` for unknown
    // addresses, matching the factory contract surface.

    pub fn is_pool(&self, pool: Address) -> bool {
        self.staking.is_pool(pool)
    }

    pub fn get_pool_count(&self) -> u64 {
        self.staking.pool_count()
    }

    pub fn get_pool_nonce(&self) -> u64 {
        self.staking.pool_nonce()
    }

    pub fn get_pool(&self, index: u64) -> GravityResult<Address> {
        self.staking.pool_by_index(index)
    }

    pub fn get_all_pools(&self) -> Vec<Address> {
        self.staking.all_pools().to_vec()
    }

    pub fn get_pool_owner(&self, pool: Address) -> GravityResult<Address> {
        Ok(self.staking.pool(pool)?.owner())
    }

    pub fn get_pool_staker(&self, pool: Address) -> GravityResult<Address> {
        Ok(self.staking.pool(pool)?.staker())
    }

    pub fn get_pool_operator(&self, pool: Address) -> GravityResult<Address> {
        Ok(self.staking.pool(pool)?.operator())
    }

    pub fn get_pool_voter(&self, pool: Address) -> GravityResult<Address> {
        Ok(self.staking.pool(pool)?.voter())
    }

    pub fn get_active_stake(&self, pool: Address) -> GravityResult<U256> {
        Ok(self.staking.pool(pool)?.active_stake())
    }

    pub fn get_total_pending(&self, pool: Address) -> GravityResult<U256> {
        Ok(self.staking.pool(pool)?.total_pending())
    }

    pub fn get_claimed_amount(&self, pool: Address) -> GravityResult<U256> {
        Ok(self.staking.pool(pool)?.claimed_amount())
    }

    pub fn get_claimable_amount(&self, pool: Address) -> GravityResult<U256> {
        Ok(self
            .staking
            .pool(pool)?
            .claimable_amount(self.clock.now_us(), self.config.unbonding_delay_micros()))
    }

    pub fn get_pending_bucket_count(&self, pool: Address) -> GravityResult<usize> {
        Ok(self.staking.pool(pool)?.pending_bucket_count())
    }

    pub fn get_pending_bucket(
        &self,
        pool: Address,
        index: usize,
    ) -> GravityResult<Option<PendingBucket>> {
        Ok(self.staking.pool(pool)?.pending_bucket(index))
    }

    pub fn get_locked_until(&self, pool: Address) -> GravityResult<TimestampUs> {
        Ok(self.staking.pool(pool)?.locked_until())
    }

    pub fn is_locked(&self, pool: Address) -> GravityResult<bool> {
        Ok(self.staking.pool(pool)?.is_locked(self.clock.now_us()))
    }

    pub fn get_effective_stake(&self, pool: Address, t: TimestampUs) -> GravityResult<U256> {
        Ok(self.staking.pool(pool)?.effective_stake(t))
    }

    pub fn get_voting_power(&self, pool: Address, t: TimestampUs) -> GravityResult<U256> {
        Ok(self.staking.pool(pool)?.voting_power(t))
    }

    pub fn get_voting_power_now(&self, pool: Address) -> GravityResult<U256> {
        self.get_voting_power(pool, self.clock.now_us())
    }

    // Validator views.

    pub fn get_validator(&self, pool: Address) -> GravityResult<ValidatorRecord> {
        self.validators.get_validator(pool)
    }

    pub fn is_validator(&self, pool: Address) -> bool {
        self.validators.is_validator(pool)
    }

    pub fn get_validator_status(&self, pool: Address) -> GravityResult<ValidatorStatus> {
        self.validators.validator_status(pool)
    }

    pub fn get_active_validator_count(&self) -> u64 {
        self.validators.active_validator_count()
    }

    pub fn get_active_validator_by_index(&self, index: u64) -> GravityResult<ValidatorConsensusInfo> {
        self.validators.active_validator_by_index(index)
    }

    pub fn get_total_voting_power(&self) -> U256 {
        self.validators.total_voting_power()
    }

    pub fn get_cur_validator_consensus_infos(&self) -> Vec<ValidatorConsensusInfo> {
        self.validators.cur_validator_consensus_infos()
    }

    pub fn get_next_validator_consensus_infos(&self) -> Vec<ValidatorConsensusInfo> {
        self.validators
            .next_validator_consensus_infos(&self.staking, self.config.active())
    }

    pub fn get_pending_active_validators(&self) -> Vec<ValidatorConsensusInfo> {
        self.validators.pending_active_consensus_infos()
    }

    pub fn get_pending_inactive_validators(&self) -> Vec<ValidatorConsensusInfo> {
        self.validators.pending_inactive_consensus_infos()
    }

    // Governance views.

    pub fn get_proposal(&self, proposal_id: u64) -> GravityResult<Proposal> {
        self.voting.proposal(proposal_id).cloned()
    }

    pub fn get_proposal_state(&self, proposal_id: u64) -> GravityResult<ProposalState> {
        self.voting.proposal_state(proposal_id, self.clock.now_us())
    }

    pub fn get_used_voting_power(&self, voter: Address, proposal_id: u64) -> U256 {
        self.governance.used_power(voter, proposal_id)
    }
}
