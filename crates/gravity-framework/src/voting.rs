// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, B256};
use gravity_types::{
    base_types::TimestampUs,
    error::{GravityError, GravityResult},
    governance::ProposalState,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A stored proposal. The state is always derived from these fields and the
/// clock; it is never stored redundantly.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Address,
    /// Hash of the transaction payload that is allowed to execute this
    /// proposal once it resolves. The engine only stores it; the governance
    /// binding checks it.
    pub execution_hash: B256,
    pub metadata_uri: String,
    pub creation_time: TimestampUs,
    pub expiration_time: TimestampUs,
    /// Minimum combined turnout for the proposal to pass.
    pub min_vote_threshold: u128,
    pub yes_votes: u128,
    pub no_votes: u128,
    /// When either tally reaches this, the proposal becomes resolvable
    /// before expiration. Armed by the Timelock caller.
    pub early_resolution_threshold: Option<u128>,
    pub is_resolved: bool,
    pub resolution_time: TimestampUs,
    /// Timestamp of the most recent vote; resolution must happen strictly
    /// later so that a vote and the resolution never share a transaction.
    pub last_vote_time: TimestampUs,
}

impl Proposal {
    fn passes(&self) -> bool {
        self.yes_votes > self.no_votes
            && self.yes_votes.saturating_add(self.no_votes) >= self.min_vote_threshold
    }

    fn early_resolvable(&self) -> bool {
        self.early_resolution_threshold
            .is_some_and(|threshold| self.yes_votes >= threshold || self.no_votes >= threshold)
    }

    pub fn state(&self, now: TimestampUs) -> ProposalState {
        if self.is_resolved {
            if self.passes() {
                ProposalState::Executed
            } else {
                ProposalState::Failed
            }
        } else if now < self.expiration_time && !self.early_resolvable() {
            ProposalState::Pending
        } else if self.passes() {
            ProposalState::Succeeded
        } else {
            ProposalState::Failed
        }
    }
}

/// Generic proposal/vote/resolve engine. It accumulates voting power and
/// advances the resolution bit; binding votes to pool-backed authority and
/// executing outcomes is the governance layer's job.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct VotingEngine {
    proposals: std::collections::BTreeMap<u64, Proposal>,
    next_proposal_id: u64,
}

impl VotingEngine {
    pub fn proposal(&self, proposal_id: u64) -> GravityResult<&Proposal> {
        self.proposals
            .get(&proposal_id)
            .ok_or(GravityError::ProposalNotFound(proposal_id))
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn proposal_state(&self, proposal_id: u64, now: TimestampUs) -> GravityResult<ProposalState> {
        Ok(self.proposal(proposal_id)?.state(now))
    }

    /// Stores a new proposal and returns its id. Ids start at 1 and grow
    /// monotonically.
    pub fn create_proposal(
        &mut self,
        proposer: Address,
        execution_hash: B256,
        metadata_uri: String,
        min_vote_threshold: u128,
        voting_duration_micros: u64,
        now: TimestampUs,
    ) -> u64 {
        self.next_proposal_id += 1;
        let id = self.next_proposal_id;
        self.proposals.insert(
            id,
            Proposal {
                id,
                proposer,
                execution_hash,
                metadata_uri,
                creation_time: now,
                expiration_time: now.saturating_add(voting_duration_micros),
                min_vote_threshold,
                yes_votes: 0,
                no_votes: 0,
                early_resolution_threshold: None,
                is_resolved: false,
                resolution_time: 0,
                last_vote_time: 0,
            },
        );
        debug!(proposal_id = id, proposer = %proposer, "created proposal");
        id
    }

    /// Accumulates `voting_power` onto one side of the tally. Partial voting
    /// is intrinsic: the engine adds whatever it is given, the governance
    /// binding is responsible for computing the voter's unused remainder.
    pub fn vote(
        &mut self,
        proposal_id: u64,
        voting_power: u128,
        support: bool,
        now: TimestampUs,
    ) -> GravityResult<()> {
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GravityError::ProposalNotFound(proposal_id))?;
        if proposal.is_resolved {
            return Err(GravityError::ProposalAlreadyResolved);
        }
        if now >= proposal.expiration_time {
            return Err(GravityError::VotingPeriodEnded);
        }
        if support {
            proposal.yes_votes = proposal.yes_votes.saturating_add(voting_power);
        } else {
            proposal.no_votes = proposal.no_votes.saturating_add(voting_power);
        }
        proposal.last_vote_time = now;
        Ok(())
    }

    /// Marks the proposal resolved once voting has ended (by expiration or
    /// by reaching the early-resolution threshold) and returns the terminal
    /// state. Resolution only advances the state bit; it executes nothing.
    pub fn resolve(&mut self, proposal_id: u64, now: TimestampUs) -> GravityResult<ProposalState> {
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GravityError::ProposalNotFound(proposal_id))?;
        if proposal.is_resolved {
            return Err(GravityError::ProposalAlreadyResolved);
        }
        if now < proposal.expiration_time && !proposal.early_resolvable() {
            return Err(GravityError::VotingPeriodNotEnded);
        }
        proposal.is_resolved = true;
        proposal.resolution_time = now;
        debug!(proposal_id, "resolved proposal");
        Ok(proposal.state(now))
    }

    /// Timelock-gated by the caller. Arms early resolution on a live
    /// proposal.
    pub fn set_early_resolution_threshold(
        &mut self,
        proposal_id: u64,
        threshold: u128,
    ) -> GravityResult<()> {
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GravityError::ProposalNotFound(proposal_id))?;
        if proposal.is_resolved {
            return Err(GravityError::ProposalAlreadyResolved);
        }
        proposal.early_resolution_threshold = Some(threshold);
        Ok(())
    }
}
