// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{system_addresses::SystemIdentity, validator::ValidatorStatus};

pub type GravityResult<T = ()> = Result<T, GravityError>;

/// Typed failures surfaced by the core state machine. Every error aborts the
/// enclosing operation; no partial state change commits and nothing is
/// retried inside the core.
#[derive(thiserror::Error, Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub enum GravityError {
    // Authorization
    #[error("Caller is not the pool owner")]
    NotOwner,
    #[error("Caller is not the pool operator")]
    NotOperator,
    #[error("Caller is not the pool staker")]
    NotStaker,
    #[error("Caller is not the pool voter")]
    NotVoter,
    #[error("Caller is not the {0} system identity")]
    Unauthorized(SystemIdentity),

    // Existence
    #[error("Address {0} is not a stake pool")]
    InvalidPool(Address),
    #[error("No validator is registered for pool {0}")]
    ValidatorNotFound(Address),
    #[error("No proposal with id {0}")]
    ProposalNotFound(u64),
    #[error("Pool index {index} out of bounds (pool count {count})")]
    PoolIndexOutOfBounds { index: u64, count: u64 },
    #[error("Validator index {index} out of bounds (active count {count})")]
    ValidatorIndexOutOfBounds { index: u64, count: u64 },

    // Uniqueness / conflict
    #[error("A validator is already registered for pool {0}")]
    ValidatorAlreadyExists(Address),
    #[error("Consensus pubkey is already bound to another validator")]
    DuplicateConsensusPubkey,
    #[error("Component is already initialized")]
    AlreadyInitialized,

    // Arithmetic / bounds
    #[error("Amount must be non-zero")]
    ZeroAmount,
    #[error("Insufficient stake")]
    InsufficientStake,
    #[error("Requested amount exceeds the pool's active stake")]
    InsufficientAvailableStake,
    #[error("Bond is below the minimum bond")]
    InsufficientBond,
    #[error("Bond exceeds the maximum bond")]
    ExceedsMaximumBond,
    #[error("Value is below the minimum stake required to create a pool")]
    InsufficientStakeForPoolCreation,
    #[error("Moniker of {0} bytes exceeds the 31 byte maximum")]
    MonikerTooLong(usize),
    #[error("Consensus pubkey of {0} bytes is not a 48 byte BLS key")]
    InvalidConsensusPubkeyLength(usize),
    #[error("Consensus proof of possession must be non-empty")]
    InvalidConsensusPopLength,
    #[error("Staking config rejected: {0}")]
    InvalidConfig(&'static str),

    // Temporal
    #[error("Pool lockup has not expired")]
    LockupNotExpired,
    #[error("Lockup must cover at least one lockup duration")]
    LockupDurationTooShort,
    #[error("Lockup extension is zero or overflows")]
    InvalidLockupExtension,
    #[error("Pool lockup does not cover the proposal expiration")]
    InsufficientLockup,
    #[error("Unbonding delay has not elapsed")]
    UnbondNotReady,
    #[error("Voting period has ended")]
    VotingPeriodEnded,
    #[error("Voting period has not ended")]
    VotingPeriodNotEnded,
    #[error("Withdrawal would take the bond below the minimum")]
    WithdrawalWouldBreachMinimumBond,
    #[error("Global clock may not move backwards")]
    InvalidTimestamp,
    #[error("Resolution must happen strictly after the last vote")]
    ResolutionTooEarly,

    // State machine
    #[error("Validator status is {actual}, expected {expected}")]
    InvalidStatus {
        expected: ValidatorStatus,
        actual: ValidatorStatus,
    },
    #[error("Validator set changes are disabled")]
    ValidatorSetChangesDisabled,
    #[error("Cannot remove the last active validator")]
    CannotRemoveLastValidator,
    #[error("An epoch transition is in progress")]
    ReconfigurationInProgress,
    #[error("Validator set has reached its maximum size")]
    MaxValidatorSetSizeReached,
    #[error("Voting power increase exceeds the per-epoch limit")]
    VotingPowerIncreaseLimitExceeded,
    #[error("Proposal is already resolved")]
    ProposalAlreadyResolved,
}
