// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Length of a BLS12-381 consensus public key in bytes. The key and its
/// proof of possession are stored verbatim; verification happens in the
/// consensus engine outside this core.
pub const CONSENSUS_PUBKEY_LENGTH: usize = 48;

/// Maximum moniker length in bytes.
pub const MAX_MONIKER_LENGTH: usize = 31;

/// Sentinel for a validator that holds no index in the current epoch.
pub const VALIDATOR_INDEX_NONE: u64 = u64::MAX;

/// Validator lifecycle status. Discriminants match the on-chain ABI.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValidatorStatus {
    /// Not in the validator set.
    Inactive = 0,
    /// Queued to join at the next epoch boundary.
    PendingActive = 1,
    /// Currently validating.
    Active = 2,
    /// Still validating this epoch, queued to leave at the next boundary.
    PendingInactive = 3,
}

impl ValidatorStatus {
    /// Whether the validator participates in the in-flight epoch. Pools in
    /// this state must keep their bond above the minimum.
    pub fn in_active_set(&self) -> bool {
        matches!(self, ValidatorStatus::Active | ValidatorStatus::PendingInactive)
    }
}

impl TryFrom<u8> for ValidatorStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(ValidatorStatus::Inactive),
            1 => Ok(ValidatorStatus::PendingActive),
            2 => Ok(ValidatorStatus::Active),
            3 => Ok(ValidatorStatus::PendingInactive),
            other => Err(other),
        }
    }
}

/// Full validator record, keyed by its stake pool address.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct ValidatorRecord {
    /// Immutable validator identity; equals the stake pool address.
    pub validator: Address,
    /// Display name, at most 31 bytes.
    pub moniker: String,
    pub status: ValidatorStatus,
    /// Snapshot of the pool's effective bond, refreshed at every epoch
    /// boundary and capped at the maximum bond. Used as consensus voting
    /// power while active.
    pub bond: U256,
    pub consensus_pubkey: Vec<u8>,
    pub consensus_pop: Vec<u8>,
    pub network_addresses: Vec<u8>,
    pub fullnode_addresses: Vec<u8>,
    pub fee_recipient: Address,
    /// Staged fee recipient, applied at the next epoch boundary while the
    /// record is in the active set. `Address::ZERO` means nothing staged.
    pub pending_fee_recipient: Address,
    /// Position in the active validator array. Only meaningful while the
    /// status is Active or PendingInactive; `VALIDATOR_INDEX_NONE` otherwise.
    pub validator_index: u64,
}

impl ValidatorRecord {
    pub fn consensus_info(&self) -> ValidatorConsensusInfo {
        ValidatorConsensusInfo {
            validator: self.validator,
            consensus_pubkey: self.consensus_pubkey.clone(),
            consensus_pop: self.consensus_pop.clone(),
            voting_power: self.bond,
            validator_index: self.validator_index,
            network_addresses: self.network_addresses.clone(),
            fullnode_addresses: self.fullnode_addresses.clone(),
        }
    }
}

/// The row the consensus engine reads for each committee member.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct ValidatorConsensusInfo {
    pub validator: Address,
    pub consensus_pubkey: Vec<u8>,
    pub consensus_pop: Vec<u8>,
    pub voting_power: U256,
    pub validator_index: u64,
    pub network_addresses: Vec<u8>,
    pub fullnode_addresses: Vec<u8>,
}
