// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{
    base_types::{EpochId, TimestampUs},
    governance::ProposalState,
};

/// Observable side effects of the core state machine. The framework buffers
/// them in emission order; event payloads are stable contracts consumed by
/// off-chain indexers and the consensus engine.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub enum GravityEvent {
    // Staking
    PoolCreated {
        creator: Address,
        pool: Address,
        owner: Address,
        staker: Address,
        pool_index: u64,
    },
    StakeAdded {
        pool: Address,
        amount: U256,
        active_stake: U256,
    },
    Unstaked {
        pool: Address,
        amount: U256,
        locked_until: TimestampUs,
    },
    WithdrawalClaimed {
        pool: Address,
        recipient: Address,
        amount: U256,
    },
    LockupRenewed {
        pool: Address,
        locked_until: TimestampUs,
    },
    OperatorChanged {
        pool: Address,
        old_operator: Address,
        new_operator: Address,
    },
    VoterChanged {
        pool: Address,
        old_voter: Address,
        new_voter: Address,
    },
    StakerChanged {
        pool: Address,
        old_staker: Address,
        new_staker: Address,
    },
    OwnershipTransferred {
        pool: Address,
        old_owner: Address,
        new_owner: Address,
    },

    // Validator management
    ValidatorRegistered {
        pool: Address,
        moniker: String,
    },
    ValidatorJoinRequested {
        pool: Address,
    },
    ValidatorLeaveRequested {
        pool: Address,
    },
    ValidatorForceLeaveRequested {
        pool: Address,
    },
    ValidatorActivated {
        pool: Address,
        epoch: EpochId,
        voting_power: U256,
    },
    ValidatorDeactivated {
        pool: Address,
    },
    ConsensusKeyRotated {
        pool: Address,
        new_pubkey: Vec<u8>,
    },
    FeeRecipientUpdated {
        pool: Address,
        new_recipient: Address,
    },
    EpochProcessed {
        epoch: EpochId,
        active_count: u64,
        total_voting_power: U256,
    },

    // Voting
    ProposalCreated {
        proposal_id: u64,
        proposer: Address,
        execution_hash: B256,
        expiration_time: TimestampUs,
    },
    VoteCast {
        proposal_id: u64,
        voter: Address,
        voting_power: u128,
        support: bool,
    },
    ProposalResolved {
        proposal_id: u64,
        state: ProposalState,
        yes_votes: u128,
        no_votes: u128,
    },

    // Reconfiguration
    NewEpoch {
        epoch: EpochId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Event payloads are a stable contract for off-chain indexers; pin the
    /// serialized shape.
    #[test]
    fn test_event_serialization_shape() {
        let event = GravityEvent::EpochProcessed {
            epoch: 7,
            active_count: 2,
            total_voting_power: U256::from(110u64),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "EpochProcessed": {
                    "epoch": 7,
                    "active_count": 2,
                    "total_voting_power": "0x6e",
                }
            })
        );

        let event = GravityEvent::ValidatorActivated {
            pool: Address::with_last_byte(1),
            epoch: 1,
            voting_power: U256::from(100u64),
        };
        let roundtrip: GravityEvent =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(roundtrip, event);
    }
}
