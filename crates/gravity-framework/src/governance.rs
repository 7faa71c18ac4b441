// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// External collaborator that turns a resolved proposal into actual
/// parameter changes. The binding only verifies authority and hands over the
/// execution hash; verifying that the executing payload hashes to it happens
/// outside the core.
pub trait GovernanceResolver {
    fn execute(&mut self, proposal_id: u64, execution_hash: B256);
}

/// Per-(voter, proposal) ledger of voting power already spent. Votes only
/// ever credit the difference between a pool's current power and this mark,
/// so repeat votes add nothing unless the pool's stake grew in between.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Governance {
    used_power: BTreeMap<Address, BTreeMap<u64, U256>>,
}

impl Governance {
    pub fn used_power(&self, voter: Address, proposal_id: u64) -> U256 {
        self.used_power
            .get(&voter)
            .and_then(|by_proposal| by_proposal.get(&proposal_id))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// The unused remainder of `current_power` for this (voter, proposal).
    pub fn remaining_power(&self, voter: Address, proposal_id: u64, current_power: U256) -> U256 {
        current_power.saturating_sub(self.used_power(voter, proposal_id))
    }

    /// Raises the used mark to the full current power. The mark is monotone;
    /// a shrunk pool never refunds spent power.
    pub fn mark_spent(&mut self, voter: Address, proposal_id: u64, current_power: U256) {
        let entry = self
            .used_power
            .entry(voter)
            .or_default()
            .entry(proposal_id)
            .or_insert(U256::ZERO);
        *entry = (*entry).max(current_power);
    }
}
