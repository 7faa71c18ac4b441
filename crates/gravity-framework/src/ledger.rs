// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use gravity_types::error::{GravityError, GravityResult};
use serde::{Deserialize, Serialize};

/// Minimal balance book standing in for the native value channel. Payable
/// operations deposit their attached value here; withdrawals move funds from
/// a pool to a recipient. The concrete delivery mechanism is
/// deployment-defined, so nothing outside the framework depends on this
/// being more than an `Address -> U256` map.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Ledger {
    balances: BTreeMap<Address, U256>,
}

impl Ledger {
    pub fn balance(&self, address: Address) -> U256 {
        self.balances.get(&address).copied().unwrap_or(U256::ZERO)
    }

    pub fn deposit(&mut self, address: Address, amount: U256) {
        *self.balances.entry(address).or_insert(U256::ZERO) += amount;
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> GravityResult<()> {
        let balance = self.balance(from);
        if balance < amount {
            return Err(GravityError::InsufficientAvailableStake);
        }
        self.balances.insert(from, balance - amount);
        self.deposit(to, amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_and_transfer() {
        let a = Address::with_last_byte(1);
        let b = Address::with_last_byte(2);
        let mut ledger = Ledger::default();
        ledger.deposit(a, U256::from(100u64));
        ledger.transfer(a, b, U256::from(40u64)).unwrap();
        assert_eq!(ledger.balance(a), U256::from(60u64));
        assert_eq!(ledger.balance(b), U256::from(40u64));
        assert_eq!(
            ledger.transfer(a, b, U256::from(61u64)),
            Err(GravityError::InsufficientAvailableStake)
        );
    }
}
