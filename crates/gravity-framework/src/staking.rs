// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256, keccak256};
use gravity_types::{
    base_types::TimestampUs,
    error::{GravityError, GravityResult},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stake_pool::StakePool;

/// Domain tag for deriving pool addresses from the factory nonce.
const POOL_ADDRESS_TAG: &[u8] = b"gravity::stake_pool";

/// Factory and registry for all stake pools. Pools are created with a
/// minimum stake, live at an address derived from a monotonic nonce, and are
/// never destroyed (a fully withdrawn pool is simply inert).
#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct StakingRegistry {
    pools: BTreeMap<Address, StakePool>,
    pool_order: Vec<Address>,
    nonce: u64,
}

impl StakingRegistry {
    /// Derives the stable address for the pool created under `nonce`.
    pub fn derive_pool_address(nonce: u64) -> Address {
        let mut preimage = Vec::with_capacity(POOL_ADDRESS_TAG.len() + 8);
        preimage.extend_from_slice(POOL_ADDRESS_TAG);
        preimage.extend_from_slice(&nonce.to_be_bytes());
        Address::from_word(keccak256(&preimage))
    }

    /// Creates a pool. The attached `value` must meet the minimum stake and
    /// the initial lockup must cover at least one lockup duration. Returns
    /// the new pool's address; the caller deposits `value` there.
    pub fn create_pool(
        &mut self,
        owner: Address,
        staker: Address,
        operator: Address,
        voter: Address,
        locked_until: TimestampUs,
        value: U256,
        now: TimestampUs,
        min_stake: U256,
        lockup_duration_micros: u64,
    ) -> GravityResult<Address> {
        if value < min_stake {
            return Err(GravityError::InsufficientStakeForPoolCreation);
        }
        if locked_until < now.saturating_add(lockup_duration_micros) {
            return Err(GravityError::LockupDurationTooShort);
        }
        let address = Self::derive_pool_address(self.nonce);
        self.nonce += 1;
        self.pools.insert(
            address,
            StakePool::new(owner, staker, operator, voter, value, locked_until),
        );
        self.pool_order.push(address);
        debug!(pool = %address, %value, "created stake pool");
        Ok(address)
    }

    pub fn is_pool(&self, address: Address) -> bool {
        self.pools.contains_key(&address)
    }

    /// Resolves a pool or fails `InvalidPool`; every aggregate view and all
    /// pool-targeted operations funnel through here.
    pub fn pool(&self, address: Address) -> GravityResult<&StakePool> {
        self.pools
            .get(&address)
            .ok_or(GravityError::InvalidPool(address))
    }

    pub fn pool_mut(&mut self, address: Address) -> GravityResult<&mut StakePool> {
        self.pools
            .get_mut(&address)
            .ok_or(GravityError::InvalidPool(address))
    }

    pub fn pool_count(&self) -> u64 {
        self.pool_order.len() as u64
    }

    pub fn pool_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn pool_by_index(&self, index: u64) -> GravityResult<Address> {
        self.pool_order
            .get(index as usize)
            .copied()
            .ok_or(GravityError::PoolIndexOutOfBounds {
                index,
                count: self.pool_count(),
            })
    }

    pub fn all_pools(&self) -> &[Address] {
        &self.pool_order
    }
}
