// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, U256};
use gravity_types::{
    base_types::TimestampUs,
    error::{GravityError, GravityResult},
};
use serde::{Deserialize, Serialize};

/// One unstake request. Amounts are stored as a running prefix sum, so a
/// bucket's own amount is the difference to its predecessor and the total
/// ever unstaked is just the last bucket's `cumulative_amount`.
///
/// Both `locked_until` and `cumulative_amount` are strictly increasing
/// across a pool's bucket sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct PendingBucket {
    pub locked_until: TimestampUs,
    pub cumulative_amount: U256,
}

/// A stake pool: active stake that counts toward voting power while the
/// pool-level lockup is unexpired, plus an append-only sequence of pending
/// unbonding buckets and a monotone claim pointer into their prefix sum.
///
/// Four separate roles control a pool. The owner administers the roles and
/// is transferable via a two-step propose/accept protocol; the staker moves
/// funds; the operator manages consensus metadata; the voter spends
/// governance power.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct StakePool {
    owner: Address,
    staker: Address,
    operator: Address,
    voter: Address,
    pending_owner: Option<Address>,
    active_stake: U256,
    buckets: Vec<PendingBucket>,
    claimed_amount: U256,
    locked_until: TimestampUs,
}

impl StakePool {
    pub fn new(
        owner: Address,
        staker: Address,
        operator: Address,
        voter: Address,
        value: U256,
        locked_until: TimestampUs,
    ) -> Self {
        Self {
            owner,
            staker,
            operator,
            voter,
            pending_owner: None,
            active_stake: value,
            buckets: Vec::new(),
            claimed_amount: U256::ZERO,
            locked_until,
        }
    }

    // === Role guards ===

    pub fn assert_owner(&self, caller: Address) -> GravityResult<()> {
        (caller == self.owner).then_some(()).ok_or(GravityError::NotOwner)
    }

    pub fn assert_staker(&self, caller: Address) -> GravityResult<()> {
        (caller == self.staker).then_some(()).ok_or(GravityError::NotStaker)
    }

    pub fn assert_operator(&self, caller: Address) -> GravityResult<()> {
        (caller == self.operator).then_some(()).ok_or(GravityError::NotOperator)
    }

    pub fn assert_voter(&self, caller: Address) -> GravityResult<()> {
        (caller == self.voter).then_some(()).ok_or(GravityError::NotVoter)
    }

    // === Mutations ===

    /// Staker-only (checked by the caller). Adds to the active stake and
    /// extends the lockup to cover at least one full lockup duration.
    pub fn add_stake(
        &mut self,
        value: U256,
        now: TimestampUs,
        lockup_duration_micros: u64,
    ) -> GravityResult<()> {
        if value.is_zero() {
            return Err(GravityError::ZeroAmount);
        }
        self.active_stake += value;
        self.locked_until = self
            .locked_until
            .max(now.saturating_add(lockup_duration_micros));
        Ok(())
    }

    /// Moves `amount` from the active stake into the pending buckets, keyed
    /// by the pool's current lockup. A repeat unstake under an unchanged
    /// lockup merges into the last bucket, which keeps both bucket
    /// sequences strictly increasing.
    ///
    /// Returns the lockup the new pending amount is bound to.
    pub fn unstake(&mut self, amount: U256) -> GravityResult<TimestampUs> {
        if amount.is_zero() {
            return Err(GravityError::ZeroAmount);
        }
        if amount > self.active_stake {
            return Err(GravityError::InsufficientAvailableStake);
        }
        self.active_stake -= amount;

        match self.buckets.last_mut() {
            Some(last) if last.locked_until == self.locked_until => {
                last.cumulative_amount += amount;
            }
            last => {
                let cumulative = last.map(|b| b.cumulative_amount).unwrap_or(U256::ZERO);
                debug_assert!(
                    self.buckets
                        .last()
                        .is_none_or(|b| b.locked_until < self.locked_until),
                    "bucket lockups must be strictly increasing"
                );
                self.buckets.push(PendingBucket {
                    locked_until: self.locked_until,
                    cumulative_amount: cumulative + amount,
                });
            }
        }
        Ok(self.locked_until)
    }

    /// Advances the claim pointer over every bucket whose unbonding delay
    /// has fully elapsed and returns the amount freed (possibly zero). The
    /// caller performs the outbound transfer after this commits.
    pub fn withdraw_available(
        &mut self,
        now: TimestampUs,
        unbonding_delay_micros: u64,
    ) -> U256 {
        let claimable = self.claimable_amount(now, unbonding_delay_micros);
        self.claimed_amount += claimable;
        claimable
    }

    /// Extends the lockup by `extension_micros`. The new lockup must be
    /// representable, strictly larger, and still cover at least one full
    /// lockup duration from now.
    pub fn renew_lock_until(
        &mut self,
        extension_micros: u64,
        now: TimestampUs,
        lockup_duration_micros: u64,
    ) -> GravityResult<TimestampUs> {
        let renewed = self
            .locked_until
            .checked_add(extension_micros)
            .filter(|renewed| *renewed > self.locked_until)
            .ok_or(GravityError::InvalidLockupExtension)?;
        if renewed < now.saturating_add(lockup_duration_micros) {
            return Err(GravityError::LockupDurationTooShort);
        }
        self.locked_until = renewed;
        Ok(renewed)
    }

    // === Role mutations (owner-gated by the caller) ===

    pub fn set_operator(&mut self, new_operator: Address) -> Address {
        std::mem::replace(&mut self.operator, new_operator)
    }

    pub fn set_voter(&mut self, new_voter: Address) -> Address {
        std::mem::replace(&mut self.voter, new_voter)
    }

    pub fn set_staker(&mut self, new_staker: Address) -> Address {
        std::mem::replace(&mut self.staker, new_staker)
    }

    /// First half of the two-step ownership transfer: the current owner
    /// proposes a successor.
    pub fn transfer_ownership(&mut self, new_owner: Address) {
        self.pending_owner = Some(new_owner);
    }

    /// Second half: only the proposed successor may accept. Returns the
    /// previous owner.
    pub fn accept_ownership(&mut self, caller: Address) -> GravityResult<Address> {
        if self.pending_owner != Some(caller) {
            return Err(GravityError::NotOwner);
        }
        self.pending_owner = None;
        Ok(std::mem::replace(&mut self.owner, caller))
    }

    // === Views ===

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn staker(&self) -> Address {
        self.staker
    }

    pub fn operator(&self) -> Address {
        self.operator
    }

    pub fn voter(&self) -> Address {
        self.voter
    }

    pub fn pending_owner(&self) -> Option<Address> {
        self.pending_owner
    }

    pub fn active_stake(&self) -> U256 {
        self.active_stake
    }

    pub fn claimed_amount(&self) -> U256 {
        self.claimed_amount
    }

    pub fn locked_until(&self) -> TimestampUs {
        self.locked_until
    }

    pub fn is_locked(&self, now: TimestampUs) -> bool {
        self.locked_until > now
    }

    pub fn pending_bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn pending_bucket(&self, index: usize) -> Option<PendingBucket> {
        self.buckets.get(index).copied()
    }

    /// Total ever unstaked through this pool.
    pub fn total_unstaked(&self) -> U256 {
        self.buckets
            .last()
            .map(|b| b.cumulative_amount)
            .unwrap_or(U256::ZERO)
    }

    /// Pending amount not yet paid out.
    pub fn total_pending(&self) -> U256 {
        self.total_unstaked() - self.claimed_amount
    }

    /// Amount currently claimable: the prefix of buckets whose
    /// `locked_until + unbonding_delay` lies strictly in the past, minus
    /// what was already claimed. At the exact boundary nothing is claimable.
    pub fn claimable_amount(&self, now: TimestampUs, unbonding_delay_micros: u64) -> U256 {
        let released = self.buckets.partition_point(|b| {
            b.locked_until
                .checked_add(unbonding_delay_micros)
                .is_some_and(|release| release < now)
        });
        if released == 0 {
            return U256::ZERO;
        }
        let cumulative = self.buckets[released - 1].cumulative_amount;
        cumulative.saturating_sub(self.claimed_amount)
    }

    /// Active stake plus every pending bucket still locked past `t`.
    pub fn effective_stake(&self, t: TimestampUs) -> U256 {
        let expired = self.buckets.partition_point(|b| b.locked_until <= t);
        let expired_cumulative = if expired == 0 {
            U256::ZERO
        } else {
            self.buckets[expired - 1].cumulative_amount
        };
        self.active_stake + (self.total_unstaked() - expired_cumulative)
    }

    /// Effective stake while the pool-level lockup covers `t`, zero
    /// otherwise. A pool whose lockup expired must renew it before it can
    /// vote again.
    pub fn voting_power(&self, t: TimestampUs) -> U256 {
        if self.locked_until > t {
            self.effective_stake(t)
        } else {
            U256::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const DAY: u64 = 86_400_000_000;
    const LOCKUP: u64 = 14 * DAY;
    const UNBONDING: u64 = 7 * DAY;
    const T0: u64 = 1_000_000_000_000_000;

    fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn pool(value: U256) -> StakePool {
        StakePool::new(addr(1), addr(2), addr(3), addr(4), value, T0 + LOCKUP)
    }

    fn assert_bucket_invariants(pool: &StakePool) {
        for i in 1..pool.pending_bucket_count() {
            let prev = pool.pending_bucket(i - 1).unwrap();
            let cur = pool.pending_bucket(i).unwrap();
            assert!(prev.locked_until < cur.locked_until);
            assert!(prev.cumulative_amount < cur.cumulative_amount);
        }
        assert!(pool.claimed_amount() <= pool.total_unstaked());
    }

    #[test]
    fn test_unstake_appends_bucket() {
        let mut pool = pool(ether(10));
        pool.unstake(ether(5)).unwrap();
        assert_eq!(pool.active_stake(), ether(5));
        assert_eq!(pool.total_pending(), ether(5));
        assert_eq!(pool.pending_bucket_count(), 1);
        let bucket = pool.pending_bucket(0).unwrap();
        assert_eq!(bucket.locked_until, T0 + LOCKUP);
        assert_eq!(bucket.cumulative_amount, ether(5));
    }

    #[test]
    fn test_unstake_rejects_zero_and_overdraw() {
        let mut pool = pool(ether(1));
        assert_eq!(pool.unstake(U256::ZERO), Err(GravityError::ZeroAmount));
        assert_eq!(
            pool.unstake(ether(2)),
            Err(GravityError::InsufficientAvailableStake)
        );
    }

    #[test]
    fn test_bucket_merge_then_split_after_renewal() {
        let mut pool = pool(ether(10));
        pool.unstake(ether(5)).unwrap();
        // Same lockup: merges into the existing bucket.
        pool.unstake(ether(3)).unwrap();
        assert_eq!(pool.pending_bucket_count(), 1);
        assert_eq!(pool.pending_bucket(0).unwrap().cumulative_amount, ether(8));

        // After renewal a fresh unstake opens a second bucket.
        pool.renew_lock_until(LOCKUP, T0, LOCKUP).unwrap();
        assert_eq!(pool.locked_until(), T0 + 2 * LOCKUP);
        pool.unstake(ether(2)).unwrap();
        assert_eq!(pool.pending_bucket_count(), 2);
        let second = pool.pending_bucket(1).unwrap();
        assert_eq!(second.locked_until, T0 + 2 * LOCKUP);
        assert_eq!(second.cumulative_amount, ether(10));
        assert_bucket_invariants(&pool);
    }

    #[test]
    fn test_strict_claim_boundary() {
        let mut pool = pool(ether(10));
        pool.unstake(ether(5)).unwrap();
        let release = T0 + LOCKUP + UNBONDING;

        // Exactly at lockup + unbonding delay: not claimable yet.
        assert_eq!(pool.claimable_amount(release, UNBONDING), U256::ZERO);
        assert_eq!(pool.withdraw_available(release, UNBONDING), U256::ZERO);

        // One microsecond later: the full bucket is claimable.
        assert_eq!(pool.claimable_amount(release + 1, UNBONDING), ether(5));
        assert_eq!(pool.withdraw_available(release + 1, UNBONDING), ether(5));
        assert_eq!(pool.claimed_amount(), ether(5));
        assert_eq!(pool.total_pending(), U256::ZERO);

        // The claim pointer is monotone; a second withdraw frees nothing.
        assert_eq!(pool.withdraw_available(release + 2, UNBONDING), U256::ZERO);
    }

    #[test]
    fn test_claim_skips_still_locked_buckets() {
        let mut pool = pool(ether(10));
        pool.unstake(ether(4)).unwrap();
        pool.renew_lock_until(LOCKUP, T0, LOCKUP).unwrap();
        pool.unstake(ether(6)).unwrap();

        let after_first = T0 + LOCKUP + UNBONDING + 1;
        assert_eq!(pool.claimable_amount(after_first, UNBONDING), ether(4));
        assert_eq!(pool.withdraw_available(after_first, UNBONDING), ether(4));

        let after_second = T0 + 2 * LOCKUP + UNBONDING + 1;
        assert_eq!(pool.claimable_amount(after_second, UNBONDING), ether(6));
    }

    #[test]
    fn test_claim_walks_many_buckets() {
        let mut pool = pool(ether(100));
        // One bucket per lockup period, 1..=10 ether.
        for i in 1..=10u64 {
            pool.unstake(ether(i)).unwrap();
            pool.renew_lock_until(LOCKUP, T0, LOCKUP).unwrap();
        }
        assert_eq!(pool.pending_bucket_count(), 10);
        assert_eq!(pool.total_pending(), ether(55));

        // Bucket k (0-based) unlocks at T0 + (k + 1) * LOCKUP. Claim after
        // every second release point and check the running prefix.
        let mut claimed = U256::ZERO;
        for k in (0..10u64).step_by(2) {
            let now = T0 + (k + 1) * LOCKUP + UNBONDING + 1;
            let expected: U256 = (1..=k + 1).map(ether).sum::<U256>() - claimed;
            assert_eq!(pool.claimable_amount(now, UNBONDING), expected);
            assert_eq!(pool.withdraw_available(now, UNBONDING), expected);
            claimed += expected;
        }
        assert_eq!(pool.claimed_amount(), ether(45));
        assert_eq!(pool.total_pending(), ether(10));
    }

    #[test]
    fn test_renew_lock_until_validation() {
        let mut pool = pool(ether(10));
        assert_eq!(
            pool.renew_lock_until(0, T0, LOCKUP),
            Err(GravityError::InvalidLockupExtension)
        );
        assert_eq!(
            pool.renew_lock_until(u64::MAX, T0, LOCKUP),
            Err(GravityError::InvalidLockupExtension)
        );
        // Far in the future the old lockup plus a tiny extension no longer
        // covers a full duration.
        let late = T0 + 10 * LOCKUP;
        assert_eq!(
            pool.renew_lock_until(1, late, LOCKUP),
            Err(GravityError::LockupDurationTooShort)
        );
        let before = pool.locked_until();
        pool.renew_lock_until(LOCKUP, T0, LOCKUP).unwrap();
        assert_eq!(pool.locked_until(), before + LOCKUP);
    }

    #[test]
    fn test_add_stake_extends_lockup() {
        let mut pool = pool(ether(10));
        assert_eq!(
            pool.add_stake(U256::ZERO, T0, LOCKUP),
            Err(GravityError::ZeroAmount)
        );
        // Early in the lockup the expiry stays put.
        pool.add_stake(ether(1), T0, LOCKUP).unwrap();
        assert_eq!(pool.locked_until(), T0 + LOCKUP);
        // Later it is pushed out to cover a full duration again.
        pool.add_stake(ether(1), T0 + 2 * DAY, LOCKUP).unwrap();
        assert_eq!(pool.locked_until(), T0 + 2 * DAY + LOCKUP);
        assert_eq!(pool.active_stake(), ether(12));
    }

    #[test]
    fn test_voting_power_requires_pool_lockup() {
        let mut pool = pool(ether(10));
        pool.unstake(ether(4)).unwrap();

        // Locked: active stake plus the still-locked bucket.
        assert_eq!(pool.voting_power(T0), ether(10));
        assert_eq!(pool.effective_stake(T0), ether(10));

        // At expiry the bucket no longer counts and the pool-level gate
        // zeroes everything.
        let expiry = pool.locked_until();
        assert_eq!(pool.effective_stake(expiry), ether(6));
        assert_eq!(pool.voting_power(expiry), U256::ZERO);

        // Renewal restores power over the active stake.
        pool.renew_lock_until(2 * LOCKUP, expiry, LOCKUP).unwrap();
        assert_eq!(pool.voting_power(expiry), ether(6));
    }

    #[test]
    fn test_two_step_ownership_transfer() {
        let mut pool = pool(ether(10));
        assert_eq!(pool.accept_ownership(addr(9)), Err(GravityError::NotOwner));
        pool.transfer_ownership(addr(9));
        assert_eq!(pool.owner(), addr(1));
        assert_eq!(pool.accept_ownership(addr(8)), Err(GravityError::NotOwner));
        assert_eq!(pool.accept_ownership(addr(9)), Ok(addr(1)));
        assert_eq!(pool.owner(), addr(9));
        assert!(pool.pending_owner().is_none());
    }

    proptest! {
        /// Random unstake/renew/withdraw sequences preserve the bucket
        /// invariants, lockup monotonicity and balance conservation.
        #[test]
        fn proptest_pool_invariants(ops in proptest::collection::vec((0u8..3, 1u64..1_000), 1..50)) {
            let initial = ether(1_000);
            let mut pool = pool(initial);
            let mut now = T0;
            let mut paid_out = U256::ZERO;

            for (op, arg) in ops {
                now += arg * 1_000_000;
                let locked_before = pool.locked_until();
                match op {
                    0 => {
                        let _ = pool.unstake(ether(arg % 50 + 1));
                    }
                    1 => {
                        let _ = pool.renew_lock_until(arg * DAY, now, LOCKUP);
                    }
                    _ => {
                        paid_out += pool.withdraw_available(now, UNBONDING);
                    }
                }
                prop_assert!(pool.locked_until() >= locked_before);
                for i in 1..pool.pending_bucket_count() {
                    let prev = pool.pending_bucket(i - 1).unwrap();
                    let cur = pool.pending_bucket(i).unwrap();
                    prop_assert!(prev.locked_until < cur.locked_until);
                    prop_assert!(prev.cumulative_amount < cur.cumulative_amount);
                }
                // Conservation: active + unpaid pending + paid out == initial.
                prop_assert_eq!(
                    pool.active_stake() + pool.total_pending() + paid_out,
                    initial
                );
                prop_assert!(pool.claimed_amount() <= pool.total_unstaked());
            }
        }
    }
}
