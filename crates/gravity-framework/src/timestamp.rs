// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::Address;
use gravity_types::{
    base_types::TimestampUs,
    error::{GravityError, GravityResult},
    system_addresses::{SystemIdentity, assert_caller},
};
use serde::{Deserialize, Serialize};

/// Global wall clock in microseconds, owned by the Block system caller.
/// Every other component reads it; nothing else writes it.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct GlobalClock {
    now_us: TimestampUs,
}

impl GlobalClock {
    pub fn now_us(&self) -> TimestampUs {
        self.now_us
    }

    /// Block-only. The clock is monotone non-decreasing; equal timestamps
    /// are accepted, a backwards move is rejected.
    pub fn update_global_time(
        &mut self,
        caller: Address,
        now_us: TimestampUs,
    ) -> GravityResult<()> {
        assert_caller(SystemIdentity::Block, caller)?;
        if now_us < self.now_us {
            return Err(GravityError::InvalidTimestamp);
        }
        self.now_us = now_us;
        Ok(())
    }
}
