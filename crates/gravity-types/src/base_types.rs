// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

/// Epoch counter. Starts at 0 at genesis and increases by exactly one per
/// reconfiguration.
pub type EpochId = u64;

/// Wall-clock timestamp in microseconds since the unix epoch, as maintained
/// by the Block system caller.
pub type TimestampUs = u64;

pub const MICROS_PER_SECOND: u64 = 1_000_000;
pub const MICROS_PER_DAY: u64 = 86_400 * MICROS_PER_SECOND;
