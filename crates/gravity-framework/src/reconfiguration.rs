// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use gravity_types::base_types::{EpochId, TimestampUs};
use serde::{Deserialize, Serialize};

/// Serializes epoch transitions. Two states: an epoch transition is either
/// in progress or it is not, and every user-facing mutation checks the flag
/// before touching state. Together with the single-threaded execution model
/// this is the sole point that keeps user mutations and transitions from
/// interleaving.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Reconfiguration {
    epoch: EpochId,
    last_reconfiguration_time: TimestampUs,
    in_progress: bool,
}

impl Reconfiguration {
    pub fn epoch(&self) -> EpochId {
        self.epoch
    }

    pub fn last_reconfiguration_time(&self) -> TimestampUs {
        self.last_reconfiguration_time
    }

    pub fn is_transition_in_progress(&self) -> bool {
        self.in_progress
    }

    /// Whether a request at `now` is a duplicate of the transition that
    /// already ran at this timestamp; duplicates return silently.
    pub fn is_duplicate(&self, now: TimestampUs) -> bool {
        self.last_reconfiguration_time == now && self.epoch > 0
    }

    pub fn begin(&mut self, now: TimestampUs) {
        self.in_progress = true;
        self.last_reconfiguration_time = now;
    }

    /// Ends the transition and returns the new epoch number.
    pub fn finish(&mut self) -> EpochId {
        self.epoch += 1;
        self.in_progress = false;
        self.epoch
    }
}
