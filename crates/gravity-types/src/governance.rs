// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Derived proposal state. Never stored; always recomputed from the tallies,
/// the clock and the resolution bit.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    /// Voting is still open and no early-resolution threshold was reached.
    Pending,
    /// Voting concluded in favor, but the proposal is not yet resolved.
    Succeeded,
    /// Voting concluded against, or the turnout threshold was missed.
    Failed,
    /// Resolved with a passing tally.
    Executed,
}
