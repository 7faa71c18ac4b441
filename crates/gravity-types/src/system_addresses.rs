// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, address};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::{GravityError, GravityResult};

/// Genesis caller; may run the one-time `initialize` entry points.
pub const GENESIS_ADDRESS: Address = address!("00000000000000000000000000000001625F0000");

/// Block caller; owns the global clock and may trigger reconfiguration.
pub const BLOCK_ADDRESS: Address = address!("00000000000000000000000000000001625F0001");

/// Reconfiguration caller; the only identity allowed to fan out
/// `apply_pending_config` and `on_new_epoch` during an epoch transition.
pub const RECONFIGURATION_ADDRESS: Address = address!("00000000000000000000000000000001625F0002");

/// Governance caller; stages configuration and may force validators out.
pub const GOVERNANCE_ADDRESS: Address = address!("00000000000000000000000000000001625F0003");

/// VM caller.
pub const VM_ADDRESS: Address = address!("00000000000000000000000000000001625F0004");

/// Timelock caller; may arm early resolution on proposals.
pub const TIMELOCK_ADDRESS: Address = address!("00000000000000000000000000000001625F0005");

/// Well-known address of the staking component.
pub const STAKING_ADDRESS: Address = address!("00000000000000000000000000000001625F2000");

/// Well-known address of the validator-management component.
pub const VALIDATOR_MANAGER_ADDRESS: Address = address!("00000000000000000000000000000001625F2001");

/// System-caller identities gating the privileged entry points.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemIdentity {
    Genesis,
    Block,
    Reconfiguration,
    Governance,
    Vm,
    Timelock,
}

impl SystemIdentity {
    pub const fn address(&self) -> Address {
        match self {
            SystemIdentity::Genesis => GENESIS_ADDRESS,
            SystemIdentity::Block => BLOCK_ADDRESS,
            SystemIdentity::Reconfiguration => RECONFIGURATION_ADDRESS,
            SystemIdentity::Governance => GOVERNANCE_ADDRESS,
            SystemIdentity::Vm => VM_ADDRESS,
            SystemIdentity::Timelock => TIMELOCK_ADDRESS,
        }
    }
}

/// Fails with a typed `Unauthorized` error when `caller` is not the expected
/// system identity.
pub fn assert_caller(identity: SystemIdentity, caller: Address) -> GravityResult<()> {
    if caller == identity.address() {
        Ok(())
    } else {
        Err(GravityError::Unauthorized(identity))
    }
}
