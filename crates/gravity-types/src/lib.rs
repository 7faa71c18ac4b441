// Copyright (c) 2025 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Shared value types of the Gravity core state machine: addresses and
//! system identities, the error taxonomy, event payloads, the staking
//! configuration record, and the validator records consumed by the
//! consensus engine.

pub mod base_types;
pub mod config;
pub mod error;
pub mod event;
pub mod governance;
pub mod system_addresses;
pub mod validator;

pub use alloy_primitives::{Address, B256, U256};
