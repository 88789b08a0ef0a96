// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON Settlement - Transaction Construction and Summary Core
//!
//! Builds, signs, verifies and broadcasts TRX, TRC10 and TRC20 transfers for
//! custodial accounts that own many addresses, and consolidates those
//! addresses into one with delegated fee support.
//!
//! ## Modules
//!
//! - `blockchain` - node client, envelope encoding, signing, balances
//! - `config` - chain parameters from the environment
//! - `decoder` - transfer lifecycle, funding selection, summary batches
//! - `error` - settlement error kinds
//! - `models` - request and record types
//! - `telemetry` - tracing subscriber setup
//! - `wallet` - account, address and key capabilities

pub mod blockchain;
pub mod config;
pub mod decoder;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod wallet;

#[cfg(test)]
mod test_support;

pub use config::TronConfig;
pub use decoder::TransactionDecoder;
pub use error::TransferError;
