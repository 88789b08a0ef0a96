// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON chain integration.
//!
//! This module provides functionality for:
//! - Talking to a full node over its HTTP API
//! - Encoding and digesting protobuf transaction envelopes
//! - Signing with secp256k1 and recovering signers
//! - Querying TRX, TRC10 and TRC20 balances
//! - Estimating bandwidth fees and checking energy

pub mod abi;
pub mod address;
pub mod amount;
pub mod balance;
pub mod client;
pub mod envelope;
pub mod resources;
pub mod signing;
pub mod types;

pub use address::{AddressCodec, DecodedAddress, HexAddressCodec};
pub use balance::{AddressBalance, BalanceResolver};
pub use client::{HttpNodeRpc, NodeRpc, RpcError, TronClient};
pub use envelope::{BuiltEnvelope, ContractPayload, EnvelopeBuilder};
pub use resources::{EnergyCheck, FeeEstimator};
pub use types::*;
