// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Domain errors of the settlement core.

use crate::blockchain::client::RpcError;

/// Errors returned by transfer building, signing, submission and summary.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Account {0} has no address")]
    NoAddressInAccount(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Insufficient token balance: {0}")]
    InsufficientTokenBalance(String),

    #[error("Insufficient fees: {0}")]
    InsufficientFees(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Reference block unavailable: {0}")]
    ReferenceBlockUnavailable(String),

    #[error("Transaction has no signature to sign")]
    SignatureEmpty,

    #[error("Signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("Contract call failed: {0}")]
    ContractCallError(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl TransferError {
    /// Map a node error, lifting broadcast rejections into their own kind.
    pub fn from_broadcast(error: RpcError) -> Self {
        match error {
            RpcError::Rejected(reason) => Self::BroadcastRejected(reason),
            other => Self::Rpc(other),
        }
    }
}
