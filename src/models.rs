// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Settlement Data Models
//!
//! Request and record types that flow through the transfer lifecycle and
//! the summary orchestrator. All types derive `Serialize` and `Deserialize`
//! so an embedding service can persist or expose them as-is.
//!
//! ## Model Categories
//!
//! - **Tokens**: [`TokenDescriptor`] and the closed [`TokenKind`] variant
//! - **Accounts**: [`AccountRef`], [`AccountAddress`]
//! - **Transfers**: [`TransferRequest`], [`KeySignature`], [`FeeEstimate`]
//! - **Summary**: [`SummaryRequest`], [`FeeSupportAccount`], [`SummaryLeg`]

use std::collections::{BTreeMap, HashMap};

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{TRX_DECIMALS, TRX_SYMBOL};
use crate::error::TransferError;

// =============================================================================
// Token Models
// =============================================================================

/// What kind of asset a transfer moves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenKind {
    /// The chain's native coin (TRX)
    Native,
    /// First-class token held in the account's asset list
    Trc10 { asset_id: String },
    /// Smart-contract token reached through ABI calls
    Trc20 { contract_address: String },
}

/// Immutable description of the coin a request operates on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenDescriptor {
    /// Chain symbol (always "TRX" here).
    pub chain_symbol: String,
    /// Display name of the token.
    pub name: String,
    /// Token ticker.
    pub token_symbol: String,
    /// Exponent between the decimal and base-unit amount.
    pub decimals: u8,
    pub kind: TokenKind,
}

impl TokenDescriptor {
    /// The native coin.
    pub fn native() -> Self {
        Self {
            chain_symbol: TRX_SYMBOL.to_string(),
            name: "Tronix".to_string(),
            token_symbol: TRX_SYMBOL.to_string(),
            decimals: TRX_DECIMALS,
            kind: TokenKind::Native,
        }
    }

    pub fn trc10(symbol: &str, asset_id: &str, decimals: u8) -> Self {
        Self {
            chain_symbol: TRX_SYMBOL.to_string(),
            name: symbol.to_string(),
            token_symbol: symbol.to_string(),
            decimals,
            kind: TokenKind::Trc10 {
                asset_id: asset_id.to_string(),
            },
        }
    }

    pub fn trc20(symbol: &str, contract_address: &str, decimals: u8) -> Self {
        Self {
            chain_symbol: TRX_SYMBOL.to_string(),
            name: symbol.to_string(),
            token_symbol: symbol.to_string(),
            decimals,
            kind: TokenKind::Trc20 {
                contract_address: contract_address.to_string(),
            },
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self.kind, TokenKind::Native)
    }

    /// Symbol shown to users: the ticker for tokens, the chain symbol otherwise.
    pub fn display_symbol(&self) -> &str {
        match self.kind {
            TokenKind::Native => &self.chain_symbol,
            TokenKind::Trc10 { .. } | TokenKind::Trc20 { .. } => &self.token_symbol,
        }
    }
}

// =============================================================================
// Account Models
// =============================================================================

/// Reference to a custodial account inside a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AccountRef {
    pub wallet_id: String,
    pub account_id: String,
}

/// One derived address of an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountAddress {
    pub account_id: String,
    /// Hex form, `41` + 40 hex characters
    pub address: String,
    /// HD derivation path of the key behind this address
    pub hd_path: String,
    pub index: u64,
}

/// Signature curve.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    #[default]
    Secp256k1,
}

// =============================================================================
// Transfer Models
// =============================================================================

/// Lifecycle of a [`TransferRequest`]. States only move forward.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    #[default]
    Unbuilt,
    Built,
    Signed,
    Verified,
    Submitted,
}

/// A signature slot: the digest to sign and, once signed, the signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeySignature {
    pub curve: Curve,
    pub address: AccountAddress,
    /// Hex SHA-256 digest of the raw transaction
    pub message: String,
    /// Hex 65-byte r||s||v signature, empty while pending
    #[serde(default)]
    pub signature: String,
}

impl KeySignature {
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// A single-destination transfer, mutated in place through its lifecycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferRequest {
    pub account: Option<AccountRef>,
    pub coin: Option<TokenDescriptor>,
    /// Destination address -> decimal amount
    pub to: BTreeMap<String, String>,
    /// Fee rate as provided by the caller, echoed back after build
    #[serde(default)]
    pub fee_rate: String,
    /// Computed fee in TRX, decimal
    #[serde(default)]
    pub fees: String,
    /// Hex protobuf of the transaction
    #[serde(default)]
    pub raw_hex: String,
    /// Signature slots keyed by account id
    #[serde(default)]
    pub signatures: HashMap<String, Vec<KeySignature>>,
    /// "address:amount" entries of the source
    #[serde(default)]
    pub tx_from: Vec<String>,
    /// "address:amount" entries of the destination
    #[serde(default)]
    pub tx_to: Vec<String>,
    /// Net movement of the account, decimal (negative when funds leave)
    #[serde(default)]
    pub tx_amount: String,
    #[serde(default)]
    pub tx_id: String,
    #[serde(default)]
    pub state: TxState,
}

impl TransferRequest {
    /// A fresh, unbuilt transfer of `amount` to `to`.
    pub fn new(account: AccountRef, coin: TokenDescriptor, to: &str, amount: &str) -> Self {
        let mut destinations = BTreeMap::new();
        destinations.insert(to.to_string(), amount.to_string());
        Self {
            account: Some(account),
            coin: Some(coin),
            to: destinations,
            ..Default::default()
        }
    }

    pub fn with_fee_rate(mut self, fee_rate: &str) -> Self {
        self.fee_rate = fee_rate.to_string();
        self
    }

    pub fn is_built(&self) -> bool {
        self.state >= TxState::Built && !self.raw_hex.is_empty()
    }

    pub fn is_completed(&self) -> bool {
        self.state >= TxState::Verified
    }

    pub fn is_submitted(&self) -> bool {
        self.state == TxState::Submitted
    }

    /// The only destination, or `InvalidRequest` when there is not exactly one.
    pub fn single_destination(&self) -> Result<(&str, &str), TransferError> {
        if self.to.len() != 1 {
            return Err(TransferError::InvalidRequest(format!(
                "expected exactly one destination, got {}",
                self.to.len()
            )));
        }
        self.to
            .iter()
            .next()
            .map(|(to, amount)| (to.as_str(), amount.as_str()))
            .ok_or_else(|| TransferError::InvalidRequest("no destination".to_string()))
    }

    pub fn account(&self) -> Result<&AccountRef, TransferError> {
        self.account
            .as_ref()
            .ok_or_else(|| TransferError::InvalidRequest("account is required".to_string()))
    }

    pub fn coin(&self) -> Result<&TokenDescriptor, TransferError> {
        self.coin
            .as_ref()
            .ok_or_else(|| TransferError::InvalidRequest("coin is required".to_string()))
    }
}

/// Resource cost of a transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeEstimate {
    /// Resource units consumed (bandwidth bytes)
    pub gas_used: u64,
    /// SUN per unit
    pub gas_price: U256,
    /// Total in SUN
    pub fee: U256,
}

/// Balances of one address, both the native coin and the requested token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateBalance {
    pub address: String,
    /// Native balance in SUN
    pub native_balance: U256,
    /// Token balance in base units (equals `native_balance` for TRX)
    pub token_balance: U256,
    pub index: u64,
}

/// Record of a broadcast transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub amount: String,
    pub coin: TokenDescriptor,
    pub tx_id: String,
    pub decimals: u8,
    pub account_id: String,
    pub fees: String,
    pub submit_time: DateTime<Utc>,
}

// =============================================================================
// Summary Models
// =============================================================================

/// Account that pays resource fees on behalf of starved addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeSupportAccount {
    pub account_id: String,
    /// Fixed TRX amount sent per supported address
    #[serde(default)]
    pub fix_support_amount: Option<String>,
    /// Multiplier applied to the estimated fee
    #[serde(default)]
    pub fees_support_scale: Option<String>,
}

/// Batch consolidation of an account's addresses into one address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub account: AccountRef,
    pub summary_address: String,
    /// Balances below this are left alone
    pub min_transfer: String,
    /// Balance kept on each address
    pub retained_balance: String,
    #[serde(default)]
    pub address_start_index: usize,
    /// Page size, `None` for every address
    #[serde(default)]
    pub address_limit: Option<usize>,
    pub coin: TokenDescriptor,
    #[serde(default)]
    pub fee_rate: String,
    #[serde(default)]
    pub fee_support: Option<FeeSupportAccount>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    /// Moves funds to the summary address
    Summary,
    /// Pays fees for another leg
    FeeSupport,
}

/// Outcome for one address of a summary batch.
#[derive(Debug, Serialize)]
pub struct SummaryLeg {
    pub address: String,
    pub kind: LegKind,
    pub raw_tx: Option<TransferRequest>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<TransferError>,
}

impl SummaryLeg {
    pub fn built(address: &str, kind: LegKind, raw_tx: TransferRequest) -> Self {
        Self {
            address: address.to_string(),
            kind,
            raw_tx: Some(raw_tx),
            error: None,
        }
    }

    pub fn failed(address: &str, error: TransferError) -> Self {
        Self {
            address: address.to_string(),
            kind: LegKind::Summary,
            raw_tx: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.raw_tx.is_some()
    }
}

fn serialize_error<S>(error: &Option<TransferError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}
