// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction envelope building.
//!
//! TRON transactions are protobuf messages. The id and signing digest are
//! SHA-256 over the serialized `raw_data` alone, so signatures can be added
//! without changing the id.

use std::sync::Arc;

use alloy::primitives::U256;
use prost::Message;
use sha2::{Digest, Sha256};

use super::abi;
use super::address::AddressCodec;
use super::amount::{parse_amount, to_i64};
use super::client::{NodeRpc, TronClient};
use crate::config::TronConfig;
use crate::error::TransferError;
use crate::models::{TokenDescriptor, TokenKind};

// =============================================================================
// Wire Messages
// =============================================================================

/// Signed transaction.
#[derive(Clone, PartialEq, Message)]
pub struct Transaction {
    #[prost(message, optional, tag = "1")]
    pub raw_data: Option<TransactionRaw>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub signature: Vec<Vec<u8>>,
}

/// The signed part of a transaction.
#[derive(Clone, PartialEq, Message)]
pub struct TransactionRaw {
    #[prost(bytes = "vec", tag = "1")]
    pub ref_block_bytes: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub ref_block_num: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub ref_block_hash: Vec<u8>,
    #[prost(int64, tag = "8")]
    pub expiration: i64,
    #[prost(bytes = "vec", tag = "10")]
    pub data: Vec<u8>,
    #[prost(message, repeated, tag = "11")]
    pub contract: Vec<Contract>,
    #[prost(int64, tag = "14")]
    pub timestamp: i64,
    #[prost(int64, tag = "18")]
    pub fee_limit: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct Contract {
    #[prost(enumeration = "ContractType", tag = "1")]
    pub contract_type: i32,
    #[prost(message, optional, tag = "2")]
    pub parameter: Option<Any>,
    #[prost(bytes = "vec", tag = "3")]
    pub provider: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub contract_name: Vec<u8>,
    #[prost(int32, tag = "5")]
    pub permission_id: i32,
}

/// `google.protobuf.Any`.
#[derive(Clone, PartialEq, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ContractType {
    TransferContract = 1,
    TransferAssetContract = 2,
    TriggerSmartContract = 31,
}

impl ContractType {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            ContractType::TransferContract => "TransferContract",
            ContractType::TransferAssetContract => "TransferAssetContract",
            ContractType::TriggerSmartContract => "TriggerSmartContract",
        }
    }

    pub fn type_url(&self) -> String {
        format!("type.googleapis.com/protocol.{}", self.as_str_name())
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct TransferContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub to_address: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub amount: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct TransferAssetContract {
    #[prost(bytes = "vec", tag = "1")]
    pub asset_name: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub owner_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub to_address: Vec<u8>,
    #[prost(int64, tag = "4")]
    pub amount: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct TriggerSmartContract {
    #[prost(bytes = "vec", tag = "1")]
    pub owner_address: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub contract_address: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub call_value: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub data: Vec<u8>,
    #[prost(int64, tag = "5")]
    pub call_token_value: i64,
    #[prost(int64, tag = "6")]
    pub token_id: i64,
}

/// A contract parameter decoded according to its type.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedContract {
    Transfer(TransferContract),
    TransferAsset(TransferAssetContract),
    TriggerSmartContract(TriggerSmartContract),
}

impl DecodedContract {
    pub fn owner_address(&self) -> &[u8] {
        match self {
            DecodedContract::Transfer(c) => &c.owner_address,
            DecodedContract::TransferAsset(c) => &c.owner_address,
            DecodedContract::TriggerSmartContract(c) => &c.owner_address,
        }
    }
}

// =============================================================================
// Payloads
// =============================================================================

/// What a transaction does, with addresses still in user-facing form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractPayload {
    Transfer {
        owner: String,
        to: String,
        amount: U256,
    },
    TransferAsset {
        owner: String,
        to: String,
        asset_id: String,
        amount: U256,
    },
    TriggerSmartContract {
        owner: String,
        contract: String,
        /// Hex call data, method id included
        data: String,
    },
}

impl ContractPayload {
    pub fn is_contract_call(&self) -> bool {
        matches!(self, ContractPayload::TriggerSmartContract { .. })
    }
}

/// A freshly built, unsigned transaction.
#[derive(Debug, Clone)]
pub struct BuiltEnvelope {
    pub transaction: Transaction,
    /// Hex protobuf of `transaction`
    pub raw_hex: String,
    /// SHA-256 of the serialized raw data
    pub digest: [u8; 32],
}

impl BuiltEnvelope {
    pub fn digest_hex(&self) -> String {
        alloy::hex::encode(self.digest)
    }

    /// Serialized size used for bandwidth pricing.
    pub fn payload_len(&self) -> usize {
        self.raw_hex.len() / 2
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds transaction envelopes against the current head block.
pub struct EnvelopeBuilder<N> {
    client: TronClient<N>,
    codec: Arc<dyn AddressCodec + Send + Sync>,
    config: Arc<TronConfig>,
}

impl<N> Clone for EnvelopeBuilder<N> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            codec: Arc::clone(&self.codec),
            config: Arc::clone(&self.config),
        }
    }
}

impl<N: NodeRpc> EnvelopeBuilder<N> {
    pub fn new(
        client: TronClient<N>,
        codec: Arc<dyn AddressCodec + Send + Sync>,
        config: Arc<TronConfig>,
    ) -> Self {
        Self {
            client,
            codec,
            config,
        }
    }

    fn raw_address(&self, text: &str) -> Result<Vec<u8>, TransferError> {
        Ok(self.codec.decode_address(text, self.config.is_testnet)?.raw)
    }

    /// Build an unsigned transaction for `payload`.
    pub async fn build(&self, payload: &ContractPayload) -> Result<BuiltEnvelope, TransferError> {
        let contract = self.encode_contract(payload)?;

        let block = self
            .client
            .get_now_block()
            .await
            .map_err(|e| TransferError::ReferenceBlockUnavailable(e.to_string()))?;
        let block_id = alloy::hex::decode(&block.block_id).map_err(|e| {
            TransferError::ReferenceBlockUnavailable(format!("invalid block id: {e}"))
        })?;
        if block_id.len() < 16 {
            return Err(TransferError::ReferenceBlockUnavailable(format!(
                "block id too short: {:?}",
                block.block_id
            )));
        }

        let now_ms = chrono::Utc::now().timestamp_millis();
        let expiration = now_ms
            .checked_add(self.config.expiration_window_ms)
            .ok_or_else(|| {
                TransferError::Encoding(format!(
                    "expiration window of {} ms overflows",
                    self.config.expiration_window_ms
                ))
            })?;
        let fee_limit = if payload.is_contract_call() && self.config.fee_limit > 0 {
            self.config.fee_limit
        } else {
            0
        };

        let raw = TransactionRaw {
            ref_block_bytes: block_id[6..8].to_vec(),
            ref_block_hash: block_id[8..16].to_vec(),
            expiration,
            contract: vec![contract],
            timestamp: now_ms,
            fee_limit,
            ..Default::default()
        };

        tracing::debug!(
            block = block.number(),
            expiration = raw.expiration,
            fee_limit,
            "Built transaction envelope"
        );

        let digest = raw_digest(&raw);
        let transaction = Transaction {
            raw_data: Some(raw),
            signature: Vec::new(),
        };

        Ok(BuiltEnvelope {
            raw_hex: encode_transaction(&transaction),
            transaction,
            digest,
        })
    }

    /// Build a transfer of a decimal `amount` of `token`.
    pub async fn build_transfer(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        token: &TokenDescriptor,
    ) -> Result<BuiltEnvelope, TransferError> {
        let base_units = parse_amount(amount, token.decimals)?;
        self.build_transfer_base(from, to, base_units, token).await
    }

    /// Build a transfer of `amount` base units of `token`.
    pub async fn build_transfer_base(
        &self,
        from: &str,
        to: &str,
        amount: U256,
        token: &TokenDescriptor,
    ) -> Result<BuiltEnvelope, TransferError> {
        let payload = match &token.kind {
            TokenKind::Native => ContractPayload::Transfer {
                owner: from.to_string(),
                to: to.to_string(),
                amount,
            },
            TokenKind::Trc10 { asset_id } => ContractPayload::TransferAsset {
                owner: from.to_string(),
                to: to.to_string(),
                asset_id: asset_id.clone(),
                amount,
            },
            TokenKind::Trc20 { contract_address } => ContractPayload::TriggerSmartContract {
                owner: from.to_string(),
                contract: contract_address.clone(),
                data: abi::transfer_call_data(&self.codec.decode_address(to, self.config.is_testnet)?.hex, amount)?,
            },
        };
        self.build(&payload).await
    }

    fn encode_contract(&self, payload: &ContractPayload) -> Result<Contract, TransferError> {
        let (contract_type, value) = match payload {
            ContractPayload::Transfer { owner, to, amount } => (
                ContractType::TransferContract,
                TransferContract {
                    owner_address: self.raw_address(owner)?,
                    to_address: self.raw_address(to)?,
                    amount: to_i64(*amount)?,
                }
                .encode_to_vec(),
            ),
            ContractPayload::TransferAsset {
                owner,
                to,
                asset_id,
                amount,
            } => (
                ContractType::TransferAssetContract,
                TransferAssetContract {
                    asset_name: asset_id.as_bytes().to_vec(),
                    owner_address: self.raw_address(owner)?,
                    to_address: self.raw_address(to)?,
                    amount: to_i64(*amount)?,
                }
                .encode_to_vec(),
            ),
            ContractPayload::TriggerSmartContract {
                owner,
                contract,
                data,
            } => (
                ContractType::TriggerSmartContract,
                TriggerSmartContract {
                    owner_address: self.raw_address(owner)?,
                    contract_address: self.raw_address(contract)?,
                    data: alloy::hex::decode(data)
                        .map_err(|e| TransferError::Encoding(format!("call data: {e}")))?,
                    ..Default::default()
                }
                .encode_to_vec(),
            ),
        };

        Ok(Contract {
            contract_type: contract_type as i32,
            parameter: Some(Any {
                type_url: contract_type.type_url(),
                value,
            }),
            ..Default::default()
        })
    }
}

// =============================================================================
// Envelope Operations
// =============================================================================

pub fn encode_raw(raw: &TransactionRaw) -> Vec<u8> {
    raw.encode_to_vec()
}

/// SHA-256 of the serialized raw data; also the transaction id.
pub fn raw_digest(raw: &TransactionRaw) -> [u8; 32] {
    Sha256::digest(raw.encode_to_vec()).into()
}

pub fn transaction_digest(tx: &Transaction) -> Result<[u8; 32], TransferError> {
    tx.raw_data
        .as_ref()
        .map(raw_digest)
        .ok_or_else(|| TransferError::Encoding("transaction has no raw data".to_string()))
}

pub fn encode_transaction(tx: &Transaction) -> String {
    alloy::hex::encode(tx.encode_to_vec())
}

pub fn decode_transaction(raw_hex: &str) -> Result<Transaction, TransferError> {
    let bytes = alloy::hex::decode(raw_hex.trim())
        .map_err(|e| TransferError::Encoding(format!("raw transaction hex: {e}")))?;
    let tx = Transaction::decode(bytes.as_slice())
        .map_err(|e| TransferError::Encoding(format!("raw transaction: {e}")))?;
    if tx.raw_data.is_none() {
        return Err(TransferError::Encoding(
            "transaction has no raw data".to_string(),
        ));
    }
    Ok(tx)
}

/// Append a signature to a serialized transaction.
///
/// A signature already present is not added twice.
pub fn insert_signature(raw_hex: &str, signature_hex: &str) -> Result<String, TransferError> {
    let mut tx = decode_transaction(raw_hex)?;
    let signature = alloy::hex::decode(signature_hex)
        .map_err(|e| TransferError::Encoding(format!("signature hex: {e}")))?;

    if !tx.signature.contains(&signature) {
        tx.signature.push(signature);
    }
    Ok(encode_transaction(&tx))
}

/// Decode the typed parameter of a contract entry.
pub fn decode_contract(contract: &Contract) -> Result<DecodedContract, TransferError> {
    let parameter = contract
        .parameter
        .as_ref()
        .ok_or_else(|| TransferError::Encoding("contract has no parameter".to_string()))?;
    let value = parameter.value.as_slice();
    let malformed = |e: prost::DecodeError| TransferError::Encoding(format!("contract parameter: {e}"));

    match ContractType::try_from(contract.contract_type) {
        Ok(ContractType::TransferContract) => Ok(DecodedContract::Transfer(
            TransferContract::decode(value).map_err(malformed)?,
        )),
        Ok(ContractType::TransferAssetContract) => Ok(DecodedContract::TransferAsset(
            TransferAssetContract::decode(value).map_err(malformed)?,
        )),
        Ok(ContractType::TriggerSmartContract) => Ok(DecodedContract::TriggerSmartContract(
            TriggerSmartContract::decode(value).map_err(malformed)?,
        )),
        Ok(other) => Err(TransferError::Encoding(format!(
            "unsupported contract type {}",
            other.as_str_name()
        ))),
        Err(_) => Err(TransferError::Encoding(format!(
            "unknown contract type {}",
            contract.contract_type
        ))),
    }
}

/// Raw owner address of a contract entry.
pub fn owner_address(contract: &Contract) -> Result<Vec<u8>, TransferError> {
    Ok(decode_contract(contract)?.owner_address().to_vec())
}
