// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRON full-node client.
//!
//! [`NodeRpc`] is the raw `call(endpoint, params)` capability; [`TronClient`]
//! layers typed requests and responses on top of it.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::envelope::{self, ContractType, Transaction};
use super::types::*;

/// Request/response access to a node's HTTP API.
pub trait NodeRpc: Send + Sync {
    /// POST `params` to `endpoint` and return the JSON body.
    fn call(
        &self,
        endpoint: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, RpcError>> + Send;
}

/// reqwest-backed [`NodeRpc`].
#[derive(Debug, Clone)]
pub struct HttpNodeRpc {
    base_url: url::Url,
    http: reqwest::Client,
}

impl HttpNodeRpc {
    /// Create a transport for the given API base URL.
    pub fn new(api_url: &str) -> Result<Self, RpcError> {
        let base_url: url::Url = api_url
            .parse()
            .map_err(|e: url::ParseError| RpcError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }
}

impl NodeRpc for HttpNodeRpc {
    async fn call(&self, endpoint: &str, params: Value) -> Result<Value, RpcError> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| RpcError::InvalidUrl(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .json(&params)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RpcError::Decode(e.to_string()))
    }
}

/// Typed TRON node client.
pub struct TronClient<N> {
    rpc: Arc<N>,
}

impl<N> Clone for TronClient<N> {
    fn clone(&self) -> Self {
        Self {
            rpc: Arc::clone(&self.rpc),
        }
    }
}

impl<N: NodeRpc> TronClient<N> {
    pub fn new(rpc: Arc<N>) -> Self {
        Self { rpc }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let body = self.rpc.call(endpoint, params).await?;
        serde_json::from_value(body)
            .map_err(|e| RpcError::Decode(format!("{endpoint}: {e}")))
    }

    /// Get the current head block.
    pub async fn get_now_block(&self) -> Result<NowBlock, RpcError> {
        self.request(endpoints::GET_NOW_BLOCK, json!({})).await
    }

    /// Get an account by hex address; the flag reports whether it exists on chain.
    pub async fn get_account(&self, address_hex: &str) -> Result<(Account, bool), RpcError> {
        let body = self
            .rpc
            .call(endpoints::GET_ACCOUNT, json!({ "address": address_hex }))
            .await?;

        let exists = body.as_object().is_some_and(|o| !o.is_empty());
        let account = serde_json::from_value(body)
            .map_err(|e| RpcError::Decode(format!("{}: {e}", endpoints::GET_ACCOUNT)))?;
        Ok((account, exists))
    }

    /// Get bandwidth counters for an address.
    pub async fn get_account_net(&self, address_hex: &str) -> Result<AccountNet, RpcError> {
        self.request(endpoints::GET_ACCOUNT_NET, json!({ "address": address_hex }))
            .await
    }

    /// Get energy counters for an address.
    pub async fn get_account_resource(
        &self,
        address_hex: &str,
    ) -> Result<AccountResource, RpcError> {
        self.request(
            endpoints::GET_ACCOUNT_RESOURCE,
            json!({ "address": address_hex }),
        )
        .await
    }

    /// Run a read-only contract method.
    pub async fn trigger_constant_contract(
        &self,
        owner_hex: &str,
        contract_hex: &str,
        function_selector: &str,
        parameter: &str,
    ) -> Result<TransactionExtention, RpcError> {
        self.request(
            endpoints::TRIGGER_CONSTANT_CONTRACT,
            json!({
                "owner_address": owner_hex,
                "contract_address": contract_hex,
                "function_selector": function_selector,
                "parameter": parameter,
            }),
        )
        .await
    }

    /// Ask the node to prepare a state-changing contract call.
    pub async fn trigger_smart_contract(
        &self,
        owner_hex: &str,
        contract_hex: &str,
        function_selector: &str,
        parameter: &str,
        fee_limit: i64,
        call_value: i64,
    ) -> Result<TransactionExtention, RpcError> {
        self.request(
            endpoints::TRIGGER_SMART_CONTRACT,
            json!({
                "owner_address": owner_hex,
                "contract_address": contract_hex,
                "function_selector": function_selector,
                "parameter": parameter,
                "fee_limit": fee_limit,
                "call_value": call_value,
            }),
        )
        .await
    }

    /// Get deployed contract metadata.
    pub async fn get_contract_info(&self, contract_hex: &str) -> Result<ContractInfo, RpcError> {
        self.request(endpoints::GET_CONTRACT, json!({ "value": contract_hex }))
            .await
    }

    /// Broadcast a signed transaction and return its id.
    pub async fn broadcast_transaction(&self, tx: &Transaction) -> Result<String, RpcError> {
        let params = broadcast_params(tx)?;
        let tx_id = params["txID"].as_str().unwrap_or_default().to_string();

        let response: BroadcastResponse = self
            .request(endpoints::BROADCAST_TRANSACTION, params)
            .await?;

        if !response.result {
            let reason = if response.message.is_empty() {
                format!("node returned code {:?}", response.code)
            } else {
                decode_node_message(&response.message)
            };
            return Err(RpcError::Rejected(reason));
        }

        tracing::info!(tx_id = %tx_id, "Transaction broadcast accepted");
        Ok(tx_id)
    }
}

/// Render a signed transaction as the node's JSON broadcast body.
pub fn broadcast_params(tx: &Transaction) -> Result<Value, RpcError> {
    let raw = tx
        .raw_data
        .as_ref()
        .ok_or_else(|| RpcError::Encode("transaction has no raw data".to_string()))?;

    let tx_id = alloy::hex::encode(envelope::raw_digest(raw));
    let signature: Vec<String> = tx.signature.iter().map(alloy::hex::encode).collect();

    let mut contracts = Vec::with_capacity(raw.contract.len());
    for contract in &raw.contract {
        let parameter = contract
            .parameter
            .as_ref()
            .ok_or_else(|| RpcError::Encode("contract has no parameter".to_string()))?;

        let value = match envelope::decode_contract(contract)
            .map_err(|e| RpcError::Encode(e.to_string()))?
        {
            envelope::DecodedContract::Transfer(tc) => json!({
                "amount": tc.amount,
                "owner_address": alloy::hex::encode(&tc.owner_address),
                "to_address": alloy::hex::encode(&tc.to_address),
            }),
            envelope::DecodedContract::TransferAsset(tc) => json!({
                "amount": tc.amount,
                "owner_address": alloy::hex::encode(&tc.owner_address),
                "to_address": alloy::hex::encode(&tc.to_address),
                "asset_name": alloy::hex::encode(&tc.asset_name),
            }),
            envelope::DecodedContract::TriggerSmartContract(tc) => json!({
                "data": alloy::hex::encode(&tc.data),
                "owner_address": alloy::hex::encode(&tc.owner_address),
                "contract_address": alloy::hex::encode(&tc.contract_address),
            }),
        };

        let type_name = ContractType::try_from(contract.contract_type)
            .map(|t| t.as_str_name())
            .unwrap_or("UnknownContract");

        contracts.push(json!({
            "type": type_name,
            "parameter": {
                "type_url": parameter.type_url,
                "value": value,
            },
        }));
    }

    let mut raw_data = json!({
        "ref_block_bytes": alloy::hex::encode(&raw.ref_block_bytes),
        "ref_block_hash": alloy::hex::encode(&raw.ref_block_hash),
        "expiration": raw.expiration,
        "timestamp": raw.timestamp,
        "contract": contracts,
    });
    if raw.fee_limit > 0 {
        raw_data["fee_limit"] = json!(raw.fee_limit);
    }

    Ok(json!({
        "signature": signature,
        "txID": tx_id,
        "raw_data": raw_data,
        "raw_data_hex": alloy::hex::encode(envelope::encode_raw(raw)),
    }))
}

/// Errors that can occur while talking to a node.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Invalid node response: {0}")]
    Decode(String),

    #[error("Cannot encode request: {0}")]
    Encode(String),

    #[error("Broadcast rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockNode;

    #[tokio::test]
    async fn missing_account_reports_not_existing() {
        let node = Arc::new(MockNode::new());
        let client = TronClient::new(Arc::clone(&node));

        let (account, exists) = client.get_account("41ffffffffffffffffffffffffffffffffffffffff").await.unwrap();
        assert!(!exists);
        assert_eq!(account.balance, 0);
    }

    #[tokio::test]
    async fn existing_account_is_parsed() {
        let node = Arc::new(MockNode::new());
        let address = "41aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        node.set_native_balance(address, 5_000_000);
        let client = TronClient::new(Arc::clone(&node));

        let (account, exists) = client.get_account(address).await.unwrap();
        assert!(exists);
        assert_eq!(account.balance, 5_000_000);
    }

    #[tokio::test]
    async fn contract_info_reports_deployment() {
        let node = Arc::new(MockNode::new());
        let contract = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";
        node.deploy_contract(contract, "TetherToken");
        let client = TronClient::new(Arc::clone(&node));

        let info = client.get_contract_info(contract).await.unwrap();
        assert!(info.is_deployed());
        assert_eq!(info.name, "TetherToken");

        let unknown = client
            .get_contract_info("41bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")
            .await
            .unwrap();
        assert!(!unknown.is_deployed());
    }

    #[tokio::test]
    async fn trigger_smart_contract_forwards_fee_limit() {
        let node = Arc::new(MockNode::new());
        let client = TronClient::new(Arc::clone(&node));

        client
            .trigger_smart_contract("41aa", "41bb", "transfer(address,uint256)", "00", 1_000, 0)
            .await
            .unwrap();

        let (_, params) = node.last_call(endpoints::TRIGGER_SMART_CONTRACT).unwrap();
        assert_eq!(params["fee_limit"], 1_000);
        assert_eq!(params["function_selector"], "transfer(address,uint256)");
    }

    #[test]
    fn http_transport_rejects_bad_url() {
        assert!(matches!(
            HttpNodeRpc::new("::not-a-url"),
            Err(RpcError::InvalidUrl(_))
        ));
        assert!(HttpNodeRpc::new(TRON_MAINNET.api_url).is_ok());
    }
}
