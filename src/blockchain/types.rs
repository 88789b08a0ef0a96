// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use serde::{Deserialize, Serialize};

/// TRON network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Full-node HTTP API endpoint
    pub api_url: &'static str,
    /// Whether the network uses testnet address rules
    pub is_testnet: bool,
}

/// TRON Mainnet configuration.
pub const TRON_MAINNET: NetworkConfig = NetworkConfig {
    name: "TRON Mainnet",
    api_url: "https://api.trongrid.io",
    is_testnet: false,
};

/// TRON Shasta testnet configuration.
pub const TRON_SHASTA: NetworkConfig = NetworkConfig {
    name: "TRON Shasta Testnet",
    api_url: "https://api.shasta.trongrid.io",
    is_testnet: true,
};

/// Node endpoint paths.
pub mod endpoints {
    pub const GET_NOW_BLOCK: &str = "/wallet/getnowblock";
    pub const GET_ACCOUNT: &str = "/wallet/getaccount";
    pub const GET_ACCOUNT_NET: &str = "/wallet/getaccountnet";
    pub const GET_ACCOUNT_RESOURCE: &str = "/wallet/getaccountresource";
    pub const TRIGGER_CONSTANT_CONTRACT: &str = "/wallet/triggerconstantcontract";
    pub const TRIGGER_SMART_CONTRACT: &str = "/wallet/triggersmartcontract";
    pub const GET_CONTRACT: &str = "/wallet/getcontract";
    pub const BROADCAST_TRANSACTION: &str = "/wallet/broadcasttransaction";
}

/// Header of the current head block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NowBlock {
    /// 32-byte block id, hex encoded
    #[serde(rename = "blockID", default)]
    pub block_id: String,
    #[serde(default)]
    pub block_header: Option<BlockHeader>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockHeader {
    #[serde(default)]
    pub raw_data: BlockHeaderRaw,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockHeaderRaw {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub timestamp: i64,
}

impl NowBlock {
    pub fn number(&self) -> u64 {
        self.block_header
            .as_ref()
            .map(|h| h.raw_data.number)
            .unwrap_or(0)
    }
}

/// One entry of an account's TRC10 balance list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    pub key: String,
    pub value: u64,
}

/// On-chain account as returned by `getaccount`.
///
/// A node answers `{}` for addresses that were never activated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub address: String,
    /// Native balance in SUN
    #[serde(default)]
    pub balance: u64,
    #[serde(rename = "assetV2", default)]
    pub asset_v2: Vec<AssetEntry>,
    #[serde(default)]
    pub create_time: i64,
}

impl Account {
    pub fn asset_balance(&self, asset_id: &str) -> u64 {
        self.asset_v2
            .iter()
            .find(|entry| entry.key == asset_id)
            .map(|entry| entry.value)
            .unwrap_or(0)
    }
}

/// Bandwidth counters from `getaccountnet`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountNet {
    #[serde(rename = "freeNetUsed", default)]
    pub free_net_used: i64,
    #[serde(rename = "freeNetLimit", default)]
    pub free_net_limit: i64,
    #[serde(rename = "NetUsed", default)]
    pub net_used: i64,
    #[serde(rename = "NetLimit", default)]
    pub net_limit: i64,
}

impl AccountNet {
    /// True when both staked and free bandwidth are used up.
    pub fn is_exhausted(&self) -> bool {
        self.net_used >= self.net_limit && self.free_net_used >= self.free_net_limit
    }
}

/// Energy counters from `getaccountresource`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "EnergyUsed", default)]
    pub energy_used: i64,
    #[serde(rename = "EnergyLimit", default)]
    pub energy_limit: i64,
    #[serde(rename = "freeNetUsed", default)]
    pub free_net_used: i64,
    #[serde(rename = "freeNetLimit", default)]
    pub free_net_limit: i64,
}

/// Node-side result flag attached to contract triggers and broadcasts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnStatus {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub code: String,
    /// Hex-encoded error text
    #[serde(default)]
    pub message: String,
}

/// Response of `triggersmartcontract` / `triggerconstantcontract`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionExtention {
    #[serde(default)]
    pub result: ReturnStatus,
    #[serde(default)]
    pub constant_result: Vec<String>,
    #[serde(default)]
    pub energy_used: i64,
    #[serde(default)]
    pub transaction: Option<serde_json::Value>,
    #[serde(default)]
    pub txid: String,
}

/// Deployed contract metadata from `getcontract`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractInfo {
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub origin_address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bytecode: String,
    #[serde(default)]
    pub consume_user_resource_percent: i64,
    #[serde(default)]
    pub origin_energy_limit: i64,
}

impl ContractInfo {
    /// A node answers `{}` for unknown contract addresses.
    pub fn is_deployed(&self) -> bool {
        !self.bytecode.is_empty()
    }
}

/// Response of `broadcasttransaction`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub code: String,
    /// Hex-encoded error text
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub txid: String,
}

/// Decode a hex-encoded node message, falling back to the raw text.
pub fn decode_node_message(message: &str) -> String {
    match alloy::hex::decode(message) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => message.to_string(),
    }
}
