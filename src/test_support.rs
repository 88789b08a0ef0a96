// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory node and wallet fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::primitives::U256;
use serde_json::{json, Value};

use crate::blockchain::address::HexAddressCodec;
use crate::blockchain::balance::BalanceResolver;
use crate::blockchain::client::{NodeRpc, RpcError, TronClient};
use crate::blockchain::envelope::EnvelopeBuilder;
use crate::blockchain::resources::FeeEstimator;
use crate::blockchain::types::{endpoints, Account, AccountNet, AccountResource, AssetEntry};
use crate::config::TronConfig;
use crate::decoder::selector::FundingSelector;
use crate::decoder::TransactionDecoder;
use crate::models::{AccountAddress, AccountRef};
use crate::wallet::InMemoryWallet;

pub const BLOCK_ID: &str = "00000000033c2a1f8f1a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f70";

/// External destination no test wallet owns.
pub const DEST: &str = "41dddddddddddddddddddddddddddddddddddddddd";

pub const KEY_A: [u8; 32] = [1u8; 32];
pub const KEY_B: [u8; 32] = [2u8; 32];
pub const KEY_C: [u8; 32] = [3u8; 32];

/// Last 40 hex characters, the 20-byte body shared by addresses and ABI words.
fn body(hex: &str) -> String {
    let hex = hex.to_lowercase();
    hex[hex.len().saturating_sub(40)..].to_string()
}

struct NodeState {
    block_id: String,
    accounts: HashMap<String, Account>,
    nets: HashMap<String, AccountNet>,
    resources: HashMap<String, AccountResource>,
    token_balances: HashMap<(String, String), U256>,
    reverts: HashMap<String, String>,
    contracts: HashMap<String, String>,
    failures: HashMap<String, usize>,
    calls: Vec<(String, Value)>,
    broadcast_reply: Value,
}

/// Scriptable stand-in for a TRON full node.
pub struct MockNode {
    state: Mutex<NodeState>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNode {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NodeState {
                block_id: BLOCK_ID.to_string(),
                accounts: HashMap::new(),
                nets: HashMap::new(),
                resources: HashMap::new(),
                token_balances: HashMap::new(),
                reverts: HashMap::new(),
                contracts: HashMap::new(),
                failures: HashMap::new(),
                calls: Vec::new(),
                broadcast_reply: json!({ "result": true }),
            }),
        }
    }

    fn with_account(&self, address: &str, f: impl FnOnce(&mut Account)) {
        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts
            .entry(address.to_lowercase())
            .or_insert_with(|| Account {
                address: address.to_lowercase(),
                create_time: 1,
                ..Default::default()
            });
        f(account);
    }

    /// Activates the account as a side effect.
    pub fn set_native_balance(&self, address: &str, sun: u64) {
        self.with_account(address, |account| account.balance = sun);
    }

    pub fn set_asset_balance(&self, address: &str, asset_id: &str, amount: u64) {
        self.with_account(address, |account| {
            account.asset_v2.retain(|entry| entry.key != asset_id);
            account.asset_v2.push(AssetEntry {
                key: asset_id.to_string(),
                value: amount,
            });
        });
    }

    pub fn mark_existing(&self, address: &str) {
        self.with_account(address, |_| {});
    }

    pub fn set_token_balance(&self, contract: &str, owner: &str, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .token_balances
            .insert((contract.to_lowercase(), body(owner)), amount);
    }

    /// Constant calls on `contract` for owners without a balance fail with `message`.
    pub fn set_constant_revert(&self, contract: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .reverts
            .insert(contract.to_lowercase(), message.to_string());
    }

    pub fn deploy_contract(&self, contract: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .contracts
            .insert(contract.to_lowercase(), name.to_string());
    }

    pub fn set_account_net(&self, address: &str, net: AccountNet) {
        self.state.lock().unwrap().nets.insert(address.to_lowercase(), net);
    }

    pub fn set_account_resource(&self, address: &str, resource: AccountResource) {
        self.state
            .lock()
            .unwrap()
            .resources
            .insert(address.to_lowercase(), resource);
    }

    pub fn set_block_id(&self, block_id: &str) {
        self.state.lock().unwrap().block_id = block_id.to_string();
    }

    /// Fail the next `times` calls to `endpoint` with a transport error.
    pub fn fail_next(&self, endpoint: &str, times: usize) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(endpoint.to_string(), times);
    }

    pub fn reject_broadcasts(&self, code: &str, message: &str) {
        self.state.lock().unwrap().broadcast_reply = json!({
            "result": false,
            "code": code,
            "message": alloy::hex::encode(message),
        });
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(e, _)| e == endpoint)
            .count()
    }

    pub fn last_call(&self, endpoint: &str) -> Option<(String, Value)> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .rev()
            .find(|(e, _)| e == endpoint)
            .cloned()
    }

    fn respond(state: &NodeState, endpoint: &str, params: &Value) -> Result<Value, RpcError> {
        let address = params["address"].as_str().unwrap_or_default().to_lowercase();

        let reply = match endpoint {
            endpoints::GET_NOW_BLOCK => json!({
                "blockID": state.block_id,
                "block_header": { "raw_data": { "number": 54_000_000u64, "timestamp": 1_700_000_000_000i64 } },
            }),
            endpoints::GET_ACCOUNT => match state.accounts.get(&address) {
                Some(account) => serde_json::to_value(account)
                    .map_err(|e| RpcError::Decode(e.to_string()))?,
                None => json!({}),
            },
            endpoints::GET_ACCOUNT_NET => match state.nets.get(&address) {
                Some(net) => serde_json::to_value(net).map_err(|e| RpcError::Decode(e.to_string()))?,
                None => json!({ "freeNetLimit": 600 }),
            },
            endpoints::GET_ACCOUNT_RESOURCE => match state.resources.get(&address) {
                Some(resource) => serde_json::to_value(resource)
                    .map_err(|e| RpcError::Decode(e.to_string()))?,
                None => json!({}),
            },
            endpoints::TRIGGER_CONSTANT_CONTRACT => {
                let contract = params["contract_address"]
                    .as_str()
                    .unwrap_or_default()
                    .to_lowercase();
                let owner = body(params["parameter"].as_str().unwrap_or_default());

                match state.token_balances.get(&(contract.clone(), owner)) {
                    Some(amount) => json!({
                        "result": { "result": true },
                        "constant_result": [format!("{:0>64}", format!("{amount:x}"))],
                    }),
                    None => match state.reverts.get(&contract) {
                        Some(message) => json!({
                            "result": { "result": false, "message": alloy::hex::encode(message) },
                            "constant_result": [],
                        }),
                        None => json!({
                            "result": { "result": true },
                            "constant_result": ["0".repeat(64)],
                        }),
                    },
                }
            }
            endpoints::TRIGGER_SMART_CONTRACT => json!({ "result": { "result": true } }),
            endpoints::GET_CONTRACT => {
                let contract = params["value"].as_str().unwrap_or_default().to_lowercase();
                match state.contracts.get(&contract) {
                    Some(name) => json!({
                        "contract_address": contract,
                        "name": name,
                        "bytecode": "6080604052",
                    }),
                    None => json!({}),
                }
            }
            endpoints::BROADCAST_TRANSACTION => state.broadcast_reply.clone(),
            other => {
                return Err(RpcError::Status {
                    endpoint: other.to_string(),
                    status: 404,
                })
            }
        };
        Ok(reply)
    }
}

impl NodeRpc for MockNode {
    async fn call(&self, endpoint: &str, params: Value) -> Result<Value, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((endpoint.to_string(), params.clone()));

        if let Some(remaining) = state.failures.get_mut(endpoint) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RpcError::Transport(format!("{endpoint}: connection reset")));
            }
        }

        Self::respond(&state, endpoint, &params)
    }
}

/// A wallet with one account ("w1"/"a1") over a [`MockNode`].
pub struct Harness {
    pub node: Arc<MockNode>,
    pub wallet: Arc<InMemoryWallet>,
    pub account: AccountRef,
    pub addresses: Vec<AccountAddress>,
    pub config: Arc<TronConfig>,
}

impl Harness {
    pub fn new(keys: &[[u8; 32]]) -> Self {
        Self::with_config(keys, TronConfig::default())
    }

    pub fn with_config(keys: &[[u8; 32]], config: TronConfig) -> Self {
        let wallet = Arc::new(InMemoryWallet::default());
        let account = wallet.create_account("w1", "a1").unwrap();
        let addresses = keys
            .iter()
            .map(|key| wallet.import_key("a1", key).unwrap())
            .collect();

        Self {
            node: Arc::new(MockNode::new()),
            wallet,
            account,
            addresses,
            config: Arc::new(config),
        }
    }

    pub fn client(&self) -> TronClient<MockNode> {
        TronClient::new(Arc::clone(&self.node))
    }

    pub fn envelopes(&self) -> EnvelopeBuilder<MockNode> {
        EnvelopeBuilder::new(
            self.client(),
            Arc::new(HexAddressCodec::default()),
            Arc::clone(&self.config),
        )
    }

    pub fn selector(&self) -> FundingSelector<MockNode> {
        FundingSelector::new(
            self.envelopes(),
            FeeEstimator::new(self.client(), Arc::clone(&self.config)),
            BalanceResolver::new(
                self.client(),
                Arc::new(HexAddressCodec::default()),
                self.config.is_testnet,
            ),
            self.wallet.clone(),
            Arc::clone(&self.config),
        )
    }

    pub fn decoder(&self) -> TransactionDecoder<MockNode> {
        TransactionDecoder::new(
            Arc::clone(&self.node),
            Arc::new(HexAddressCodec::default()),
            self.wallet.clone(),
            self.wallet.clone(),
            Arc::clone(&self.config),
        )
    }
}
