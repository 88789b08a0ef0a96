// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance lookups per token kind.

use std::future::Future;
use std::sync::Arc;

use alloy::primitives::U256;

use super::abi;
use super::address::AddressCodec;
use super::amount::format_amount;
use super::client::{NodeRpc, TronClient};
use super::types::decode_node_message;
use crate::error::TransferError;
use crate::models::{CandidateBalance, TokenDescriptor, TokenKind};

/// Formatted balance of one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBalance {
    pub address: String,
    pub symbol: String,
    pub balance_raw: U256,
    pub balance_formatted: String,
    pub decimals: u8,
}

/// Resolves native, TRC10 and TRC20 balances. Every lookup is retried once.
///
/// Owner and contract addresses pass through the codec before reaching the node.
pub struct BalanceResolver<N> {
    client: TronClient<N>,
    codec: Arc<dyn AddressCodec + Send + Sync>,
    is_testnet: bool,
}

impl<N> Clone for BalanceResolver<N> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            codec: Arc::clone(&self.codec),
            is_testnet: self.is_testnet,
        }
    }
}

/// Run `op`, retrying once on failure.
async fn retry_once<T, F, Fut>(what: &str, address: &str, op: F) -> Result<T, TransferError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, TransferError>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(address = %address, error = %e, "{what} lookup failed, retrying");
            op().await
        }
    }
}

impl<N: NodeRpc> BalanceResolver<N> {
    pub fn new(
        client: TronClient<N>,
        codec: Arc<dyn AddressCodec + Send + Sync>,
        is_testnet: bool,
    ) -> Self {
        Self {
            client,
            codec,
            is_testnet,
        }
    }

    fn hex(&self, address: &str) -> Result<String, TransferError> {
        Ok(self.codec.decode_address(address, self.is_testnet)?.hex)
    }

    /// Native balance in SUN. An account that does not exist has zero.
    pub async fn native_balance(&self, address: &str) -> Result<U256, TransferError> {
        let address = self.hex(address)?;
        let address = address.as_str();
        retry_once("Native balance", address, || async move {
            let (account, _) = self.client.get_account(address).await?;
            Ok(U256::from(account.balance))
        })
        .await
    }

    /// Whether the account exists on chain.
    pub async fn account_exists(&self, address: &str) -> Result<bool, TransferError> {
        let address = self.hex(address)?;
        let address = address.as_str();
        retry_once("Account", address, || async move {
            let (_, exists) = self.client.get_account(address).await?;
            Ok(exists)
        })
        .await
    }

    pub async fn trc10_balance(&self, address: &str, asset_id: &str) -> Result<U256, TransferError> {
        let address = self.hex(address)?;
        let address = address.as_str();
        retry_once("TRC10 balance", address, || async move {
            let (account, _) = self.client.get_account(address).await?;
            Ok(U256::from(account.asset_balance(asset_id)))
        })
        .await
    }

    /// `balanceOf(address)` on a TRC20 contract.
    pub async fn trc20_balance(&self, address: &str, contract: &str) -> Result<U256, TransferError> {
        let address = self.hex(address)?;
        let address = address.as_str();
        let contract = self.hex(contract)?;
        let contract = contract.as_str();
        let parameter = abi::balance_of_parameter(address)?;
        let parameter = parameter.as_str();
        retry_once("TRC20 balance", address, || async move {
            let ext = self
                .client
                .trigger_constant_contract(address, contract, abi::BALANCE_OF_SELECTOR, parameter)
                .await?;

            match ext.constant_result.first() {
                Some(result) => abi::decode_uint256(result),
                None => Err(TransferError::ContractCallError(decode_node_message(
                    &ext.result.message,
                ))),
            }
        })
        .await
    }

    /// Balance of `token` held by `address`, in base units.
    pub async fn balance(
        &self,
        address: &str,
        token: &TokenDescriptor,
    ) -> Result<U256, TransferError> {
        match &token.kind {
            TokenKind::Native => self.native_balance(address).await,
            TokenKind::Trc10 { asset_id } => self.trc10_balance(address, asset_id).await,
            TokenKind::Trc20 { contract_address } => {
                self.trc20_balance(address, contract_address).await
            }
        }
    }

    /// Native and token balances of a page of addresses, in input order.
    ///
    /// `addresses` pairs each address with its derivation index.
    pub async fn balances(
        &self,
        addresses: &[(String, u64)],
        token: &TokenDescriptor,
    ) -> Result<Vec<CandidateBalance>, TransferError> {
        let mut out = Vec::with_capacity(addresses.len());
        for (address, index) in addresses {
            let native_balance = self.native_balance(address).await?;
            let token_balance = if token.is_native() {
                native_balance
            } else {
                self.balance(address, token).await?
            };
            out.push(CandidateBalance {
                address: address.clone(),
                native_balance,
                token_balance,
                index: *index,
            });
        }
        Ok(out)
    }

    /// Formatted `token` balances, skipping addresses whose lookup fails.
    pub async fn token_balances_by_address(
        &self,
        token: &TokenDescriptor,
        addresses: &[String],
    ) -> Vec<AddressBalance> {
        let mut out = Vec::with_capacity(addresses.len());
        for address in addresses {
            match self.balance(address, token).await {
                Ok(raw) => out.push(AddressBalance {
                    address: address.clone(),
                    symbol: token.display_symbol().to_string(),
                    balance_formatted: format_amount(raw, token.decimals),
                    balance_raw: raw,
                    decimals: token.decimals,
                }),
                Err(e) => {
                    tracing::warn!(address = %address, error = %e, "Failed to get token balance");
                }
            }
        }
        out
    }
}
