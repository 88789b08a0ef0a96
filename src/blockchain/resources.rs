// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bandwidth fee estimation and energy sufficiency checks.

use std::sync::Arc;

use alloy::primitives::U256;

use super::client::{NodeRpc, TronClient};
use crate::config::TronConfig;
use crate::error::TransferError;
use crate::models::FeeEstimate;

/// Result of an energy sufficiency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyCheck {
    pub sufficient: bool,
    /// Energy left plus what the native balance can buy
    pub remaining: i128,
    pub minimum: i64,
}

pub struct FeeEstimator<N> {
    client: TronClient<N>,
    config: Arc<TronConfig>,
}

impl<N> Clone for FeeEstimator<N> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<N: NodeRpc> FeeEstimator<N> {
    pub fn new(client: TronClient<N>, config: Arc<TronConfig>) -> Self {
        Self { client, config }
    }

    /// Fee in SUN for sending `payload_len` bytes from `from`.
    ///
    /// Zero while the address still has staked or free bandwidth.
    pub async fn estimate_fee(
        &self,
        from: &str,
        payload_len: usize,
    ) -> Result<FeeEstimate, TransferError> {
        let net = self.client.get_account_net(from).await?;
        let price = U256::from(self.config.bandwidth_price_sun);
        let used = payload_len as u64;

        let fee = if net.is_exhausted() {
            price * U256::from(used)
        } else {
            U256::ZERO
        };

        tracing::debug!(address = %from, payload_len, fee = %fee, "Estimated bandwidth fee");

        Ok(FeeEstimate {
            gas_used: used,
            gas_price: price,
            fee,
        })
    }

    /// Whether `address` has enough energy for a contract call.
    ///
    /// A failed resource query counts as insufficient.
    pub async fn is_enough_energy(&self, address: &str, native_balance_sun: i128) -> EnergyCheck {
        let minimum = self.config.fee_mini;

        let resource = match self.client.get_account_resource(address).await {
            Ok(resource) => resource,
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Failed to fetch account resource");
                return EnergyCheck {
                    sufficient: false,
                    remaining: 0,
                    minimum,
                };
            }
        };

        let price = i128::from(self.config.energy_price_sun.max(1));
        let remaining = i128::from(resource.energy_limit) - i128::from(resource.energy_used)
            + native_balance_sun / price;

        EnergyCheck {
            sufficient: remaining >= i128::from(minimum),
            remaining,
            minimum,
        }
    }
}
