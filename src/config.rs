// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! [`TronConfig`] carries every tunable used by the settlement core. Values
//! start from [`TronConfig::default`] and may be overridden from the
//! environment at startup with [`TronConfig::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TRON_SERVER_API` | Full-node HTTP API base URL | `https://api.trongrid.io` |
//! | `TRON_IS_TESTNET` | Use testnet address rules | `false` |
//! | `TRON_FEE_LIMIT` | Fee ceiling (SUN) attached to contract calls, `0` = none | `10000000` |
//! | `TRON_FEE_MINI` | Minimum energy required to call a contract | `0` |
//! | `TRON_ENERGY_PRICE_SUN` | SUN per energy unit | `140` |
//! | `TRON_BANDWIDTH_PRICE_SUN` | SUN per byte once bandwidth is exhausted | `140` |
//! | `TRON_CREATE_ACCOUNT_COST_SUN` | Surcharge for activating a new account | `100000` |
//! | `TRON_TX_EXPIRATION_MS` | Transaction validity window | `36000000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use serde::Deserialize;

use crate::blockchain::types::{NetworkConfig, TRON_MAINNET, TRON_SHASTA};
use crate::models::Curve;

/// Environment variable for the full-node HTTP API base URL.
pub const SERVER_API_ENV: &str = "TRON_SERVER_API";

/// Environment variable selecting testnet address rules.
pub const IS_TESTNET_ENV: &str = "TRON_IS_TESTNET";

/// Environment variable for the contract-call fee ceiling, in SUN.
pub const FEE_LIMIT_ENV: &str = "TRON_FEE_LIMIT";

/// Environment variable for the minimum energy needed to call a contract.
pub const FEE_MINI_ENV: &str = "TRON_FEE_MINI";

/// Environment variable for the price of one energy unit, in SUN.
pub const ENERGY_PRICE_ENV: &str = "TRON_ENERGY_PRICE_SUN";

/// Environment variable for the price of one bandwidth byte, in SUN.
pub const BANDWIDTH_PRICE_ENV: &str = "TRON_BANDWIDTH_PRICE_SUN";

/// Environment variable for the account-creation surcharge, in SUN.
pub const CREATE_ACCOUNT_COST_ENV: &str = "TRON_CREATE_ACCOUNT_COST_SUN";

/// Environment variable for the transaction validity window, in milliseconds.
pub const TX_EXPIRATION_ENV: &str = "TRON_TX_EXPIRATION_MS";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Native coin symbol.
pub const TRX_SYMBOL: &str = "TRX";

/// Native coin decimals (1 TRX = 1_000_000 SUN).
pub const TRX_DECIMALS: u8 = 6;

/// Default fee ceiling for contract calls (10 TRX).
pub const DEFAULT_FEE_LIMIT: i64 = 10_000_000;

/// Default SUN price per energy unit.
pub const DEFAULT_ENERGY_PRICE_SUN: u64 = 140;

/// Default SUN price per bandwidth byte.
pub const DEFAULT_BANDWIDTH_PRICE_SUN: u64 = 140;

/// Default account activation surcharge (0.1 TRX).
pub const DEFAULT_CREATE_ACCOUNT_COST_SUN: u64 = 100_000;

/// Default validity window of a built transaction (10 hours).
pub const DEFAULT_EXPIRATION_WINDOW_MS: i64 = 36_000_000;

/// Longest validity window a node accepts (24 hours).
pub const MAX_EXPIRATION_WINDOW_MS: i64 = 86_400_000;

/// Settlement core configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TronConfig {
    /// Native coin decimals
    pub decimals: u8,
    /// Node HTTP API base URL
    pub server_api: String,
    /// Whether addresses follow testnet rules
    pub is_testnet: bool,
    /// Signing curve
    pub curve: Curve,
    /// Fee ceiling in SUN for contract calls, `0` disables it
    pub fee_limit: i64,
    /// Minimum energy an address needs before calling a contract
    pub fee_mini: i64,
    /// SUN per energy unit
    pub energy_price_sun: u64,
    /// SUN per bandwidth byte
    pub bandwidth_price_sun: u64,
    /// Surcharge in SUN when the destination account does not exist yet
    pub create_account_cost_sun: u64,
    /// Validity window added to the build time, in milliseconds
    pub expiration_window_ms: i64,
}

impl Default for TronConfig {
    fn default() -> Self {
        Self::for_network(&TRON_MAINNET)
    }
}

impl TronConfig {
    /// Defaults bound to a network preset.
    pub fn for_network(network: &NetworkConfig) -> Self {
        Self {
            decimals: TRX_DECIMALS,
            server_api: network.api_url.to_string(),
            is_testnet: network.is_testnet,
            curve: Curve::Secp256k1,
            fee_limit: DEFAULT_FEE_LIMIT,
            fee_mini: 0,
            energy_price_sun: DEFAULT_ENERGY_PRICE_SUN,
            bandwidth_price_sun: DEFAULT_BANDWIDTH_PRICE_SUN,
            create_account_cost_sun: DEFAULT_CREATE_ACCOUNT_COST_SUN,
            expiration_window_ms: DEFAULT_EXPIRATION_WINDOW_MS,
        }
    }

    /// Load the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults; set keys must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_testnet = parse_var(&lookup, IS_TESTNET_ENV)?.unwrap_or(false);
        let network = if is_testnet { &TRON_SHASTA } else { &TRON_MAINNET };
        let mut config = Self::for_network(network);

        if let Some(api) = lookup(SERVER_API_ENV) {
            url::Url::parse(&api).map_err(|e| ConfigError::Invalid {
                key: SERVER_API_ENV,
                reason: e.to_string(),
            })?;
            config.server_api = api;
        }
        if let Some(v) = parse_var(&lookup, FEE_LIMIT_ENV)? {
            config.fee_limit = v;
        }
        if let Some(v) = parse_var(&lookup, FEE_MINI_ENV)? {
            config.fee_mini = v;
        }
        if let Some(v) = parse_var(&lookup, ENERGY_PRICE_ENV)? {
            config.energy_price_sun = v;
        }
        if let Some(v) = parse_var(&lookup, BANDWIDTH_PRICE_ENV)? {
            config.bandwidth_price_sun = v;
        }
        if let Some(v) = parse_var(&lookup, CREATE_ACCOUNT_COST_ENV)? {
            config.create_account_cost_sun = v;
        }
        if let Some(v) = parse_var(&lookup, TX_EXPIRATION_ENV)? {
            config.expiration_window_ms = v;
        }

        if config.energy_price_sun == 0 {
            return Err(ConfigError::Invalid {
                key: ENERGY_PRICE_ENV,
                reason: "energy price must be positive".to_string(),
            });
        }
        if !(1..=MAX_EXPIRATION_WINDOW_MS).contains(&config.expiration_window_ms) {
            return Err(ConfigError::Invalid {
                key: TX_EXPIRATION_ENV,
                reason: format!("must be between 1 and {MAX_EXPIRATION_WINDOW_MS} ms"),
            });
        }

        tracing::debug!(network = network.name, server_api = %config.server_api, "Loaded TRON configuration");
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_mainnet() {
        let config = TronConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.decimals, 6);
        assert!(!config.is_testnet);
        assert_eq!(config.expiration_window_ms, 36_000_000);
        assert_eq!(config.create_account_cost_sun, 100_000);
    }

    #[test]
    fn overrides_are_applied() {
        let config = TronConfig::from_lookup(lookup_from(&[
            (IS_TESTNET_ENV, "true"),
            (FEE_MINI_ENV, "15000"),
            (FEE_LIMIT_ENV, "0"),
            (TX_EXPIRATION_ENV, "60000"),
        ]))
        .unwrap();

        assert!(config.is_testnet);
        assert_eq!(config.server_api, TRON_SHASTA.api_url);
        assert_eq!(config.fee_mini, 15_000);
        assert_eq!(config.fee_limit, 0);
        assert_eq!(config.expiration_window_ms, 60_000);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = TronConfig::from_lookup(lookup_from(&[(FEE_MINI_ENV, "lots")])).unwrap_err();
        assert!(err.to_string().contains(FEE_MINI_ENV));

        let err =
            TronConfig::from_lookup(lookup_from(&[(SERVER_API_ENV, "not a url")])).unwrap_err();
        assert!(err.to_string().contains(SERVER_API_ENV));

        assert!(TronConfig::from_lookup(lookup_from(&[(ENERGY_PRICE_ENV, "0")])).is_err());
    }

    #[test]
    fn expiration_window_is_bounded() {
        for bad in ["0", "-5", "86400001", "9223372036854775807"] {
            let err = TronConfig::from_lookup(lookup_from(&[(TX_EXPIRATION_ENV, bad)])).unwrap_err();
            assert!(err.to_string().contains(TX_EXPIRATION_ENV), "{bad}");
        }
        let config =
            TronConfig::from_lookup(lookup_from(&[(TX_EXPIRATION_ENV, "86400000")])).unwrap();
        assert_eq!(config.expiration_window_ms, MAX_EXPIRATION_WINDOW_MS);
    }
}
