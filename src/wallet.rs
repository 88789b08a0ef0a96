// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet capabilities consumed by the settlement core.
//!
//! - [`WalletStore`]: account and address lookup
//! - [`KeyProvider`]: private key for a derivation path
//!
//! [`InMemoryWallet`] implements both over plain maps.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::blockchain::signing::address_from_private_key;
use crate::error::TransferError;
use crate::models::{AccountAddress, AccountRef, Curve};

/// Read access to accounts and their derived addresses.
pub trait WalletStore: Send + Sync {
    /// Addresses of an account in derivation order; `limit: None` means all.
    fn address_list(
        &self,
        account_id: &str,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<AccountAddress>, TransferError>;

    /// Look up an address across all accounts.
    fn get_address(&self, address: &str) -> Result<Option<AccountAddress>, TransferError>;

    /// Look up an account by id.
    fn assets_account(&self, account_id: &str) -> Result<Option<AccountRef>, TransferError>;

    fn owns_address(&self, account_id: &str, address: &str) -> Result<bool, TransferError> {
        Ok(self
            .get_address(address)?
            .is_some_and(|a| a.account_id == account_id))
    }
}

/// Supplies signing keys.
pub trait KeyProvider: Send + Sync {
    /// Raw 32-byte private key behind `hd_path` of `account`.
    fn derive_private_key(
        &self,
        account: &AccountRef,
        hd_path: &str,
        curve: Curve,
    ) -> Result<Vec<u8>, TransferError>;
}

#[derive(Default)]
struct WalletState {
    accounts: HashMap<String, AccountRef>,
    addresses: HashMap<String, Vec<AccountAddress>>,
    keys: HashMap<String, Vec<u8>>,
}

/// In-memory wallet holding accounts, addresses and their keys.
pub struct InMemoryWallet {
    prefix: u8,
    state: RwLock<WalletState>,
}

impl Default for InMemoryWallet {
    fn default() -> Self {
        Self::new(0x41)
    }
}

impl InMemoryWallet {
    pub fn new(prefix: u8) -> Self {
        Self {
            prefix,
            state: RwLock::new(WalletState::default()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, WalletState>, TransferError> {
        self.state
            .read()
            .map_err(|_| TransferError::Wallet("wallet lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, WalletState>, TransferError> {
        self.state
            .write()
            .map_err(|_| TransferError::Wallet("wallet lock poisoned".to_string()))
    }

    pub fn create_account(
        &self,
        wallet_id: &str,
        account_id: &str,
    ) -> Result<AccountRef, TransferError> {
        let account = AccountRef {
            wallet_id: wallet_id.to_string(),
            account_id: account_id.to_string(),
        };
        self.write()?
            .accounts
            .insert(account_id.to_string(), account.clone());
        Ok(account)
    }

    /// Import a private key as the next address of an account.
    pub fn import_key(
        &self,
        account_id: &str,
        private_key: &[u8],
    ) -> Result<AccountAddress, TransferError> {
        let address = address_from_private_key(private_key, self.prefix)?;
        let mut state = self.write()?;

        if !state.accounts.contains_key(account_id) {
            return Err(TransferError::AccountNotFound(account_id.to_string()));
        }

        let list = state.addresses.entry(account_id.to_string()).or_default();
        let index = list.len() as u64;
        let entry = AccountAddress {
            account_id: account_id.to_string(),
            address: address.clone(),
            hd_path: format!("m/44'/195'/0'/0/{index}"),
            index,
        };
        list.push(entry.clone());
        state.keys.insert(key_slot(account_id, &entry.hd_path), private_key.to_vec());

        Ok(entry)
    }
}

fn key_slot(account_id: &str, hd_path: &str) -> String {
    format!("{account_id}:{hd_path}")
}

impl WalletStore for InMemoryWallet {
    fn address_list(
        &self,
        account_id: &str,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<AccountAddress>, TransferError> {
        let state = self.read()?;
        let Some(list) = state.addresses.get(account_id) else {
            return Ok(Vec::new());
        };
        let take = limit.unwrap_or(usize::MAX);
        Ok(list.iter().skip(offset).take(take).cloned().collect())
    }

    fn get_address(&self, address: &str) -> Result<Option<AccountAddress>, TransferError> {
        let needle = address.to_lowercase();
        let state = self.read()?;
        Ok(state
            .addresses
            .values()
            .flatten()
            .find(|a| a.address == needle)
            .cloned())
    }

    fn assets_account(&self, account_id: &str) -> Result<Option<AccountRef>, TransferError> {
        Ok(self.read()?.accounts.get(account_id).cloned())
    }
}

impl KeyProvider for InMemoryWallet {
    fn derive_private_key(
        &self,
        account: &AccountRef,
        hd_path: &str,
        _curve: Curve,
    ) -> Result<Vec<u8>, TransferError> {
        self.read()?
            .keys
            .get(&key_slot(&account.account_id, hd_path))
            .cloned()
            .ok_or_else(|| {
                TransferError::KeyDerivation(format!(
                    "no key at {hd_path} for account {}",
                    account.account_id
                ))
            })
    }
}
