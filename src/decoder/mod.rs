// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Decoder
//!
//! Entry point for callers. A [`TransferRequest`] moves through
//! `Unbuilt -> Built -> Signed -> Verified -> Submitted`:
//!
//! | Step | Method | Requires |
//! |------|--------|----------|
//! | Build | [`TransactionDecoder::create_raw_transaction`] | one destination |
//! | Sign | [`TransactionDecoder::sign_raw_transaction`] | built |
//! | Verify | [`TransactionDecoder::verify_raw_transaction`] | built, signed |
//! | Submit | [`TransactionDecoder::submit_raw_transaction`] | verified |
//!
//! Summary (consolidation) batches live in [`summary`].

pub mod selector;
pub mod summary;

use std::sync::Arc;

use alloy::primitives::U256;
use chrono::Utc;

use crate::blockchain::address::AddressCodec;
use crate::blockchain::amount::{format_amount, format_signed_amount, parse_amount};
use crate::blockchain::balance::{AddressBalance, BalanceResolver};
use crate::blockchain::client::{NodeRpc, TronClient};
use crate::blockchain::envelope::{
    decode_contract, decode_transaction, encode_transaction, transaction_digest, BuiltEnvelope,
    EnvelopeBuilder,
};
use crate::blockchain::resources::FeeEstimator;
use crate::blockchain::signing::{sign_digest, verify_owner};
use crate::config::TronConfig;
use crate::error::TransferError;
use crate::models::{
    AccountAddress, FeeEstimate, KeySignature, SubmittedTransaction, TokenDescriptor,
    TransferRequest, TxState,
};
use crate::wallet::{KeyProvider, WalletStore};

use selector::FundingSelector;

/// Reject requests that do not have exactly one destination or were never built.
pub fn check_raw_transaction(tx: &TransferRequest) -> Result<(), TransferError> {
    tx.single_destination()?;
    if tx.raw_hex.is_empty() {
        return Err(TransferError::InvalidState(
            "transaction has not been built".to_string(),
        ));
    }
    Ok(())
}

fn digest_from_hex(message: &str) -> Result<[u8; 32], TransferError> {
    let bytes = alloy::hex::decode(message)
        .map_err(|e| TransferError::Encoding(format!("digest hex: {e}")))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| TransferError::Encoding(format!("digest is {} bytes", bytes.len())))
}

/// Builds, signs, verifies and submits transfers.
pub struct TransactionDecoder<N> {
    client: TronClient<N>,
    codec: Arc<dyn AddressCodec + Send + Sync>,
    envelopes: EnvelopeBuilder<N>,
    fees: FeeEstimator<N>,
    balances: BalanceResolver<N>,
    selector: FundingSelector<N>,
    wallet: Arc<dyn WalletStore>,
    keys: Arc<dyn KeyProvider>,
    config: Arc<TronConfig>,
}

impl<N: NodeRpc> TransactionDecoder<N> {
    pub fn new(
        rpc: Arc<N>,
        codec: Arc<dyn AddressCodec + Send + Sync>,
        wallet: Arc<dyn WalletStore>,
        keys: Arc<dyn KeyProvider>,
        config: Arc<TronConfig>,
    ) -> Self {
        let client = TronClient::new(rpc);
        let envelopes = EnvelopeBuilder::new(client.clone(), Arc::clone(&codec), Arc::clone(&config));
        let fees = FeeEstimator::new(client.clone(), Arc::clone(&config));
        let balances = BalanceResolver::new(client.clone(), Arc::clone(&codec), config.is_testnet);
        let selector = FundingSelector::new(
            envelopes.clone(),
            fees.clone(),
            balances.clone(),
            Arc::clone(&wallet),
            Arc::clone(&config),
        );

        Self {
            client,
            codec,
            envelopes,
            fees,
            balances,
            selector,
            wallet,
            keys,
            config,
        }
    }

    pub fn client(&self) -> &TronClient<N> {
        &self.client
    }

    pub fn balances(&self) -> &BalanceResolver<N> {
        &self.balances
    }

    fn hex_address(&self, text: &str) -> Result<String, TransferError> {
        Ok(self.codec.decode_address(text, self.config.is_testnet)?.hex)
    }

    /// Formatted balances of `token` for each address.
    pub async fn token_balances_by_address(
        &self,
        token: &TokenDescriptor,
        addresses: &[String],
    ) -> Vec<AddressBalance> {
        self.balances.token_balances_by_address(token, addresses).await
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Select a funding address and build the transfer.
    pub async fn create_raw_transaction(&self, tx: &mut TransferRequest) -> Result<(), TransferError> {
        if tx.state != TxState::Unbuilt {
            return Err(TransferError::InvalidState(format!(
                "cannot build a transaction in state {:?}",
                tx.state
            )));
        }

        let (to, amount_text) = tx.single_destination()?;
        let to = self.hex_address(to)?;
        let amount_text = amount_text.to_string();
        let account = tx.account()?.clone();
        let coin = tx.coin()?.clone();

        let amount = parse_amount(&amount_text, coin.decimals)?;
        if amount.is_zero() {
            return Err(TransferError::InvalidAmount("amount must be positive".to_string()));
        }

        let selection = self.selector.select(&account, &to, amount, &coin).await?;
        self.finalize(tx, &selection.address, &to, amount, &selection.envelope, &selection.fee)
    }

    /// Fill a request from an already built envelope.
    pub(crate) fn finalize(
        &self,
        tx: &mut TransferRequest,
        from: &AccountAddress,
        to: &str,
        amount: U256,
        envelope: &BuiltEnvelope,
        fee: &FeeEstimate,
    ) -> Result<(), TransferError> {
        let account = tx.account()?.clone();
        let coin = tx.coin()?.clone();
        let amount_text = format_amount(amount, coin.decimals);

        let to_outside = !self.wallet.owns_address(&account.account_id, to)?;
        let to_i128 = |v: U256| {
            i128::try_from(v).map_err(|_| TransferError::InvalidAmount(format!("{v} out of range")))
        };

        let mut net = 0i128;
        if to_outside {
            net -= to_i128(amount)?;
        }
        if coin.is_native() {
            net -= to_i128(fee.fee)?;
        }

        tx.raw_hex = envelope.raw_hex.clone();
        tx.fees = format_amount(fee.fee, self.config.decimals);
        if tx.fee_rate.is_empty() {
            tx.fee_rate = format_amount(fee.gas_price, self.config.decimals);
        }
        tx.tx_from = vec![format!("{}:{}", from.address, amount_text)];
        tx.tx_to = vec![format!("{}:{}", to, amount_text)];
        tx.tx_amount = format_signed_amount(net, coin.decimals);
        tx.signatures.insert(
            account.account_id.clone(),
            vec![KeySignature {
                curve: self.config.curve,
                address: from.clone(),
                message: envelope.digest_hex(),
                signature: String::new(),
            }],
        );
        tx.state = TxState::Built;

        tracing::info!(
            account_id = %account.account_id,
            from = %from.address,
            to = %to,
            amount = %amount_text,
            fees = %tx.fees,
            "Built transaction"
        );
        Ok(())
    }

    // =========================================================================
    // Sign
    // =========================================================================

    /// Sign every pending signature slot of the request's account.
    pub fn sign_raw_transaction(&self, tx: &mut TransferRequest) -> Result<(), TransferError> {
        if !tx.is_built() || tx.state > TxState::Signed {
            return Err(TransferError::InvalidState(format!(
                "cannot sign a transaction in state {:?}",
                tx.state
            )));
        }

        let account = tx.account()?.clone();
        let slots = match tx.signatures.get_mut(&account.account_id) {
            Some(slots) if !slots.is_empty() => slots,
            _ => return Err(TransferError::SignatureEmpty),
        };

        for slot in slots.iter_mut() {
            let key = self
                .keys
                .derive_private_key(&account, &slot.address.hd_path, slot.curve)?;
            let digest = digest_from_hex(&slot.message)?;
            slot.signature = alloy::hex::encode(sign_digest(&key, &digest)?);
            tracing::debug!(address = %slot.address.address, "Signed transaction digest");
        }

        tx.state = TxState::Signed;
        Ok(())
    }

    // =========================================================================
    // Verify
    // =========================================================================

    /// Check that the signature belongs to the owner of every contract entry.
    pub fn verify_raw_transaction(&self, tx: &mut TransferRequest) -> Result<(), TransferError> {
        check_raw_transaction(tx)?;
        if tx.state > TxState::Verified {
            return Err(TransferError::InvalidState(format!(
                "cannot verify a transaction in state {:?}",
                tx.state
            )));
        }

        let account_id = tx.account()?.account_id.clone();
        let slot = tx
            .signatures
            .get(&account_id)
            .and_then(|slots| slots.first())
            .filter(|slot| slot.is_signed())
            .ok_or_else(|| {
                TransferError::SignatureVerificationFailed("transaction is not signed".to_string())
            })?;

        let mut envelope = decode_transaction(&tx.raw_hex)?;
        let signature = alloy::hex::decode(&slot.signature)
            .map_err(|e| TransferError::SignatureVerificationFailed(format!("signature hex: {e}")))?;
        if !envelope.signature.contains(&signature) {
            envelope.signature.push(signature);
        }

        let digest = transaction_digest(&envelope)?;
        if alloy::hex::encode(digest) != slot.message.to_lowercase() {
            return Err(TransferError::SignatureVerificationFailed(
                "signed digest does not match transaction".to_string(),
            ));
        }

        let raw = envelope
            .raw_data
            .as_ref()
            .ok_or_else(|| TransferError::Encoding("transaction has no raw data".to_string()))?;
        for (i, contract) in raw.contract.iter().enumerate() {
            let owner = decode_contract(contract)?.owner_address().to_vec();
            let signature = envelope.signature.get(i).ok_or_else(|| {
                TransferError::SignatureVerificationFailed(format!("missing signature {i}"))
            })?;
            if !verify_owner(&digest, signature, &owner) {
                tracing::warn!(owner = %alloy::hex::encode(&owner), "Signature does not match owner");
                return Err(TransferError::SignatureVerificationFailed(format!(
                    "signature {i} is not from {}",
                    alloy::hex::encode(&owner)
                )));
            }
        }

        tx.state = TxState::Verified;
        Ok(())
    }

    // =========================================================================
    // Submit
    // =========================================================================

    /// Merge signatures and broadcast a verified transaction.
    pub async fn submit_raw_transaction(
        &self,
        tx: &mut TransferRequest,
    ) -> Result<SubmittedTransaction, TransferError> {
        if !tx.is_completed() || tx.is_submitted() {
            return Err(TransferError::InvalidState(format!(
                "cannot submit a transaction in state {:?}",
                tx.state
            )));
        }

        let account_id = tx.account()?.account_id.clone();
        let coin = tx.coin()?.clone();

        let mut envelope = decode_transaction(&tx.raw_hex)?;
        for slot in tx.signatures.get(&account_id).into_iter().flatten() {
            let signature = alloy::hex::decode(&slot.signature)
                .map_err(|e| TransferError::Encoding(format!("signature hex: {e}")))?;
            if !envelope.signature.contains(&signature) {
                envelope.signature.push(signature);
            }
        }

        let tx_id = self
            .client
            .broadcast_transaction(&envelope)
            .await
            .map_err(|e| {
                tracing::error!(account_id = %account_id, error = %e, "Broadcast failed");
                TransferError::from_broadcast(e)
            })?;

        tx.raw_hex = encode_transaction(&envelope);
        tx.tx_id = tx_id.clone();
        tx.state = TxState::Submitted;

        Ok(SubmittedTransaction {
            from: tx.tx_from.clone(),
            to: tx.tx_to.clone(),
            amount: tx.tx_amount.clone(),
            decimals: coin.decimals,
            coin,
            tx_id,
            account_id,
            fees: tx.fees.clone(),
            submit_time: Utc::now(),
        })
    }
}
