// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Summary (consolidation) of an account's addresses into one address.
//!
//! Each address above the minimum moves everything except the retained
//! balance. Token addresses that cannot pay for their own transfer get an
//! auxiliary native transfer from the fee-support account instead; their
//! tokens are collected on a later run.

use alloy::primitives::U256;

use super::selector::native_after;
use super::TransactionDecoder;
use crate::blockchain::amount::{format_amount, parse_amount, scale_amount};
use crate::blockchain::client::NodeRpc;
use crate::error::TransferError;
use crate::models::{
    AccountRef, FeeEstimate, FeeSupportAccount, LegKind, SummaryLeg, SummaryRequest,
    TokenDescriptor, TokenKind, TransferRequest,
};

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl<N: NodeRpc> TransactionDecoder<N> {
    /// Build summary transfers, keeping only the legs that succeeded.
    pub async fn create_summary_raw_transaction(
        &self,
        request: &SummaryRequest,
    ) -> Result<Vec<TransferRequest>, TransferError> {
        let legs = self.create_summary_raw_transaction_with_error(request).await?;
        Ok(legs
            .into_iter()
            .filter(SummaryLeg::is_ok)
            .filter_map(|leg| leg.raw_tx)
            .collect())
    }

    /// Build summary transfers, one leg per processed address.
    ///
    /// Only request validation and envelope construction abort the batch;
    /// any other failure is recorded on its leg.
    pub async fn create_summary_raw_transaction_with_error(
        &self,
        request: &SummaryRequest,
    ) -> Result<Vec<SummaryLeg>, TransferError> {
        let coin = &request.coin;
        let min_transfer = parse_amount(&request.min_transfer, coin.decimals)?;
        let retained = parse_amount(&request.retained_balance, coin.decimals)?;

        let support = match &request.fee_support {
            Some(fee_support) => {
                let account = self
                    .wallet
                    .assets_account(&fee_support.account_id)?
                    .ok_or_else(|| TransferError::AccountNotFound(fee_support.account_id.clone()))?;
                Some((fee_support, account))
            }
            None => None,
        };

        let addresses = self.wallet.address_list(
            &request.account.account_id,
            request.address_start_index,
            request.address_limit,
        )?;
        if addresses.is_empty() {
            return Err(TransferError::NoAddressInAccount(
                request.account.account_id.clone(),
            ));
        }

        let summary_to = self.hex_address(&request.summary_address)?;
        let mut summary_exists = self.balances.account_exists(&summary_to).await?;
        let mut legs = Vec::new();

        for address in &addresses {
            let from = address.address.as_str();

            let balance = match self.balances.balance(from, coin).await {
                Ok(balance) => balance,
                Err(e) => {
                    tracing::warn!(address = %from, error = %e, "Skipping address, balance unavailable");
                    legs.push(SummaryLeg::failed(from, e));
                    continue;
                }
            };

            if balance < min_transfer || balance <= retained {
                continue;
            }

            let mut sum = balance - retained;
            let surcharge = if summary_exists {
                0
            } else {
                self.config.create_account_cost_sun
            };

            if coin.is_native() && surcharge > 0 {
                let cost = U256::from(surcharge);
                if sum <= cost {
                    legs.push(SummaryLeg::failed(
                        from,
                        TransferError::InsufficientBalance(format!(
                            "{from} cannot cover the {} TRX account creation cost",
                            format_amount(cost, self.config.decimals)
                        )),
                    ));
                    continue;
                }
                sum -= cost;
            }
            if sum.is_zero() {
                continue;
            }

            let envelope = self
                .envelopes
                .build_transfer_base(from, &summary_to, sum, coin)
                .await?;

            let fee = match self.fees.estimate_fee(from, envelope.payload_len()).await {
                Ok(fee) => fee,
                Err(e) => {
                    tracing::warn!(address = %from, error = %e, "Fee estimation failed");
                    legs.push(SummaryLeg::failed(from, e));
                    continue;
                }
            };

            let support_target = match &coin.kind {
                TokenKind::Native => None,
                TokenKind::Trc10 { .. } | TokenKind::Trc20 { .. } => {
                    let native = match self.balances.native_balance(from).await {
                        Ok(native) => native,
                        Err(e) => {
                            legs.push(SummaryLeg::failed(from, e));
                            continue;
                        }
                    };
                    let left = native_after(native, fee.fee, surcharge);

                    if matches!(coin.kind, TokenKind::Trc20 { .. }) {
                        let check = self.fees.is_enough_energy(from, left).await;
                        if check.sufficient {
                            None
                        } else if support.is_none() {
                            legs.push(SummaryLeg::failed(
                                from,
                                TransferError::InsufficientFees(format!(
                                    "address {from} available energy {} is less than {}",
                                    check.remaining, check.minimum
                                )),
                            ));
                            continue;
                        } else {
                            tracing::debug!(address = %from, energy = check.remaining, "Supporting energy for address");
                            Some(from.to_string())
                        }
                    } else if left >= 0 {
                        None
                    } else if support.is_none() {
                        legs.push(SummaryLeg::failed(
                            from,
                            TransferError::InsufficientFees(format!(
                                "address {from} lacks {} SUN to pay fees",
                                left.unsigned_abs()
                            )),
                        ));
                        continue;
                    } else {
                        tracing::debug!(address = %summary_to, "Supporting summary address activation");
                        summary_exists = true;
                        Some(summary_to.clone())
                    }
                }
            };

            if let (Some(target), Some((fee_support, support_account))) = (support_target, &support) {
                let leg = self
                    .create_fee_support(fee_support, support_account, &target, &fee)
                    .await;
                legs.push(leg);
                continue;
            }

            let mut tx = TransferRequest::new(
                request.account.clone(),
                coin.clone(),
                &summary_to,
                &format_amount(sum, coin.decimals),
            )
            .with_fee_rate(&request.fee_rate);

            let leg = match self.finalize(&mut tx, address, &summary_to, sum, &envelope, &fee) {
                Ok(()) => SummaryLeg::built(from, LegKind::Summary, tx),
                Err(e) => SummaryLeg {
                    address: from.to_string(),
                    kind: LegKind::Summary,
                    raw_tx: Some(tx),
                    error: Some(e),
                },
            };
            legs.push(leg);
        }

        tracing::info!(
            account_id = %request.account.account_id,
            legs = legs.len(),
            failed = legs.iter().filter(|l| !l.is_ok()).count(),
            "Built summary batch"
        );
        Ok(legs)
    }

    /// Native amount, in SUN, the support account sends per starved address.
    ///
    /// Fixed amount if set and positive, otherwise scale x fee if that is
    /// positive, otherwise the fee itself. The fee is the configured minimum
    /// energy at the energy price plus the estimated bandwidth fee.
    fn support_amount(
        &self,
        fee_support: &FeeSupportAccount,
        fee: &FeeEstimate,
    ) -> Result<U256, TransferError> {
        let energy = U256::from(self.config.fee_mini.max(0).unsigned_abs())
            * U256::from(self.config.energy_price_sun);
        let support_fee = energy + fee.fee;

        if let Some(fixed) = non_empty(&fee_support.fix_support_amount) {
            let fixed = parse_amount(fixed, self.config.decimals)?;
            if !fixed.is_zero() {
                return Ok(fixed);
            }
        }
        if let Some(scale) = non_empty(&fee_support.fees_support_scale) {
            let scaled = scale_amount(support_fee, scale)?;
            if !scaled.is_zero() {
                return Ok(scaled);
            }
        }
        Ok(support_fee)
    }

    async fn create_fee_support(
        &self,
        fee_support: &FeeSupportAccount,
        support_account: &AccountRef,
        target: &str,
        fee: &FeeEstimate,
    ) -> SummaryLeg {
        let amount = match self.support_amount(fee_support, fee) {
            Ok(amount) => amount,
            Err(e) => {
                return SummaryLeg {
                    address: target.to_string(),
                    kind: LegKind::FeeSupport,
                    raw_tx: None,
                    error: Some(e),
                }
            }
        };
        let amount_text = format_amount(amount, self.config.decimals);

        tracing::info!(
            support_account = %support_account.account_id,
            address = %target,
            amount = %amount_text,
            "Creating fee support transfer"
        );

        let mut tx = TransferRequest::new(
            support_account.clone(),
            TokenDescriptor::native(),
            target,
            &amount_text,
        );
        match self.create_raw_transaction(&mut tx).await {
            Ok(()) => SummaryLeg::built(target, LegKind::FeeSupport, tx),
            Err(e) => {
                tracing::warn!(address = %target, error = %e, "Fee support transfer failed");
                SummaryLeg {
                    address: target.to_string(),
                    kind: LegKind::FeeSupport,
                    raw_tx: Some(tx),
                    error: Some(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::endpoints;
    use crate::config::TronConfig;
    use crate::test_support::{Harness, DEST, KEY_A, KEY_B, KEY_C};

    const USDT: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

    fn request(h: &Harness, coin: TokenDescriptor, min: &str, retained: &str) -> SummaryRequest {
        SummaryRequest {
            account: h.account.clone(),
            summary_address: DEST.to_string(),
            min_transfer: min.to_string(),
            retained_balance: retained.to_string(),
            address_start_index: 0,
            address_limit: None,
            coin,
            fee_rate: String::new(),
            fee_support: None,
        }
    }

    #[tokio::test]
    async fn native_summary_keeps_retained_balance() {
        let h = Harness::new(&[KEY_A, KEY_B, KEY_C]);
        h.node.set_native_balance(&h.addresses[0].address, 100_000_000);
        h.node.set_native_balance(&h.addresses[1].address, 5_000_000);
        // Above the minimum but not above the retained balance.
        h.node.set_native_balance(&h.addresses[2].address, 15_000_000);
        h.node.mark_existing(DEST);

        let legs = h
            .decoder()
            .create_summary_raw_transaction_with_error(&request(&h, TokenDescriptor::native(), "10", "20"))
            .await
            .unwrap();

        assert_eq!(legs.len(), 1);
        let leg = &legs[0];
        assert!(leg.is_ok());
        assert_eq!(leg.address, h.addresses[0].address);
        let tx = leg.raw_tx.as_ref().unwrap();
        assert_eq!(tx.to[DEST], "80");
        assert_eq!(tx.tx_from, vec![format!("{}:80", h.addresses[0].address)]);
    }

    #[tokio::test]
    async fn absent_summary_address_costs_activation() {
        let h = Harness::new(&[KEY_A]);
        h.node.set_native_balance(&h.addresses[0].address, 100_000_000);

        let txs = h
            .decoder()
            .create_summary_raw_transaction(&request(&h, TokenDescriptor::native(), "10", "20"))
            .await
            .unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].to[DEST], "79.9");
    }

    #[tokio::test]
    async fn request_validation_aborts() {
        let h = Harness::new(&[KEY_A]);
        let decoder = h.decoder();

        for (min, retained) in [("-1", "0"), ("1", "lots")] {
            let err = decoder
                .create_summary_raw_transaction_with_error(&request(&h, TokenDescriptor::native(), min, retained))
                .await
                .unwrap_err();
            assert!(matches!(err, TransferError::InvalidAmount(_)), "{min}/{retained}");
        }

        let mut with_support = request(&h, TokenDescriptor::native(), "1", "0");
        with_support.fee_support = Some(FeeSupportAccount {
            account_id: "missing".into(),
            ..Default::default()
        });
        let err = decoder
            .create_summary_raw_transaction_with_error(&with_support)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::AccountNotFound(_)));

        let mut empty_page = request(&h, TokenDescriptor::native(), "1", "0");
        empty_page.address_start_index = 5;
        let err = decoder
            .create_summary_raw_transaction_with_error(&empty_page)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::NoAddressInAccount(_)));
    }

    #[tokio::test]
    async fn failed_balance_lookup_only_fails_its_address() {
        let h = Harness::new(&[KEY_A, KEY_B]);
        for address in &h.addresses {
            h.node.set_token_balance(USDT, &address.address, U256::from(10_000_000u64));
        }
        h.node.mark_existing(DEST);
        // Both attempts for the first address fail.
        h.node.fail_next(endpoints::TRIGGER_CONSTANT_CONTRACT, 2);

        let legs = h
            .decoder()
            .create_summary_raw_transaction_with_error(&request(&h, TokenDescriptor::trc20("USDT", USDT, 6), "1", "0"))
            .await
            .unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].address, h.addresses[0].address);
        assert!(matches!(legs[0].error, Some(TransferError::Rpc(_))));
        assert!(legs[1].is_ok(), "{:?}", legs[1].error);
        assert_eq!(legs[1].address, h.addresses[1].address);
        assert_eq!(legs[1].raw_tx.as_ref().unwrap().to[DEST], "10");
    }

    #[tokio::test]
    async fn failed_fee_estimate_only_fails_its_address() {
        let h = Harness::new(&[KEY_A, KEY_B]);
        h.node.set_native_balance(&h.addresses[0].address, 100_000_000);
        h.node.set_native_balance(&h.addresses[1].address, 50_000_000);
        h.node.mark_existing(DEST);
        h.node.fail_next(endpoints::GET_ACCOUNT_NET, 1);

        let decoder = h.decoder();
        let req = request(&h, TokenDescriptor::native(), "1", "0");
        let legs = decoder.create_summary_raw_transaction_with_error(&req).await.unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].address, h.addresses[0].address);
        assert!(matches!(legs[0].error, Some(TransferError::Rpc(_))));
        assert!(legs[1].is_ok(), "{:?}", legs[1].error);
        assert_eq!(legs[1].raw_tx.as_ref().unwrap().to[DEST], "50");

        let txs = decoder.create_summary_raw_transaction(&req).await.unwrap();
        assert_eq!(txs.len(), 2);
    }

    #[tokio::test]
    async fn missing_reference_block_aborts() {
        let h = Harness::new(&[KEY_A]);
        h.node.set_native_balance(&h.addresses[0].address, 100_000_000);
        h.node.mark_existing(DEST);
        h.node.set_block_id("");

        let err = h
            .decoder()
            .create_summary_raw_transaction_with_error(&request(&h, TokenDescriptor::native(), "10", "0"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::ReferenceBlockUnavailable(_)));
    }

    #[tokio::test]
    async fn trc20_without_energy_or_support_fails_per_address() {
        let h = Harness::with_config(
            &[KEY_A],
            TronConfig {
                fee_mini: 10_000,
                ..TronConfig::default()
            },
        );
        let a = h.addresses[0].address.clone();
        h.node.set_native_balance(&a, 0);
        h.node.set_token_balance(USDT, &a, U256::from(100_000_000u64));
        h.node.mark_existing(DEST);

        let req = request(&h, TokenDescriptor::trc20("USDT", USDT, 6), "1", "0");
        let decoder = h.decoder();

        let legs = decoder.create_summary_raw_transaction_with_error(&req).await.unwrap();
        assert_eq!(legs.len(), 1);
        assert!(matches!(legs[0].error, Some(TransferError::InsufficientFees(_))));

        assert!(decoder.create_summary_raw_transaction(&req).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn trc20_energy_shortage_uses_fixed_support() {
        let h = Harness::with_config(
            &[KEY_A],
            TronConfig {
                fee_mini: 10_000,
                ..TronConfig::default()
            },
        );
        let a = h.addresses[0].address.clone();
        h.node.set_native_balance(&a, 0);
        h.node.set_token_balance(USDT, &a, U256::from(100_000_000u64));
        h.node.mark_existing(DEST);

        let fees_account = h.wallet.create_account("w1", "fees").unwrap();
        let payer = h.wallet.import_key("fees", &KEY_C).unwrap();
        h.node.set_native_balance(&payer.address, 50_000_000);

        let mut req = request(&h, TokenDescriptor::trc20("USDT", USDT, 6), "1", "0");
        req.fee_support = Some(FeeSupportAccount {
            account_id: fees_account.account_id.clone(),
            fix_support_amount: Some("1".into()),
            fees_support_scale: Some("3".into()),
        });

        let legs = h
            .decoder()
            .create_summary_raw_transaction_with_error(&req)
            .await
            .unwrap();

        assert_eq!(legs.len(), 1);
        let leg = &legs[0];
        assert!(leg.is_ok(), "{:?}", leg.error);
        assert_eq!(leg.kind, LegKind::FeeSupport);
        assert_eq!(leg.address, a);

        let tx = leg.raw_tx.as_ref().unwrap();
        assert_eq!(tx.to[&a], "1");
        assert_eq!(tx.account.as_ref().unwrap().account_id, "fees");
        assert!(tx.coin.as_ref().unwrap().is_native());
        assert_eq!(tx.tx_from, vec![format!("{}:1", payer.address)]);
    }

    #[tokio::test]
    async fn trc10_activation_is_supported_once() {
        let h = Harness::new(&[KEY_A, KEY_B]);
        let btt = TokenDescriptor::trc10("BTT", "1002000", 6);
        for address in &h.addresses {
            h.node.set_native_balance(&address.address, 0);
            h.node.set_asset_balance(&address.address, "1002000", 10_000_000);
        }

        h.wallet.create_account("w1", "fees").unwrap();
        let payer = h.wallet.import_key("fees", &KEY_C).unwrap();
        h.node.set_native_balance(&payer.address, 50_000_000);

        let mut req = request(&h, btt, "1", "0");
        req.fee_support = Some(FeeSupportAccount {
            account_id: "fees".into(),
            fix_support_amount: Some("0.5".into()),
            fees_support_scale: None,
        });

        let legs = h
            .decoder()
            .create_summary_raw_transaction_with_error(&req)
            .await
            .unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].kind, LegKind::FeeSupport);
        assert_eq!(legs[0].address, DEST);
        assert_eq!(legs[0].raw_tx.as_ref().unwrap().to[DEST], "0.5");

        assert_eq!(legs[1].kind, LegKind::Summary);
        assert!(legs[1].is_ok(), "{:?}", legs[1].error);
        assert_eq!(legs[1].raw_tx.as_ref().unwrap().to[DEST], "10");
    }

    #[test]
    fn support_amount_precedence() {
        let h = Harness::with_config(
            &[KEY_A],
            TronConfig {
                fee_mini: 1_000,
                energy_price_sun: 100,
                ..TronConfig::default()
            },
        );
        let decoder = h.decoder();
        let fee = FeeEstimate {
            gas_used: 0,
            gas_price: U256::from(140u64),
            fee: U256::from(50_000u64),
        };

        let fixed = FeeSupportAccount {
            account_id: "fees".into(),
            fix_support_amount: Some("2".into()),
            fees_support_scale: Some("3".into()),
        };
        assert_eq!(decoder.support_amount(&fixed, &fee).unwrap(), U256::from(2_000_000u64));

        let scaled = FeeSupportAccount {
            fix_support_amount: Some("0".into()),
            ..fixed.clone()
        };
        assert_eq!(decoder.support_amount(&scaled, &fee).unwrap(), U256::from(450_000u64));

        let plain = FeeSupportAccount {
            account_id: "fees".into(),
            ..Default::default()
        };
        assert_eq!(decoder.support_amount(&plain, &fee).unwrap(), U256::from(150_000u64));
    }
}
