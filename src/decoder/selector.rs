// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Greedy funding-address selection.

use std::sync::Arc;

use alloy::primitives::U256;

use crate::blockchain::amount::format_amount;
use crate::blockchain::balance::BalanceResolver;
use crate::blockchain::client::NodeRpc;
use crate::blockchain::envelope::{BuiltEnvelope, EnvelopeBuilder};
use crate::blockchain::resources::FeeEstimator;
use crate::config::TronConfig;
use crate::error::TransferError;
use crate::models::{AccountAddress, AccountRef, CandidateBalance, FeeEstimate, TokenDescriptor, TokenKind};
use crate::wallet::WalletStore;

/// The address chosen to fund a transfer, with its envelope and fee.
#[derive(Debug, Clone)]
pub struct FundingSelection {
    pub address: AccountAddress,
    pub balance: CandidateBalance,
    pub envelope: BuiltEnvelope,
    pub fee: FeeEstimate,
}

/// Native coin left after paying for a transfer, in SUN. May be negative.
pub(crate) fn native_after(native_balance: U256, fee: U256, surcharge: u64) -> i128 {
    let to_i128 = |v: U256| i128::try_from(v).unwrap_or(i128::MAX);
    to_i128(native_balance)
        .saturating_sub(to_i128(fee))
        .saturating_sub(i128::from(surcharge))
}

/// Picks the first address of an account able to pay for a transfer.
pub struct FundingSelector<N> {
    envelopes: EnvelopeBuilder<N>,
    fees: FeeEstimator<N>,
    balances: BalanceResolver<N>,
    wallet: Arc<dyn WalletStore>,
    config: Arc<TronConfig>,
}

impl<N> Clone for FundingSelector<N> {
    fn clone(&self) -> Self {
        Self {
            envelopes: self.envelopes.clone(),
            fees: self.fees.clone(),
            balances: self.balances.clone(),
            wallet: Arc::clone(&self.wallet),
            config: Arc::clone(&self.config),
        }
    }
}

impl<N: NodeRpc> FundingSelector<N> {
    pub fn new(
        envelopes: EnvelopeBuilder<N>,
        fees: FeeEstimator<N>,
        balances: BalanceResolver<N>,
        wallet: Arc<dyn WalletStore>,
        config: Arc<TronConfig>,
    ) -> Self {
        Self {
            envelopes,
            fees,
            balances,
            wallet,
            config,
        }
    }

    /// Surcharge owed when `to` does not exist yet.
    pub async fn creation_surcharge(&self, to: &str) -> Result<u64, TransferError> {
        if self.balances.account_exists(to).await? {
            Ok(0)
        } else {
            Ok(self.config.create_account_cost_sun)
        }
    }

    /// Select a funding address of `account` for sending `amount` base units of `token` to `to`.
    ///
    /// Candidates are tried from the smallest balance upwards.
    pub async fn select(
        &self,
        account: &AccountRef,
        to: &str,
        amount: U256,
        token: &TokenDescriptor,
    ) -> Result<FundingSelection, TransferError> {
        let addresses = self.wallet.address_list(&account.account_id, 0, None)?;
        if addresses.is_empty() {
            return Err(TransferError::NoAddressInAccount(account.account_id.clone()));
        }

        let page: Vec<(String, u64)> = addresses
            .iter()
            .map(|a| (a.address.clone(), a.index))
            .collect();
        let mut candidates = self.balances.balances(&page, token).await?;
        // Smallest balances first.
        candidates.sort_by(|a, b| a.token_balance.cmp(&b.token_balance));

        let surcharge = self.creation_surcharge(to).await?;
        let mut token_short = false;
        let mut fee_shortfall: Option<String> = None;

        for candidate in candidates {
            if candidate.token_balance < amount {
                tracing::debug!(
                    address = %candidate.address,
                    balance = %candidate.token_balance,
                    "Candidate balance below amount"
                );
                token_short = true;
                continue;
            }

            let envelope = self
                .envelopes
                .build_transfer_base(&candidate.address, to, amount, token)
                .await?;

            let fee = match self
                .fees
                .estimate_fee(&candidate.address, envelope.payload_len())
                .await
            {
                Ok(fee) => fee,
                Err(e) => {
                    tracing::warn!(address = %candidate.address, error = %e, "Fee estimation failed, skipping candidate");
                    continue;
                }
            };

            let accepted = match &token.kind {
                TokenKind::Native => {
                    let needed = amount + fee.fee + U256::from(surcharge);
                    let ok = candidate.native_balance >= needed;
                    if !ok {
                        fee_shortfall = Some(format!(
                            "{} holds {} TRX, needs {} TRX",
                            candidate.address,
                            format_amount(candidate.native_balance, self.config.decimals),
                            format_amount(needed, self.config.decimals)
                        ));
                    }
                    ok
                }
                TokenKind::Trc10 { .. } => {
                    let left = native_after(candidate.native_balance, fee.fee, surcharge);
                    if left < 0 {
                        fee_shortfall = Some(format!(
                            "{} lacks {} SUN to pay fees",
                            candidate.address,
                            left.unsigned_abs()
                        ));
                    }
                    left >= 0
                }
                TokenKind::Trc20 { .. } => {
                    let left = native_after(candidate.native_balance, fee.fee, surcharge);
                    let check = self.fees.is_enough_energy(&candidate.address, left).await;
                    if !check.sufficient {
                        fee_shortfall = Some(format!(
                            "{} available energy {} is less than {}",
                            candidate.address, check.remaining, check.minimum
                        ));
                    }
                    check.sufficient
                }
            };

            if !accepted {
                tracing::debug!(address = %candidate.address, "Candidate cannot pay fees");
                continue;
            }

            let address = addresses
                .iter()
                .find(|a| a.address == candidate.address)
                .cloned()
                .ok_or_else(|| TransferError::Wallet(format!("{} vanished from account", candidate.address)))?;

            tracing::info!(
                address = %candidate.address,
                fee = %fee.fee,
                "Selected funding address"
            );

            return Ok(FundingSelection {
                address,
                balance: candidate,
                envelope,
                fee,
            });
        }

        let wanted = format!("{} {}", format_amount(amount, token.decimals), token.display_symbol());
        Err(match &token.kind {
            TokenKind::Native => {
                let mut message = format!("no address of {} can send {wanted}", account.account_id);
                if surcharge > 0 {
                    message.push_str(&format!(
                        " plus {} TRX to create the destination account",
                        format_amount(U256::from(surcharge), self.config.decimals)
                    ));
                }
                TransferError::InsufficientBalance(message)
            }
            TokenKind::Trc10 { .. } | TokenKind::Trc20 { .. } if token_short => {
                TransferError::InsufficientTokenBalance(format!(
                    "no address of {} holds {wanted}",
                    account.account_id
                ))
            }
            TokenKind::Trc10 { .. } | TokenKind::Trc20 { .. } => TransferError::InsufficientFees(
                fee_shortfall.unwrap_or_else(|| format!("no address of {} can pay fees", account.account_id)),
            ),
        })
    }
}
