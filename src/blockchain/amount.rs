// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decimal <-> base-unit amount conversion.
//!
//! Amounts travel as decimal strings (`"1.5"`) and are settled in base
//! units (SUN for TRX, `10^-decimals` for tokens). Conversion is an exact
//! exponent shift over [`U256`].

use alloy::primitives::U256;

use crate::error::TransferError;

/// Parse a human-readable amount into base units.
///
/// More fractional digits than `decimals` is an error, never rounded.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, TransferError> {
    let amount = amount.trim();
    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(TransferError::InvalidAmount(format!("empty amount: {amount:?}")));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(TransferError::InvalidAmount(format!("not a decimal number: {amount}")));
    }
    if fraction.len() > decimals as usize {
        return Err(TransferError::InvalidAmount(format!(
            "{amount} has more than {decimals} decimal places"
        )));
    }

    // Pad with zeros to match decimals
    let digits = format!("{whole}{fraction:0<width$}", width = decimals as usize);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10)
        .map_err(|_| TransferError::InvalidAmount(format!("amount overflow: {amount}")))
}

/// Format base units as a human-readable amount, trailing zeros trimmed.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

/// Format a signed base-unit amount.
pub fn format_signed_amount(amount: i128, decimals: u8) -> String {
    let magnitude = format_amount(U256::from(amount.unsigned_abs()), decimals);
    if amount < 0 {
        format!("-{magnitude}")
    } else {
        magnitude
    }
}

/// Multiply base units by a decimal factor, rounding down.
///
/// `scale_amount(1000, "1.5")` is `1500`.
pub fn scale_amount(amount: U256, scale: &str) -> Result<U256, TransferError> {
    let fraction_len = scale.trim().split_once('.').map(|(_, f)| f.len()).unwrap_or(0);
    let decimals = u8::try_from(fraction_len)
        .map_err(|_| TransferError::InvalidAmount(format!("scale too precise: {scale}")))?;

    let factor = parse_amount(scale, decimals)?;
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    amount
        .checked_mul(factor)
        .map(|product| product / divisor)
        .ok_or_else(|| TransferError::InvalidAmount(format!("scaled amount overflow: {scale}")))
}

/// Base units as a protobuf `int64` amount.
pub fn to_i64(amount: U256) -> Result<i64, TransferError> {
    i64::try_from(amount)
        .map_err(|_| TransferError::Encoding(format!("amount {amount} exceeds int64")))
}
