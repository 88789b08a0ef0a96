// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TRC-20 contract value codec.
//!
//! Encodes `address` and `uint256` parameters into 32-byte ABI slots and
//! decodes constant-call results.

use alloy::primitives::U256;

use crate::error::TransferError;

/// Method id of `transfer(address,uint256)`.
pub const TRANSFER_METHOD_ID: &str = "a9059cbb";

/// Function selector used for balance queries.
pub const BALANCE_OF_SELECTOR: &str = "balanceOf(address)";

/// Hex characters in one ABI slot.
const SLOT_HEX_LEN: usize = 64;

/// Encode an address parameter into a 64-character slot.
///
/// Accepts `0x`-prefixed, `41`-prefixed or bare 40-character hex.
pub fn encode_address(address: &str) -> Result<String, TransferError> {
    let lower = address.trim().to_lowercase();
    let body = lower.strip_prefix("0x").unwrap_or(&lower);
    let body = if body.len() == 42 {
        body.strip_prefix("41").unwrap_or(body)
    } else {
        body
    };

    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TransferError::Encoding(format!(
            "invalid address parameter: {address}"
        )));
    }

    Ok(format!("{body:0>SLOT_HEX_LEN$}"))
}

/// Encode a `uint256` parameter into a 64-character slot.
pub fn encode_uint256(value: U256) -> String {
    let hex = format!("{value:x}");
    format!("{hex:0>SLOT_HEX_LEN$}")
}

/// Call data for `transfer(to, amount)`, method id included.
pub fn transfer_call_data(to: &str, amount: U256) -> Result<String, TransferError> {
    Ok(format!(
        "{TRANSFER_METHOD_ID}{}{}",
        encode_address(to)?,
        encode_uint256(amount)
    ))
}

/// Parameter string for `balanceOf(owner)`; the selector is sent separately.
pub fn balance_of_parameter(owner: &str) -> Result<String, TransferError> {
    encode_address(owner)
}

/// Decode a hex `uint256` return value.
pub fn decode_uint256(hex: &str) -> Result<U256, TransferError> {
    let body = hex.trim().trim_start_matches("0x");
    if body.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(body, 16)
        .map_err(|e| TransferError::Encoding(format!("invalid uint256 {hex}: {e}")))
}

/// Split `transfer` call data into the destination (hex, `41`-prefixed) and amount.
pub fn decode_transfer_call(data: &[u8]) -> Result<(String, U256), TransferError> {
    let hex = alloy::hex::encode(data);
    let params = hex.strip_prefix(TRANSFER_METHOD_ID).ok_or_else(|| {
        TransferError::Encoding("call data is not a transfer".to_string())
    })?;

    if params.len() != SLOT_HEX_LEN * 2 {
        return Err(TransferError::Encoding(format!(
            "transfer call data has {} parameter characters",
            params.len()
        )));
    }

    let (address_slot, amount_slot) = params.split_at(SLOT_HEX_LEN);
    let to = format!("41{}", &address_slot[SLOT_HEX_LEN - 40..]);
    Ok((to, decode_uint256(amount_slot)?))
}
