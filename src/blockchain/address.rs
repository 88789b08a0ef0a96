// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address decoding.
//!
//! Display-form encoding (base58check) lives outside this crate; the core
//! only needs an address in hex form and as raw 21 bytes.

use crate::error::TransferError;

/// Address length in raw bytes: one prefix byte + 20 hash bytes.
pub const ADDRESS_LEN: usize = 21;

/// A decoded address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    /// Lower-case hex, 42 characters
    pub hex: String,
    pub raw: Vec<u8>,
}

/// Turns a user-facing address into its hex and raw forms.
pub trait AddressCodec {
    fn decode_address(&self, text: &str, is_testnet: bool) -> Result<DecodedAddress, TransferError>;
}

/// Codec for addresses already in hex form.
///
/// Accepts `41` + 40 hex characters, or `0x` + 40 hex characters to which
/// the network prefix is added.
#[derive(Debug, Clone, Copy)]
pub struct HexAddressCodec {
    prefix: u8,
}

impl HexAddressCodec {
    pub fn new(prefix: u8) -> Self {
        Self { prefix }
    }
}

impl Default for HexAddressCodec {
    fn default() -> Self {
        Self::new(0x41)
    }
}

impl AddressCodec for HexAddressCodec {
    fn decode_address(&self, text: &str, _is_testnet: bool) -> Result<DecodedAddress, TransferError> {
        let trimmed = text.trim();
        let hex = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(body) if body.len() == 40 => format!("{:02x}{}", self.prefix, body),
            Some(_) => {
                return Err(TransferError::InvalidAddress(format!(
                    "{text}: expected 40 hex characters after 0x"
                )))
            }
            None => trimmed.to_string(),
        };

        let raw = alloy::hex::decode(&hex)
            .map_err(|e| TransferError::InvalidAddress(format!("{text}: {e}")))?;

        if raw.len() != ADDRESS_LEN {
            return Err(TransferError::InvalidAddress(format!(
                "{text}: expected {ADDRESS_LEN} bytes, got {}",
                raw.len()
            )));
        }
        if raw[0] != self.prefix {
            return Err(TransferError::InvalidAddress(format!(
                "{text}: unexpected prefix {:02x}",
                raw[0]
            )));
        }

        Ok(DecodedAddress {
            hex: hex.to_lowercase(),
            raw,
        })
    }
}
