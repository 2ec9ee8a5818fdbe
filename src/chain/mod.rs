mod client;

pub use client::{build_signer_client, wallet_from_key, SignerClient};

use ethers::types::{Address, TxHash, U256};
use thiserror::Error;
use url::Url;

/// Decimals of the native currency.
const NATIVE_DECIMALS: usize = 18;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("not a plain decimal: {0}")]
    Malformed(String),
    #[error("more than 18 fractional digits: {0}")]
    TooPrecise(String),
    #[error("amount must be greater than zero")]
    Zero,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address hex: {0}")]
    Hex(String),
    #[error("address must be 20 bytes, got {0}")]
    Length(usize),
}

/// Converts a decimal native-currency amount (e.g. `"0.001"`) to wei.
pub fn parse_native_amount(raw: &str) -> Result<U256, AmountError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(AmountError::Empty);
    }
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    let digits_only = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
        return Err(AmountError::Malformed(s.to_string()));
    }
    if frac.len() > NATIVE_DECIMALS {
        return Err(AmountError::TooPrecise(s.to_string()));
    }
    let parse = |p: &str| U256::from_dec_str(if p.is_empty() { "0" } else { p });
    let whole = parse(whole).map_err(|_| AmountError::Malformed(s.to_string()))?;
    let frac = parse(&format!("{:0<width$}", frac, width = NATIVE_DECIMALS))
        .map_err(|_| AmountError::Malformed(s.to_string()))?;
    let wei = whole
        .checked_mul(U256::exp10(NATIVE_DECIMALS))
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| AmountError::Malformed(s.to_string()))?;
    if wei.is_zero() {
        return Err(AmountError::Zero);
    }
    Ok(wei)
}

pub fn address_from_hex(s: &str) -> Result<Address, AddressError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| AddressError::Hex(e.to_string()))?;
    if bytes.len() != 20 {
        return Err(AddressError::Length(bytes.len()));
    }
    Ok(Address::from_slice(&bytes))
}

/// Full `0x`-prefixed hex. `Display` on ethers hashes abbreviates.
pub fn hex_string<T: std::fmt::Debug>(value: &T) -> String {
    format!("{:?}", value)
}

pub fn explorer_tx_url(explorer: &Url, tx_hash: &TxHash) -> String {
    format!("{}/tx/{}", explorer.as_str().trim_end_matches('/'), hex_string(tx_hash))
}
