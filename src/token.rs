//! ERC-20 token reads
//!
//! Standard metadata and balance reads done as raw `eth_call`s with
//! hand-assembled calldata. Non-standard tokens (bytes32 names, missing
//! decimals) degrade to `None` instead of failing the whole query.

use alloy::primitives::{Address, U256};
use alloy::providers::{Provider, ProviderBuilder};
use serde_json::json;
use std::time::Duration;

use crate::error::{Error, Result, RpcError};

// Function selectors for the standard ERC-20 read surface
const SEL_NAME: &str = "0x06fdde03";
const SEL_SYMBOL: &str = "0x95d89b41";
const SEL_DECIMALS: &str = "0x313ce567";
const SEL_TOTAL_SUPPLY: &str = "0x18160ddd";
const SEL_BALANCE_OF: &str = "0x70a08231";

/// ERC-20 metadata; fields a token doesn't implement come back `None`
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub address: Address,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<U256>,
}

/// Raw and human-readable balance of one holder
#[derive(Debug, Clone)]
pub struct TokenBalance {
    pub raw: U256,
    pub formatted: String,
    pub symbol: Option<String>,
    pub decimals: u8,
}

/// Token reader bound to one RPC endpoint
pub struct TokenClient {
    url: String,
    timeout: Duration,
}

impl TokenClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    /// Read name, symbol, decimals, and total supply
    pub async fn info(&self, token: Address) -> Result<TokenInfo> {
        let name = self
            .eth_call(token, SEL_NAME)
            .await
            .ok()
            .and_then(|data| decode_string_from_hex(&data));
        let symbol = self
            .eth_call(token, SEL_SYMBOL)
            .await
            .ok()
            .and_then(|data| decode_string_from_hex(&data));
        let decimals = self
            .eth_call(token, SEL_DECIMALS)
            .await
            .ok()
            .and_then(|data| decode_uint8_from_hex(&data));
        let total_supply = self
            .eth_call(token, SEL_TOTAL_SUPPLY)
            .await
            .ok()
            .and_then(|data| decode_uint256_from_hex(&data));

        if name.is_none() && symbol.is_none() && decimals.is_none() && total_supply.is_none() {
            return Err(Error::Other(format!(
                "{} does not answer any ERC-20 read",
                token
            )));
        }

        Ok(TokenInfo {
            address: token,
            name,
            symbol,
            decimals,
            total_supply,
        })
    }

    /// Read `balanceOf(holder)`, formatted with the token's own decimals
    pub async fn balance_of(&self, token: Address, holder: Address) -> Result<TokenBalance> {
        let data = self.eth_call(token, &balance_call_data(holder)).await?;
        let raw = decode_uint256_from_hex(&data)
            .ok_or_else(|| Error::Other("balanceOf returned no value".to_string()))?;

        let decimals = self
            .eth_call(token, SEL_DECIMALS)
            .await
            .ok()
            .and_then(|d| decode_uint8_from_hex(&d))
            .unwrap_or(18);
        let symbol = self
            .eth_call(token, SEL_SYMBOL)
            .await
            .ok()
            .and_then(|d| decode_string_from_hex(&d));

        Ok(TokenBalance {
            raw,
            formatted: format_units(raw, decimals),
            symbol,
            decimals,
        })
    }

    async fn eth_call(&self, to: Address, data: &str) -> Result<String> {
        let parsed = self
            .url
            .parse()
            .map_err(|_| RpcError::EndpointUnreachable {
                url: crate::validate::mask_url(&self.url),
                reason: "not connected".to_string(),
            })?;
        let provider = ProviderBuilder::new().on_http(parsed);

        let params = (json!({ "to": to, "data": data }), "latest");
        let call = provider.raw_request::<_, String>("eth_call".into(), params);
        let result = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| Error::Other("eth_call timed out".to_string()))?
            .map_err(|e| Error::Other(format!("eth_call failed: {}", e)))?;

        if result == "0x" || result.len() < 3 {
            return Err(Error::Other("empty eth_call result".to_string()));
        }
        Ok(result)
    }
}

/// Calldata for `balanceOf(address)`: selector plus the left-padded holder
fn balance_call_data(holder: Address) -> String {
    format!(
        "{}000000000000000000000000{}",
        SEL_BALANCE_OF,
        hex::encode(holder.as_slice())
    )
}

/// Render a fixed-point integer with the given number of decimals
pub fn format_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let divisor = U256::from(10).pow(U256::from(decimals));
    let integer = value / divisor;
    let fraction = value % divisor;
    let fraction = format!("{:0>width$}", fraction, width = decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{}.{}", integer, fraction)
    }
}

/// Decode an ABI-encoded string; short payloads fall back to bytes32
fn decode_string_from_hex(hex: &str) -> Option<String> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if hex.len() < 128 {
        return decode_bytes32_string(hex);
    }

    let bytes = hex::decode(hex).ok()?;
    if bytes.len() < 64 {
        return None;
    }

    let length = u64::from_be_bytes(bytes[56..64].try_into().ok()?) as usize;
    let end = 64usize.checked_add(length)?;
    if bytes.len() < end {
        return None;
    }

    String::from_utf8(bytes[64..end].to_vec())
        .ok()
        .map(|s| s.trim_end_matches('\0').to_string())
        .filter(|s| !s.is_empty())
}

/// Pre-standard tokens (MKR and friends) return bytes32 names
fn decode_bytes32_string(hex: &str) -> Option<String> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if hex.len() != 64 {
        return None;
    }

    let bytes = hex::decode(hex).ok()?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(32);
    String::from_utf8(bytes[..end].to_vec())
        .ok()
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_graphic() || c == ' '))
}

fn decode_uint8_from_hex(hex: &str) -> Option<u8> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if hex.is_empty() {
        return None;
    }

    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some(0);
    }

    let value = u64::from_str_radix(trimmed, 16).ok()?;
    if value > 255 {
        return None;
    }
    Some(value as u8)
}

fn decode_uint256_from_hex(hex: &str) -> Option<U256> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    if hex.is_empty() {
        return None;
    }
    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(trimmed, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decode_string() {
        // "USDC" as a dynamic ABI string
        let hex = "0x0000000000000000000000000000000000000000000000000000000000000020000000000000000000000000000000000000000000000000000000000000000455534443000000000000000000000000000000000000000000000000000000";
        assert_eq!(decode_string_from_hex(hex), Some("USDC".to_string()));
    }

    #[test]
    fn test_decode_bytes32_string() {
        // "MKR" padded to bytes32
        let hex = "4d4b520000000000000000000000000000000000000000000000000000000000";
        assert_eq!(decode_bytes32_string(hex), Some("MKR".to_string()));
    }

    #[test]
    fn test_decode_uint8() {
        assert_eq!(decode_uint8_from_hex("0x06"), Some(6));
        assert_eq!(decode_uint8_from_hex("0x12"), Some(18));
        assert_eq!(decode_uint8_from_hex("0x00"), Some(0));
        assert_eq!(decode_uint8_from_hex("0x100"), None);
    }

    #[test]
    fn test_decode_uint256() {
        assert_eq!(decode_uint256_from_hex("0x00"), Some(U256::ZERO));
        assert_eq!(
            decode_uint256_from_hex("0x0de0b6b3a7640000"),
            Some(U256::from(1_000_000_000_000_000_000u64))
        );
    }

    #[test]
    fn test_balance_call_data() {
        let holder =
            Address::from_str("0x742d35Cc6634C0532925a3b844Bc454e4438f44e").unwrap();
        let data = balance_call_data(holder);
        assert!(data.starts_with("0x70a08231"));
        assert!(data.ends_with("742d35cc6634c0532925a3b844bc454e4438f44e"));
        // 4-byte selector plus one 32-byte word
        assert_eq!(data.len(), 2 + 8 + 64);
    }

    #[test]
    fn test_format_units() {
        assert_eq!(
            format_units(U256::from(1_500_000_000_000_000_000u64), 18),
            "1.5"
        );
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1");
        assert_eq!(format_units(U256::from(123u64), 6), "0.000123");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
        assert_eq!(format_units(U256::ZERO, 18), "0");
    }
}
