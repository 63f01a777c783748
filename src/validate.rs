//! Input validation and masking helpers
//!
//! Everything here runs before any network call. Endpoint URLs shown in
//! errors or logs go through [`mask_url`] so API keys embedded in paths or
//! query strings never leak.

use crate::error::{ConfigError, Result};
use alloy::primitives::Address;
use std::str::FromStr;
use url::Url;

/// Validate that a chain ID is a positive integer
pub fn chain_id(id: u64) -> Result<u64> {
    if id == 0 {
        return Err(ConfigError::InvalidChainId(id).into());
    }
    Ok(id)
}

/// Validate an RPC URL: http/https scheme, parseable, no template placeholder
pub fn rpc_url(raw: &str) -> Result<&str> {
    if raw.contains("${") {
        return Err(ConfigError::InvalidUrl(mask_url(raw)).into());
    }

    let parsed = Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(mask_url(raw)))?;
    match parsed.scheme() {
        "http" | "https" => {}
        _ => return Err(ConfigError::InvalidUrl(mask_url(raw)).into()),
    }
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(mask_url(raw)).into());
    }

    Ok(raw)
}

/// Parse and validate an Ethereum address
pub fn address(raw: &str) -> Result<Address> {
    Address::from_str(raw).map_err(|_| ConfigError::InvalidAddress(mask_address(raw)).into())
}

/// Mask an address for display in errors
pub fn mask_address(addr: &str) -> String {
    mask_middle(addr, 6, 4)
}

/// Mask a URL host for display, dropping query strings entirely
pub fn mask_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("");
            let host = if host.len() > 10 {
                format!("{}...{}", &host[..4], &host[host.len() - 4..])
            } else {
                host.to_string()
            };
            format!("{}://{}{}", parsed.scheme(), host, parsed.path())
        }
        Err(_) => "***".to_string(),
    }
}

/// Mask an API key for display: `test_key_123456789` -> `test...6789`
pub fn mask_key(key: &str) -> String {
    mask_middle(key, 4, 4)
}

/// Keep the first `head` and last `tail` characters. Counts characters,
/// not bytes, so multibyte input never lands mid-codepoint.
fn mask_middle(s: &str, head: usize, tail: usize) -> String {
    let count = s.chars().count();
    if count < 10 {
        return "***".to_string();
    }
    let head: String = s.chars().take(head).collect();
    let tail: String = s.chars().skip(count - tail).collect();
    format!("{}...{}", head, tail)
}
