//! Verified contract source lookup
//!
//! Sourcify first (no key needed), Etherscan v2 as fallback. Sourcify serves
//! the full verified file set; Etherscan returns a single flattened source.

use crate::error::{ExplorerError, Result};
use crate::validate;
use alloy::primitives::Address;
use serde::Deserialize;
use std::time::Duration;

/// One verified source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// Verified source with its origin
#[derive(Debug, Clone)]
pub struct ContractSource {
    pub origin: &'static str,
    pub files: Vec<SourceFile>,
}

#[derive(Deserialize)]
struct SourcifyFile {
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: String,
    content: String,
}

#[derive(Deserialize)]
struct EtherscanEnvelope {
    status: String,
    result: serde_json::Value,
}

#[derive(Deserialize)]
struct EtherscanSource {
    #[serde(rename = "SourceCode", default)]
    source_code: String,
    #[serde(rename = "ContractName", default)]
    contract_name: String,
}

/// Source lookup client over Sourcify and Etherscan
pub struct Explorer {
    http: reqwest::Client,
    sourcify_url: String,
    etherscan_url: String,
    api_key: Option<String>,
}

impl Explorer {
    pub fn new(
        sourcify_url: impl Into<String>,
        etherscan_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            sourcify_url: sourcify_url.into(),
            etherscan_url: etherscan_url.into(),
            api_key,
        }
    }

    /// Fetch verified source for a contract.
    ///
    /// Any Sourcify failure falls through to Etherscan; without an API key
    /// the fallback is skipped and the caller is told to configure one.
    pub async fn contract_source(
        &self,
        chain_id: u64,
        address: Address,
    ) -> Result<ContractSource> {
        validate::chain_id(chain_id)?;

        match self.from_sourcify(chain_id, address).await {
            Ok(files) if !files.is_empty() => {
                return Ok(ContractSource {
                    origin: "sourcify",
                    files,
                })
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("sourcify lookup failed for {}: {}", address, e),
        }

        let Some(api_key) = &self.api_key else {
            return Err(ExplorerError::MissingApiKey("etherscan".to_string()).into());
        };
        let files = self.from_etherscan(chain_id, address, api_key).await?;
        Ok(ContractSource {
            origin: "etherscan",
            files,
        })
    }

    async fn from_sourcify(&self, chain_id: u64, address: Address) -> Result<Vec<SourceFile>> {
        let url = format!(
            "{}/files/{}/{}",
            self.sourcify_url.trim_end_matches('/'),
            chain_id,
            address
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ExplorerError::Fetch(e.to_string()))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = response
            .error_for_status()
            .map_err(|e| ExplorerError::Fetch(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| ExplorerError::Fetch(e.to_string()))?;
        parse_sourcify_payload(&body)
    }

    async fn from_etherscan(
        &self,
        chain_id: u64,
        address: Address,
        api_key: &str,
    ) -> Result<Vec<SourceFile>> {
        let url = format!(
            "{}?chainid={}&module=contract&action=getsourcecode&address={}&apikey={}",
            self.etherscan_url, chain_id, address, api_key
        );
        let body = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ExplorerError::Fetch(e.to_string()))?
            .text()
            .await
            .map_err(|e| ExplorerError::Fetch(e.to_string()))?;
        parse_etherscan_payload(&body)
    }
}

fn parse_sourcify_payload(body: &str) -> Result<Vec<SourceFile>> {
    let files: Vec<SourcifyFile> = serde_json::from_str(body)
        .map_err(|e| ExplorerError::Fetch(format!("bad sourcify payload: {}", e)))?;
    Ok(files
        .into_iter()
        .map(|f| SourceFile {
            path: if f.path.is_empty() { f.name } else { f.path },
            content: f.content,
        })
        .collect())
}

fn parse_etherscan_payload(body: &str) -> Result<Vec<SourceFile>> {
    let envelope: EtherscanEnvelope = serde_json::from_str(body)
        .map_err(|e| ExplorerError::Fetch(format!("bad etherscan payload: {}", e)))?;
    if envelope.status != "1" {
        // status "0" with a string result carries the API's error message
        if let Some(message) = envelope.result.as_str() {
            return Err(ExplorerError::Fetch(message.to_string()).into());
        }
        return Err(ExplorerError::NotVerified.into());
    }

    let sources: Vec<EtherscanSource> = serde_json::from_value(envelope.result)
        .map_err(|e| ExplorerError::Fetch(format!("bad etherscan payload: {}", e)))?;
    let files: Vec<SourceFile> = sources
        .into_iter()
        .filter(|s| !s.source_code.is_empty())
        .map(|s| SourceFile {
            path: format!("{}.sol", s.contract_name),
            content: s.source_code,
        })
        .collect();
    if files.is_empty() {
        return Err(ExplorerError::NotVerified.into());
    }
    Ok(files)
}
