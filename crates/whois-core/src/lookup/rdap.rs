//! RDAP-backed lookup provider.
//!
//! Registration data is fetched as JSON from an RDAP bootstrap service
//! (`rdap.org` redirects to the authoritative registry). TLD records come from
//! the IANA RDAP service. Response bodies are returned as-is.

use super::WhoisProvider;
use crate::config::LookupConfig;
use crate::{Result, WhoisError};
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::net::IpAddr;
use tracing::debug;

/// Lookup provider speaking RDAP over HTTPS.
pub struct RdapProvider {
    client: Client,
    base_url: String,
    tld_base_url: String,
}

impl RdapProvider {
    /// Create a provider against the public RDAP services.
    pub fn new() -> Result<Self> {
        Self::with_base_urls(LookupConfig::RDAP_BASE_URL, LookupConfig::RDAP_TLD_BASE_URL)
    }

    /// Create a provider against custom RDAP services.
    ///
    /// No request timeout is set on the client; the lookup invoker bounds
    /// every call.
    pub fn with_base_urls(base_url: &str, tld_base_url: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let tld_base_url = parse_base_url(tld_base_url)?;

        let client = Client::builder()
            .user_agent(LookupConfig::USER_AGENT)
            .build()
            .map_err(|e| WhoisError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            base_url,
            tld_base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, url: String) -> Result<Value> {
        debug!("RDAP GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/rdap+json, application/json")
            .send()
            .await
            .map_err(|e| WhoisError::Network {
                message: format!("GET {} failed: {}", url, e),
                source: Some(e),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WhoisError::Upstream {
                message: "No registration data found".to_string(),
                status: Some(status.as_u16()),
            });
        }
        if !status.is_success() {
            return Err(WhoisError::Upstream {
                message: format!("Registry responded with HTTP {}", status.as_u16()),
                status: Some(status.as_u16()),
            });
        }

        response.json::<Value>().await.map_err(|e| WhoisError::Upstream {
            message: format!("Registry returned an unreadable response: {}", e),
            status: Some(status.as_u16()),
        })
    }
}

#[async_trait::async_trait]
impl WhoisProvider for RdapProvider {
    async fn lookup_domain(&self, domain: &str) -> Result<Value> {
        self.fetch(format!("{}/domain/{}", self.base_url, domain)).await
    }

    async fn lookup_tld(&self, tld: &str) -> Result<Value> {
        self.fetch(format!("{}/domain/{}", self.tld_base_url, tld)).await
    }

    async fn lookup_ip(&self, ip: IpAddr) -> Result<Value> {
        self.fetch(format!("{}/ip/{}", self.base_url, ip)).await
    }

    async fn lookup_asn(&self, asn: u32) -> Result<Value> {
        self.fetch(format!("{}/autnum/{}", self.base_url, asn)).await
    }
}

fn parse_base_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw).map_err(|e| WhoisError::Config {
        message: format!("Invalid RDAP base URL '{}': {}", raw, e),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        other => Err(WhoisError::Config {
            message: format!("Unsupported RDAP URL scheme: {}", other),
        }),
    }
}
