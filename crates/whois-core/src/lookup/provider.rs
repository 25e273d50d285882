//! External lookup provider boundary.

use crate::Result;
use serde_json::Value;
use std::net::IpAddr;

/// A source of WHOIS-style registration data.
///
/// Results are provider-defined JSON and are passed through to clients
/// without interpretation. Implementations report failures as
/// [`WhoisError::Upstream`](crate::WhoisError::Upstream) or
/// [`WhoisError::Network`](crate::WhoisError::Network).
#[async_trait::async_trait]
pub trait WhoisProvider: Send + Sync + 'static {
    async fn lookup_domain(&self, domain: &str) -> Result<Value>;

    async fn lookup_tld(&self, tld: &str) -> Result<Value>;

    async fn lookup_ip(&self, ip: IpAddr) -> Result<Value>;

    async fn lookup_asn(&self, asn: u32) -> Result<Value>;
}
