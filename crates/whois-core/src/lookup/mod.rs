//! WHOIS-style lookups.
//!
//! - [`WhoisProvider`]: the external data source boundary (one async call per resource kind)
//! - [`RdapProvider`]: default provider backed by RDAP JSON endpoints
//! - [`LookupInvoker`]: bounds every provider call by a timeout and translates errors

mod invoker;
mod provider;
mod rdap;

pub use invoker::LookupInvoker;
pub use provider::WhoisProvider;
pub use rdap::RdapProvider;

use std::fmt;
use std::net::IpAddr;

/// Resource kinds that can be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Domain,
    Tld,
    Ip,
    Asn,
}

impl LookupKind {
    /// Label used in result text, e.g. "Domain whois lookup for: ...".
    pub fn label(&self) -> &'static str {
        match self {
            LookupKind::Domain => "Domain",
            LookupKind::Tld => "TLD",
            LookupKind::Ip => "IP",
            LookupKind::Asn => "ASN",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated, normalized lookup input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupRequest {
    Domain(String),
    Tld(String),
    Ip(IpAddr),
    Asn(u32),
}

impl LookupRequest {
    pub fn kind(&self) -> LookupKind {
        match self {
            LookupRequest::Domain(_) => LookupKind::Domain,
            LookupRequest::Tld(_) => LookupKind::Tld,
            LookupRequest::Ip(_) => LookupKind::Ip,
            LookupRequest::Asn(_) => LookupKind::Asn,
        }
    }
}

impl fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupRequest::Domain(d) => write!(f, "{}", d),
            LookupRequest::Tld(t) => write!(f, "{}", t),
            LookupRequest::Ip(ip) => write!(f, "{}", ip),
            LookupRequest::Asn(n) => write!(f, "AS{}", n),
        }
    }
}
