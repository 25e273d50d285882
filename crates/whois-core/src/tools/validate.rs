//! Input validation rules for the lookup tools.

use crate::lookup::LookupRequest;
use crate::{Result, WhoisError};
use regex::Regex;
use serde_json::{json, Value};
use std::net::IpAddr;
use std::sync::LazyLock;

static DOMAIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]+$").expect("domain regex must compile"));

static TLD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([xX][nN]--)?[a-zA-Z0-9-]+$").expect("tld regex must compile"));

static ASN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[aA][sS]([0-9]+)$").expect("asn regex must compile"));

/// Validation rule attached to a tool's single input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// 1..=253 characters from `[a-z0-9.-]`.
    Domain,
    /// 2..=63 characters of label syntax, optional `xn--` prefix.
    Tld,
    /// IPv4 or IPv6 literal.
    Ip,
    /// `AS<digits>`, converted to its number.
    Asn,
}

impl FieldRule {
    /// Validate and normalize a raw string value for `field`.
    pub fn validate(&self, field: &str, raw: &str) -> Result<LookupRequest> {
        match self {
            FieldRule::Domain => {
                check_length(field, raw, 1, 253)?;
                if !DOMAIN_PATTERN.is_match(raw) {
                    return Err(WhoisError::validation(field, "Invalid domain format"));
                }
                Ok(LookupRequest::Domain(raw.to_ascii_lowercase()))
            }
            FieldRule::Tld => {
                check_length(field, raw, 2, 63)?;
                if !TLD_PATTERN.is_match(raw) {
                    return Err(WhoisError::validation(field, "Invalid TLD format"));
                }
                Ok(LookupRequest::Tld(raw.to_ascii_lowercase()))
            }
            FieldRule::Ip => raw
                .parse::<IpAddr>()
                .map(LookupRequest::Ip)
                .map_err(|_| WhoisError::validation(field, "Invalid ip")),
            FieldRule::Asn => {
                let digits = ASN_PATTERN
                    .captures(raw)
                    .and_then(|c| c.get(1))
                    .ok_or_else(|| WhoisError::validation(field, "ASN must be in format AS12345"))?;
                digits
                    .as_str()
                    .parse::<u32>()
                    .map(LookupRequest::Asn)
                    .map_err(|_| WhoisError::validation(field, "ASN number out of range"))
            }
        }
    }

    /// JSON Schema fragment advertised in `tools/list`.
    pub fn json_schema(&self) -> Value {
        match self {
            FieldRule::Domain => json!({
                "type": "string",
                "minLength": 1,
                "maxLength": 253,
                "pattern": "^[a-zA-Z0-9.-]+$",
            }),
            FieldRule::Tld => json!({
                "type": "string",
                "minLength": 2,
                "maxLength": 63,
                "pattern": "^([xX][nN]--)?[a-zA-Z0-9-]+$",
            }),
            FieldRule::Ip => json!({
                "type": "string",
                "anyOf": [{"format": "ipv4"}, {"format": "ipv6"}],
            }),
            FieldRule::Asn => json!({
                "type": "string",
                "pattern": "^[aA][sS][0-9]+$",
            }),
        }
    }
}

fn check_length(field: &str, raw: &str, min: usize, max: usize) -> Result<()> {
    let len = raw.chars().count();
    if len < min {
        return Err(WhoisError::validation(
            field,
            format!("must contain at least {} character(s)", min),
        ));
    }
    if len > max {
        return Err(WhoisError::validation(
            field,
            format!("must contain at most {} character(s)", max),
        ));
    }
    Ok(())
}
