//! Access guard: optional bearer token and origin allow-list checks.
//!
//! Evaluated before any session state is touched, for both stream
//! admission and command submission.

use crate::config::ServerSettings;
use crate::{Result, WhoisError};
use subtle::ConstantTimeEq;

/// Stateless request admission predicate.
#[derive(Debug, Clone, Default)]
pub struct AccessGuard {
    api_key: Option<String>,
    allowed_origins: Vec<String>,
}

impl AccessGuard {
    pub fn new(api_key: Option<String>, allowed_origins: Vec<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            allowed_origins,
        }
    }

    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::new(settings.api_key.clone(), settings.allowed_origins.clone())
    }

    pub fn requires_token(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// Check the raw `Authorization` and `Origin` header values.
    pub fn check(&self, authorization: Option<&str>, origin: Option<&str>) -> Result<()> {
        self.check_token(authorization)?;
        self.check_origin(origin)
    }

    fn check_token(&self, authorization: Option<&str>) -> Result<()> {
        let Some(expected) = &self.api_key else {
            return Ok(());
        };

        let presented = authorization
            .and_then(parse_bearer)
            .ok_or_else(|| WhoisError::Unauthorized {
                reason: "missing bearer token".to_string(),
            })?;

        if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            Err(WhoisError::Unauthorized {
                reason: "invalid bearer token".to_string(),
            })
        }
    }

    fn check_origin(&self, origin: Option<&str>) -> Result<()> {
        if self.allowed_origins.is_empty() {
            return Ok(());
        }
        // Non-browser clients send no Origin header.
        let Some(origin) = origin else {
            return Ok(());
        };
        let origin = origin.trim_end_matches('/');
        if self.allowed_origins.iter().any(|allowed| allowed == origin) {
            Ok(())
        } else {
            Err(WhoisError::OriginNotAllowed {
                origin: origin.to_string(),
            })
        }
    }
}

fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}
