//! Bounded-time wrapper around the lookup provider.

use super::{LookupRequest, WhoisProvider};
use crate::config::LookupConfig;
use crate::{Result, WhoisError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Invokes provider lookups under a timeout.
///
/// When the timer wins, the provider future is dropped and its eventual
/// result is never observed.
#[derive(Clone)]
pub struct LookupInvoker {
    provider: Arc<dyn WhoisProvider>,
    timeout: Duration,
}

impl LookupInvoker {
    /// Create an invoker with the default 15 second timeout.
    pub fn new(provider: Arc<dyn WhoisProvider>) -> Self {
        Self::with_timeout(provider, LookupConfig::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(provider: Arc<dyn WhoisProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one lookup, failing with [`WhoisError::Timeout`] on expiry.
    pub async fn invoke(&self, request: &LookupRequest) -> Result<Value> {
        debug!("{} lookup for {}", request.kind(), request);

        let call = async {
            match request {
                LookupRequest::Domain(domain) => self.provider.lookup_domain(domain).await,
                LookupRequest::Tld(tld) => self.provider.lookup_tld(tld).await,
                LookupRequest::Ip(ip) => self.provider.lookup_ip(*ip).await,
                LookupRequest::Asn(asn) => self.provider.lookup_asn(*asn).await,
            }
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(translate(e)),
            Err(_) => {
                warn!(
                    "{} lookup for {} timed out after {:?}",
                    request.kind(),
                    request,
                    self.timeout
                );
                Err(WhoisError::Timeout(self.timeout))
            }
        }
    }
}

/// Map provider failures onto the operation error taxonomy.
fn translate(err: WhoisError) -> WhoisError {
    match err {
        e @ (WhoisError::Upstream { .. } | WhoisError::Timeout(_) | WhoisError::Validation { .. }) => e,
        WhoisError::Network { message, .. } => WhoisError::upstream(message),
        other => WhoisError::upstream(other.to_string()),
    }
}
