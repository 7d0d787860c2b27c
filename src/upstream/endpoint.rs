//! Upstream destination resolution.
//!
//! # Responsibilities
//! - Derive the ordered destination list from configuration
//! - Keep the primary destination distinct from best-effort secondaries
//!
//! # Design Decisions
//! - Resolved once at startup; immutable afterwards
//! - No validation here: config validation runs before resolution
//! - The list can never be empty: the primary is a field, not an element

use std::collections::HashSet;
use std::fmt;

use crate::config::ProxyConfig;

/// One upstream destination.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Base host; outbound requests go to `<subdomain>.<host>`.
    pub host: String,
    /// Sent as `DD-API-KEY`.
    pub api_key: String,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
        }
    }

    /// Host the request for `subdomain` is sent to.
    pub fn target_host(&self, subdomain: &str) -> String {
        format!("{}.{}", subdomain, self.host)
    }
}

// Keys end up in logs through error messages and `{:?}`; never print them.
impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Ordered destination list: the primary first, then every secondary.
#[derive(Debug, Clone)]
pub struct Endpoints {
    primary: Endpoint,
    secondary: Vec<Endpoint>,
}

impl Endpoints {
    pub fn new(primary: Endpoint, secondary: Vec<Endpoint>) -> Self {
        Self { primary, secondary }
    }

    /// Resolve destinations from configuration.
    ///
    /// The default destination uses `evp_proxy.dd_url` / `evp_proxy.api_key`
    /// when set (non-empty) and falls back to `agent.site` / `agent.api_key`.
    /// Each `(host, key)` pair of `additional_endpoints` follows, hosts in
    /// sorted order, keys in configured order with duplicates dropped.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let evp = &config.evp_proxy;

        let host = evp
            .dd_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(&config.agent.site);
        let api_key = evp
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .unwrap_or(&config.agent.api_key);
        let primary = Endpoint::new(host, api_key);

        let mut secondary = Vec::new();
        for (host, keys) in &evp.additional_endpoints {
            let mut seen = HashSet::new();
            for key in keys {
                if seen.insert(key.as_str()) {
                    secondary.push(Endpoint::new(host.as_str(), key.as_str()));
                }
            }
        }

        Self::new(primary, secondary)
    }

    /// The destination whose response is returned to the caller.
    pub fn primary(&self) -> &Endpoint {
        &self.primary
    }

    /// Destinations that receive a copy; their responses are discarded.
    pub fn secondary(&self) -> &[Endpoint] {
        &self.secondary
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        std::iter::once(&self.primary).chain(self.secondary.iter())
    }

    pub fn len(&self) -> usize {
        1 + self.secondary.len()
    }

    /// Always false; there is at least the primary.
    pub fn is_empty(&self) -> bool {
        false
    }
}
