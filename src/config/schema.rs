//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default upper bound for an inbound EVP payload (5 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u64 = 5 * 1024 * 1024;

/// Root configuration for the EVP proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Identity of the agent this proxy runs in.
    pub agent: AgentConfig,

    /// EVP forwarding settings.
    pub evp_proxy: EvpProxyConfig,

    /// Static container ID -> tags table used for the container tags header.
    pub container_tags: BTreeMap<String, Vec<String>>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8126").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8126".to_string(),
        }
    }
}

/// Agent identity, shared by every outbound request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Sent as `X-Datadog-Hostname`.
    pub hostname: String,

    /// Sent as `X-Datadog-AgentDefaultEnv`.
    pub default_env: String,

    /// Intake site; the default upstream host.
    pub site: String,

    /// Baseline API key for the default upstream.
    pub api_key: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            default_env: "none".to_string(),
            site: "datadoghq.com".to_string(),
            api_key: String::new(),
        }
    }
}

/// EVP proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvpProxyConfig {
    /// When false every request is rejected with 405.
    pub enabled: bool,

    /// Replaces `agent.site` as the default upstream host.
    pub dd_url: Option<String>,

    /// Replaces `agent.api_key` for the default upstream.
    pub api_key: Option<String>,

    /// Maximum inbound body size in bytes. 0 disables the limit.
    pub max_payload_size: u64,

    /// Extra destinations: host -> API keys. Each pair receives a copy.
    pub additional_endpoints: BTreeMap<String, Vec<String>>,
}

impl Default for EvpProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dd_url: None,
            api_key: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            additional_endpoints: BTreeMap::new(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for the whole fan-out) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
