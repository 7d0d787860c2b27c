//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every upstream host forms a valid URI authority
//! - Check that identity values can be sent as header values
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("evp_proxy is enabled but no API key is configured")]
    MissingApiKey,

    #[error("evp_proxy is enabled but no site is configured")]
    MissingSite,

    #[error("{field} host {host:?} is not a valid host")]
    InvalidHost { field: &'static str, host: String },

    #[error("evp_proxy.additional_endpoints.{0:?} has an empty API key")]
    EmptyAdditionalKey(String),

    #[error("{0} cannot be sent as a header value")]
    InvalidHeaderValue(&'static str),
}

/// Check a loaded configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if SocketAddr::from_str(&config.listener.bind_address).is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.observability.metrics_enabled
        && SocketAddr::from_str(&config.observability.metrics_address).is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if HeaderValue::from_str(&config.agent.hostname).is_err() {
        errors.push(ValidationError::InvalidHeaderValue("agent.hostname"));
    }
    if HeaderValue::from_str(&config.agent.default_env).is_err() {
        errors.push(ValidationError::InvalidHeaderValue("agent.default_env"));
    }

    if config.evp_proxy.enabled {
        validate_evp_proxy(config, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_evp_proxy(config: &ProxyConfig, errors: &mut Vec<ValidationError>) {
    let evp = &config.evp_proxy;

    match evp.dd_url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => check_host("evp_proxy.dd_url", url, errors),
        None if config.agent.site.is_empty() => errors.push(ValidationError::MissingSite),
        None => check_host("agent.site", &config.agent.site, errors),
    }

    let api_key = evp
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .unwrap_or(&config.agent.api_key);
    if api_key.is_empty() {
        errors.push(ValidationError::MissingApiKey);
    } else if HeaderValue::from_str(api_key).is_err() {
        errors.push(ValidationError::InvalidHeaderValue("evp_proxy.api_key"));
    }

    for (host, keys) in &evp.additional_endpoints {
        check_host("evp_proxy.additional_endpoints", host, errors);
        for key in keys {
            if key.is_empty() {
                errors.push(ValidationError::EmptyAdditionalKey(host.clone()));
            } else if HeaderValue::from_str(key).is_err() {
                errors.push(ValidationError::InvalidHeaderValue(
                    "evp_proxy.additional_endpoints",
                ));
            }
        }
    }
}

/// Upstream hosts are always prefixed with a subdomain, so check the
/// combined form.
fn check_host(field: &'static str, host: &str, errors: &mut Vec<ValidationError>) {
    let valid = !host.is_empty()
        && !host.contains(&['/', '@', '?', '#'][..])
        && Authority::from_str(&format!("subdomain.{host}")).is_ok();
    if !valid {
        errors.push(ValidationError::InvalidHost {
            field,
            host: host.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.agent.api_key = "test_api_key".into();
        config
    }

    #[test]
    fn test_default_with_key_is_valid() {
        assert_eq!(validate_config(&valid_config()), Ok(()));
    }

    #[test]
    fn test_missing_api_key() {
        let errors = validate_config(&ProxyConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingApiKey]);
    }

    #[test]
    fn test_override_key_satisfies_requirement() {
        let mut config = ProxyConfig::default();
        config.evp_proxy.api_key = Some("override".into());
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_disabled_proxy_skips_upstream_checks() {
        let mut config = ProxyConfig::default();
        config.evp_proxy.enabled = false;
        config.agent.site = String::new();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.request_secs = 0;
        config.agent.site = String::new();
        config
            .evp_proxy
            .additional_endpoints
            .insert("datadoghq.eu".into(), vec!["".into()]);
        config
            .evp_proxy
            .additional_endpoints
            .insert("bad host".into(), vec!["key".into()]);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::BindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::ZeroRequestTimeout));
        assert!(errors.contains(&ValidationError::MissingSite));
        assert!(errors.contains(&ValidationError::EmptyAdditionalKey("datadoghq.eu".into())));
        assert!(errors.contains(&ValidationError::InvalidHost {
            field: "evp_proxy.additional_endpoints",
            host: "bad host".into(),
        }));
    }

    #[test]
    fn test_host_with_port_is_accepted() {
        let mut config = valid_config();
        config.evp_proxy.dd_url = Some("intake.example.com:8443".into());
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_host_with_path_is_rejected() {
        let mut config = valid_config();
        config.evp_proxy.dd_url = Some("example.com/evil".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::InvalidHost { field: "evp_proxy.dd_url", .. }));
    }

    #[test]
    fn test_hostname_must_be_header_safe() {
        let mut config = valid_config();
        config.agent.hostname = "web\n1".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidHeaderValue("agent.hostname")]);
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = valid_config();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_err());

        config.observability.metrics_enabled = false;
        assert_eq!(validate_config(&config), Ok(()));
    }
}
