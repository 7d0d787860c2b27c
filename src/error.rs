//! Error taxonomy for the EVP proxy.
//!
//! Validation and size errors are raised before any upstream request is
//! built. Only the primary destination's transport failure is ever returned
//! to the caller; secondary failures are logged by the forwarder and dropped.

use thiserror::Error;

/// Boxed error used at the transport and body seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The feature is switched off in configuration.
    #[error("EVPProxy is disabled: {0}")]
    Disabled(&'static str),

    #[error("no subdomain specified")]
    MissingSubdomain,

    #[error("invalid subdomain: {0}")]
    InvalidSubdomain(String),

    #[error("invalid target path: {0}")]
    InvalidPath(String),

    #[error("invalid query string: {0}")]
    InvalidQuery(String),

    /// The inbound body grew past `evp_proxy.max_payload_size`.
    #[error("read limit reached ({limit} bytes)")]
    PayloadTooLarge { limit: u64 },

    #[error("failed to read request body: {0}")]
    BodyRead(#[source] BoxError),

    /// The outbound request could not be assembled (bad host or key in config).
    #[error("invalid outbound request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Transport(#[source] BoxError),
}

impl ProxyError {
    /// True for errors caused by the inbound routing fields.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ProxyError::MissingSubdomain
                | ProxyError::InvalidSubdomain(_)
                | ProxyError::InvalidPath(_)
                | ProxyError::InvalidQuery(_)
        )
    }
}
