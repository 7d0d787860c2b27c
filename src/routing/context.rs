//! Per-request routing fields.
//!
//! # Responsibilities
//! - Read the routing-relevant inbound fields exactly once
//! - Split the subdomain segment off the path
//!
//! # Design Decisions
//! - Nothing here is trusted; `security::input` validates before use
//! - Header values are kept as `HeaderValue` so they are copied byte for byte
//! - Path and query are kept raw (still percent-encoded)

use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};

/// Selects the subdomain explicitly; the path is then forwarded whole.
pub const SUBDOMAIN_HEADER: &str = "x-datadog-evp-subdomain";

/// Container the payload originates from.
pub const CONTAINER_ID_HEADER: &str = "datadog-container-id";

/// Routing fields extracted from one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingContext {
    pub subdomain: String,
    pub container_id: Option<String>,
    pub content_type: Option<HeaderValue>,
    pub user_agent: Option<HeaderValue>,
    pub path: String,
    pub raw_query: String,
}

impl RoutingContext {
    /// Extract routing fields from the request head.
    ///
    /// The request path has already had the mount prefix removed. When the
    /// subdomain header is set it wins and the path is kept as is;
    /// otherwise the first path segment is the subdomain and the remainder
    /// becomes the outbound path.
    pub fn from_parts(parts: &Parts) -> Self {
        let headers = &parts.headers;
        let path = parts.uri.path();

        let (subdomain, path) = match header_string(headers, SUBDOMAIN_HEADER) {
            Some(subdomain) => (subdomain, path.to_string()),
            None => split_subdomain(path),
        };

        Self {
            subdomain,
            container_id: header_string(headers, CONTAINER_ID_HEADER),
            content_type: non_empty(headers.get(CONTENT_TYPE)),
            user_agent: non_empty(headers.get(USER_AGENT)),
            path,
            raw_query: parts.uri.query().unwrap_or_default().to_string(),
        }
    }

    /// Content type as a string, for metric tags.
    pub fn content_type_str(&self) -> Option<String> {
        self.content_type
            .as_ref()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    }

    /// Outbound path plus query, as it goes on the wire.
    pub fn path_and_query(&self) -> String {
        if self.raw_query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.raw_query)
        }
    }
}

/// `/sub/a/b` → (`sub`, `/a/b`); `/sub` → (`sub`, `/`).
fn split_subdomain(path: &str) -> (String, String) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.split_once('/') {
        Some((subdomain, rest)) => (subdomain.to_string(), format!("/{}", rest)),
        None => (trimmed.to_string(), "/".to_string()),
    }
}

// Lossy on purpose: invalid bytes become U+FFFD and fail validation.
fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .filter(|v| !v.is_empty())
}

fn non_empty(value: Option<&HeaderValue>) -> Option<HeaderValue> {
    value.filter(|v| !v.is_empty()).cloned()
}
