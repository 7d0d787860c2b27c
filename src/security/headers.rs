//! Outbound header construction.
//!
//! # Responsibilities
//! - Build the outbound header set from scratch (inbound headers are dropped)
//! - Add agent identity headers
//! - Point each per-destination copy at its host with its own API key
//!
//! # Design Decisions
//! - Never forward inbound headers, including any X-Forwarded-* chain
//! - Scheme, host and API key are the only per-destination differences

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, HOST, USER_AGENT, VIA};
use axum::http::uri::Scheme;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};

use crate::config::AgentConfig;
use crate::error::ProxyError;
use crate::routing::RoutingContext;
use crate::tags::{container_tags_header, ContainerTagger};
use crate::upstream::Endpoint;

pub const CONTAINER_TAGS_HEADER: HeaderName = HeaderName::from_static("x-datadog-container-tags");
pub const HOSTNAME_HEADER: HeaderName = HeaderName::from_static("x-datadog-hostname");
pub const DEFAULT_ENV_HEADER: HeaderName = HeaderName::from_static("x-datadog-agentdefaultenv");
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("dd-api-key");

/// Builds the trusted header set shared by every destination.
#[derive(Clone)]
pub struct HeaderRewriter {
    via: HeaderValue,
    hostname: HeaderValue,
    default_env: HeaderValue,
    tagger: Arc<dyn ContainerTagger>,
}

impl HeaderRewriter {
    pub fn new(agent: &AgentConfig, tagger: Arc<dyn ContainerTagger>) -> Self {
        Self {
            via: HeaderValue::from_static(concat!("evp-proxy ", env!("CARGO_PKG_VERSION"))),
            hostname: identity_value("agent.hostname", &agent.hostname),
            default_env: identity_value("agent.default_env", &agent.default_env),
            tagger,
        }
    }

    /// Rewrite the validated request into a destination-independent template.
    pub fn rewrite(&self, ctx: &RoutingContext, method: Method) -> OutboundRequest {
        let mut headers = HeaderMap::new();
        headers.insert(VIA, self.via.clone());
        if let Some(content_type) = &ctx.content_type {
            headers.insert(CONTENT_TYPE, content_type.clone());
        }
        // Always present so no client default gets substituted downstream.
        headers.insert(
            USER_AGENT,
            ctx.user_agent
                .clone()
                .unwrap_or_else(|| HeaderValue::from_static("")),
        );

        if let Some(container_id) = &ctx.container_id {
            if let Some(tags) = container_tags_header(self.tagger.as_ref(), container_id) {
                match HeaderValue::from_str(&tags) {
                    Ok(value) => {
                        headers.insert(CONTAINER_TAGS_HEADER, value);
                    }
                    Err(_) => {
                        tracing::debug!(container_id = %container_id, "Container tags are not a valid header value");
                    }
                }
            }
        }
        headers.insert(HOSTNAME_HEADER, self.hostname.clone());
        headers.insert(DEFAULT_ENV_HEADER, self.default_env.clone());

        OutboundRequest {
            method,
            subdomain: ctx.subdomain.clone(),
            path_and_query: ctx.path_and_query(),
            headers,
        }
    }
}

// Validation rejects these up front; an empty value keeps the header present.
fn identity_value(field: &'static str, value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| {
        tracing::warn!(field, "Identity value is not a valid header value, sending empty");
        HeaderValue::from_static("")
    })
}

/// A rewritten request, ready to be aimed at any destination.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    method: Method,
    subdomain: String,
    path_and_query: String,
    headers: HeaderMap,
}

impl OutboundRequest {
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    /// Build the request for one destination: `https://<subdomain>.<host>`
    /// plus the shared headers and the destination's API key.
    pub fn for_endpoint(&self, endpoint: &Endpoint, body: Body) -> Result<Request<Body>, ProxyError> {
        let host = endpoint.target_host(&self.subdomain);
        let uri = Uri::builder()
            .scheme(Scheme::HTTPS)
            .authority(host.as_str())
            .path_and_query(self.path_and_query.as_str())
            .build()?;

        let mut api_key = HeaderValue::from_str(&endpoint.api_key).map_err(axum::http::Error::from)?;
        api_key.set_sensitive(true);
        let host = HeaderValue::from_str(&host).map_err(axum::http::Error::from)?;

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .body(body)?;
        let headers = request.headers_mut();
        *headers = self.headers.clone();
        headers.insert(HOST, host);
        headers.insert(API_KEY_HEADER, api_key);
        Ok(request)
    }
}
