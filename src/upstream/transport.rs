//! Outbound transport.
//!
//! The forwarder only needs "send this request, get a response or an
//! error". Connection pooling, TLS and HTTP/2 belong to the implementation.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};

use crate::config::TimeoutConfig;
use crate::error::BoxError;

/// Sends one fully-built upstream request.
///
/// Implementations are shared by every in-flight request and must be safe
/// for concurrent use.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, BoxError>;
}

/// Pooled HTTPS transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            // Redirects would replay the API key to an arbitrary host.
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        let (parts, body) = request.into_parts();
        let body = reqwest::Body::wrap_stream(body.into_data_stream());
        let request = reqwest::Request::try_from(Request::from_parts(parts, body))?;

        let response = self.client.execute(request).await?;
        let response: Response<reqwest::Body> = response.into();
        Ok(response.map(Body::new))
    }
}
