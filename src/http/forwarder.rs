//! Multi-destination forwarding.
//!
//! # Responsibilities
//! - Validate the routing fields before anything touches the network
//! - Rewrite the request and send it to every destination, in order
//! - Return the primary destination's result; drain or log the rest
//! - Emit the per-request metric set exactly once
//!
//! # Design Decisions
//! - Sends are sequential: latency is the sum of all destinations, but an
//!   inbound request never holds more than one upstream connection
//! - No retries; a down secondary never affects the primary result
//! - Dropping the future (client gone, request timeout) aborts the send

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, HttpBody};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{Request, Response};
use http_body_util::BodyExt;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::body::ReplayableBody;
use crate::observability::metrics;
use crate::observability::{ProxyLog, StatsClient};
use crate::routing::RoutingContext;
use crate::security::headers::{HeaderRewriter, OutboundRequest};
use crate::security::{input, limits};
use crate::tags::ContainerTagger;
use crate::upstream::{Endpoint, Endpoints, Transport};

/// External capabilities the forwarder is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub stats: Arc<dyn StatsClient>,
    pub log: Arc<dyn ProxyLog>,
    pub tagger: Arc<dyn ContainerTagger>,
}

/// Sends each inbound request to every configured destination.
pub struct Forwarder {
    endpoints: Endpoints,
    rewriter: HeaderRewriter,
    transport: Arc<dyn Transport>,
    stats: Arc<dyn StatsClient>,
    log: Arc<dyn ProxyLog>,
    max_payload_size: u64,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig, collaborators: Collaborators) -> Self {
        let endpoints = Endpoints::from_config(config);
        tracing::info!(
            primary = %endpoints.primary().host,
            destinations = endpoints.len(),
            max_payload_size = config.evp_proxy.max_payload_size,
            "EVP proxy forwarder configured"
        );
        for endpoint in endpoints.iter() {
            tracing::debug!(host = %endpoint.host, "EVP proxy destination");
        }

        Self {
            endpoints,
            rewriter: HeaderRewriter::new(&config.agent, collaborators.tagger),
            transport: collaborators.transport,
            stats: collaborators.stats,
            log: collaborators.log,
            max_payload_size: config.evp_proxy.max_payload_size,
        }
    }

    /// Forward one inbound request (mount prefix already stripped).
    ///
    /// Metrics are emitted even when the returned future is dropped before
    /// completion (request timeout, client gone); that case counts as an error.
    pub async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let mut recorder = RequestRecorder::start(
            self.stats.as_ref(),
            self.log.as_ref(),
            content_length(&request),
        );

        let result = self.forward(request, &mut recorder.tags).await;
        recorder.finish(result.is_err());
        result
    }

    async fn forward(
        &self,
        request: Request<Body>,
        tags: &mut Vec<String>,
    ) -> Result<Response<Body>, ProxyError> {
        let (parts, body) = request.into_parts();
        let body = limits::limit_body(body, self.max_payload_size);
        let ctx = RoutingContext::from_parts(&parts);

        if let Some(content_type) = ctx.content_type_str() {
            tags.push(format!("content_type:{}", content_type));
        }

        input::check_subdomain(&ctx.subdomain)?;
        tags.push(format!("subdomain:{}", ctx.subdomain));
        input::check_path(&ctx.path)?;
        input::check_query(&ctx.raw_query)?;

        let outbound = self.rewriter.rewrite(&ctx, parts.method);
        let mut body =
            ReplayableBody::prepare(body, self.endpoints.len(), self.max_payload_size).await?;
        tracing::trace!(buffered = body.is_buffered(), "Request body prepared");

        let primary = self
            .send(&outbound, self.endpoints.primary(), body.take())
            .await;

        for endpoint in self.endpoints.secondary() {
            match self.send(&outbound, endpoint, body.take()).await {
                Ok(response) => drain(response).await,
                Err(e) => self.log.error(&format!(
                    "secondary endpoint {}: {}",
                    endpoint.target_host(outbound.subdomain()),
                    e
                )),
            }
        }

        primary
    }

    async fn send(
        &self,
        outbound: &OutboundRequest,
        endpoint: &Endpoint,
        body: Body,
    ) -> Result<Response<Body>, ProxyError> {
        let request = outbound.for_endpoint(endpoint, body)?;
        tracing::debug!(
            host = %endpoint.target_host(outbound.subdomain()),
            path = %request.uri().path(),
            "Forwarding EVP payload"
        );
        self.transport
            .send(request)
            .await
            .map_err(|e| limits::transport_error(e, self.max_payload_size))
    }
}

/// Emits the per-request metric set exactly once, when dropped.
struct RequestRecorder<'a> {
    stats: &'a dyn StatsClient,
    log: &'a dyn ProxyLog,
    tags: Vec<String>,
    request_bytes: i64,
    started: Instant,
    /// `Some(failed)` once `forward` returned; `None` means cancelled.
    outcome: Option<bool>,
}

impl<'a> RequestRecorder<'a> {
    fn start(stats: &'a dyn StatsClient, log: &'a dyn ProxyLog, request_bytes: i64) -> Self {
        Self {
            stats,
            log,
            tags: Vec::new(),
            request_bytes,
            started: Instant::now(),
            outcome: None,
        }
    }

    fn finish(&mut self, failed: bool) {
        self.outcome = Some(failed);
    }
}

impl Drop for RequestRecorder<'_> {
    fn drop(&mut self) {
        let failed = match self.outcome {
            Some(failed) => failed,
            None => {
                self.log.error(&format!(
                    "proxy error: request cancelled after {:?}",
                    self.started.elapsed()
                ));
                true
            }
        };
        metrics::record_request(
            self.stats,
            &self.tags,
            self.request_bytes,
            self.started.elapsed(),
            failed,
        );
    }
}

/// Read and drop a discarded response so its connection can be reused.
async fn drain(response: Response<Body>) {
    let mut body = response.into_body();
    while let Some(frame) = body.frame().await {
        if frame.is_err() {
            break;
        }
    }
}

/// Inbound content length, -1 when the client did not say.
fn content_length(request: &Request<Body>) -> i64 {
    request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .or_else(|| {
            HttpBody::size_hint(request.body())
                .exact()
                .and_then(|n| i64::try_from(n).ok())
        })
        .unwrap_or(-1)
}
