//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router mounting the proxy under `/evp_proxy/v1`
//! - Wire up middleware (tracing, request timeout)
//! - Build the forwarder from configuration and its collaborators
//! - Bind server to listener and shut down gracefully
//!
//! # Design Decisions
//! - When the proxy is disabled the mount point still exists and answers 405
//! - A request that outlives `timeouts.request_secs` gets 504; the forwarder
//!   still records it as a failed request
//! - Every collaborator is injected through `Collaborators`, so tests can run
//!   the full router against a recording transport

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::forwarder::{Collaborators, Forwarder};
use crate::http::response::into_client_response;
use crate::observability::{MetricsStatsClient, ProxyLog, ThrottledLog};
use crate::tags::StaticTagger;
use crate::upstream::ReqwestTransport;

/// Mount point of the proxy on the local listener.
pub const EVP_PROXY_PREFIX: &str = "/evp_proxy/v1";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub log: Arc<dyn ProxyLog>,
}

/// HTTP server for the EVP proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server with the production collaborators: pooled HTTPS
    /// transport, throttled error log, global metrics recorder and the
    /// configured container tags.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let collaborators = Collaborators {
            transport: Arc::new(ReqwestTransport::new(&config.timeouts)?),
            stats: Arc::new(MetricsStatsClient),
            log: Arc::new(ThrottledLog::for_evp_proxy()),
            tagger: Arc::new(StaticTagger::new(&config.container_tags)),
        };
        Ok(Self::with_collaborators(config, collaborators))
    }

    pub fn with_collaborators(config: ProxyConfig, collaborators: Collaborators) -> Self {
        let router = build_router(&config, collaborators);
        Self { router, config }
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            enabled = self.config.evp_proxy.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
///
/// The mount point is matched with and without a trailing slash so an empty
/// remainder still reaches the handler (and fails as a missing subdomain).
fn build_router(config: &ProxyConfig, collaborators: Collaborators) -> Router {
    let mounts = [
        EVP_PROXY_PREFIX.to_string(),
        format!("{}/", EVP_PROXY_PREFIX),
        format!("{}/{{*path}}", EVP_PROXY_PREFIX),
    ];

    let router = if config.evp_proxy.enabled {
        let state = AppState {
            log: collaborators.log.clone(),
            forwarder: Arc::new(Forwarder::new(config, collaborators)),
        };
        mounts
            .iter()
            .fold(Router::new(), |router, path| {
                router.route(path, any(proxy_handler))
            })
            .with_state(state)
    } else {
        tracing::info!("EVP proxy disabled in config");
        mounts.iter().fold(Router::new(), |router, path| {
            router.route(path, any(disabled_handler))
        })
    };

    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            Duration::from_secs(config.timeouts.request_secs),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Remove the mount prefix, keeping the query. An empty remainder becomes `/`.
fn strip_mount(request: Request<Body>) -> Request<Body> {
    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path();
    let rest = match path.strip_prefix(EVP_PROXY_PREFIX) {
        Some("") => "/",
        Some(rest) => rest,
        None => path,
    };
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{}?{}", rest, query),
        None => rest.to_string(),
    };

    match Uri::try_from(path_and_query) {
        Ok(uri) => parts.uri = uri,
        Err(e) => tracing::debug!(error = %e, "Could not strip mount prefix"),
    }
    Request::from_parts(parts, body)
}

async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match state.forwarder.round_trip(strip_mount(request)).await {
        Ok(response) => into_client_response(response).into_response(),
        Err(err) => {
            if err.is_validation() {
                tracing::debug!(error = %err, "Rejected malformed EVP request");
            }
            state.log.error(&format!("proxy error: {}", err));
            err.into_response()
        }
    }
}

async fn disabled_handler() -> Response {
    ProxyError::Disabled("Has been disabled in config").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stripped(uri: &str) -> String {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        strip_mount(request).uri().to_string()
    }

    #[test]
    fn test_strip_mount() {
        assert_eq!(stripped("/evp_proxy/v1/my.subdomain/mypath?arg=test"), "/my.subdomain/mypath?arg=test");
        assert_eq!(stripped("/evp_proxy/v1/"), "/");
        assert_eq!(stripped("/evp_proxy/v1"), "/");
        assert_eq!(stripped("/evp_proxy/v1?a=1"), "/?a=1");
    }
}
