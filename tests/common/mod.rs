//! Shared utilities for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Response, StatusCode};
use axum::Router;
use bytes::Bytes;
use tower::ServiceExt;

use evp_proxy::config::ProxyConfig;
use evp_proxy::error::BoxError;
use evp_proxy::http::{Collaborators, HttpServer};
use evp_proxy::observability::{ProxyLog, StatsClient};
use evp_proxy::upstream::Transport;

pub const RESPONSE_BODY: &str = "ok_resprino";

/// One request as the transport saw it.
#[derive(Debug, Clone)]
pub struct Sent {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport that records every request and answers 200 `ok_resprino`,
/// or fails for the hosts it was told to fail.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    failing_hosts: Vec<String>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn failing(hosts: &[&str]) -> Self {
        Self {
            failing_hosts: hosts.iter().map(|h| h.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Records the request, then waits `delay` before answering.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        let (parts, body) = request.into_parts();
        // Reading the body is where a streamed size limit trips.
        let body = axum::body::to_bytes(body, usize::MAX).await?;
        let host = parts.uri.host().unwrap_or_default().to_string();

        self.sent.lock().unwrap().push(Sent {
            method: parts.method,
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_hosts.contains(&host) {
            return Err(format!("connection refused: {}", host).into());
        }
        Ok(Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "text/plain")
            .body(Body::from(RESPONSE_BODY))
            .unwrap())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatCall {
    Count {
        name: String,
        value: i64,
        tags: Vec<String>,
        rate: f64,
    },
    Timing {
        name: String,
        value: Duration,
        tags: Vec<String>,
        rate: f64,
    },
}

impl StatCall {
    pub fn name(&self) -> &str {
        match self {
            StatCall::Count { name, .. } | StatCall::Timing { name, .. } => name,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            StatCall::Count { tags, .. } | StatCall::Timing { tags, .. } => tags,
        }
    }
}

#[derive(Default)]
pub struct RecordingStats {
    calls: Mutex<Vec<StatCall>>,
}

impl RecordingStats {
    pub fn calls(&self) -> Vec<StatCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl StatsClient for RecordingStats {
    fn count(&self, name: &str, value: i64, tags: &[String], rate: f64) {
        self.calls.lock().unwrap().push(StatCall::Count {
            name: name.to_string(),
            value,
            tags: tags.to_vec(),
            rate,
        });
    }

    fn timing(&self, name: &str, value: Duration, tags: &[String], rate: f64) {
        self.calls.lock().unwrap().push(StatCall::Timing {
            name: name.to_string(),
            value,
            tags: tags.to_vec(),
            rate,
        });
    }
}

/// Unthrottled log that keeps every message.
#[derive(Default)]
pub struct BufferLog {
    lines: Mutex<Vec<String>>,
}

impl BufferLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ProxyLog for BufferLog {
    fn error(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

/// Everything a test needs to drive the proxy and inspect its effects.
pub struct Harness {
    pub router: Router,
    pub transport: Arc<RecordingTransport>,
    pub stats: Arc<RecordingStats>,
    pub log: Arc<BufferLog>,
}

impl Harness {
    pub fn new(config: ProxyConfig) -> Self {
        Self::with_transport(config, RecordingTransport::default())
    }

    pub fn with_transport(config: ProxyConfig, transport: RecordingTransport) -> Self {
        let transport = Arc::new(transport);
        let stats = Arc::new(RecordingStats::default());
        let log = Arc::new(BufferLog::default());

        let mut tags = BTreeMap::new();
        tags.insert(
            "myid".to_string(),
            vec!["container:myid".to_string(), "image:myimage".to_string()],
        );
        let tagger = move |cid: &str| -> Result<Vec<String>, BoxError> {
            Ok(tags.get(cid).cloned().unwrap_or_default())
        };

        let collaborators = Collaborators {
            transport: transport.clone(),
            stats: stats.clone(),
            log: log.clone(),
            tagger: Arc::new(tagger),
        };
        let router = HttpServer::with_collaborators(config, collaborators).router();

        Self {
            router,
            transport,
            stats,
            log,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }
}

/// Configuration shared by the forwarding tests.
pub fn test_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.agent.hostname = "test_hostname".into();
    config.agent.default_env = "test_env".into();
    config.agent.site = "us3.datadoghq.com".into();
    config.agent.api_key = "test_api_key".into();
    config
}

/// A POST to the proxy with the headers a typical client sends.
pub fn evp_request(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "text/json")
        .header("user-agent", "test_user_agent")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap()
}
