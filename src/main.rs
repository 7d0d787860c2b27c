//! Datadog EVP intake proxy.
//!
//! Local agents post event payloads to `/evp_proxy/v1/...`; the proxy
//! validates each request and relays it to the intake of every configured
//! organization.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ http::forwarder ──┬──▶ primary intake ──▶ response to client
//!                (/evp_proxy/v1)  routing + security ├──▶ secondary intake (drained)
//!                                                     └──▶ secondary intake (drained)
//!
//!     Cross-cutting: config, observability (logs, metrics), lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use evp_proxy::config::{load_config, read_config, validate_config, ConfigError, ProxyConfig};
use evp_proxy::lifecycle::{shutdown_signal, Shutdown};
use evp_proxy::observability::{logging, metrics};
use evp_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "evp-proxy")]
#[command(about = "Validating multi-destination proxy for Datadog EVP intake", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API key for the default intake
    #[arg(long, env = "DD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Hostname reported to the intake
    #[arg(long, env = "DD_HOSTNAME")]
    hostname: Option<String>,

    /// Listener address, overriding `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,
}

impl Cli {
    fn has_overrides(&self) -> bool {
        self.api_key.is_some() || self.hostname.is_some() || self.bind.is_some()
    }

    fn apply(self, config: &mut ProxyConfig) {
        if let Some(api_key) = self.api_key {
            config.agent.api_key = api_key;
        }
        if let Some(hostname) = self.hostname {
            config.agent.hostname = hostname;
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
    }
}

/// Apply command line overrides, then validate.
fn with_overrides(cli: Cli, mut config: ProxyConfig) -> Result<ProxyConfig, ConfigError> {
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut cli = Cli::parse();

    // Overrides must land before validation, so they skip the one-step load.
    let config = match cli.config.take() {
        Some(path) if !cli.has_overrides() => load_config(&path)?,
        Some(path) => with_overrides(cli, read_config(&path)?)?,
        None => with_overrides(cli, ProxyConfig::default())?,
    };

    logging::init(&config.observability.log_level);
    tracing::info!("evp-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        enabled = config.evp_proxy.enabled,
        site = %config.agent.site,
        additional_hosts = config.evp_proxy.additional_endpoints.len(),
        max_payload_size = config.evp_proxy.max_payload_size,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Address was checked by validation.
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!(
            subscribers = shutdown.receiver_count(),
            "Draining in-flight requests"
        );
        shutdown.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
