//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder produces:
//!     → logging.rs (throttled error sink, structured tracing events)
//!     → metrics.rs (counts and timings through StatsClient)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Sinks are injected, never reached through globals, so tests can record them
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use self::logging::{ProxyLog, ThrottledLog};
pub use self::metrics::{MetricsStatsClient, StatsClient};
