//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binary
//! - Provide the rate-limited error sink used by the proxy hot path
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level from config, overridable via `RUST_LOG`
//! - Proxy errors are throttled per window so a flapping upstream cannot
//!   flood the log

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("evp_proxy={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Error sink for the proxy.
pub trait ProxyLog: Send + Sync {
    fn error(&self, message: &str);
}

/// Outcome of asking the throttle for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub admitted: bool,
    /// Messages dropped in the window that just closed.
    pub dropped: u64,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    emitted: u32,
    dropped: u64,
}

/// Lets through at most `limit` messages per `window`, emitting via `tracing`.
#[derive(Debug)]
pub struct ThrottledLog {
    limit: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl ThrottledLog {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                emitted: 0,
                dropped: 0,
            }),
        }
    }

    /// 5 messages every 10 seconds.
    pub fn for_evp_proxy() -> Self {
        Self::new(5, Duration::from_secs(10))
    }

    pub fn admit(&self, now: Instant) -> Admission {
        let mut window = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut dropped = 0;
        if now.saturating_duration_since(window.started) >= self.window {
            dropped = window.dropped;
            *window = Window {
                started: now,
                emitted: 0,
                dropped: 0,
            };
        }

        let admitted = window.emitted < self.limit;
        if admitted {
            window.emitted += 1;
        } else {
            window.dropped += 1;
        }
        Admission { admitted, dropped }
    }
}

impl ProxyLog for ThrottledLog {
    fn error(&self, message: &str) {
        let admission = self.admit(Instant::now());
        if admission.dropped > 0 {
            tracing::warn!(dropped = admission.dropped, "EVPProxy: log messages suppressed by rate limit");
        }
        if admission.admitted {
            tracing::error!("EVPProxy: {}", message);
        }
    }
}
