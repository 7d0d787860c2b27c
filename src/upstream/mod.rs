//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyConfig
//!     → endpoint.rs (resolve primary + secondary destinations, once)
//!
//! Per destination, per request:
//!     → transport.rs (send over the shared connection pool)
//! ```

pub mod endpoint;
pub mod transport;

pub use endpoint::{Endpoint, Endpoints};
pub use transport::{ReqwestTransport, Transport};
