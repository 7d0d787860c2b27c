//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (prefix already stripped)
//!     → context.rs (subdomain, path, query, selected headers)
//!     → security::input (allowlist validation)
//!     → security::headers (outbound request per destination)
//! ```
//!
//! # Design Decisions
//! - Fields are read once at entry and passed by reference afterwards
//! - Deterministic: same input always yields the same context

pub mod context;

pub use context::{RoutingContext, CONTAINER_ID_HEADER, SUBDOMAIN_HEADER};
