//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (cap the body while it is read)
//!     → input.rs (allowlist subdomain, path and query)
//!     → headers.rs (drop inbound headers, add trusted ones)
//!     → Pass to the destinations
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input
//! - Nothing reaches the network before validation succeeds

pub mod headers;
pub mod input;
pub mod limits;
