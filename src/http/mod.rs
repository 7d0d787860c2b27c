//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, mount under /evp_proxy/v1)
//!     → forwarder.rs (validate, rewrite, fan out)
//!     → body.rs (stream or buffer the payload per destination count)
//!     → response.rs (primary response or error status to the client)
//! ```

pub mod body;
pub mod forwarder;
pub mod response;
pub mod server;

pub use forwarder::{Collaborators, Forwarder};
pub use server::{HttpServer, EVP_PROXY_PREFIX};
