//! Datadog EVP intake proxy library.
//!
//! Accepts payloads under `/evp_proxy/v1/<subdomain>/<path>`, validates
//! them, and forwards each one to the primary intake and every configured
//! secondary intake.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod tags;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::{Forwarder, HttpServer};
pub use lifecycle::Shutdown;
