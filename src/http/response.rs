//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the primary destination's response to the client
//! - Strip hop-by-hop headers
//! - Map proxy errors to HTTP status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Every forwarding failure is a 502 with an empty body; the cause is logged,
//!   never echoed to the client
//! - The disabled state is the only error with a body

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;

use crate::error::ProxyError;

/// Headers that describe a single connection and must not be relayed.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TE,
    header::TRAILER,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
];

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ProxyError::Disabled(_) => {
                (StatusCode::METHOD_NOT_ALLOWED, self.to_string()).into_response()
            }
            _ => StatusCode::BAD_GATEWAY.into_response(),
        }
    }
}

/// Turn the primary destination's response into the client response.
pub fn into_client_response(response: Response<Body>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, body)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Connection may name further per-connection headers.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}
