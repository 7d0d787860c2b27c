//! Request body size limit.
//!
//! # Responsibilities
//! - Enforce maximum request body size while the body is read
//! - Recognise the limit error wherever it surfaces (buffering or transport)
//!
//! # Design Decisions
//! - Checked incrementally, frame by frame; the body is never pre-read
//! - 0 means unlimited
//! - Surfaces as `ProxyError::PayloadTooLarge`, reported like any other failure

use std::error::Error;

use axum::body::Body;
use http_body_util::{LengthLimitError, Limited};

use crate::error::{BoxError, ProxyError};

/// Wrap `body` so reading past `max_payload_size` bytes fails.
pub fn limit_body(body: Body, max_payload_size: u64) -> Body {
    if max_payload_size == 0 {
        return body;
    }
    let limit = usize::try_from(max_payload_size).unwrap_or(usize::MAX);
    Body::new(Limited::new(body, limit))
}

/// True when the limit error appears anywhere in the source chain.
pub fn exceeds_limit(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Classify a failure to read the inbound body.
pub fn body_error(err: BoxError, max_payload_size: u64) -> ProxyError {
    if exceeds_limit(err.as_ref()) {
        ProxyError::PayloadTooLarge {
            limit: max_payload_size,
        }
    } else {
        ProxyError::BodyRead(err)
    }
}

/// Classify a failed send. A streamed body that crosses the limit fails
/// inside the transport, so the limit is checked for here too.
pub fn transport_error(err: BoxError, max_payload_size: u64) -> ProxyError {
    if exceeds_limit(err.as_ref()) {
        ProxyError::PayloadTooLarge {
            limit: max_payload_size,
        }
    } else {
        ProxyError::Transport(err)
    }
}
