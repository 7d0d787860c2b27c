//! Request body replay across destinations.
//!
//! With a single destination the inbound body is streamed straight through.
//! With several, it is read into memory once and every destination gets its
//! own copy; the size limit bounds what can be buffered.

use axum::body::Body;
use bytes::Bytes;

use crate::error::ProxyError;
use crate::security::limits;

/// Source of request bodies for the per-destination sends.
#[derive(Debug)]
pub enum ReplayableBody {
    /// Single use; later takes yield an empty body.
    Streaming(Option<Body>),
    /// Cheap to copy (`Bytes` is reference counted).
    Buffered(Bytes),
}

impl ReplayableBody {
    /// Stream when there is one destination, buffer otherwise.
    ///
    /// `body` is expected to carry the size limit already, so buffering
    /// fails with `PayloadTooLarge` as soon as the limit is crossed.
    pub async fn prepare(
        body: Body,
        destinations: usize,
        max_payload_size: u64,
    ) -> Result<Self, ProxyError> {
        if destinations <= 1 {
            return Ok(ReplayableBody::Streaming(Some(body)));
        }
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| limits::body_error(Box::new(e), max_payload_size))?;
        Ok(ReplayableBody::Buffered(bytes))
    }

    /// Body for the next destination.
    pub fn take(&mut self) -> Body {
        match self {
            ReplayableBody::Streaming(body) => body.take().unwrap_or_else(Body::empty),
            ReplayableBody::Buffered(bytes) => Body::from(bytes.clone()),
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, ReplayableBody::Buffered(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read(body: Body) -> Bytes {
        axum::body::to_bytes(body, usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn test_single_destination_streams() {
        let mut body = ReplayableBody::prepare(Body::from("payload"), 1, 0).await.unwrap();
        assert!(!body.is_buffered());
        assert_eq!(read(body.take()).await, "payload");
        assert!(read(body.take()).await.is_empty());
    }

    #[tokio::test]
    async fn test_many_destinations_get_independent_copies() {
        let mut body = ReplayableBody::prepare(Body::from("payload"), 3, 0).await.unwrap();
        assert!(body.is_buffered());
        for _ in 0..3 {
            assert_eq!(read(body.take()).await, "payload");
        }
    }

    #[tokio::test]
    async fn test_buffering_respects_limit() {
        let limited = limits::limit_body(Body::from(vec![0u8; 1024]), 42);
        let err = ReplayableBody::prepare(limited, 2, 42).await.unwrap_err();
        assert!(matches!(err, ProxyError::PayloadTooLarge { limit: 42 }));
    }

    #[tokio::test]
    async fn test_streaming_defers_limit_to_reader() {
        let limited = limits::limit_body(Body::from(vec![0u8; 1024]), 42);
        let mut body = ReplayableBody::prepare(limited, 1, 42).await.unwrap();
        let err = axum::body::to_bytes(body.take(), usize::MAX).await.unwrap_err();
        assert!(limits::exceeds_limit(&err));
    }
}
