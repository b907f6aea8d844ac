//! Transport seam for tile bytes.

use async_trait::async_trait;
use bytes::Bytes;

use crate::JmaResult;

/// Fetches the raw bytes behind a tile URL.
///
/// Timeouts, retries and cancellation belong to the implementation; the
/// compositor treats any error as terminal for the request and reports it
/// as `JmaError::TransportFailure`.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> JmaResult<Bytes>;
}
