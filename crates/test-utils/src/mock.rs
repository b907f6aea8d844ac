//! In-memory tile fetcher.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use jma_common::{JmaError, JmaResult, TileFetcher};

use crate::generators::{coded_tile, encode_png, tile_from_url};

/// A `TileFetcher` that serves canned bytes and records every request.
///
/// Routes are matched by URL substring in insertion order; `fail_on`
/// patterns win over routes. Without a matching route the fallback is
/// served, and without a fallback the request fails like a 404.
#[derive(Debug, Default)]
pub struct MockTileFetcher {
    routes: Vec<(String, Bytes)>,
    failures: Vec<String>,
    fallback: Option<Bytes>,
    coded: bool,
    requested: Mutex<Vec<String>>,
}

impl MockTileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` for every URL containing `pattern`.
    pub fn serve(mut self, pattern: impl Into<String>, bytes: Bytes) -> Self {
        self.routes.push((pattern.into(), bytes));
        self
    }

    /// Fail every URL containing `pattern` with a transport error.
    pub fn fail_on(mut self, pattern: impl Into<String>) -> Self {
        self.failures.push(pattern.into());
        self
    }

    /// Serve `bytes` for URLs no route matches.
    pub fn with_fallback(mut self, bytes: Bytes) -> Self {
        self.fallback = Some(bytes);
        self
    }

    /// Serve `coded_tile` for URLs no route matches, so tests can tell
    /// which tile address landed where.
    pub fn with_coded_tiles(mut self) -> Self {
        self.coded = true;
        self
    }

    /// Every URL requested so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|urls| urls.clone()).unwrap_or_default()
    }

    /// Requested URLs containing `pattern`.
    pub fn requested_matching(&self, pattern: &str) -> Vec<String> {
        self.requested()
            .into_iter()
            .filter(|url| url.contains(pattern))
            .collect()
    }

    fn respond(&self, url: &str) -> JmaResult<Bytes> {
        if self.failures.iter().any(|pattern| url.contains(pattern.as_str())) {
            return Err(JmaError::transport(url, "injected failure"));
        }

        if let Some((_, bytes)) = self
            .routes
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
        {
            return Ok(bytes.clone());
        }

        if self.coded {
            if let Some(tile) = tile_from_url(url) {
                return Ok(encode_png(&coded_tile(&tile)));
            }
        }

        self.fallback
            .clone()
            .ok_or_else(|| JmaError::transport(url, "404 Not Found"))
    }
}

#[async_trait]
impl TileFetcher for MockTileFetcher {
    async fn fetch(&self, url: &str) -> JmaResult<Bytes> {
        if let Ok(mut urls) = self.requested.lock() {
            urls.push(url.to_string());
        }
        self.respond(url)
    }
}
