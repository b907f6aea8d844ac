//! HTTP tile transport.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use metrics::{counter, histogram};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use jma_common::{JmaError, JmaResult, TileFetcher};

/// HTTP client settings for tile requests.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpFetcherConfig {
    /// Whole-request timeout, body included
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("jma-snapshot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Fetches tiles over HTTP(S) with a shared connection pool.
#[derive(Debug, Clone)]
pub struct HttpTileFetcher {
    client: Client,
}

impl HttpTileFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent)
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> JmaResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| JmaError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JmaError::transport(url, format!("HTTP {}", status)));
        }

        response.bytes().await.map_err(|e| JmaError::transport(url, e))
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> JmaResult<Bytes> {
        let start = Instant::now();
        let result = self.get(url).await;
        histogram!("jma_tile_fetch_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(bytes) => {
                counter!("jma_tile_fetch_total", "outcome" => "ok").increment(1);
                debug!(size = bytes.len(), "Tile downloaded");
            }
            Err(e) => {
                counter!("jma_tile_fetch_total", "outcome" => "error").increment(1);
                warn!(error = %e, kind = e.kind(), "Tile download failed");
            }
        }
        result
    }
}
