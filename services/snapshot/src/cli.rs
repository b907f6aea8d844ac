//! Command-line arguments and the snapshot run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use tracing::{info, Level};

use compositor::{BaseLayerStyle, CenterPoint, ComposerConfig, CompositePlan, TileComposer};
use jma_common::time::parse_instant;
use jma_common::{GeoCoordinate, JmaError, Rect, Tile, TileFetcher};

use crate::sources::HttpFetcherConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "snapshot")]
#[command(about = "Render a JMA radar composite centred on a point")]
pub struct Args {
    /// Latitude of the centre point
    #[arg(long, env = "JMA_LAT", allow_negative_numbers = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude of the centre point
    #[arg(long, env = "JMA_LON", allow_negative_numbers = true, requires = "lat")]
    pub lon: Option<f64>,

    /// Zoom level used with --lat/--lon
    #[arg(long, env = "JMA_ZOOM", default_value = "8")]
    pub zoom: u8,

    /// Centre on a tile instead, as z/x/y
    #[arg(long, env = "JMA_TILE", conflicts_with_all = ["lat", "lon"])]
    pub tile: Option<Tile>,

    /// Wrap/clamp an out-of-range coordinate instead of failing
    #[arg(long)]
    pub normalize: bool,

    /// Output width in pixels
    #[arg(long, env = "JMA_WIDTH", default_value = "256")]
    pub width: u32,

    /// Output height in pixels
    #[arg(long, env = "JMA_HEIGHT", default_value = "256")]
    pub height: u32,

    /// Radar frame offset from now in minutes; negative looks back
    #[arg(long, env = "JMA_OFFSET_MINUTES", default_value = "0", allow_negative_numbers = true)]
    pub offset_minutes: i64,

    /// Reference time (RFC 3339); defaults to the current time
    #[arg(long, env = "JMA_NOW")]
    pub now: Option<String>,

    /// GSI base map style
    #[arg(long, env = "JMA_BASE_STYLE")]
    pub style: Option<String>,

    /// Maximum concurrent tile requests per layer
    #[arg(long, env = "JMA_MAX_CONCURRENT_FETCHES")]
    pub max_concurrent: Option<usize>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "JMA_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Base map treatment: plain or receded
    #[arg(long, env = "JMA_BASE_LAYER")]
    pub base_style: Option<BaseLayerStyle>,

    /// Output PNG path
    #[arg(short, long, env = "JMA_OUTPUT", default_value = "snapshot.png")]
    pub output: PathBuf,

    /// Print the tile plan as JSON instead of fetching
    #[arg(long)]
    pub dry_run: bool,

    /// Log level
    #[arg(long, env = "JMA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// What a run produced.
#[derive(Debug)]
pub enum Outcome {
    Plan(CompositePlan),
    Image { path: PathBuf, width: u32, height: u32 },
}

impl Args {
    pub fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    pub fn center(&self) -> Result<CenterPoint> {
        if let Some(tile) = self.tile {
            return Ok(CenterPoint::Tile { tile });
        }

        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                let mut coord = GeoCoordinate::new(lat, lon);
                if self.normalize {
                    coord = coord.normalize();
                }
                Ok(CenterPoint::Geo {
                    coord,
                    zoom: self.zoom,
                })
            }
            _ => bail!("either --lat and --lon or --tile is required"),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }

    pub fn offset(&self) -> Duration {
        Duration::minutes(self.offset_minutes)
    }

    pub fn now(&self) -> Result<DateTime<Utc>> {
        match &self.now {
            Some(s) => parse_instant(s).with_context(|| format!("Invalid --now value '{}'", s)),
            None => Ok(Utc::now()),
        }
    }

    /// Environment configuration with flags taking precedence.
    pub fn composer_config(&self) -> ComposerConfig {
        let mut config = ComposerConfig::from_env();
        if let Some(style) = &self.style {
            config.base_style = style.clone();
        }
        if let Some(max) = self.max_concurrent.filter(|&n| n > 0) {
            config.max_concurrent_fetches = max;
        }
        if let Some(base_style) = self.base_style {
            config.base_layer = base_style;
        }
        config
    }

    pub fn http_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig {
            request_timeout: StdDuration::from_secs(self.timeout_secs.max(1)),
            ..HttpFetcherConfig::default()
        }
    }
}

/// Stable label for a failed run and whether the request itself was at
/// fault. Errors from outside the compositor are labelled `other`.
pub fn failure_kind(err: &anyhow::Error) -> (&'static str, bool) {
    match err.downcast_ref::<JmaError>() {
        Some(e) => (e.kind(), e.is_invalid_request()),
        None => ("other", false),
    }
}

/// Build the composite described by `args` and write it, or only plan it
/// with `--dry-run`.
pub async fn run(args: &Args, fetcher: Arc<dyn TileFetcher>) -> Result<Outcome> {
    let center = args.center()?;
    let rect = args.rect();
    let now = args.now()?;
    let composer = TileComposer::new(fetcher, args.composer_config());

    if args.dry_run {
        let plan = composer.plan(center, rect, now, args.offset())?;
        return Ok(Outcome::Plan(plan));
    }

    info!(
        center = ?center,
        width = rect.width,
        height = rect.height,
        offset_minutes = args.offset_minutes,
        "Building composite"
    );

    let composite = composer.compose(center, rect, now, args.offset()).await?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let path = args.output.clone();
    let (width, height) = composite.dimensions();
    tokio::task::spawn_blocking(move || composite.save_with_format(&path, image::ImageFormat::Png))
        .await
        .map_err(|e| anyhow!("PNG writer task failed: {}", e))?
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(path = %args.output.display(), width, height, "Snapshot written");
    Ok(Outcome::Image {
        path: args.output.clone(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("snapshot").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_geo_center() {
        let args = parse(&["--lat", "34.65", "--lon", "135.0", "--zoom", "14"]);
        match args.center().unwrap() {
            CenterPoint::Geo { coord, zoom } => {
                assert_eq!(zoom, 14);
                assert_eq!(coord, GeoCoordinate::new(34.65, 135.0));
            }
            other => panic!("unexpected centre {:?}", other),
        }
    }

    #[test]
    fn test_negative_values_and_normalize() {
        let args = parse(&[
            "--lat", "-33.9", "--lon", "-190", "--normalize", "--offset-minutes", "-90",
        ]);
        assert_eq!(args.offset(), Duration::minutes(-90));
        match args.center().unwrap() {
            CenterPoint::Geo { coord, .. } => assert!((coord.lon - 170.0).abs() < 1e-9),
            other => panic!("unexpected centre {:?}", other),
        }
    }

    #[test]
    fn test_tile_center() {
        let args = parse(&["--tile", "14/14336/6509"]);
        assert_eq!(
            args.center().unwrap(),
            CenterPoint::Tile {
                tile: Tile::new(14, 14336, 6509)
            }
        );
    }

    #[test]
    fn test_bad_arguments() {
        let argv = ["snapshot", "--tile", "14/1/2", "--lat", "1", "--lon", "2"];
        assert!(Args::try_parse_from(argv).is_err());
        assert!(Args::try_parse_from(["snapshot", "--tile", "14/1"]).is_err());
        assert!(Args::try_parse_from(["snapshot", "--base-style", "sepia"]).is_err());
        assert!(parse(&[]).center().is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&[
            "--tile", "2/3/1", "--style", "std", "--max-concurrent", "2", "--base-style", "receded",
        ]);
        let config = args.composer_config();
        assert_eq!(config.base_style, "std");
        assert_eq!(config.max_concurrent_fetches, 2);
        assert_eq!(config.base_layer, BaseLayerStyle::receded());
    }

    #[test]
    fn test_now_parsing() {
        let args = parse(&["--tile", "2/3/1", "--now", "2021-09-05T13:32:38Z"]);
        assert_eq!(args.now().unwrap().to_rfc3339(), "2021-09-05T13:32:38+00:00");
        let args = parse(&["--tile", "2/3/1", "--now", "yesterday"]);
        assert!(args.now().is_err());
    }

    #[test]
    fn test_failure_kind() {
        let err = anyhow::Error::from(JmaError::UnsupportedDuration { minutes: 1440 });
        assert_eq!(failure_kind(&err), ("unsupported_duration", true));

        let err = anyhow::Error::from(JmaError::transport("u", "HTTP 503")).context("Building composite");
        assert_eq!(failure_kind(&err), ("transport_failure", false));

        let args = parse(&["--tile", "2/3/1", "--now", "yesterday"]);
        assert_eq!(failure_kind(&args.now().unwrap_err()), ("invalid_time", true));

        assert_eq!(failure_kind(&anyhow!("disk full")), ("other", false));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["--log-level", "DEBUG"]).level(), Level::DEBUG);
        assert_eq!(parse(&["--log-level", "loud"]).level(), Level::INFO);
    }
}
