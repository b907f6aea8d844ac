//! The composite facade: point and size in, finished radar image out.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use jma_common::{
    GeoCoordinate, JmaResult, Rect, Tile, TileCoordinate, TileFetcher, TileLayer, WeatherFrame,
};

use crate::canvas::{CanvasAssembler, TileGrid};
use crate::composite::composite;
use crate::config::ComposerConfig;

/// What a composite is centred on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CenterPoint {
    /// A geographic point at a zoom level
    Geo { coord: GeoCoordinate, zoom: u8 },
    /// The centre of a tile
    Tile { tile: Tile },
}

impl CenterPoint {
    pub fn zoom(&self) -> u8 {
        match self {
            CenterPoint::Geo { zoom, .. } => *zoom,
            CenterPoint::Tile { tile } => tile.zoom,
        }
    }

    /// Fractional tile-space centre, validating the point on the way.
    pub fn tile_coordinate(&self) -> JmaResult<TileCoordinate> {
        match self {
            CenterPoint::Geo { coord, zoom } => coord.to_tile_coordinate(*zoom),
            CenterPoint::Tile { tile } => {
                tile.validate()?;
                Ok(tile.centroid())
            }
        }
    }
}

impl From<Tile> for CenterPoint {
    fn from(tile: Tile) -> Self {
        CenterPoint::Tile { tile }
    }
}

/// One tile request of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileRequest {
    pub layer: &'static str,
    pub tile: Tile,
    pub url: String,
}

/// Everything a composite would fetch, without fetching it.
#[derive(Debug, Clone, Serialize)]
pub struct CompositePlan {
    pub center: CenterPoint,
    pub rect: Rect,
    pub grid: TileGrid,
    pub crop_origin: (u32, u32),
    pub frame: WeatherFrame,
    pub requests: Vec<TileRequest>,
}

/// Builds radar composites over an injected tile transport.
#[derive(Clone)]
pub struct TileComposer {
    assembler: CanvasAssembler,
    config: ComposerConfig,
}

impl TileComposer {
    pub fn new(fetcher: Arc<dyn TileFetcher>, config: ComposerConfig) -> Self {
        let assembler = CanvasAssembler::new(fetcher, config.max_concurrent_fetches);
        Self { assembler, config }
    }

    /// Composite of `rect` pixels centred on `coord` at `zoom`.
    pub async fn fetch_composite(
        &self,
        coord: GeoCoordinate,
        zoom: u8,
        rect: Rect,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> JmaResult<RgbaImage> {
        self.compose(CenterPoint::Geo { coord, zoom }, rect, now, duration)
            .await
    }

    /// Composite covering exactly one tile.
    pub async fn fetch_tile(
        &self,
        tile: Tile,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> JmaResult<RgbaImage> {
        self.compose(tile.into(), Rect::tile(), now, duration).await
    }

    /// Fetch the three layers for `center` and stack them.
    ///
    /// Validation and frame selection happen before any request is made.
    #[instrument(skip(self), fields(zoom = center.zoom()))]
    pub async fn compose(
        &self,
        center: CenterPoint,
        rect: Rect,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> JmaResult<RgbaImage> {
        let (grid, frame) = self.prepare(&center, rect, now, duration)?;

        let base_layer = self.config.base_layer_source();
        let weather_layer = TileLayer::Weather(frame);
        let border_layer = self.config.border_layer();

        let (base, weather, border) = tokio::try_join!(
            self.assembler.assemble(&grid, &base_layer, rect),
            self.assembler.assemble(&grid, &weather_layer, rect),
            self.assembler.assemble(&grid, &border_layer, rect),
        )?;

        let output = composite(&base, &weather, &border, &self.config.base_layer)?;

        info!(
            width = rect.width,
            height = rect.height,
            tiles = grid.tiles().len(),
            product = ?frame.product,
            base_time = %frame.base_stamp(),
            end_time = %frame.end_stamp(),
            "Composite built"
        );
        Ok(output)
    }

    /// Describe the grid and every URL `compose` would fetch.
    pub fn plan(
        &self,
        center: CenterPoint,
        rect: Rect,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> JmaResult<CompositePlan> {
        let (grid, frame) = self.prepare(&center, rect, now, duration)?;

        let layers = [
            self.config.base_layer_source(),
            TileLayer::Weather(frame),
            self.config.border_layer(),
        ];
        let tiles = grid.tiles();

        let mut requests = Vec::with_capacity(tiles.len() * layers.len());
        for layer in &layers {
            for tile in &tiles {
                requests.push(TileRequest {
                    layer: layer.name(),
                    tile: *tile,
                    url: tile.url(layer)?,
                });
            }
        }

        Ok(CompositePlan {
            center,
            rect,
            crop_origin: grid.crop_origin(rect),
            grid,
            frame,
            requests,
        })
    }

    fn prepare(
        &self,
        center: &CenterPoint,
        rect: Rect,
        now: DateTime<Utc>,
        duration: Duration,
    ) -> JmaResult<(TileGrid, WeatherFrame)> {
        rect.validate()?;
        let coordinate = center.tile_coordinate()?;
        let frame = WeatherFrame::select(now, duration)?;
        let grid = TileGrid::covering(coordinate, rect)?;
        Ok((grid, frame))
    }
}
