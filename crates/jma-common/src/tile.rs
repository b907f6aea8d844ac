//! Slippy-map tile addressing and JMA tile source URLs.
//!
//! Tiles follow the GSI/XYZ scheme: `2^zoom` columns and rows, origin at the
//! north-west corner, 256x256 pixels each.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoCoordinate;
use crate::time::WeatherFrame;
use crate::{JmaError, JmaResult};

/// Edge length of every source tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Deepest zoom level served by the tile sources.
pub const MAX_ZOOM: u8 = 18;

const GSI_BASE_URL: &str = "https://www.jma.go.jp/tile/gsi";
const BORDER_MASK_URL: &str = "https://www.jma.go.jp/bosai/jmatile/data/map/none/none/none/surf/mask";

pub(crate) fn validate_zoom(zoom: u8) -> JmaResult<()> {
    if zoom > MAX_ZOOM {
        return Err(JmaError::InvalidZoom(zoom));
    }
    Ok(())
}

/// Number of tiles along one axis at `zoom`.
pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom.min(MAX_ZOOM)
}

/// A tile address (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Zoom level
    pub zoom: u8,
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

impl Tile {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    pub fn is_valid(&self) -> bool {
        self.zoom <= MAX_ZOOM && self.x < tiles_per_axis(self.zoom) && self.y < tiles_per_axis(self.zoom)
    }

    pub fn validate(&self) -> JmaResult<()> {
        validate_zoom(self.zoom)?;
        if !self.is_valid() {
            return Err(JmaError::InvalidTile {
                zoom: self.zoom,
                x: self.x,
                y: self.y,
            });
        }
        Ok(())
    }

    /// Fractional position of the tile's centre.
    pub fn centroid(&self) -> TileCoordinate {
        TileCoordinate {
            zoom: self.zoom,
            x: self.x as f64 + 0.5,
            y: self.y as f64 + 0.5,
        }
    }

    /// GSI base map tile, e.g. `style = "pale"`, `extension = "png"`.
    pub fn map_url(&self, style: &str, extension: &str) -> JmaResult<String> {
        self.validate()?;
        Ok(format!(
            "{}/{}/{}/{}/{}.{}",
            GSI_BASE_URL, style, self.zoom, self.x, self.y, extension
        ))
    }

    /// Prefectural border mask tile.
    pub fn border_url(&self, extension: &str) -> JmaResult<String> {
        self.validate()?;
        Ok(format!(
            "{}/{}/{}/{}.{}",
            BORDER_MASK_URL, self.zoom, self.x, self.y, extension
        ))
    }

    /// Radar/forecast tile for the frame selected by `now` and `duration`.
    pub fn weather_url(&self, now: DateTime<Utc>, duration: Duration) -> JmaResult<String> {
        WeatherFrame::select(now, duration)?.tile_url(self)
    }

    /// Source URL of this tile in the given layer.
    pub fn url(&self, layer: &TileLayer) -> JmaResult<String> {
        match layer {
            TileLayer::Base { style, extension } => self.map_url(style, extension),
            TileLayer::Border { extension } => self.border_url(extension),
            TileLayer::Weather(frame) => frame.tile_url(self),
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for Tile {
    type Err = JmaError;

    /// Parse a `z/x/y` tile path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        let tile = match parts.as_slice() {
            [z, x, y] => match (z.parse::<u8>(), x.parse::<u32>(), y.parse::<u32>()) {
                (Ok(zoom), Ok(x), Ok(y)) => Tile::new(zoom, x, y),
                _ => return Err(JmaError::InvalidTilePath(s.to_string())),
            },
            _ => return Err(JmaError::InvalidTilePath(s.to_string())),
        };
        tile.validate()?;
        Ok(tile)
    }
}

/// A real-valued position in tile space; its integer part is the tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub zoom: u8,
    pub x: f64,
    pub y: f64,
}

impl TileCoordinate {
    pub fn new(zoom: u8, x: f64, y: f64) -> Self {
        Self { zoom, x, y }
    }

    pub fn is_valid(&self) -> bool {
        let n = tiles_per_axis(self.zoom) as f64;
        self.zoom <= MAX_ZOOM
            && self.x.is_finite()
            && self.y.is_finite()
            && (0.0..n).contains(&self.x)
            && (0.0..n).contains(&self.y)
    }

    /// Element-wise floor, kept inside the tile matrix.
    pub fn tile(&self) -> Tile {
        let max = tiles_per_axis(self.zoom) - 1;
        Tile {
            zoom: self.zoom,
            x: (self.x.floor().max(0.0) as u32).min(max),
            y: (self.y.floor().max(0.0) as u32).min(max),
        }
    }

    /// Inverse Web Mercator projection.
    pub fn to_geo(&self) -> GeoCoordinate {
        let n = 2f64.powi(self.zoom as i32);
        let my = 2.0 * self.y * PI / n - PI;
        GeoCoordinate {
            lat: (-my).exp().atan() * 360.0 / PI - 90.0,
            lon: (self.x / n) * 360.0 - 180.0,
        }
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Requested output size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// One source tile.
    pub fn tile() -> Self {
        Self {
            width: TILE_SIZE,
            height: TILE_SIZE,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn validate(&self) -> JmaResult<()> {
        if !self.is_valid() {
            return Err(JmaError::InvalidRect {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Which source a tile is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileLayer {
    /// GSI base map in a named style (`pale`, `std`, `blank`, ...)
    Base { style: String, extension: String },
    /// Administrative border mask
    Border { extension: String },
    /// Radar nowcast or rainfall forecast frame
    Weather(WeatherFrame),
}

impl TileLayer {
    /// Short name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            TileLayer::Base { .. } => "base",
            TileLayer::Border { .. } => "border",
            TileLayer::Weather(_) => "weather",
        }
    }
}
