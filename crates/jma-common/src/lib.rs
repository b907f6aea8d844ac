//! Common types shared by the JMA tile compositor and its tools.
//!
//! - Web Mercator conversions between geographic, tile and fractional-tile
//!   coordinates
//! - tile source URLs for the base map, border mask and radar layers
//! - radar frame selection from a forecast/lookback offset

pub mod error;
pub mod fetch;
pub mod geo;
pub mod tile;
pub mod time;

pub use error::{JmaError, JmaResult};
pub use fetch::TileFetcher;
pub use geo::{GeoCoordinate, MAX_LATITUDE};
pub use tile::{tiles_per_axis, Rect, Tile, TileCoordinate, TileLayer, MAX_ZOOM, TILE_SIZE};
pub use time::{WeatherFrame, WeatherProduct};
