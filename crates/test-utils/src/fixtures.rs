//! Common test fixtures for compositor tests.
//!
//! The reference instant and coordinate are the ones the JMA tile paths in
//! the test suites were worked out against.

use chrono::{DateTime, TimeZone, Utc};
use jma_common::{GeoCoordinate, Tile};

/// 2021-09-05T13:32:38Z, between nowcast frames (13:30 and 13:35).
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 9, 5, 13, 32, 38)
        .single()
        .expect("valid reference instant")
}

/// Akashi, on the 135°E meridian.
pub fn akashi() -> GeoCoordinate {
    GeoCoordinate::new(34.6497512427944, 135.00132061562732)
}

/// The zoom-14 tile containing `akashi()`.
pub fn akashi_tile() -> Tile {
    Tile::new(14, 14336, 6509)
}

/// Common zoom levels for testing.
pub mod zoom {
    /// Whole-country view
    pub const COUNTRY: u8 = 5;
    /// Regional view used by the JMA radar page
    pub const REGION: u8 = 8;
    /// City view
    pub const CITY: u8 = 14;
}

/// Output sizes that exercise odd, even and sub-tile grids.
pub mod rects {
    pub const ONE_PIXEL: (u32, u32) = (1, 1);
    pub const TILE: (u32, u32) = (256, 256);
    pub const TWO_TILES: (u32, u32) = (512, 512);
    pub const PORTRAIT: (u32, u32) = (600, 800);
    pub const ODD: (u32, u32) = (255, 257);
    pub const WIDE: (u32, u32) = (1000, 300);

    pub const ALL: [(u32, u32); 6] = [ONE_PIXEL, TILE, TWO_TILES, PORTRAIT, ODD, WIDE];
}
