//! Geographic coordinates and the spherical Web Mercator forward projection.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tile::{validate_zoom, Tile, TileCoordinate};
use crate::{JmaError, JmaResult};

/// Latitude limit of the Web Mercator square (the projection diverges at ±90°).
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub lat: f64,
    pub lon: f64,
}

impl GeoCoordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when the latitude lies inside the Mercator domain and the
    /// longitude is already wrapped into [-180, 180).
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-MAX_LATITUDE..=MAX_LATITUDE).contains(&self.lat)
            && (-180.0..180.0).contains(&self.lon)
    }

    /// Clamp the latitude into the Mercator domain and wrap the longitude
    /// into [-180, 180).
    pub fn normalize(&self) -> GeoCoordinate {
        GeoCoordinate {
            lat: self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            lon: (self.lon + 180.0).rem_euclid(360.0) - 180.0,
        }
    }

    /// Fails with `InvalidCoordinate` unless `is_valid()` holds.
    pub fn validate(&self) -> JmaResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(JmaError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }

    /// Project onto the fractional tile space of `zoom`.
    pub fn to_tile_coordinate(&self, zoom: u8) -> JmaResult<TileCoordinate> {
        self.validate()?;
        validate_zoom(zoom)?;

        let n = 2f64.powi(zoom as i32);
        let lat_rad = self.lat.to_radians();
        let x = (self.lon + 180.0) / 360.0 * n;
        let y = (1.0 - (PI / 4.0 + lat_rad / 2.0).tan().ln() / PI) / 2.0 * n;

        Ok(TileCoordinate { zoom, x, y })
    }

    /// The tile containing this coordinate at `zoom`.
    pub fn to_tile(&self, zoom: u8) -> JmaResult<Tile> {
        Ok(self.to_tile_coordinate(zoom)?.tile())
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    fn akashi() -> GeoCoordinate {
        GeoCoordinate::new(34.6497512427944, 135.00132061562732)
    }

    fn assert_round_trip(geo: GeoCoordinate, zoom: u8) {
        let back = geo.to_tile_coordinate(zoom).unwrap().to_geo();
        assert_approx_eq!(geo.lat, back.lat, 1e-10, "{} at zoom {}", geo, zoom);
        assert_approx_eq!(geo.lon, back.lon, 1e-10, "{} at zoom {}", geo, zoom);
    }

    #[test]
    fn test_to_tile_known_points() {
        assert_eq!(akashi().to_tile(2).unwrap(), Tile::new(2, 3, 1));
        assert_eq!(akashi().to_tile(14).unwrap(), Tile::new(14, 14336, 6509));
        assert_eq!(GeoCoordinate::new(0.0, 0.0).to_tile(0).unwrap(), Tile::new(0, 0, 0));
    }

    #[test]
    fn test_round_trip() {
        for zoom in [0u8, 2, 8, 14, 18] {
            assert_round_trip(akashi(), zoom);
        }
        assert_round_trip(GeoCoordinate::new(-60.25, -179.5), 10);
    }

    #[test]
    fn test_is_valid() {
        assert!(akashi().is_valid());
        assert!(GeoCoordinate::new(MAX_LATITUDE, -180.0).is_valid());
        assert!(!GeoCoordinate::new(85.06, 0.0).is_valid());
        assert!(!GeoCoordinate::new(0.0, 180.0).is_valid());
        assert!(!GeoCoordinate::new(0.0, 200.0).is_valid());
        assert!(!GeoCoordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_normalize() {
        let g = GeoCoordinate::new(89.0, 200.0);
        let n = g.normalize();
        assert_eq!(n.lat, MAX_LATITUDE);
        assert_approx_eq!(n.lon, -160.0, 1e-9);
        assert!(n.is_valid());
        // The input is left untouched
        assert_eq!(g.lat, 89.0);

        let n = GeoCoordinate::new(-90.0, -190.0).normalize();
        assert_eq!(n.lat, -MAX_LATITUDE);
        assert_approx_eq!(n.lon, 170.0, 1e-9);

        let n = GeoCoordinate::new(10.0, 180.0).normalize();
        assert_eq!(n.lon, -180.0);
    }

    #[test]
    fn test_invalid_input_rejected() {
        let err = GeoCoordinate::new(86.0, 0.0).to_tile(3).unwrap_err();
        assert!(matches!(err, JmaError::InvalidCoordinate { .. }));

        let err = akashi().to_tile(19).unwrap_err();
        assert!(matches!(err, JmaError::InvalidZoom(19)));
    }
}
