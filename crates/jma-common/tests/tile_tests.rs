//! Tests for tile addressing across the public API.

use chrono::{Duration, TimeZone, Utc};
use jma_common::{GeoCoordinate, JmaError, Tile, TileLayer, WeatherFrame, MAX_LATITUDE};
use test_utils::assert_approx_eq;

fn akashi() -> GeoCoordinate {
    GeoCoordinate::new(34.6497512427944, 135.00132061562732)
}

// ============================================================================
// Projection tests
// ============================================================================

#[test]
fn test_round_trip_across_the_domain() {
    let lats = [-85.0, -60.5, -12.25, 0.0, 1e-7, 34.6497512427944, 71.3, 85.0];
    let lons = [-180.0, -120.75, -0.5, 0.0, 45.123456, 135.00132061562732, 179.999];

    for zoom in [0u8, 1, 7, 12, 18] {
        for &lat in &lats {
            for &lon in &lons {
                let geo = GeoCoordinate::new(lat, lon);
                let back = geo.to_tile_coordinate(zoom).unwrap().to_geo();
                assert_approx_eq!(geo.lat, back.lat, 1e-10, "{} at zoom {}", geo, zoom);
                assert_approx_eq!(geo.lon, back.lon, 1e-10, "{} at zoom {}", geo, zoom);
            }
        }
    }
}

#[test]
fn test_tile_is_floor_of_fractional_coordinate() {
    let coord = akashi().to_tile_coordinate(14).unwrap();
    let tile = akashi().to_tile(14).unwrap();
    assert_eq!(tile.x, coord.x.floor() as u32);
    assert_eq!(tile.y, coord.y.floor() as u32);
    assert_eq!(tile, Tile::new(14, 14336, 6509));
}

#[test]
fn test_domain_edges_map_inside_the_matrix() {
    let north_west = GeoCoordinate::new(MAX_LATITUDE, -180.0).to_tile(4).unwrap();
    assert_eq!(north_west, Tile::new(4, 0, 0));

    let south_east = GeoCoordinate::new(-MAX_LATITUDE, 179.9999).to_tile(4).unwrap();
    assert_eq!(south_east, Tile::new(4, 15, 15));
}

#[test]
fn test_normalized_coordinate_projects() {
    let raw = GeoCoordinate::new(88.0, 495.00132061562732);
    assert!(matches!(raw.to_tile(2), Err(JmaError::InvalidCoordinate { .. })));

    let tile = raw.normalize().to_tile(2).unwrap();
    assert_eq!(tile.x, 3);
    assert_eq!(tile.y, 0);
}

// ============================================================================
// URL tests
// ============================================================================

#[test]
fn test_every_layer_url_for_one_tile() {
    let now = Utc.with_ymd_and_hms(2021, 9, 5, 13, 32, 38).unwrap();
    let tile = Tile::new(14, 14336, 6509);

    let base = TileLayer::Base {
        style: "pale".to_string(),
        extension: "png".to_string(),
    };
    let border = TileLayer::Border {
        extension: "png".to_string(),
    };
    let weather = TileLayer::Weather(WeatherFrame::select(now, Duration::minutes(30)).unwrap());

    assert_eq!(
        tile.url(&base).unwrap(),
        "https://www.jma.go.jp/tile/gsi/pale/14/14336/6509.png"
    );
    assert_eq!(
        tile.url(&border).unwrap(),
        "https://www.jma.go.jp/bosai/jmatile/data/map/none/none/none/surf/mask/14/14336/6509.png"
    );
    assert_eq!(
        tile.url(&weather).unwrap(),
        "https://www.jma.go.jp/bosai/jmatile/data/nowc/20210905133000/none/20210905140000/surf/hrpns/14/14336/6509.png"
    );
}

#[test]
fn test_weather_url_rejects_invalid_tile() {
    let now = Utc.with_ymd_and_hms(2021, 9, 5, 13, 32, 38).unwrap();
    let err = Tile::new(2, 3, 1000).weather_url(now, Duration::zero()).unwrap_err();
    assert!(matches!(err, JmaError::InvalidTile { .. }));
}

#[test]
fn test_tile_serializes_as_object() {
    let json = serde_json::to_string(&Tile::new(2, 3, 1)).unwrap();
    assert_eq!(json, r#"{"zoom":2,"x":3,"y":1}"#);

    let back: Tile = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Tile::new(2, 3, 1));
}
