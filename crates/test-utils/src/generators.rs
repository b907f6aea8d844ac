//! Synthetic tile generators.
//!
//! These generators create predictable PNG tiles so tests can tell which
//! source tile ended up where in an assembled canvas.

use std::io::Cursor;

use bytes::Bytes;
use image::{ImageOutputFormat, Rgba, RgbaImage};
use jma_common::{Tile, TILE_SIZE};

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Bytes {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .expect("PNG encoding of an in-memory image");
    Bytes::from(buffer.into_inner())
}

/// A 256x256 tile filled with one colour.
pub fn solid_tile(color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba(color))
}

/// PNG bytes of `solid_tile`.
pub fn solid_tile_png(color: [u8; 4]) -> Bytes {
    encode_png(&solid_tile(color))
}

/// The colour `coded_tile` uses for a tile address.
///
/// Red and green carry the low byte of x and y; blue carries the zoom.
pub fn tile_color(tile: &Tile) -> [u8; 4] {
    [(tile.x % 256) as u8, (tile.y % 256) as u8, tile.zoom, 255]
}

/// A tile whose colour identifies its address.
pub fn coded_tile(tile: &Tile) -> RgbaImage {
    solid_tile(tile_color(tile))
}

/// A tile that is transparent except for a centred opaque square of
/// `size` pixels.
pub fn spot_tile(color: [u8; 4], size: u32) -> RgbaImage {
    let start = (TILE_SIZE - size.min(TILE_SIZE)) / 2;
    let end = start + size.min(TILE_SIZE);
    RgbaImage::from_fn(TILE_SIZE, TILE_SIZE, |x, y| {
        if (start..end).contains(&x) && (start..end).contains(&y) {
            Rgba(color)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Recover the tile address from the `/{z}/{x}/{y}.{ext}` tail of a tile URL.
pub fn tile_from_url(url: &str) -> Option<Tile> {
    let path = url.rsplit_once('.').map(|(path, _)| path)?;
    let mut parts = path.rsplit('/');
    let y = parts.next()?.parse().ok()?;
    let x = parts.next()?.parse().ok()?;
    let zoom = parts.next()?.parse().ok()?;
    Some(Tile::new(zoom, x, y))
}
