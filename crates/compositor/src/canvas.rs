//! Tile grid derivation and canvas assembly.
//!
//! A request is a fractional tile-space centre plus an output size in
//! pixels. The grid is the smallest block of whole tiles covering that
//! window; the assembled canvas is cropped back to the exact window so the
//! requested point sits at the centre of the output with sub-tile precision.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use image::RgbaImage;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use jma_common::{
    tiles_per_axis, JmaError, JmaResult, Rect, Tile, TileCoordinate, TileFetcher, TileLayer,
    MAX_ZOOM, TILE_SIZE,
};

/// The block of tiles covering an output window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileGrid {
    /// Fractional centre the window is built around
    pub center: TileCoordinate,
    /// Column of the left-most tile; may be negative before wrapping
    pub min_x: i64,
    /// Row of the top-most tile; may lie beyond the poles
    pub min_y: i64,
    pub columns: u32,
    pub rows: u32,
}

/// One cell of a grid. `tile` is `None` for rows beyond the poles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub column: u32,
    pub row: u32,
    pub tile: Option<Tile>,
}

impl TileGrid {
    /// Smallest grid covering `rect` pixels centred on `center`.
    ///
    /// Per axis the grid spans `floor(c - w/2)` up to the tile holding the
    /// far edge. A far edge that falls exactly on a tile boundary needs no
    /// extra tile, which is what keeps a single tile centred on its own
    /// centroid a 1x1 grid.
    pub fn covering(center: TileCoordinate, rect: Rect) -> JmaResult<Self> {
        rect.validate()?;
        if center.zoom > MAX_ZOOM {
            return Err(JmaError::InvalidZoom(center.zoom));
        }
        // Longitudes just below 180 can project onto x == 2^zoom
        let n = tiles_per_axis(center.zoom) as f64;
        let center = TileCoordinate::new(center.zoom, center.x.rem_euclid(n), center.y);
        if !center.is_valid() {
            let geo = center.to_geo();
            return Err(JmaError::InvalidCoordinate {
                lat: geo.lat,
                lon: geo.lon,
            });
        }

        let tile_size = TILE_SIZE as f64;
        let (min_x, columns) = axis_span(center.x, rect.width as f64 / tile_size);
        let (min_y, rows) = axis_span(center.y, rect.height as f64 / tile_size);
        if columns.checked_mul(TILE_SIZE).is_none() || rows.checked_mul(TILE_SIZE).is_none() {
            return Err(JmaError::InvalidRect {
                width: rect.width,
                height: rect.height,
            });
        }

        Ok(Self {
            center,
            min_x,
            min_y,
            columns,
            rows,
        })
    }

    pub fn zoom(&self) -> u8 {
        self.center.zoom
    }

    pub fn pixel_width(&self) -> u32 {
        self.columns * TILE_SIZE
    }

    pub fn pixel_height(&self) -> u32 {
        self.rows * TILE_SIZE
    }

    /// Cells in row-major order. Columns wrap around the antimeridian.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        let n = tiles_per_axis(self.zoom()) as i64;
        let zoom = self.zoom();
        (0..self.rows).flat_map(move |row| {
            (0..self.columns).map(move |column| {
                let x = (self.min_x + column as i64).rem_euclid(n);
                let y = self.min_y + row as i64;
                let tile = (0..n)
                    .contains(&y)
                    .then(|| Tile::new(zoom, x as u32, y as u32));
                GridCell { column, row, tile }
            })
        })
    }

    /// Distinct tiles that have to be fetched.
    pub fn tiles(&self) -> Vec<Tile> {
        self.cells().filter_map(|cell| cell.tile).collect()
    }

    /// Top-left corner of the `rect` crop inside the assembled canvas,
    /// placing the grid's fractional centre at the centre of the crop.
    pub fn crop_origin(&self, rect: Rect) -> (u32, u32) {
        let tile_size = TILE_SIZE as f64;
        let left = (self.center.x - self.min_x as f64) * tile_size - rect.width as f64 / 2.0;
        let top = (self.center.y - self.min_y as f64) * tile_size - rect.height as f64 / 2.0;

        let max_left = self.pixel_width().saturating_sub(rect.width);
        let max_top = self.pixel_height().saturating_sub(rect.height);
        (
            (left.floor().max(0.0) as u32).min(max_left),
            (top.floor().max(0.0) as u32).min(max_top),
        )
    }
}

fn axis_span(center: f64, window: f64) -> (i64, u32) {
    let first = (center - window / 2.0).floor();
    let end = (center + window / 2.0).ceil();
    (first as i64, (end - first).max(1.0) as u32)
}

struct FetchedTile {
    column: u32,
    row: u32,
    url: String,
    bytes: Bytes,
}

/// Fetches a grid of tiles for one layer and stitches them into a canvas.
#[derive(Clone)]
pub struct CanvasAssembler {
    fetcher: Arc<dyn TileFetcher>,
    max_concurrent: usize,
}

impl CanvasAssembler {
    pub fn new(fetcher: Arc<dyn TileFetcher>, max_concurrent: usize) -> Self {
        Self {
            fetcher,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetch every tile of `grid` in `layer` and crop the stitched canvas to
    /// exactly `rect` pixels.
    ///
    /// The first failed fetch or decode aborts the whole assembly.
    #[instrument(skip(self, grid, layer), fields(layer = layer.name(), zoom = grid.zoom(), columns = grid.columns, rows = grid.rows))]
    pub async fn assemble(&self, grid: &TileGrid, layer: &TileLayer, rect: Rect) -> JmaResult<RgbaImage> {
        let requests = grid
            .cells()
            .filter_map(|cell| {
                cell.tile
                    .map(|tile| tile.url(layer).map(|url| (cell.column, cell.row, url)))
            })
            .collect::<JmaResult<Vec<_>>>()?;

        let fetcher = &self.fetcher;
        let fetched: Vec<FetchedTile> = stream::iter(requests)
            .map(|(column, row, url)| async move {
                let bytes = fetcher.fetch(&url).await?;
                debug!(url = %url, size = bytes.len(), "Fetched tile");
                Ok::<_, JmaError>(FetchedTile {
                    column,
                    row,
                    url,
                    bytes,
                })
            })
            .buffer_unordered(self.max_concurrent)
            .try_collect()
            .await?;

        let grid = *grid;
        tokio::task::spawn_blocking(move || stitch(&grid, fetched, rect))
            .await
            .map_err(|e| JmaError::Internal(format!("Canvas stitching task failed: {}", e)))?
    }
}

/// Decode tiles in parallel, paste them into one canvas and crop.
fn stitch(grid: &TileGrid, tiles: Vec<FetchedTile>, rect: Rect) -> JmaResult<RgbaImage> {
    let decoded = tiles
        .into_par_iter()
        .map(|tile| decode_tile(&tile.url, &tile.bytes).map(|image| (tile.column, tile.row, image)))
        .collect::<JmaResult<Vec<_>>>()?;

    let mut by_row: Vec<Vec<(u32, RgbaImage)>> = vec![Vec::new(); grid.rows as usize];
    for (column, row, image) in decoded {
        by_row[row as usize].push((column, image));
    }

    let width = grid.pixel_width();
    let height = grid.pixel_height();
    let tile_size = TILE_SIZE as usize;
    let stride = width as usize * 4;
    let band_len = stride * tile_size;
    let line_len = tile_size * 4;

    // Each band is one row of tiles; bands are disjoint so rows are pasted
    // in parallel without locking.
    let mut pixels = vec![0u8; band_len * grid.rows as usize];
    pixels
        .par_chunks_mut(band_len)
        .zip(by_row.par_iter())
        .for_each(|(band, tiles)| {
            for (column, image) in tiles {
                let src = image.as_raw();
                let offset = *column as usize * line_len;
                for line in 0..tile_size {
                    let dst_start = line * stride + offset;
                    band[dst_start..dst_start + line_len]
                        .copy_from_slice(&src[line * line_len..(line + 1) * line_len]);
                }
            }
        });

    let canvas = RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| JmaError::Internal(format!("Canvas buffer does not match {}x{}", width, height)))?;

    let (left, top) = grid.crop_origin(rect);
    Ok(image::imageops::crop_imm(&canvas, left, top, rect.width, rect.height).to_image())
}

fn decode_tile(url: &str, bytes: &[u8]) -> JmaResult<RgbaImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| JmaError::decode(url, e))?
        .to_rgba8();

    if image.dimensions() != (TILE_SIZE, TILE_SIZE) {
        return Err(JmaError::decode(
            url,
            format!(
                "expected a {}x{} tile, got {}x{}",
                TILE_SIZE,
                TILE_SIZE,
                image.width(),
                image.height()
            ),
        ));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jma_common::GeoCoordinate;
    use test_utils::assert_approx_eq;

    fn grid_for(center: TileCoordinate, width: u32, height: u32) -> TileGrid {
        TileGrid::covering(center, Rect::new(width, height)).unwrap()
    }

    #[test]
    fn test_tile_centroid_is_single_tile() {
        let tile = Tile::new(8, 227, 101);
        let grid = grid_for(tile.centroid(), 256, 256);
        assert_eq!((grid.min_x, grid.min_y), (227, 101));
        assert_eq!((grid.columns, grid.rows), (1, 1));
        assert_eq!(grid.crop_origin(Rect::tile()), (0, 0));
        assert_eq!(grid.tiles(), vec![tile]);
    }

    #[test]
    fn test_tile_centroid_with_even_window() {
        // 512px around a centroid spans half a tile on each side of a 2-tile
        // window, so three tiles per axis are needed.
        let grid = grid_for(Tile::new(8, 227, 101).centroid(), 512, 512);
        assert_eq!((grid.min_x, grid.min_y), (226, 100));
        assert_eq!((grid.columns, grid.rows), (3, 3));
        assert_eq!(grid.crop_origin(Rect::new(512, 512)), (128, 128));
    }

    #[test]
    fn test_tile_centroid_with_odd_window() {
        let grid = grid_for(Tile::new(8, 227, 101).centroid(), 768, 256);
        assert_eq!((grid.columns, grid.rows), (3, 1));
        assert_eq!(grid.min_x, 226);
        assert_eq!(grid.crop_origin(Rect::new(768, 256)), (0, 0));
    }

    #[test]
    fn test_off_centre_point_adds_edge_tile() {
        let center = TileCoordinate::new(10, 500.25, 300.75);
        let grid = grid_for(center, 256, 256);
        assert_eq!((grid.min_x, grid.min_y), (499, 300));
        assert_eq!((grid.columns, grid.rows), (2, 2));
        // Centre sits at (1.25 * 256, 0.75 * 256) = (320, 192) in the canvas
        assert_eq!(grid.crop_origin(Rect::tile()), (192, 64));
    }

    #[test]
    fn test_crop_always_inside_canvas() {
        let sizes = [1u32, 2, 255, 256, 257, 511, 512, 600, 800, 1000];
        let fractions = [0.0, 0.001, 0.25, 0.5, 0.75, 0.999];

        for &fx in &fractions {
            for &fy in &fractions {
                let center = TileCoordinate::new(12, 2000.0 + fx, 1500.0 + fy);
                for &w in &sizes {
                    for &h in &sizes {
                        let rect = Rect::new(w, h);
                        let grid = grid_for(center, w, h);
                        let (left, top) = grid.crop_origin(rect);
                        assert!(left + w <= grid.pixel_width(), "{:?} {:?}", center, rect);
                        assert!(top + h <= grid.pixel_height(), "{:?} {:?}", center, rect);

                        // The true centre lands within a pixel of the crop centre
                        let cx = (center.x - grid.min_x as f64) * 256.0 - left as f64;
                        let cy = (center.y - grid.min_y as f64) * 256.0 - top as f64;
                        assert_approx_eq!(cx, w as f64 / 2.0, 1.0, "{:?} {:?}", center, rect);
                        assert_approx_eq!(cy, h as f64 / 2.0, 1.0, "{:?} {:?}", center, rect);
                    }
                }
            }
        }
    }

    #[test]
    fn test_columns_wrap_at_antimeridian() {
        let center = GeoCoordinate::new(0.0, -179.9).to_tile_coordinate(2).unwrap();
        let grid = grid_for(center, 512, 256);
        let xs: Vec<u32> = grid.tiles().iter().map(|t| t.x).collect();
        assert!(xs.contains(&3));
        assert!(xs.contains(&0));
        assert_eq!(grid.min_x, -1);
    }

    #[test]
    fn test_rows_beyond_poles_have_no_tile() {
        let center = Tile::new(0, 0, 0).centroid();
        let grid = grid_for(center, 256, 768);
        assert_eq!(grid.rows, 3);
        let cells: Vec<GridCell> = grid.cells().collect();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].tile, None);
        assert_eq!(cells[1].tile, Some(Tile::new(0, 0, 0)));
        assert_eq!(cells[2].tile, None);
    }

    #[test]
    fn test_invalid_requests() {
        let center = Tile::new(3, 1, 1).centroid();
        assert!(matches!(
            TileGrid::covering(center, Rect::new(0, 256)),
            Err(JmaError::InvalidRect { .. })
        ));
        assert!(matches!(
            TileGrid::covering(TileCoordinate::new(3, 1.0, 9.0), Rect::tile()),
            Err(JmaError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_last_longitude_before_antimeridian() {
        let coord = GeoCoordinate::new(jma_common::MAX_LATITUDE, 179.99999999999997);
        for zoom in [0u8, 3, 18] {
            let center = coord.to_tile_coordinate(zoom).unwrap();
            let grid = TileGrid::covering(center, Rect::tile())
                .unwrap_or_else(|e| panic!("zoom {}: {}", zoom, e));
            assert!(grid.center.x < tiles_per_axis(zoom) as f64);
            assert!(grid.tiles().iter().all(|t| t.is_valid()));
        }
    }

    #[test]
    fn test_oversized_rect_is_rejected() {
        let center = Tile::new(3, 1, 1).centroid();
        assert!(matches!(
            TileGrid::covering(center, Rect::new(u32::MAX, 256)),
            Err(JmaError::InvalidRect { .. })
        ));
        assert!(matches!(
            TileGrid::covering(center, Rect::new(256, u32::MAX - 100)),
            Err(JmaError::InvalidRect { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage_and_wrong_size() {
        let err = decode_tile("u", b"not a png").unwrap_err();
        assert!(matches!(err, JmaError::DecodeFailure { .. }));

        let mut png = std::io::Cursor::new(Vec::new());
        RgbaImage::new(10, 10)
            .write_to(&mut png, image::ImageOutputFormat::Png)
            .unwrap();
        let err = decode_tile("u", png.get_ref()).unwrap_err();
        assert!(err.to_string().contains("expected a 256x256 tile"));
    }
}
