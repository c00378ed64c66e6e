use image::{imageops, RgbImage};
use rayon::prelude::*;

use crate::geometry::{GridSpec, PageSpec, TileArea};
use crate::mosaic::BACKGROUND;

/// pixel rectangle of one grid cell inside the mosaic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub row: u32,
    pub col: u32,
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl TileRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

pub fn tile_rect(tile: TileArea, row: u32, col: u32) -> TileRect {
    TileRect {
        row,
        col,
        left: col * tile.width,
        top: row * tile.height,
        right: (col + 1) * tile.width,
        bottom: (row + 1) * tile.height,
    }
}

/// all tile rectangles in document order (row-major)
pub fn tile_rects(tile: TileArea, grid: GridSpec) -> Vec<TileRect> {
    (0..grid.rows)
        .flat_map(|row| (0..grid.columns).map(move |col| tile_rect(tile, row, col)))
        .collect()
}

/// cut the mosaic into tiles and place each one inside its page margins
///
/// Tiles are independent so they are assembled in parallel; the indexed
/// collect keeps page `row * columns + col` at that position regardless of
/// which worker finished first.
pub fn assemble_pages(
    mosaic: &RgbImage,
    tile: TileArea,
    grid: GridSpec,
    page: &PageSpec,
) -> Vec<RgbImage> {
    debug_assert_eq!(mosaic.width(), tile.width * grid.columns);
    debug_assert_eq!(mosaic.height(), tile.height * grid.rows);

    tile_rects(tile, grid)
        .into_par_iter()
        .map(|rect| {
            log::trace!(
                "page r{}c{}: mosaic [{}, {}) x [{}, {})",
                rect.row,
                rect.col,
                rect.left,
                rect.right,
                rect.top,
                rect.bottom
            );
            let cut = imageops::crop_imm(mosaic, rect.left, rect.top, rect.width(), rect.height())
                .to_image();
            let mut canvas = RgbImage::from_pixel(page.width_px, page.height_px, BACKGROUND);
            let offset = page.margin_px as i64;
            imageops::replace(&mut canvas, &cut, offset, offset);
            canvas
        })
        .collect()
}
