use image::{imageops, Rgb, RgbImage};

use crate::geometry::TileArea;

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// where the source lands in the mosaic
///
/// The source is never scaled. Each axis is handled on its own: a source
/// larger than the grid is center-cropped, a smaller one is centered on
/// background padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    pub target_w: u32,
    pub target_h: u32,
    pub crop_left: u32,
    pub crop_top: u32,
    pub crop_w: u32,
    pub crop_h: u32,
    pub paste_x: u32,
    pub paste_y: u32,
}

impl CropPlan {
    pub fn new(source_w: u32, source_h: u32, target_w: u32, target_h: u32) -> Self {
        let crop_w = source_w.min(target_w);
        let crop_h = source_h.min(target_h);
        CropPlan {
            target_w,
            target_h,
            crop_left: (source_w - crop_w) / 2,
            crop_top: (source_h - crop_h) / 2,
            crop_w,
            crop_h,
            paste_x: (target_w - crop_w) / 2,
            paste_y: (target_h - crop_h) / 2,
        }
    }

    pub fn for_grid(source_w: u32, source_h: u32, tile: TileArea, columns: u32, rows: u32) -> Self {
        Self::new(source_w, source_h, tile.width * columns, tile.height * rows)
    }

    /// how many tiles the visible artwork spans on each axis
    pub fn footprint(&self, tile: TileArea) -> (f64, f64) {
        (
            self.crop_w as f64 / tile.width as f64,
            self.crop_h as f64 / tile.height as f64,
        )
    }
}

/// build the full-grid canvas with the source centered on it
pub fn compose(source: &RgbImage, tile: TileArea, columns: u32, rows: u32) -> RgbImage {
    let plan = CropPlan::for_grid(source.width(), source.height(), tile, columns, rows);
    log::debug!(
        "mosaic {}x{}: crop {}x{} at ({}, {}) from {}x{} source, paste at ({}, {})",
        plan.target_w,
        plan.target_h,
        plan.crop_w,
        plan.crop_h,
        plan.crop_left,
        plan.crop_top,
        source.width(),
        source.height(),
        plan.paste_x,
        plan.paste_y
    );

    let mut mosaic = RgbImage::from_pixel(plan.target_w, plan.target_h, BACKGROUND);
    let cover = imageops::crop_imm(source, plan.crop_left, plan.crop_top, plan.crop_w, plan.crop_h)
        .to_image();
    imageops::replace(&mut mosaic, &cover, plan.paste_x as i64, plan.paste_y as i64);
    mosaic
}
