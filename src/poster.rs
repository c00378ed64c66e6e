use image::RgbImage;

use crate::document::Document;
use crate::error::{PosterError, Result};
use crate::geometry::{resolve, GridSpec, PageSpec, TileArea};
use crate::mosaic::{compose, CropPlan};
use crate::tiles::assemble_pages;

/// every configuration input of one conversion
#[derive(Debug, Clone, PartialEq)]
pub struct PosterRequest {
    pub columns: u32,
    pub rows: u32,
    pub page_size: String,
    pub orientation: String,
    pub margin_mm: f64,
    pub dpi: u32,
}

impl Default for PosterRequest {
    fn default() -> Self {
        PosterRequest {
            columns: 3,
            rows: 3,
            page_size: "A4".to_string(),
            orientation: "portrait".to_string(),
            margin_mm: 10.0,
            dpi: 300,
        }
    }
}

/// validated, image-independent plan of a conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub grid: GridSpec,
    pub page: PageSpec,
    pub tile: TileArea,
}

impl Layout {
    /// run every check up front so no image work starts on a bad request
    pub fn plan(request: &PosterRequest) -> Result<Self> {
        let grid = GridSpec::new(request.columns, request.rows)?;
        let page = resolve(
            &request.page_size,
            &request.orientation,
            request.margin_mm,
            request.dpi,
        )?;
        let tile = page.tile_area();

        // the mosaic has to be addressable with u32 pixel coordinates
        let fits = tile.width.checked_mul(grid.columns).is_some()
            && tile.height.checked_mul(grid.rows).is_some();
        if !fits {
            return Err(PosterError::InvalidDimensions {
                columns: grid.columns,
                rows: grid.rows,
            });
        }

        Ok(Layout { grid, page, tile })
    }

    pub fn mosaic_size(&self) -> (u32, u32) {
        (
            self.tile.width * self.grid.columns,
            self.tile.height * self.grid.rows,
        )
    }

    pub fn crop_plan(&self, source_w: u32, source_h: u32) -> CropPlan {
        CropPlan::for_grid(source_w, source_h, self.tile, self.grid.columns, self.grid.rows)
    }

    /// lay an already decoded image out onto pages
    pub fn render(&self, source: &RgbImage) -> Result<Document> {
        let mosaic = compose(source, self.tile, self.grid.columns, self.grid.rows);
        let pages = assemble_pages(&mosaic, self.tile, self.grid, &self.page);
        drop(mosaic);
        Document::assemble(pages, self.page.dpi)
    }
}

/// decode `image_bytes` and tile it per `request`
pub fn generate_document(image_bytes: &[u8], request: &PosterRequest) -> Result<Document> {
    let layout = Layout::plan(request)?;
    let source = image::load_from_memory(image_bytes)?.into_rgb8();
    log::debug!(
        "decoded {}x{} source for a {}x{} grid",
        source.width(),
        source.height(),
        layout.grid.columns,
        layout.grid.rows
    );
    layout.render(&source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::io::Cursor;

    fn request(columns: u32, rows: u32, margin_mm: f64, dpi: u32) -> PosterRequest {
        PosterRequest {
            columns,
            rows,
            margin_mm,
            dpi,
            ..PosterRequest::default()
        }
    }

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn defaults_match_form_defaults() {
        let req = PosterRequest::default();
        assert_eq!((req.columns, req.rows, req.dpi), (3, 3, 300));
        assert_eq!(req.margin_mm, 10.0);
        assert_eq!(req.page_size, "A4");
        assert_eq!(req.orientation, "portrait");
    }

    #[test]
    fn plan_end_to_end_scenario() {
        let layout = Layout::plan(&request(2, 1, 0.0, 300)).unwrap();
        assert_eq!(layout.tile, TileArea { width: 2480, height: 3508 });
        assert_eq!(layout.mosaic_size(), (4960, 3508));
        let crop = layout.crop_plan(5000, 4000);
        assert_eq!((crop.crop_w, crop.crop_h), (4960, 3508));
        assert_eq!((crop.crop_left, crop.crop_top), (20, 246));
    }

    #[test]
    fn render_end_to_end_scenario() {
        // 5000x4000 source on 2x1 A4 portrait at 300 DPI with no margin
        let layout = Layout::plan(&request(2, 1, 0.0, 300)).unwrap();
        let source = RgbImage::from_fn(5000, 4000, |x, y| {
            Rgb([(x / 256) as u8, (x % 256) as u8, (y % 256) as u8])
        });
        let column = |x: u32, y: u32| Rgb([(x / 256) as u8, (x % 256) as u8, (y % 256) as u8]);

        let doc = layout.render(&source).unwrap();
        assert_eq!(doc.len(), 2);
        let (first, second) = (&doc.pages()[0], &doc.pages()[1]);
        assert_eq!(first.dimensions(), (2480, 3508));
        assert_eq!(second.dimensions(), (2480, 3508));
        // crop starts at (20, 246); page 1 picks up at mosaic column 2480
        assert_eq!(*first.get_pixel(0, 0), column(20, 246));
        assert_eq!(*first.get_pixel(2479, 3507), column(2499, 3753));
        assert_eq!(*second.get_pixel(0, 0), column(2500, 246));
        assert_eq!(*second.get_pixel(2479, 3507), column(4979, 3753));
    }

    #[test]
    fn plan_rejects_zero_columns_before_anything_else() {
        let mut req = request(0, 1, -5.0, 10);
        req.page_size = "Nope".into();
        assert!(matches!(
            Layout::plan(&req),
            Err(PosterError::InvalidDimensions { columns: 0, rows: 1 })
        ));
    }

    #[test]
    fn validation_happens_before_decoding() {
        // garbage bytes, but the margin error wins
        let err = generate_document(b"not an image", &request(1, 1, 150.0, 72)).unwrap_err();
        assert!(matches!(err, PosterError::MarginTooLarge { .. }));
    }

    #[test]
    fn undecodable_bytes_are_decode_failure() {
        let err = generate_document(b"not an image", &request(1, 1, 0.0, 72)).unwrap_err();
        assert!(matches!(err, PosterError::DecodeFailure(_)));
    }

    #[test]
    fn unsupported_names_surface() {
        let mut req = request(1, 1, 0.0, 72);
        req.page_size = "B5".into();
        assert!(matches!(
            Layout::plan(&req),
            Err(PosterError::UnsupportedPageSize(_))
        ));
        let mut req = request(1, 1, 0.0, 72);
        req.orientation = "upside-down".into();
        assert!(matches!(
            Layout::plan(&req),
            Err(PosterError::UnsupportedOrientation(_))
        ));
    }

    #[test]
    fn two_by_two_pages_are_row_major() {
        // A4 portrait at 72 DPI, no margin: 595x842 tiles
        let layout = Layout::plan(&request(2, 2, 0.0, 72)).unwrap();
        let (w, h) = layout.mosaic_size();
        let tile = layout.tile;
        // source exactly the mosaic size, quadrants coloured by (row, col)
        let source = RgbImage::from_fn(w, h, |x, y| {
            Rgb([(y / tile.height) as u8 * 100, (x / tile.width) as u8 * 100, 50])
        });
        let doc = generate_document(&png_bytes(&source), &layout_request(&layout)).unwrap();
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.dpi(), 72);
        let corners: Vec<Rgb<u8>> = doc.pages().iter().map(|p| *p.get_pixel(10, 10)).collect();
        assert_eq!(
            corners,
            vec![
                Rgb([0, 0, 50]),
                Rgb([0, 100, 50]),
                Rgb([100, 0, 50]),
                Rgb([100, 100, 50]),
            ]
        );
    }

    fn layout_request(layout: &Layout) -> PosterRequest {
        request(layout.grid.columns, layout.grid.rows, layout.page.margin_mm, layout.page.dpi)
    }

    #[test]
    fn small_source_is_centered_on_white() {
        let layout = Layout::plan(&request(1, 1, 0.0, 72)).unwrap();
        let source = RgbImage::from_pixel(95, 42, Rgb([0, 0, 0]));
        let doc = layout.render(&source).unwrap();
        let page = &doc.pages()[0];
        assert_eq!(page.dimensions(), (595, 842));
        // (595 - 95) / 2 = 250, (842 - 42) / 2 = 400
        assert_eq!(*page.get_pixel(249, 420), Rgb([255, 255, 255]));
        assert_eq!(*page.get_pixel(250, 400), Rgb([0, 0, 0]));
        assert_eq!(*page.get_pixel(344, 441), Rgb([0, 0, 0]));
        assert_eq!(*page.get_pixel(345, 441), Rgb([255, 255, 255]));
        assert_eq!(*page.get_pixel(300, 442), Rgb([255, 255, 255]));
    }

    #[test]
    fn margin_offsets_tile_on_every_page() {
        // Letter landscape 72 DPI: 792x612, 20mm -> 57px margin
        let mut req = request(2, 1, 20.0, 72);
        req.page_size = "letter".into();
        req.orientation = "LANDSCAPE".into();
        let layout = Layout::plan(&req).unwrap();
        let page = &layout.page;
        assert_eq!((page.width_px, page.height_px, page.margin_px), (792, 612, 57));
        let (w, h) = layout.mosaic_size();
        let source = RgbImage::from_pixel(w, h, Rgb([10, 20, 30]));
        let doc = layout.render(&source).unwrap();
        for page in doc.pages() {
            assert_eq!(*page.get_pixel(56, 300), Rgb([255, 255, 255]));
            assert_eq!(*page.get_pixel(57, 57), Rgb([10, 20, 30]));
            assert_eq!(*page.get_pixel(792 - 58, 612 - 58), Rgb([10, 20, 30]));
            assert_eq!(*page.get_pixel(792 - 57, 300), Rgb([255, 255, 255]));
        }
    }
}
