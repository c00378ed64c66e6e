use image::RgbImage;

use crate::error::{PosterError, Result};

/// ordered pages of one poster plus the resolution they were laid out at
///
/// Lives only for the duration of one conversion: it is handed straight to
/// a [`DocumentEncoder`] and dropped.
#[derive(Debug)]
pub struct Document {
    pages: Vec<RgbImage>,
    dpi: u32,
}

impl Document {
    /// fix page order (already row-major) and pair it with the DPI
    pub fn assemble(pages: Vec<RgbImage>, dpi: u32) -> Result<Self> {
        if pages.is_empty() {
            return Err(PosterError::EmptyDocument);
        }
        Ok(Document { pages, dpi })
    }

    pub fn pages(&self) -> &[RgbImage] {
        &self.pages
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// physical size of a page in PDF points (1/72 inch)
    pub fn page_size_pt(&self, index: usize) -> Option<(f32, f32)> {
        let page = self.pages.get(index)?;
        let scale = 72.0 / self.dpi as f32;
        Some((page.width() as f32 * scale, page.height() as f32 * scale))
    }
}

/// turns a finished document into bytes somewhere
pub trait DocumentEncoder {
    fn encode(&self, document: &Document) -> Result<()>;
}
