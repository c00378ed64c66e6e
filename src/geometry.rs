use std::str::FromStr;

use crate::error::{PosterError, Result};

pub const MM_PER_INCH: f64 = 25.4;
pub const MIN_DPI: u32 = 72;

/// convert a physical length to whole pixels at the given resolution
///
/// Every physical length (page edges, margins) goes through here so a given
/// (size, dpi) pair always lands on the same pixel grid. Exact `.5` results
/// round to the even neighbour: an 8.5in Letter edge at 301 DPI is 2558px.
pub fn mm_to_px(length_mm: f64, dpi: u32) -> u32 {
    (length_mm / MM_PER_INCH * dpi as f64).round_ties_even() as u32
}

/// named physical page size, portrait dimensions in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub name: &'static str,
    pub width_mm: f64,
    pub height_mm: f64,
}

pub const PAGE_SIZES: &[PageSize] = &[
    PageSize {
        name: "A3",
        width_mm: 297.0,
        height_mm: 420.0,
    },
    PageSize {
        name: "A4",
        width_mm: 210.0,
        height_mm: 297.0,
    },
    PageSize {
        name: "A5",
        width_mm: 148.0,
        height_mm: 210.0,
    },
    PageSize {
        name: "Letter",
        width_mm: 215.9,
        height_mm: 279.4,
    },
    PageSize {
        name: "Legal",
        width_mm: 215.9,
        height_mm: 355.6,
    },
    PageSize {
        name: "Tabloid",
        width_mm: 279.4,
        height_mm: 431.8,
    },
];

impl PageSize {
    /// look up a configured size by name (case-insensitive)
    pub fn from_name(name: &str) -> Result<PageSize> {
        let wanted = name.trim();
        PAGE_SIZES
            .iter()
            .find(|size| size.name.eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| PosterError::UnsupportedPageSize(name.to_string()))
    }

    pub fn dimensions_mm(self, orientation: Orientation) -> (f64, f64) {
        match orientation {
            Orientation::Portrait => (self.width_mm, self.height_mm),
            Orientation::Landscape => (self.height_mm, self.width_mm),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    /// width and height swapped
    Landscape,
}

impl FromStr for Orientation {
    type Err = PosterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(PosterError::UnsupportedOrientation(s.to_string())),
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        })
    }
}

/// page resolved to pixels at a fixed DPI
///
/// Invariant: `margin_px * 2` is strictly less than both page dimensions, so
/// the printable tile area is never empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub size: PageSize,
    pub orientation: Orientation,
    pub margin_mm: f64,
    pub dpi: u32,
    pub width_px: u32,
    pub height_px: u32,
    pub margin_px: u32,
}

impl PageSpec {
    pub fn tile_area(&self) -> TileArea {
        TileArea {
            width: self.width_px - 2 * self.margin_px,
            height: self.height_px - 2 * self.margin_px,
        }
    }
}

/// printable pixel rectangle of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileArea {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub columns: u32,
    pub rows: u32,
}

impl GridSpec {
    pub fn new(columns: u32, rows: u32) -> Result<Self> {
        if columns < 1 || rows < 1 {
            return Err(PosterError::InvalidDimensions { columns, rows });
        }
        Ok(GridSpec { columns, rows })
    }

    pub fn page_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }
}

/// validate page parameters and convert them to pixels
pub fn resolve(
    page_size_name: &str,
    orientation: &str,
    margin_mm: f64,
    dpi: u32,
) -> Result<PageSpec> {
    if !margin_mm.is_finite() || margin_mm < 0.0 {
        return Err(PosterError::InvalidMargin(margin_mm));
    }
    if dpi < MIN_DPI {
        return Err(PosterError::InvalidResolution { dpi });
    }
    let size = PageSize::from_name(page_size_name)?;
    let orientation: Orientation = orientation.parse()?;

    let (width_mm, height_mm) = size.dimensions_mm(orientation);
    let width_px = mm_to_px(width_mm, dpi);
    let height_px = mm_to_px(height_mm, dpi);
    let margin_px = mm_to_px(margin_mm, dpi);

    // u64 so absurd margins cannot wrap
    let doubled = margin_px as u64 * 2;
    if doubled >= width_px as u64 || doubled >= height_px as u64 {
        return Err(PosterError::MarginTooLarge {
            margin_px,
            page_width_px: width_px,
            page_height_px: height_px,
        });
    }

    log::debug!(
        "resolved {} {} at {} DPI: page {}x{}px, margin {}px",
        size.name,
        orientation,
        dpi,
        width_px,
        height_px,
        margin_px
    );

    Ok(PageSpec {
        size,
        orientation,
        margin_mm,
        dpi,
        width_px,
        height_px,
        margin_px,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_to_px_one_inch() {
        assert_eq!(mm_to_px(25.4, 300), 300);
        assert_eq!(mm_to_px(25.4, 72), 72);
    }

    #[test]
    fn mm_to_px_a4_width() {
        assert_eq!(mm_to_px(210.0, 300), 2480);
        assert_eq!(mm_to_px(297.0, 300), 3508);
    }

    #[test]
    fn mm_to_px_ties_round_to_even() {
        // 8.5in at 301 DPI is exactly 2558.5px
        assert_eq!(mm_to_px(215.9, 301), 2558);
        // half an inch at 73 DPI is exactly 36.5px
        assert_eq!(mm_to_px(12.7, 73), 36);
        assert_eq!(mm_to_px(12.7, 75), 38);
    }

    #[test]
    fn resolve_letter_odd_dpi_ties() {
        let spec = resolve("Letter", "portrait", 12.7, 73).unwrap();
        assert_eq!((spec.width_px, spec.margin_px), (620, 36));
    }

    #[test]
    fn mm_to_px_zero() {
        assert_eq!(mm_to_px(0.0, 600), 0);
    }

    #[test]
    fn page_size_lookup_ignores_case() {
        assert_eq!(PageSize::from_name("a4").unwrap().name, "A4");
        assert_eq!(PageSize::from_name("LETTER").unwrap().name, "Letter");
        assert_eq!(PageSize::from_name(" Legal ").unwrap().name, "Legal");
    }

    #[test]
    fn page_size_lookup_unknown() {
        match PageSize::from_name("B5") {
            Err(PosterError::UnsupportedPageSize(name)) => assert_eq!(name, "B5"),
            other => panic!("expected UnsupportedPageSize, got {:?}", other),
        }
    }

    #[test]
    fn page_sizes_are_portrait() {
        for size in PAGE_SIZES {
            assert!(size.height_mm > size.width_mm, "{}", size.name);
        }
    }

    #[test]
    fn orientation_parse() {
        assert_eq!("portrait".parse::<Orientation>().unwrap(), Orientation::Portrait);
        assert_eq!("Landscape".parse::<Orientation>().unwrap(), Orientation::Landscape);
        assert!(matches!(
            "sideways".parse::<Orientation>(),
            Err(PosterError::UnsupportedOrientation(_))
        ));
    }

    #[test]
    fn resolve_a4_portrait_300() {
        let spec = resolve("A4", "portrait", 0.0, 300).unwrap();
        assert_eq!((spec.width_px, spec.height_px, spec.margin_px), (2480, 3508, 0));
        assert_eq!(spec.tile_area(), TileArea { width: 2480, height: 3508 });
    }

    #[test]
    fn resolve_landscape_swaps() {
        let spec = resolve("A4", "landscape", 10.0, 300).unwrap();
        assert_eq!((spec.width_px, spec.height_px), (3508, 2480));
        assert_eq!(spec.margin_px, 118);
        assert_eq!(spec.tile_area(), TileArea { width: 3272, height: 2244 });
    }

    #[test]
    fn resolve_letter_72() {
        let spec = resolve("Letter", "portrait", 0.0, 72).unwrap();
        assert_eq!((spec.width_px, spec.height_px), (612, 792));
    }

    #[test]
    fn resolve_rejects_low_dpi() {
        assert!(matches!(
            resolve("A4", "portrait", 10.0, 71),
            Err(PosterError::InvalidResolution { dpi: 71 })
        ));
    }

    #[test]
    fn resolve_rejects_negative_margin() {
        assert!(matches!(
            resolve("A4", "portrait", -1.0, 300),
            Err(PosterError::InvalidMargin(_))
        ));
        assert!(matches!(
            resolve("A4", "portrait", f64::NAN, 300),
            Err(PosterError::InvalidMargin(_))
        ));
    }

    #[test]
    fn resolve_margin_too_large() {
        match resolve("A4", "portrait", 150.0, 72) {
            Err(PosterError::MarginTooLarge {
                margin_px,
                page_width_px,
                page_height_px,
            }) => {
                assert_eq!(margin_px, 425);
                assert_eq!(page_width_px, 595);
                assert_eq!(page_height_px, 842);
            }
            other => panic!("expected MarginTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn resolve_margin_exactly_half_is_too_large() {
        // 105mm on each side of a 210mm page leaves nothing
        assert!(matches!(
            resolve("A4", "portrait", 105.0, 300),
            Err(PosterError::MarginTooLarge { .. })
        ));
    }

    #[test]
    fn grid_spec_rejects_zero() {
        assert!(matches!(
            GridSpec::new(0, 3),
            Err(PosterError::InvalidDimensions { columns: 0, rows: 3 })
        ));
        assert!(GridSpec::new(1, 0).is_err());
        assert_eq!(GridSpec::new(3, 2).unwrap().page_count(), 6);
    }
}
