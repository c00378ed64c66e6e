use thiserror::Error;

/// every way a single poster conversion can fail
///
/// All variants are request-local: the caller gets enough context (field and
/// offending value) to tell the user what to fix.
#[derive(Error, Debug)]
pub enum PosterError {
    #[error("columns and rows must be at least 1 (got {columns} x {rows})")]
    InvalidDimensions { columns: u32, rows: u32 },

    #[error("margin must be a non-negative number of millimetres (got {0})")]
    InvalidMargin(f64),

    #[error("DPI must be at least 72 (got {dpi})")]
    InvalidResolution { dpi: u32 },

    #[error("unsupported page size '{0}' (run `posterize page-sizes` for the list)")]
    UnsupportedPageSize(String),

    #[error("orientation must be portrait or landscape (got '{0}')")]
    UnsupportedOrientation(String),

    #[error(
        "margin too large for the selected page: {margin_px}px on each side of a \
         {page_width_px}x{page_height_px}px page leaves no printable area"
    )]
    MarginTooLarge {
        margin_px: u32,
        page_width_px: u32,
        page_height_px: u32,
    },

    #[error("failed to decode image: {0}")]
    DecodeFailure(#[from] image::ImageError),

    #[error("failed to encode document: {0}")]
    EncodeFailure(String),

    #[error("document has no pages")]
    EmptyDocument,
}

pub type Result<T> = std::result::Result<T, PosterError>;
