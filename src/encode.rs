use anyhow::{Context, Result};
use clap::ValueEnum;
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::document::{Document, DocumentEncoder};
use crate::error::PosterError;

/// PNG compression level
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum PngCompression {
    /// fastest encoding, larger files
    #[default]
    Fast,
    /// smaller files, slower encoding
    Small,
}

fn encode_failure(err: anyhow::Error) -> PosterError {
    PosterError::EncodeFailure(format!("{:#}", err))
}

/// multi-page PDF, one full-page RGB image per page
pub struct PdfEncoder {
    pub output: PathBuf,
    pub title: Option<String>,
    pub author: Option<String>,
    pub quiet: bool,
}

impl DocumentEncoder for PdfEncoder {
    fn encode(&self, document: &Document) -> crate::error::Result<()> {
        let mut pdf = build_pdf(
            document,
            self.title.as_deref(),
            self.author.as_deref(),
            self.quiet,
        )
        .map_err(encode_failure)?;
        write_pdf(&mut pdf, &self.output).map_err(encode_failure)
    }
}

/// zlib-compress a page's RGB samples for a FlateDecode image stream
fn compress_page(pixels: &[u8]) -> Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut enc = ZlibEncoder::new(Vec::with_capacity(pixels.len() / 2), Compression::fast());
    enc.write_all(pixels)?;
    Ok(enc.finish()?)
}

pub fn build_pdf(
    document: &Document,
    title: Option<&str>,
    author: Option<&str>,
    quiet: bool,
) -> Result<lopdf::Document> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let total = document.len();

    // phase 1 - parallel compression
    let compressed: Vec<Result<Vec<u8>>> = document
        .pages()
        .par_iter()
        .map(|page| compress_page(page.as_raw()))
        .collect();

    // phase 2 - sequential PDF assembly, in document order
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut page_ids: Vec<Object> = Vec::with_capacity(total);

    for (i, (page, data)) in document.pages().iter().zip(compressed).enumerate() {
        let data = data.with_context(|| format!("Failed to compress page {}", i + 1))?;
        let (page_w_pts, page_h_pts) = document
            .page_size_pt(i)
            .context("Page index out of range")?;

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => Object::Name(b"XObject".to_vec()),
                "Subtype" => Object::Name(b"Image".to_vec()),
                "Width" => page.width() as i64,
                "Height" => page.height() as i64,
                "ColorSpace" => Object::Name(b"DeviceRGB".to_vec()),
                "BitsPerComponent" => 8,
                "Filter" => Object::Name(b"FlateDecode".to_vec()),
                "Length" => data.len() as i64,
            },
            data,
        ));

        // image fills the whole page; margins are already part of the pixels
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(page_w_pts),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(page_h_pts),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content
                .encode()
                .context("Failed to encode content stream")?,
        ));

        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        });

        let page_id = doc.add_object(dictionary! {
            "Type" => Object::Name(b"Page".to_vec()),
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(page_w_pts),
                Object::Real(page_h_pts),
            ],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id.into());

        if !quiet {
            eprintln!("  [{}/{}] page {}", i + 1, total, i + 1);
        }
    }

    let count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => Object::Name(b"Pages".to_vec()),
            "Kids" => page_ids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => Object::Name(b"Catalog".to_vec()),
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info_dict = lopdf::Dictionary::new();
    info_dict.set(
        "Producer",
        Object::String(
            format!("posterize {}", env!("CARGO_PKG_VERSION")).into_bytes(),
            lopdf::StringFormat::Literal,
        ),
    );
    if let Some(date) = pdf_date_now() {
        info_dict.set(
            "CreationDate",
            Object::String(date.into_bytes(), lopdf::StringFormat::Literal),
        );
    }
    if let Some(t) = title {
        info_dict.set(
            "Title",
            Object::String(t.as_bytes().to_vec(), lopdf::StringFormat::Literal),
        );
    }
    if let Some(a) = author {
        info_dict.set(
            "Author",
            Object::String(a.as_bytes().to_vec(), lopdf::StringFormat::Literal),
        );
    }
    let info_id = doc.add_object(Object::Dictionary(info_dict));
    doc.trailer.set("Info", info_id);

    Ok(doc)
}

fn write_pdf(doc: &mut lopdf::Document, output: &Path) -> Result<()> {
    if output == Path::new("-") {
        let stdout = std::io::stdout();
        let mut out = std::io::BufWriter::new(stdout.lock());
        doc.save_to(&mut out)
            .context("Failed to write PDF to stdout")?;
        out.flush().context("Failed to flush stdout")?;
    } else {
        doc.save(output)
            .with_context(|| format!("Failed to save {}", output.display()))?;
    }
    Ok(())
}

/// PDF date string (D:YYYYMMDDHHmmSSZ) for the current UTC time
fn pdf_date_now() -> Option<String> {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs();
    Some(pdf_date(secs))
}

fn pdf_date(secs: u64) -> String {
    let days = secs / 86400;
    let time_of_day = secs % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;
    // civil-from-days
    let z = days + 719468;
    let era = z / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}Z",
        y, m, d, hours, minutes, seconds
    )
}

/// one PNG file per page, named `<stem>_NNNN.png` in document order
pub struct PngPagesEncoder {
    pub output_dir: PathBuf,
    pub stem: String,
    pub compress: PngCompression,
    pub quiet: bool,
}

impl PngPagesEncoder {
    pub fn page_path(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{:04}.png", self.stem, index + 1))
    }
}

impl DocumentEncoder for PngPagesEncoder {
    fn encode(&self, document: &Document) -> crate::error::Result<()> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Cannot create output dir: {}", self.output_dir.display()))
            .map_err(encode_failure)?;

        let total = document.len();
        let done_count = AtomicUsize::new(0);

        let errors: Vec<(usize, anyhow::Error)> = document
            .pages()
            .par_iter()
            .enumerate()
            .filter_map(|(i, page)| {
                let out_path = self.page_path(i);
                let result: Result<()> = (|| {
                    let file = std::fs::File::create(&out_path)
                        .with_context(|| format!("Failed to create {}", out_path.display()))?;
                    encode_png(
                        page.as_raw(),
                        page.width(),
                        page.height(),
                        document.dpi(),
                        self.compress,
                        file,
                    )
                })();
                if result.is_ok() && !self.quiet {
                    let done = done_count.fetch_add(1, Ordering::Relaxed) + 1;
                    eprintln!("  [{}/{}] {}", done, total, out_path.display());
                }
                result.err().map(|e| (i, e))
            })
            .collect();

        match errors.into_iter().next() {
            None => Ok(()),
            Some((page, err)) => Err(encode_failure(
                err.context(format!("Failed on page {}", page + 1)),
            )),
        }
    }
}

fn encode_png(
    data: &[u8],
    width: u32,
    height: u32,
    dpi: u32,
    compress: PngCompression,
    writer: impl Write,
) -> Result<()> {
    let writer = std::io::BufWriter::new(writer);
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    // pHYs so the page prints at its physical size
    let ppm = (dpi as f64 / 0.0254).round() as u32;
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: png::Unit::Meter,
    }));

    // - fast: fastest encoding, larger files (fdeflate + Paeth)
    // - small: smaller files, slower encoding (zlib + NoFilter)
    match compress {
        PngCompression::Fast => {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::Filter::Paeth);
        }
        PngCompression::Small => {
            encoder.set_compression(png::Compression::Balanced);
            encoder.set_filter(png::Filter::NoFilter);
        }
    }

    let mut writer = encoder
        .write_header()
        .context("Failed to write PNG header")?;
    writer
        .write_image_data(data)
        .context("Failed to encode PNG data")?;
    writer.finish().context("Failed to finish PNG")?;
    Ok(())
}
