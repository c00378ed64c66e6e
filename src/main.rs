#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod document;
mod encode;
mod error;
mod geometry;
mod mosaic;
mod poster;
mod tiles;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

use document::DocumentEncoder;
use encode::{PdfEncoder, PngCompression, PngPagesEncoder};
use poster::{Layout, PosterRequest};

#[derive(Parser)]
#[command(
    name = "posterize",
    version,
    about = "Split one image into a grid of printable poster pages"
)]
struct Cli {
    /// num parallel threads (default number of CPUs)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,

    /// suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LayoutArgs {
    /// pages across
    #[arg(short, long, default_value_t = 3)]
    columns: u32,

    /// pages down
    #[arg(short, long, default_value_t = 3)]
    rows: u32,

    /// page size name (see `page-sizes`)
    #[arg(long, default_value = "A4")]
    page_size: String,

    /// portrait or landscape
    #[arg(long, default_value = "portrait")]
    orientation: String,

    /// blank border on every page, in millimetres
    #[arg(short, long, default_value_t = 10.0, allow_negative_numbers = true)]
    margin: f64,

    /// print resolution; the image is never rescaled, so this sets the poster size
    #[arg(short, long, default_value_t = 300)]
    dpi: u32,
}

impl LayoutArgs {
    fn request(&self) -> PosterRequest {
        PosterRequest {
            columns: self.columns,
            rows: self.rows,
            page_size: self.page_size.clone(),
            orientation: self.orientation.clone(),
            margin_mm: self.margin,
            dpi: self.dpi,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// tile an image into a printable multi-page poster
    Build {
        /// input image (png, jpg, tiff, bmp, gif)
        image: PathBuf,

        /// output PDF path, "-" for stdout; output dir with --png-pages
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        layout: LayoutArgs,

        /// PDF title metadata
        #[arg(long)]
        title: Option<String>,

        /// PDF author metadata
        #[arg(long)]
        author: Option<String>,

        /// write one PNG per page instead of a PDF
        #[arg(long)]
        png_pages: bool,

        /// PNG compression for --png-pages: fast (speed) or small (filesize)
        #[arg(long, default_value = "fast")]
        compress: PngCompression,
    },
    /// show how an image would be laid out, without rendering
    Plan {
        /// input image
        image: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// list supported page sizes
    PageSizes,
    /// generate shell completions
    Completions {
        /// shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let quiet = cli.quiet;

    match cli.command {
        Commands::Build {
            image,
            output,
            layout,
            title,
            author,
            png_pages,
            compress,
        } => {
            let request = layout.request();
            let stem = image
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("poster")
                .to_string();
            let encoder: Box<dyn DocumentEncoder> = if png_pages {
                anyhow::ensure!(
                    output.as_deref() != Some(Path::new("-")),
                    "Stdout output is only available for PDF; pass an output dir with --png-pages"
                );
                let output_dir = output.unwrap_or_else(|| {
                    image
                        .parent()
                        .unwrap_or_else(|| Path::new("."))
                        .to_path_buf()
                });
                Box::new(PngPagesEncoder {
                    output_dir,
                    stem,
                    compress,
                    quiet,
                })
            } else {
                Box::new(PdfEncoder {
                    output: output.unwrap_or_else(|| PathBuf::from("poster.pdf")),
                    title,
                    author,
                    quiet,
                })
            };
            build(&image, &request, encoder.as_ref(), quiet)?;
        }
        Commands::Plan { image, layout } => {
            plan(&image, &layout.request())?;
        }
        Commands::PageSizes => {
            for size in geometry::PAGE_SIZES {
                println!("{:<8} {:>6.1} x {:>6.1} mm", size.name, size.width_mm, size.height_mm);
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "posterize",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn build(
    input: &Path,
    request: &PosterRequest,
    encoder: &dyn DocumentEncoder,
    quiet: bool,
) -> Result<()> {
    // validate before reading anything
    let layout = Layout::plan(request)?;
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;

    if !quiet {
        eprintln!(
            "Tiling {} onto {}x{} {} {} pages at {} DPI",
            input.display(),
            layout.grid.columns,
            layout.grid.rows,
            layout.page.size.name,
            layout.page.orientation,
            layout.page.dpi
        );
    }
    let start = std::time::Instant::now();

    let document = poster::generate_document(&bytes, request)
        .with_context(|| format!("Failed to tile {}", input.display()))?;
    encoder.encode(&document)?;

    if !quiet {
        eprintln!(
            "Done. {} pages in {:.2}s",
            document.len(),
            start.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

fn plan(input: &Path, request: &PosterRequest) -> Result<()> {
    let layout = Layout::plan(request)?;
    // header only; I/O problems stay I/O errors, bad headers are decode failures
    let (source_w, source_h) = image::ImageReader::open(input)
        .and_then(|reader| reader.with_guessed_format())
        .with_context(|| format!("Failed to read {}", input.display()))?
        .into_dimensions()
        .map_err(error::PosterError::from)?;
    let crop = layout.crop_plan(source_w, source_h);
    let (mosaic_w, mosaic_h) = layout.mosaic_size();
    let (span_cols, span_rows) = crop.footprint(layout.tile);
    let page = &layout.page;
    let (page_w_mm, page_h_mm) = page.size.dimensions_mm(page.orientation);

    println!("source   {}x{}px", source_w, source_h);
    println!(
        "page     {} {} {:.1}x{:.1}mm = {}x{}px, margin {}mm = {}px",
        page.size.name,
        page.orientation,
        page_w_mm,
        page_h_mm,
        page.width_px,
        page.height_px,
        page.margin_mm,
        page.margin_px
    );
    println!("tile     {}x{}px", layout.tile.width, layout.tile.height);
    println!(
        "grid     {}x{} = {} pages, mosaic {}x{}px",
        layout.grid.columns,
        layout.grid.rows,
        layout.grid.page_count(),
        mosaic_w,
        mosaic_h
    );
    println!(
        "crop     {}x{}px at ({}, {}), placed at ({}, {})",
        crop.crop_w, crop.crop_h, crop.crop_left, crop.crop_top, crop.paste_x, crop.paste_y
    );
    println!("artwork  {:.1} x {:.1} pages at {} DPI", span_cols, span_rows, page.dpi);
    Ok(())
}
