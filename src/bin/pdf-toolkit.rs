//! PDF Toolkit CLI tool
//!
//! A command-line tool for rearranging, composing and mining PDF pages.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use glob::glob;
use std::path::{Path, PathBuf};
use std::process;

use pdf_toolkit::layout::{Offset, PageDimensions};
use pdf_toolkit::page::{compose, load_pages, Composition, Page};
use pdf_toolkit::pdf::{extract_document_images, extract_metadata, merge_pdfs, write_pages, MergeOptions};

/// PDF Toolkit - Merge, rotate, compose and extract images from PDFs
#[derive(Parser)]
#[command(name = "pdf-toolkit")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge numbered PDFs in order
    pdf-toolkit merge -o handout.pdf \"[0-9]*.pdf\"

    # Turn pages 2 and 3 a quarter turn clockwise
    pdf-toolkit rotate scan.pdf -o fixed.pdf --right 1 --pages 2,3

    # Put a letterhead behind every page
    pdf-toolkit compose letter.pdf letterhead.pdf -o out.pdf --mode background

    # Dump embedded images as img0000.png, img0001.jpg, ...
    pdf-toolkit extract-images report.pdf --prefix img")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge multiple PDF files into one
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rotate pages by quarter turns
    Rotate {
        /// Input PDF file
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Quarter turns counter-clockwise
        #[arg(long, default_value_t = 0, conflicts_with = "right")]
        left: u32,

        /// Quarter turns clockwise
        #[arg(long, default_value_t = 0)]
        right: u32,

        /// Pages to rotate, 1-based and comma separated (default: all)
        #[arg(long, value_delimiter = ',')]
        pages: Vec<u32>,
    },

    /// Compose a page of another PDF onto every page
    Compose {
        /// PDF whose pages receive the donor
        input: PathBuf,

        /// PDF holding the donor page
        donor: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// How the donor is combined with each page
        #[arg(long, value_enum, default_value_t = Mode::Merge)]
        mode: Mode,

        /// Donor page number (1-based)
        #[arg(long, default_value_t = 1)]
        donor_page: u32,

        /// Horizontal offset in points
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        tx: f64,

        /// Vertical offset in points
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        ty: f64,
    },

    /// Extract embedded images to numbered files
    ExtractImages {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output file prefix, may include a directory
        #[arg(long, default_value = "image")]
        prefix: String,

        /// Index of the first file written
        #[arg(long, default_value_t = 0)]
        start: u32,
    },

    /// Wrap raster images as PDF pages
    ImageToPdf {
        /// Input image files (in order). Supports glob patterns like "*.png"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Page width in centimetres (default: one point per pixel)
        #[arg(long, requires = "height_cm")]
        width_cm: Option<f64>,

        /// Page height in centimetres
        #[arg(long, requires = "width_cm")]
        height_cm: Option<f64>,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Merge,
    Stamp,
    Background,
}

impl From<Mode> for Composition {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Merge => Composition::Merge,
            Mode::Stamp => Composition::Stamp,
            Mode::Background => Composition::Background,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Merge { inputs, output } => cmd_merge(inputs, output),
        Commands::Rotate { input, output, left, right, pages } => {
            cmd_rotate(input, output, left, right, pages)
        }
        Commands::Compose { input, donor, output, mode, donor_page, tx, ty } => {
            cmd_compose(input, donor, output, mode.into(), donor_page, Offset::new(tx, ty))
        }
        Commands::ExtractImages { inputs, prefix, start } => cmd_extract_images(inputs, prefix, start),
        Commands::ImageToPdf { inputs, output, width_cm, height_cm } => {
            cmd_image_to_pdf(inputs, output, width_cm, height_cm)
        }
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Log to stderr; RUST_LOG overrides the verbosity flag
fn init_logging(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pdf_toolkit={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).compact())
        .with(filter)
        .init();
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = Vec::new();
            for entry in glob(&pattern).with_context(|| format!("Invalid pattern: {}", pattern))? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => tracing::warn!(%pattern, error = %e, "Glob error"),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            // Sort each pattern's matches; explicit order between arguments is kept
            matched.sort();
            paths.extend(matched);
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    for path in &paths {
        if !path.exists() {
            bail!("Input file not found: {}", path.display());
        }
    }

    Ok(paths)
}

/// Merge multiple PDFs into one
fn cmd_merge(inputs: Vec<String>, output: PathBuf) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    eprintln!("Merging {} PDF files...", inputs.len());

    let options = MergeOptions {
        input_paths: inputs,
        output_path: output.clone(),
    };
    merge_pdfs(&options)?;

    eprintln!("Merged to: {}", output.display());
    Ok(())
}

/// Rotate selected pages
fn cmd_rotate(input: PathBuf, output: PathBuf, left: u32, right: u32, selected: Vec<u32>) -> Result<()> {
    let mut pages = load_pages(&input).with_context(|| format!("Failed to load {}", input.display()))?;

    for number in &selected {
        if *number == 0 || *number as usize > pages.len() {
            bail!("Page {} out of range (document has {} pages)", number, pages.len());
        }
    }

    for (i, page) in pages.iter_mut().enumerate() {
        let number = i as u32 + 1;
        if !selected.is_empty() && !selected.contains(&number) {
            continue;
        }
        // a full turn changes nothing
        for _ in 0..left % 4 {
            page.rotate_left()?;
        }
        for _ in 0..right % 4 {
            page.rotate_right()?;
        }
        tracing::debug!(page = number, label = %page.label(), "Rotated");
    }

    write_pages(&pages, &output)?;
    eprintln!("Output: {}", output.display());
    Ok(())
}

/// Compose a donor page onto every page of the input
fn cmd_compose(
    input: PathBuf,
    donor: PathBuf,
    output: PathBuf,
    op: Composition,
    donor_page: u32,
    offset: Offset,
) -> Result<()> {
    let pages = load_pages(&input).with_context(|| format!("Failed to load {}", input.display()))?;
    let donor = Page::load(&donor, donor_page)
        .with_context(|| format!("Failed to load page {} of {}", donor_page, donor.display()))?;

    let composed = pages
        .into_iter()
        .map(|page| compose(page, &donor, op, offset))
        .collect::<pdf_toolkit::Result<Vec<Page>>>()?;

    for page in &composed {
        tracing::debug!(id = %page.id(), label = %page.label(), "Composed");
    }

    write_pages(&composed, &output)?;
    eprintln!("Output: {}", output.display());
    Ok(())
}

/// Extract images from each input in turn, continuing the numbering
fn cmd_extract_images(inputs: Vec<String>, prefix: String, start: u32) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    if let Some(dir) = Path::new(&prefix).parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }

    let mut index = start;
    for input in &inputs {
        index = extract_document_images(input, &prefix, index)
            .with_context(|| format!("Failed to extract images from {}", input.display()))?;
    }

    eprintln!("Extracted {} images", index - start);
    println!("{}", index);
    Ok(())
}

/// Wrap images as pages of a new PDF
fn cmd_image_to_pdf(
    inputs: Vec<String>,
    output: PathBuf,
    width_cm: Option<f64>,
    height_cm: Option<f64>,
) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    let size = match (width_cm, height_cm) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some(PageDimensions::from_cm(w, h)),
        (Some(_), Some(_)) => bail!("Page size must be positive"),
        _ => None,
    };

    let pages = inputs
        .iter()
        .map(|path| {
            Page::from_image(path, size).with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect::<Result<Vec<Page>>>()?;

    write_pages(&pages, &output)?;
    eprintln!("Output: {}", output.display());
    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let metadata = extract_metadata(&input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    for page in &metadata.pages {
        println!(
            "  {:>4}: {:.1} x {:.1} pt, rotate {}, {} image(s)",
            page.number,
            page.width,
            page.height,
            page.rotation.degrees(),
            page.image_count
        );
    }

    Ok(())
}
