//! Error types for the PDF toolkit library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PDF toolkit library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Raster encode/decode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Requested page does not exist in the source document
    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: usize },

    /// Color space outside the supported lookup table
    #[error("Unknown color space: {0}")]
    UnknownColorSpace(String),

    /// Filter chain the extractor cannot transport
    #[error("Unsupported filter chain: {0}")]
    UnsupportedFilterChain(String),

    /// Stored page rotation that is not a multiple of 90 degrees
    #[error("Invalid rotation value: {0} (expected a multiple of 90)")]
    InvalidRotationValue(i64),

    /// Image payload that does not match its declared geometry
    #[error("Invalid image data: {0}")]
    InvalidImageData(String),

    /// General error
    #[error("{0}")]
    General(String),
}
