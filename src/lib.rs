//! PDF Toolkit Library
//!
//! A library for working with PDF pages one at a time. It provides
//! functionality to:
//! - Load pages, rotate them, and write page sequences back out
//! - Compose pages onto each other (merge, stamp, background)
//! - Extract embedded images to PNG, JPEG, JPEG 2000 and TIFF files
//! - Wrap raster images as PDF pages
//! - Extract metadata (page counts, sizes, etc.)
//!
//! # Example
//!
//! ```no_run
//! use pdf_toolkit::page::{compose, load_pages, Composition};
//! use pdf_toolkit::layout::Offset;
//! use pdf_toolkit::pdf::write_pages;
//! use std::path::Path;
//!
//! let mut pages = load_pages(Path::new("report.pdf"))?;
//! let letterhead = load_pages(Path::new("letterhead.pdf"))?.remove(0);
//!
//! let first = pages.remove(0);
//! pages.insert(0, compose(first, &letterhead, Composition::Background, Offset::default())?);
//!
//! write_pages(&pages, Path::new("out.pdf"))?;
//! # Ok::<(), pdf_toolkit::Error>(())
//! ```

pub mod error;
pub mod layout;
pub mod page;
pub mod pdf;

// Re-export commonly used items
pub use error::{Error, Result};
pub use page::{compose, load_pages, Composition, Page};
