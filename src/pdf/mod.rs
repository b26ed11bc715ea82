//! PDF manipulation module

pub mod create;
pub mod filters;
pub mod images;
pub mod merge;
pub mod metadata;
pub mod object;
pub mod tiff;

// Re-export commonly used items
pub use create::image_to_pdf;
pub use filters::{resolve_filter_chain, DecodeParms, Filter, ResolvedPayload};
pub use images::{extract_document_images, extract_images, ColorSpace, ImageResource, PixelMode};
pub use merge::{merge_pdfs, write_pages, MergeOptions};
pub use metadata::{count_pages, extract_metadata, PageInfo, PdfMetadata};
pub use object::PageObject;
pub use tiff::{tiff_header_for_ccitt, FaxGroup, TiffHeader};
