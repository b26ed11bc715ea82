//! PDF creation from raster images

use std::io::Write;
use std::path::Path;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, ImageFormat};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;
use crate::error::{Error, Result};
use crate::layout::{PageDimensions, TransformMatrix};
use crate::pdf::object::{rect_to_object, PageObject};

/// Resource name the image is drawn under
const IMAGE_NAME: &str = "Im0";

impl PageObject {
    /// Wrap the raster file at `path` as a single page with the image drawn
    /// over the whole page.
    ///
    /// Without `size` the page measures one point per pixel (72 dpi).
    pub fn from_image(path: &Path, size: Option<PageDimensions>) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path)?;
        let format = image::guess_format(&bytes)?;
        let raster = image::load_from_memory_with_format(&bytes, format)?;

        let dims = size.unwrap_or_else(|| PageDimensions::from_pixels(raster.width(), raster.height()));
        let (page_width, page_height) = (dims.width.pt(), dims.height.pt());

        let mut doc = Document::with_version("1.5");
        let image_id = add_image_xobject(&mut doc, &bytes, format, &raster)?;

        // Image space is the unit square; stretch it over the page
        let matrix = TransformMatrix {
            a: page_width,
            b: 0.0,
            c: 0.0,
            d: page_height,
            e: 0.0,
            f: 0.0,
        };
        let content = format!("q {} /{} Do Q\n", matrix.to_cm_operator(), IMAGE_NAME);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_NAME, Object::Reference(image_id));

        let page_id = doc.new_object_id();
        let page = dictionary! {
            "MediaBox" => rect_to_object([0.0, 0.0, page_width, page_height]),
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! { "XObject" => xobjects },
        };

        debug!(
            path = %path.display(),
            width = page_width,
            height = page_height,
            "Created page from image"
        );
        Ok(Self::assemble(doc, page_id, page))
    }
}

/// Convert a raster image file into a one-page PDF
pub fn image_to_pdf(input: &Path, output: &Path, size: Option<PageDimensions>) -> Result<()> {
    PageObject::from_image(input, size)?.save(output)
}

/// Embed the raster as an image XObject.
///
/// Gray and RGB JPEGs are embedded as they are; everything else is stored as
/// deflated 8-bit RGB with the alpha channel, if any, as a soft mask.
fn add_image_xobject(
    doc: &mut Document,
    bytes: &[u8],
    format: ImageFormat,
    raster: &DynamicImage,
) -> Result<ObjectId> {
    let (width, height) = (raster.width() as i64, raster.height() as i64);

    if format == ImageFormat::Jpeg {
        let color_space = match jpeg_components(bytes) {
            Some(1) => Some("DeviceGray"),
            Some(3) => Some("DeviceRGB"),
            _ => None,
        };
        if let Some(color_space) = color_space {
            let dict = dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            };
            return Ok(doc.add_object(raw_stream(dict, bytes.to_vec())));
        }
    }

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if raster.color().has_alpha() {
        let alpha: Vec<u8> = raster.to_rgba8().pixels().map(|p| p.0[3]).collect();
        let mask = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        let mask_id = doc.add_object(raw_stream(mask, deflate(&alpha)?));
        dict.set("SMask", Object::Reference(mask_id));
    }

    let rgb = raster.to_rgb8().into_raw();
    Ok(doc.add_object(raw_stream(dict, deflate(&rgb)?)))
}

/// A stream whose content is already encoded
fn raw_stream(dict: Dictionary, content: Vec<u8>) -> Stream {
    let mut stream = Stream::new(dict, content);
    stream.allows_compression = false;
    stream
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Number of color components declared in a JPEG's start-of-frame header
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            // fill byte
            pos += 1;
            continue;
        }

        let is_frame_header = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame_header {
            // length(2) precision(1) height(2) width(2), then the component count
            return bytes.get(pos + 9).copied();
        }

        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        pos += 2 + len;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    fn image_stream(page: &PageObject) -> &Stream {
        let resources = page.page_dict().unwrap().get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let id = xobjects.get(IMAGE_NAME.as_bytes()).unwrap().as_reference().unwrap();
        page.document().get_object(id).unwrap().as_stream().unwrap()
    }

    #[test]
    fn test_jpeg_components() {
        let rgb = encode(DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]))), ImageFormat::Jpeg);
        assert_eq!(jpeg_components(&rgb), Some(3));

        let gray = encode(DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([128]))), ImageFormat::Jpeg);
        assert_eq!(jpeg_components(&gray), Some(1));

        assert_eq!(jpeg_components(b"not a jpeg"), None);
    }

    #[test]
    fn test_png_page_defaults_to_pixel_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pixel.png");
        let png = encode(DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 20, Rgb([1, 2, 3]))), ImageFormat::Png);
        std::fs::write(&path, png).unwrap();

        let page = PageObject::from_image(&path, None).unwrap();
        assert!((page.width().unwrap() - 30.0).abs() < 1e-6);
        assert!((page.height().unwrap() - 20.0).abs() < 1e-6);

        let stream = image_stream(&page);
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
        assert!(!stream.dict.has(b"SMask"));
    }

    #[test]
    fn test_page_size_in_centimetres() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sized.png");
        let png = encode(DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]))), ImageFormat::Png);
        std::fs::write(&path, png).unwrap();

        let page = PageObject::from_image(&path, Some(PageDimensions::from_cm(2.54, 5.08))).unwrap();
        assert!((page.width().unwrap() - 72.0).abs() < 1e-3);
        assert!((page.height().unwrap() - 144.0).abs() < 1e-3);
    }

    #[test]
    fn test_alpha_becomes_soft_mask() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alpha.png");
        let png = encode(DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128]))), ImageFormat::Png);
        std::fs::write(&path, png).unwrap();

        let page = PageObject::from_image(&path, None).unwrap();
        assert!(image_stream(&page).dict.has(b"SMask"));
    }

    #[test]
    fn test_jpeg_is_embedded_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        let jpeg = encode(DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, Rgb([200, 100, 50]))), ImageFormat::Jpeg);
        std::fs::write(&path, &jpeg).unwrap();

        let page = PageObject::from_image(&path, None).unwrap();
        let stream = image_stream(&page);
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.content, jpeg);
    }

    #[test]
    fn test_missing_image_file() {
        let err = PageObject::from_image(Path::new("missing.png"), None).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
