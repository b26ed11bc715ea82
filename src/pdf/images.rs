//! Image XObject extraction
//!
//! Images are written one file per resource as `{prefix}{index:04}.{ext}`.
//! Rasters the extractor can read (flate or unfiltered) become PNG; JPEG,
//! JPEG 2000 and CCITT fax payloads are written without re-encoding.

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::{debug, info, warn};
use crate::error::{Error, Result};
use crate::pdf::filters::{resolve_filter_chain, DecodeParms, Filter};
use crate::pdf::object::{resolve_object, PageObject};
use crate::pdf::tiff::{tiff_header_for_ccitt, FaxGroup};

/// Pixel layout a raster is decoded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    Rgb,
    Cmyk,
    Gray8,
    /// One palette index per pixel
    Palette8,
}

impl PixelMode {
    /// Samples per pixel
    pub fn components(self) -> usize {
        match self {
            PixelMode::Rgb => 3,
            PixelMode::Cmyk => 4,
            PixelMode::Gray8 | PixelMode::Palette8 => 1,
        }
    }
}

/// Color space of an image XObject, as far as extraction cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpace {
    /// A color space given by name, e.g. `DeviceRGB`
    Named(String),
    /// `[/ICCBased stream]`, keeping the profile's component count
    IccBased(u8),
    /// `[/Indexed base hival lookup]`
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        palette: Vec<u8>,
    },
}

impl ColorSpace {
    /// Look the color space up in the supported table
    pub fn pixel_mode(&self) -> Result<PixelMode> {
        match self {
            ColorSpace::Named(name) => match name.as_str() {
                "DeviceRGB" | "DefaultRGB" | "RGB" => Ok(PixelMode::Rgb),
                "DeviceCMYK" | "DefaultCMYK" | "CMYK" => Ok(PixelMode::Cmyk),
                "DeviceGray" | "DefaultGray" | "G" => Ok(PixelMode::Gray8),
                "Indexed" => Ok(PixelMode::Palette8),
                other => Err(Error::UnknownColorSpace(other.to_string())),
            },
            ColorSpace::IccBased(1) => Ok(PixelMode::Gray8),
            ColorSpace::IccBased(3) => Ok(PixelMode::Rgb),
            ColorSpace::IccBased(4) => Ok(PixelMode::Cmyk),
            ColorSpace::IccBased(n) => Err(Error::UnknownColorSpace(format!("ICCBased with {} components", n))),
            ColorSpace::Indexed { .. } => Ok(PixelMode::Palette8),
        }
    }
}

/// One image XObject read from a page's resources
#[derive(Debug, Clone)]
pub struct ImageResource {
    /// Resource name, without the leading slash
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: ColorSpace,
    /// Filters, outermost first
    pub filters: Vec<Filter>,
    /// Parameters of the terminal filter
    pub decode_parms: DecodeParms,
    /// Stream bytes as stored
    pub data: Vec<u8>,
}

/// Read the image XObjects of `page`, in resource order.
///
/// A page without `/Resources` or `/XObject` has no images. Resources that
/// cannot be read are logged and left out.
pub fn image_resources(page: &PageObject) -> Result<Vec<ImageResource>> {
    let doc = page.document();
    let page_dict = page.page_dict()?;

    let Some(xobjects) = resolve_xobject_dict(doc, page_dict) else {
        return Ok(Vec::new());
    };

    let mut resources = Vec::new();
    for (name, value) in xobjects.iter() {
        let Ok(stream) = resolve_object(doc, value).as_stream() else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .map(|s| s == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }

        let name = String::from_utf8_lossy(name).into_owned();
        match read_image_resource(doc, &name, stream) {
            Ok(resource) => resources.push(resource),
            Err(e) => warn!(image = %name, error = %e, "Skipping unreadable image resource"),
        }
    }

    Ok(resources)
}

fn resolve_xobject_dict<'a>(doc: &'a Document, page_dict: &'a Dictionary) -> Option<&'a Dictionary> {
    let resources = resolve_object(doc, page_dict.get(b"Resources").ok()?).as_dict().ok()?;
    resolve_object(doc, resources.get(b"XObject").ok()?).as_dict().ok()
}

fn read_image_resource(doc: &Document, name: &str, stream: &Stream) -> Result<ImageResource> {
    let dict = &stream.dict;

    let width = dict_get_u32(doc, dict, b"Width")
        .ok_or_else(|| Error::InvalidImageData(format!("{}: missing /Width", name)))?;
    let height = dict_get_u32(doc, dict, b"Height")
        .ok_or_else(|| Error::InvalidImageData(format!("{}: missing /Height", name)))?;

    let is_mask = dict
        .get(b"ImageMask")
        .ok()
        .and_then(|v| resolve_object(doc, v).as_bool().ok())
        .unwrap_or(false);

    let bits_per_component = match dict_get_u32(doc, dict, b"BitsPerComponent") {
        Some(bpc) => u8::try_from(bpc)
            .map_err(|_| Error::InvalidImageData(format!("{}: BitsPerComponent {}", name, bpc)))?,
        None if is_mask => 1,
        None => 8,
    };

    // Stencil masks and JPX images may omit the color space; read them as
    // gray, JPX bytes pass through untouched either way.
    let color_space = match dict.get(b"ColorSpace") {
        Ok(obj) => parse_color_space(doc, obj)?,
        Err(_) => ColorSpace::Named("DeviceGray".to_string()),
    };

    let filters = extract_filters(doc, dict);
    let decode_parms = extract_decode_parms(doc, dict, filters.len());

    Ok(ImageResource {
        name: name.to_string(),
        width,
        height,
        bits_per_component,
        color_space,
        filters,
        decode_parms,
        data: stream.content.clone(),
    })
}

fn dict_get_u32(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = resolve_object(doc, dict.get(key).ok()?);
    match value {
        Object::Integer(i) => u32::try_from(*i).ok(),
        Object::Real(r) if *r >= 0.0 => Some(*r as u32),
        _ => None,
    }
}

fn parse_color_space(doc: &Document, obj: &Object) -> Result<ColorSpace> {
    match resolve_object(doc, obj) {
        Object::Name(name) => Ok(ColorSpace::Named(String::from_utf8_lossy(name).into_owned())),
        Object::Array(items) => {
            let family = items
                .first()
                .and_then(|f| resolve_object(doc, f).as_name().ok())
                .ok_or_else(|| Error::UnknownColorSpace("empty color space array".to_string()))?;

            match family {
                b"Indexed" | b"I" => parse_indexed(doc, items),
                b"ICCBased" => {
                    let profile = items
                        .get(1)
                        .and_then(|p| resolve_object(doc, p).as_stream().ok())
                        .ok_or_else(|| Error::UnknownColorSpace("ICCBased without profile".to_string()))?;
                    let n = dict_get_u32(doc, &profile.dict, b"N").unwrap_or(0);
                    Ok(ColorSpace::IccBased(u8::try_from(n).unwrap_or(0)))
                }
                other => Ok(ColorSpace::Named(String::from_utf8_lossy(other).into_owned())),
            }
        }
        other => Err(Error::UnknownColorSpace(format!("{:?}", other))),
    }
}

fn parse_indexed(doc: &Document, items: &[Object]) -> Result<ColorSpace> {
    if items.len() != 4 {
        return Err(Error::InvalidImageData(format!(
            "Indexed color space has {} entries, expected 4",
            items.len()
        )));
    }

    let base = parse_color_space(doc, &items[1])?;
    let hival = match resolve_object(doc, &items[2]) {
        Object::Integer(i) => u8::try_from(*i)
            .map_err(|_| Error::InvalidImageData(format!("Indexed hival {} out of range", i)))?,
        other => return Err(Error::InvalidImageData(format!("Indexed hival {:?}", other))),
    };

    let palette = match resolve_object(doc, &items[3]) {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(stream) => stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()),
        other => return Err(Error::InvalidImageData(format!("Indexed lookup {:?}", other))),
    };

    Ok(ColorSpace::Indexed {
        base: Box::new(base),
        hival,
        palette,
    })
}

fn extract_filters(doc: &Document, dict: &Dictionary) -> Vec<Filter> {
    let Ok(filter) = dict.get(b"Filter") else {
        return Vec::new();
    };

    match resolve_object(doc, filter) {
        Object::Name(name) => vec![Filter::from_name(name)],
        Object::Array(names) => names
            .iter()
            .filter_map(|n| resolve_object(doc, n).as_name().ok())
            .map(Filter::from_name)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parameters of the last filter; an array of parameters runs parallel to
/// the filter array.
fn extract_decode_parms(doc: &Document, dict: &Dictionary, filter_count: usize) -> DecodeParms {
    let Ok(parms) = dict.get(b"DecodeParms").or_else(|_| dict.get(b"DP")) else {
        return DecodeParms::default();
    };

    let terminal = match resolve_object(doc, parms) {
        Object::Array(items) => match filter_count.checked_sub(1).and_then(|i| items.get(i)) {
            Some(item) => resolve_object(doc, item),
            None => return DecodeParms::default(),
        },
        other => other,
    };

    let Ok(terminal) = terminal.as_dict() else {
        return DecodeParms::default();
    };

    let int = |key: &[u8]| -> Option<i64> {
        terminal.get(key).ok().and_then(|v| resolve_object(doc, v).as_i64().ok())
    };

    let defaults = DecodeParms::default();
    DecodeParms {
        k: int(b"K").unwrap_or(defaults.k),
        predictor: int(b"Predictor").unwrap_or(defaults.predictor),
        colors: int(b"Colors").map(|v| v.max(1) as usize).unwrap_or(defaults.colors),
        bits_per_component: int(b"BitsPerComponent")
            .map(|v| v.max(1) as usize)
            .unwrap_or(defaults.bits_per_component),
        columns: int(b"Columns").map(|v| v.max(1) as usize).unwrap_or(defaults.columns),
    }
}

/// Outcome of one extraction pass over a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePass {
    /// Index the next image would be written under
    pub next_index: u32,
    /// The pass ended at an unsupported filter
    pub stopped: bool,
}

/// Extract the images of `page`, numbering output files from `index`.
///
/// Returns the index after the last image written. Images with an unknown
/// color space or inconsistent data are logged and skipped without using up
/// an index. An unsupported filter ends the pass for the page; whatever was
/// written so far stays.
pub fn extract_images(page: &PageObject, prefix: &str, index: u32) -> Result<u32> {
    Ok(extract_page_images(page, prefix, index)?.next_index)
}

/// Same as [`extract_images`], also reporting whether the pass stopped early
pub fn extract_page_images(page: &PageObject, prefix: &str, index: u32) -> Result<PagePass> {
    let mut index = index;

    for resource in page.image_resources()? {
        match extract_image(&resource, prefix, index) {
            Ok(path) => {
                debug!(image = %resource.name, path = %path.display(), "Extracted image");
                index += 1;
            }
            Err(Error::UnsupportedFilterChain(reason)) => {
                warn!(image = %resource.name, %reason, "Unsupported filter, stopping extraction");
                return Ok(PagePass { next_index: index, stopped: true });
            }
            Err(e @ (Error::UnknownColorSpace(_) | Error::InvalidImageData(_))) => {
                warn!(image = %resource.name, error = %e, "Skipping image");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(PagePass { next_index: index, stopped: false })
}

/// Extract the images of every page of the PDF at `path`.
///
/// The index runs on across pages; an unsupported filter on one page ends
/// extraction for the whole document.
pub fn extract_document_images(path: &Path, prefix: &str, start: u32) -> Result<u32> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = doc.get_pages().len() as u32;
    let mut index = start;

    for page_number in 1..=page_count {
        let page = PageObject::from_document(&doc, page_number)?;
        let pass = extract_page_images(&page, prefix, index)?;
        debug!(page = page_number, images = pass.next_index - index, "Processed page");
        index = pass.next_index;

        if pass.stopped {
            info!(page = page_number, "Extraction stopped early");
            break;
        }
    }

    info!(path = %path.display(), extracted = index - start, "Extracted images");
    Ok(index)
}

/// Write a single image resource as `{prefix}{index:04}.{ext}`
pub fn extract_image(resource: &ImageResource, prefix: &str, index: u32) -> Result<PathBuf> {
    let mode = resource.color_space.pixel_mode()?;
    let payload = resolve_filter_chain(&resource.filters, &resource.data, &resource.decode_parms)?;

    match payload.filter {
        Filter::None | Filter::Flate => {
            let raster = decode_raster(resource, mode, &payload.data)?;
            let mut png = Vec::new();
            raster.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            write_output(&output_path(prefix, index, "png"), &[&png])
        }
        Filter::Dct => write_output(&output_path(prefix, index, "jpg"), &[&payload.data]),
        Filter::Jpx => write_output(&output_path(prefix, index, "jp2"), &[&payload.data]),
        Filter::CcittFax => {
            let group = FaxGroup::from_k(resource.decode_parms.k);
            let payload_len = u32::try_from(payload.data.len())
                .map_err(|_| Error::InvalidImageData(format!("{}: payload too large", resource.name)))?;
            let header = tiff_header_for_ccitt(resource.width, resource.height, payload_len, group);
            write_output(&output_path(prefix, index, "tiff"), &[&header, &payload.data])
        }
        other => Err(Error::UnsupportedFilterChain(other.name().to_string())),
    }
}

fn output_path(prefix: &str, index: u32, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}{:04}.{}", prefix, index, extension))
}

/// Write `parts` to a new file at `path`; a failed write leaves no file behind
fn write_output(path: &Path, parts: &[&[u8]]) -> Result<PathBuf> {
    let mut file = File::create(path)?;
    if let Err(e) = parts.iter().try_for_each(|part| file.write_all(part)) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(e.into());
    }
    Ok(path.to_path_buf())
}

/// Build a raster from decoded sample bytes
pub fn decode_raster(resource: &ImageResource, mode: PixelMode, data: &[u8]) -> Result<DynamicImage> {
    let (width, height) = (resource.width, resource.height);
    let indexed = mode == PixelMode::Palette8;
    let samples = unpack_samples(
        data,
        width as usize,
        height as usize,
        mode.components(),
        resource.bits_per_component,
        !indexed,
    )
    .ok_or_else(|| {
        Error::InvalidImageData(format!(
            "{}: {} bytes do not cover {}x{} at {} bits per component",
            resource.name,
            data.len(),
            width,
            height,
            resource.bits_per_component
        ))
    })?;

    let invalid = || Error::InvalidImageData(format!("{}: raster size mismatch", resource.name));

    match mode {
        PixelMode::Gray8 => GrayImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(invalid),
        PixelMode::Rgb => RgbImage::from_raw(width, height, samples)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(invalid),
        PixelMode::Cmyk => RgbImage::from_raw(width, height, cmyk_to_rgb(&samples))
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(invalid),
        PixelMode::Palette8 => {
            let ColorSpace::Indexed { base, hival, palette } = &resource.color_space else {
                return Err(Error::UnknownColorSpace("Indexed without palette".to_string()));
            };
            let rgb = apply_palette(&samples, base, *hival, palette)?;
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(invalid)
        }
    }
}

/// Unpack rows of `bpc`-bit samples into one byte per sample.
///
/// With `scale`, sub-byte samples are stretched to 0..=255 and 16-bit
/// samples keep their high byte; otherwise values are kept as they are
/// (palette indices). Returns `None` when `data` is too short or the
/// declared geometry overflows.
fn unpack_samples(
    data: &[u8],
    width: usize,
    height: usize,
    components: usize,
    bpc: u8,
    scale: bool,
) -> Option<Vec<u8>> {
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return None;
    }
    let samples_per_row = width.checked_mul(components)?;
    let row_bytes = samples_per_row.checked_mul(bpc as usize)?.div_ceil(8);
    let sample_count = samples_per_row.checked_mul(height)?;
    if data.len() < row_bytes.checked_mul(height)? {
        return None;
    }

    if bpc == 8 {
        return Some(data[..sample_count].to_vec());
    }

    let mut out = Vec::with_capacity(sample_count);
    for row in data.chunks(row_bytes).take(height) {
        if bpc == 16 {
            out.extend(row.chunks(2).take(samples_per_row).map(|pair| pair[0]));
            continue;
        }

        let max = (1u16 << bpc) - 1;
        let per_byte = 8 / bpc as usize;
        for i in 0..samples_per_row {
            let byte = row[i / per_byte];
            let shift = 8 - bpc as usize * (i % per_byte + 1);
            let value = ((byte >> shift) as u16) & max;
            out.push(if scale { (value * 255 / max) as u8 } else { value as u8 });
        }
    }
    Some(out)
}

/// Naive CMYK to RGB conversion, no color management
fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk.len() / 4 * 3);
    for px in cmyk.chunks_exact(4) {
        let k = px[3] as u16;
        for &c in &px[..3] {
            rgb.push(((255 - c as u16) * (255 - k) / 255) as u8);
        }
    }
    rgb
}

/// Map palette indices to RGB through the lookup table.
///
/// Indices beyond `hival` or past the end of the table come out black.
fn apply_palette(indices: &[u8], base: &ColorSpace, hival: u8, palette: &[u8]) -> Result<Vec<u8>> {
    let base_mode = base.pixel_mode()?;
    if base_mode == PixelMode::Palette8 {
        return Err(Error::UnknownColorSpace("Indexed over Indexed".to_string()));
    }
    let entry_len = base_mode.components();

    let table: Vec<[u8; 3]> = palette
        .chunks_exact(entry_len)
        .take(hival as usize + 1)
        .map(|entry| match base_mode {
            PixelMode::Gray8 => [entry[0]; 3],
            PixelMode::Cmyk => {
                let rgb = cmyk_to_rgb(entry);
                [rgb[0], rgb[1], rgb[2]]
            }
            _ => [entry[0], entry[1], entry[2]],
        })
        .collect();

    let mut rgb = Vec::with_capacity(indices.len() * 3);
    for &i in indices {
        rgb.extend_from_slice(table.get(i as usize).unwrap_or(&[0, 0, 0]));
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn resource(width: u32, height: u32, bpc: u8, color_space: ColorSpace) -> ImageResource {
        ImageResource {
            name: "Im0".to_string(),
            width,
            height,
            bits_per_component: bpc,
            color_space,
            filters: vec![],
            decode_parms: DecodeParms::default(),
            data: vec![],
        }
    }

    #[test]
    fn test_pixel_mode_table() {
        let named = |n: &str| ColorSpace::Named(n.to_string());
        assert_eq!(named("DeviceRGB").pixel_mode().unwrap(), PixelMode::Rgb);
        assert_eq!(named("DefaultCMYK").pixel_mode().unwrap(), PixelMode::Cmyk);
        assert_eq!(named("DeviceGray").pixel_mode().unwrap(), PixelMode::Gray8);
        assert_eq!(named("Indexed").pixel_mode().unwrap(), PixelMode::Palette8);
        assert_eq!(ColorSpace::IccBased(3).pixel_mode().unwrap(), PixelMode::Rgb);
        assert_eq!(ColorSpace::IccBased(1).pixel_mode().unwrap(), PixelMode::Gray8);

        assert!(matches!(named("Lab").pixel_mode(), Err(Error::UnknownColorSpace(_))));
        assert!(matches!(ColorSpace::IccBased(2).pixel_mode(), Err(Error::UnknownColorSpace(_))));
    }

    #[test]
    fn test_unpack_one_bit_rows_are_byte_aligned() {
        // 3 pixels wide: each row occupies one byte
        let data = [0b1010_0000, 0b0110_0000];
        let out = unpack_samples(&data, 3, 2, 1, 1, true).unwrap();
        assert_eq!(out, vec![255, 0, 255, 0, 255, 255]);

        let raw = unpack_samples(&data, 3, 2, 1, 1, false).unwrap();
        assert_eq!(raw, vec![1, 0, 1, 0, 1, 1]);
    }

    #[test]
    fn test_unpack_rejects_short_data() {
        assert!(unpack_samples(&[0; 5], 2, 1, 3, 8, true).is_none());
        assert!(unpack_samples(&[0; 6], 2, 1, 3, 8, true).is_some());
    }

    #[test]
    fn test_cmyk_to_rgb() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), vec![0, 255, 255]);
    }

    #[test]
    fn test_palette_maps_to_rgb() {
        let palette = vec![255, 0, 0, 0, 255, 0];
        let cs = ColorSpace::Indexed {
            base: Box::new(ColorSpace::Named("DeviceRGB".to_string())),
            hival: 1,
            palette,
        };
        let img = decode_raster(&resource(3, 1, 8, cs), PixelMode::Palette8, &[0, 1, 7]).unwrap();
        let rgb = img.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 255, 0]);
        // index beyond hival
        assert_eq!(rgb.get_pixel(2, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_decode_raster_size_mismatch() {
        let res = resource(4, 4, 8, ColorSpace::Named("DeviceRGB".to_string()));
        let err = decode_raster(&res, PixelMode::Rgb, &[0; 10]).unwrap_err();
        assert!(matches!(err, Error::InvalidImageData(_)));
    }

    #[test]
    fn test_decode_raster_huge_geometry() {
        for bpc in [1, 8, 16] {
            let res = resource(u32::MAX, u32::MAX, bpc, ColorSpace::Named("DeviceRGB".to_string()));
            let err = decode_raster(&res, PixelMode::Rgb, &[0; 12]).unwrap_err();
            assert!(matches!(err, Error::InvalidImageData(_)));
        }
        assert_eq!(unpack_samples(&[0; 12], usize::MAX, 2, 3, 8, true), None);
    }

    #[test]
    fn test_parse_color_spaces() {
        let mut doc = Document::with_version("1.5");
        let profile = doc.add_object(Stream::new(dictionary! { "N" => 4 }, vec![]));

        let icc = Object::Array(vec![Object::Name(b"ICCBased".to_vec()), Object::Reference(profile)]);
        assert_eq!(parse_color_space(&doc, &icc).unwrap(), ColorSpace::IccBased(4));

        let indexed = Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceGray".to_vec()),
            Object::Integer(1),
            Object::string_literal(vec![0u8, 255]),
        ]);
        let parsed = parse_color_space(&doc, &indexed).unwrap();
        assert_eq!(
            parsed,
            ColorSpace::Indexed {
                base: Box::new(ColorSpace::Named("DeviceGray".to_string())),
                hival: 1,
                palette: vec![0, 255],
            }
        );
    }

    #[test]
    fn test_decode_parms_follow_terminal_filter() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Filter" => vec![Object::Name(b"ASCII85Decode".to_vec()), Object::Name(b"CCITTFaxDecode".to_vec())],
            "DecodeParms" => vec![Object::Null, Object::Dictionary(dictionary! { "K" => -1, "Columns" => 100 })],
        };

        let filters = extract_filters(&doc, &dict);
        assert_eq!(filters, vec![Filter::Ascii85, Filter::CcittFax]);

        let parms = extract_decode_parms(&doc, &dict, filters.len());
        assert_eq!(parms.k, -1);
        assert_eq!(parms.columns, 100);
        assert_eq!(parms.predictor, 1);
    }
}
