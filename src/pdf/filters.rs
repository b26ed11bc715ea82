//! Filter chain resolution for image XObjects
//!
//! The extractor only needs to know the innermost (terminal) filter of a
//! stream and a payload it can either transport verbatim or read as pixels.

use lopdf::filters::png;
use lopdf::{dictionary, Stream};
use crate::error::{Error, Result};

/// Stream filters that can appear on an image XObject
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// No filter: the stored bytes are the pixels
    None,
    Ascii85,
    AsciiHex,
    Flate,
    Lzw,
    RunLength,
    Dct,
    Jpx,
    CcittFax,
    Jbig2,
    Other(String),
}

impl Filter {
    /// Parse a filter name, accepting the inline-image abbreviations
    pub fn from_name(name: &[u8]) -> Self {
        match name {
            b"ASCII85Decode" | b"A85" => Filter::Ascii85,
            b"ASCIIHexDecode" | b"AHx" => Filter::AsciiHex,
            b"FlateDecode" | b"Fl" => Filter::Flate,
            b"LZWDecode" | b"LZW" => Filter::Lzw,
            b"RunLengthDecode" | b"RL" => Filter::RunLength,
            b"DCTDecode" | b"DCT" => Filter::Dct,
            b"JPXDecode" => Filter::Jpx,
            b"CCITTFaxDecode" | b"CCF" => Filter::CcittFax,
            b"JBIG2Decode" => Filter::Jbig2,
            other => Filter::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Filter::None => "(none)",
            Filter::Ascii85 => "ASCII85Decode",
            Filter::AsciiHex => "ASCIIHexDecode",
            Filter::Flate => "FlateDecode",
            Filter::Lzw => "LZWDecode",
            Filter::RunLength => "RunLengthDecode",
            Filter::Dct => "DCTDecode",
            Filter::Jpx => "JPXDecode",
            Filter::CcittFax => "CCITTFaxDecode",
            Filter::Jbig2 => "JBIG2Decode",
            Filter::Other(name) => name,
        }
    }
}

/// Decode parameters of the terminal filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeParms {
    /// CCITT `/K`
    pub k: i64,
    /// Flate `/Predictor`
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for DecodeParms {
    fn default() -> Self {
        Self {
            k: 0,
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

/// Terminal filter plus the payload ready for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPayload {
    pub filter: Filter,
    pub data: Vec<u8>,
}

/// End-of-data marker of an ASCII-85 stream
const ASCII85_EOD: &[u8] = b"~>";

/// Resolve `filters` (outermost first) against the stored bytes.
///
/// ASCII-85 layers are peeled off until one filter is left; any other filter
/// in a wrapping position makes the chain unsupported. Stored bytes ending in
/// `~>` (trailing whitespace aside) are ASCII-85 decoded whatever the chain
/// says, so a binary payload that happens to end in those two bytes is
/// misread. A flate terminal is inflated (and un-predicted); every other
/// terminal gets its bytes still encoded.
pub fn resolve_filter_chain(filters: &[Filter], raw: &[u8], parms: &DecodeParms) -> Result<ResolvedPayload> {
    let mut chain = filters;
    while chain.len() > 1 {
        match &chain[0] {
            Filter::Ascii85 => chain = &chain[1..],
            other => {
                return Err(Error::UnsupportedFilterChain(format!(
                    "{} wrapping {}",
                    other.name(),
                    chain[1].name()
                )));
            }
        }
    }
    let terminal = chain.first().cloned().unwrap_or(Filter::None);

    let trimmed = raw.trim_ascii_end();
    let data = if trimmed.ends_with(ASCII85_EOD) {
        ascii85_decode(trimmed)?
    } else {
        raw.to_vec()
    };

    let data = match terminal {
        Filter::Flate => flate_decode(&data, parms)?,
        // a lone ASCII-85 layer has already been unwrapped above
        Filter::Ascii85 => {
            return Ok(ResolvedPayload { filter: Filter::None, data });
        }
        _ => data,
    };

    Ok(ResolvedPayload { filter: terminal, data })
}

/// Decode ASCII-85 data ending in `~>`, with or without a leading `<~`
pub fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let data = data.strip_prefix(b"<~").unwrap_or(data);
    decode_with("ASCII85Decode", data)
}

/// Inflate a zlib stream and undo any predictor.
///
/// Predictor rows are checked against the inflated length before anything
/// is allocated for them, so `/Columns` from the file cannot size a buffer
/// larger than the data.
pub fn flate_decode(data: &[u8], parms: &DecodeParms) -> Result<Vec<u8>> {
    let inflated = decode_with("FlateDecode", data)?;
    if inflated.is_empty() && !data.is_empty() {
        return Err(Error::InvalidImageData("FlateDecode produced no data".to_string()));
    }

    match parms.predictor {
        0 | 1 => Ok(inflated),
        2 => apply_tiff_predictor(inflated, parms),
        10..=15 => {
            let geometry = predictor_row(parms, inflated.len())?;
            png::decode_frame(&inflated, geometry.bytes_per_pixel, geometry.row_bytes / geometry.bytes_per_pixel)
                .map_err(|e| Error::InvalidImageData(format!("PNG predictor: {}", e)))
        }
        other => Err(Error::InvalidImageData(format!("unknown predictor {}", other))),
    }
}

/// Run one lopdf decoder over `data`
fn decode_with(filter: &str, data: &[u8]) -> Result<Vec<u8>> {
    let stream = Stream::new(dictionary! { "Filter" => filter }, data.to_vec());
    stream
        .decompressed_content()
        .map_err(|e| Error::InvalidImageData(format!("{}: {}", filter, e)))
}

struct RowGeometry {
    bytes_per_pixel: usize,
    row_bytes: usize,
}

/// Row layout of predicted data; a single row may not exceed `available` bytes
fn predictor_row(parms: &DecodeParms, available: usize) -> Result<RowGeometry> {
    let bits_per_pixel = parms.colors.checked_mul(parms.bits_per_component);
    let row_bits = bits_per_pixel.and_then(|bits| bits.checked_mul(parms.columns));

    match (bits_per_pixel, row_bits) {
        (Some(bits_per_pixel), Some(row_bits)) if row_bits.div_ceil(8) <= available => Ok(RowGeometry {
            bytes_per_pixel: (bits_per_pixel / 8).max(1),
            row_bytes: row_bits.div_ceil(8),
        }),
        _ => Err(Error::InvalidImageData(format!(
            "predictor row of {} columns exceeds {} bytes of data",
            parms.columns, available
        ))),
    }
}

/// TIFF predictor 2 (horizontal differencing), 8-bit samples only
fn apply_tiff_predictor(mut data: Vec<u8>, parms: &DecodeParms) -> Result<Vec<u8>> {
    if parms.bits_per_component != 8 {
        return Ok(data);
    }
    let geometry = predictor_row(parms, data.len())?;
    let bpp = geometry.bytes_per_pixel;

    for row in data.chunks_mut(geometry.row_bytes.max(1)) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn ascii85_encode(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in data.chunks(4) {
            let mut group = [0u8; 4];
            group[..chunk.len()].copy_from_slice(chunk);
            let mut value = u32::from_be_bytes(group);
            let mut digits = [0u8; 5];
            for digit in digits.iter_mut().rev() {
                *digit = (value % 85) as u8 + b'!';
                value /= 85;
            }
            out.extend_from_slice(&digits[..chunk.len() + 1]);
        }
        out.extend_from_slice(b"~>");
        out
    }

    #[test]
    fn test_filter_names() {
        assert_eq!(Filter::from_name(b"FlateDecode"), Filter::Flate);
        assert_eq!(Filter::from_name(b"Fl"), Filter::Flate);
        assert_eq!(Filter::from_name(b"CCF"), Filter::CcittFax);
        assert_eq!(Filter::from_name(b"A85"), Filter::Ascii85);
        assert_eq!(Filter::from_name(b"Crypt"), Filter::Other("Crypt".to_string()));
        assert_eq!(Filter::Dct.name(), "DCTDecode");
    }

    #[test]
    fn test_ascii85_decode() {
        let decoded = ascii85_decode(b"<~87cURD]i,\"Ebo80~>").unwrap();
        assert_eq!(decoded, b"Hello World!");

        let decoded = ascii85_decode(b"87cURD]i,\"Ebo7~>").unwrap();
        assert_eq!(decoded, b"Hello World");
    }

    #[test]
    fn test_ascii85_z_and_whitespace() {
        let decoded = ascii85_decode(b"z\n  z~>").unwrap();
        assert_eq!(decoded, vec![0u8; 8]);
    }

    #[test]
    fn test_ascii85_rejects_overflowing_group() {
        assert!(ascii85_decode(b"uuuuu~>").is_err());
    }

    #[test]
    fn test_single_filter_is_terminal() {
        let parms = DecodeParms::default();
        let resolved = resolve_filter_chain(&[Filter::Dct], b"\xFF\xD8\xFF", &parms).unwrap();
        assert_eq!(resolved.filter, Filter::Dct);
        assert_eq!(resolved.data, b"\xFF\xD8\xFF");
    }

    #[test]
    fn test_ascii85_wrapper_is_unwrapped() {
        let parms = DecodeParms::default();
        let resolved = resolve_filter_chain(
            &[Filter::Ascii85, Filter::Dct],
            b"<~87cURD]i,\"Ebo7~>",
            &parms,
        )
        .unwrap();
        assert_eq!(resolved.filter, Filter::Dct);
        assert_eq!(resolved.data, b"Hello World");
    }

    #[test]
    fn test_non_ascii85_wrapper_is_unsupported() {
        let parms = DecodeParms::default();
        let err = resolve_filter_chain(&[Filter::Flate, Filter::Dct], b"data", &parms).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFilterChain(_)));
    }

    #[test]
    fn test_empty_chain_is_raw() {
        let parms = DecodeParms::default();
        let resolved = resolve_filter_chain(&[], &[1, 2, 3], &parms).unwrap();
        assert_eq!(resolved.filter, Filter::None);
        assert_eq!(resolved.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_flate_terminal_is_inflated() {
        let parms = DecodeParms::default();
        let pixels: Vec<u8> = (0..48).collect();
        let resolved = resolve_filter_chain(&[Filter::Flate], &zlib(&pixels), &parms).unwrap();
        assert_eq!(resolved.filter, Filter::Flate);
        assert_eq!(resolved.data, pixels);
    }

    #[test]
    fn test_trailing_marker_forces_ascii85() {
        // No ASCII85 in the chain, but the payload ends with "~>"
        let parms = DecodeParms::default();
        let resolved = resolve_filter_chain(&[Filter::Jpx], b"87cURD]i,\"Ebo7~>", &parms).unwrap();
        assert_eq!(resolved.filter, Filter::Jpx);
        assert_eq!(resolved.data, b"Hello World");
    }

    #[test]
    fn test_trailing_marker_after_whitespace() {
        let parms = DecodeParms::default();
        let pixels: Vec<u8> = (0..12).collect();
        let mut stored = ascii85_encode(&zlib(&pixels));
        stored.extend_from_slice(b"\r\n");

        let resolved = resolve_filter_chain(&[Filter::Ascii85, Filter::Flate], &stored, &parms).unwrap();
        assert_eq!(resolved.filter, Filter::Flate);
        assert_eq!(resolved.data, pixels);
    }

    #[test]
    fn test_png_up_predictor() {
        // 2 rows of 3 gray pixels, second row encoded with "Up"
        let encoded = [0u8, 10, 20, 30, 2, 1, 1, 1];
        let parms = DecodeParms {
            predictor: 12,
            colors: 1,
            bits_per_component: 8,
            columns: 3,
            ..Default::default()
        };
        let decoded = flate_decode(&zlib(&encoded), &parms).unwrap();
        assert_eq!(decoded, vec![10, 20, 30, 11, 21, 31]);
    }

    #[test]
    fn test_tiff_predictor() {
        let parms = DecodeParms {
            predictor: 2,
            colors: 1,
            bits_per_component: 8,
            columns: 3,
            ..Default::default()
        };
        let decoded = flate_decode(&zlib(&[5, 1, 1, 7, 2, 2]), &parms).unwrap();
        assert_eq!(decoded, vec![5, 6, 7, 7, 9, 11]);
    }

    #[test]
    fn test_png_predictor_rejects_oversized_columns() {
        let parms = DecodeParms {
            predictor: 12,
            columns: 1 << 42,
            ..Default::default()
        };
        let err = flate_decode(&zlib(&[0; 8]), &parms).unwrap_err();
        assert!(matches!(err, Error::InvalidImageData(_)));

        let parms = DecodeParms {
            predictor: 12,
            colors: 3,
            columns: usize::MAX,
            ..Default::default()
        };
        let err = flate_decode(&zlib(&[0; 8]), &parms).unwrap_err();
        assert!(matches!(err, Error::InvalidImageData(_)));
    }

    #[test]
    fn test_tiff_predictor_rejects_oversized_columns() {
        let parms = DecodeParms {
            predictor: 2,
            colors: 3,
            columns: usize::MAX / 2,
            ..Default::default()
        };
        let err = flate_decode(&zlib(&[1, 2, 3]), &parms).unwrap_err();
        assert!(matches!(err, Error::InvalidImageData(_)));
    }

    #[test]
    fn test_flate_garbage_is_error() {
        let parms = DecodeParms::default();
        assert!(flate_decode(b"not zlib", &parms).is_err());
    }
}
