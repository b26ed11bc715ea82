//! Minimal TIFF container for CCITT fax payloads.
//!
//! A `CCITTFaxDecode` stream carries a bare bitstream with no header of its
//! own. Prefixing it with a single-strip IFD is enough for image viewers to
//! open it as a bilevel TIFF.

/// CCITT compression scheme of a fax payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaxGroup {
    /// T.4, TIFF compression 3
    Group3,
    /// T.6, TIFF compression 4
    Group4,
}

impl FaxGroup {
    /// Map the `/K` decode parameter: negative one selects pure 2-D (Group 4),
    /// anything else is Group 3.
    pub fn from_k(k: i64) -> Self {
        if k == -1 {
            FaxGroup::Group4
        } else {
            FaxGroup::Group3
        }
    }

    /// TIFF `Compression` tag value
    pub fn compression(self) -> u16 {
        match self {
            FaxGroup::Group3 => 3,
            FaxGroup::Group4 => 4,
        }
    }
}

const TAG_IMAGE_WIDTH: u16 = 256;
const TAG_IMAGE_LENGTH: u16 = 257;
const TAG_BITS_PER_SAMPLE: u16 = 258;
const TAG_COMPRESSION: u16 = 259;
const TAG_PHOTOMETRIC: u16 = 262;
const TAG_STRIP_OFFSETS: u16 = 273;
const TAG_ROWS_PER_STRIP: u16 = 278;
const TAG_STRIP_BYTE_COUNTS: u16 = 279;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;

/// `WhiteIsZero` photometric interpretation
const PHOTOMETRIC_WHITE_IS_ZERO: u32 = 0;

const ENTRY_COUNT: u16 = 8;

/// Length of the synthesized header: byte order mark (2), version (2),
/// IFD offset (4), entry count (2), eight 12-byte entries, and a 2-byte
/// zero terminator.
pub const TIFF_HEADER_LEN: usize = 2 + 2 + 4 + 2 + 12 * ENTRY_COUNT as usize + 2;

/// One IFD entry; every value fits in the 4-byte value field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    pub value: u32,
}

impl IfdEntry {
    fn short(tag: u16, value: u16) -> Self {
        Self { tag, field_type: TYPE_SHORT, count: 1, value: value as u32 }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self { tag, field_type: TYPE_LONG, count: 1, value }
    }
}

/// Fixed-layout TIFF header for a single-strip bilevel fax image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiffHeader {
    pub entries: [IfdEntry; ENTRY_COUNT as usize],
}

impl TiffHeader {
    /// Build the header for a payload of `payload_len` bytes.
    pub fn new(width: u32, height: u32, payload_len: u32, group: FaxGroup) -> Self {
        Self {
            entries: [
                IfdEntry::long(TAG_IMAGE_WIDTH, width),
                IfdEntry::long(TAG_IMAGE_LENGTH, height),
                IfdEntry::short(TAG_BITS_PER_SAMPLE, 1),
                IfdEntry::short(TAG_COMPRESSION, group.compression()),
                IfdEntry::short(TAG_PHOTOMETRIC, PHOTOMETRIC_WHITE_IS_ZERO as u16),
                IfdEntry::long(TAG_STRIP_OFFSETS, TIFF_HEADER_LEN as u32),
                IfdEntry::long(TAG_ROWS_PER_STRIP, height),
                IfdEntry::long(TAG_STRIP_BYTE_COUNTS, payload_len),
            ],
        }
    }

    /// Look up an entry value by tag
    pub fn value(&self, tag: u16) -> Option<u32> {
        self.entries.iter().find(|e| e.tag == tag).map(|e| e.value)
    }

    /// Serialize little-endian
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TIFF_HEADER_LEN);
        out.extend_from_slice(b"II");
        out.extend_from_slice(&42u16.to_le_bytes());
        out.extend_from_slice(&8u32.to_le_bytes());
        out.extend_from_slice(&ENTRY_COUNT.to_le_bytes());

        for entry in &self.entries {
            out.extend_from_slice(&entry.tag.to_le_bytes());
            out.extend_from_slice(&entry.field_type.to_le_bytes());
            out.extend_from_slice(&entry.count.to_le_bytes());
            out.extend_from_slice(&entry.value.to_le_bytes());
        }

        out.extend_from_slice(&0u16.to_le_bytes());
        debug_assert_eq!(out.len(), TIFF_HEADER_LEN);
        out
    }
}

/// Header bytes for a CCITT payload of `payload_len` bytes.
pub fn tiff_header_for_ccitt(width: u32, height: u32, payload_len: u32, group: FaxGroup) -> Vec<u8> {
    TiffHeader::new(width, height, payload_len, group).to_bytes()
}
