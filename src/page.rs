//! Pages of the working set: identity, provenance, transform history, and
//! the composition of one page onto another.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use lopdf::Document;
use tracing::debug;
use crate::error::{Error, Result};
use crate::layout::{composition_offset, Offset, PageDimensions};
use crate::pdf::object::PageObject;

static NEXT_PAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique page identity; ids are never handed out twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl PageId {
    fn next() -> Self {
        PageId(NEXT_PAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a page came from within its source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLabel {
    /// 1-based page number
    Number(u32),
    /// Non-numbered origin, e.g. `image`
    Tag(String),
}

impl fmt::Display for PageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLabel::Number(n) => write!(f, "{}", n),
            PageLabel::Tag(tag) => f.write_str(tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProvenanceEntry {
    /// File name of the source, without directories
    source: String,
    labels: Vec<PageLabel>,
}

/// Ordered list of the source pages that make up a page, rendered as
/// `a.pdf<1,3>b.pdf<2>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Provenance {
    entries: Vec<ProvenanceEntry>,
}

impl Provenance {
    pub fn new(source: impl Into<String>, label: PageLabel) -> Self {
        Self {
            entries: vec![ProvenanceEntry {
                source: source.into(),
                labels: vec![label],
            }],
        }
    }

    /// Append `other`'s entries; an entry from the same source as the
    /// current last entry extends that entry's labels.
    pub fn append(&mut self, other: &Provenance) {
        for entry in &other.entries {
            match self.entries.last_mut() {
                Some(last) if last.source == entry.source => {
                    last.labels.extend(entry.labels.iter().cloned());
                }
                _ => self.entries.push(entry.clone()),
            }
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{}<", entry.source)?;
            for (i, label) in entry.labels.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", label)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryToken {
    /// Net quarter turns of a rotation run, clockwise positive, in -2..=2
    Turns(i8),
    Merge,
    Stamp,
    Background,
}

/// Canonical record of what was done to a page.
///
/// Rotations are folded into the trailing run as they happen, so the
/// history never holds a run that could be shortened.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct History {
    tokens: Vec<HistoryToken>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a quarter turn: `1` clockwise (`R`), `-1` counter-clockwise (`L`)
    fn turn(&mut self, step: i8) {
        if let Some(HistoryToken::Turns(run)) = self.tokens.last_mut() {
            let next = match *run + step {
                3 => -1,
                -3 => 1,
                n => n,
            };
            if next == 0 {
                self.tokens.pop();
            } else {
                *run = next;
            }
        } else {
            self.tokens.push(HistoryToken::Turns(step));
        }
    }

    fn push(&mut self, token: HistoryToken) {
        self.tokens.push(token);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match *token {
                HistoryToken::Turns(n) if n > 0 => f.write_str(&"R".repeat(n as usize))?,
                HistoryToken::Turns(n) => f.write_str(&"L".repeat(n.unsigned_abs() as usize))?,
                HistoryToken::Merge => f.write_str("M")?,
                HistoryToken::Stamp => f.write_str("⊙")?,
                HistoryToken::Background => f.write_str("▣")?,
            }
        }
        Ok(())
    }
}

/// How a donor page is combined with a receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// Draw the donor on top; the donor counts as part of the page
    Merge,
    /// Draw the donor on top as decoration
    Stamp,
    /// Draw the donor underneath; the result takes over the donor's identity
    Background,
}

impl Composition {
    fn token(self) -> HistoryToken {
        match self {
            Composition::Merge => HistoryToken::Merge,
            Composition::Stamp => HistoryToken::Stamp,
            Composition::Background => HistoryToken::Background,
        }
    }
}

/// A page of the working set
#[derive(Debug)]
pub struct Page {
    id: PageId,
    object: PageObject,
    provenance: Provenance,
    history: History,
}

impl Page {
    /// A new page with a fresh id and empty history
    pub fn new(object: PageObject, provenance: Provenance) -> Self {
        Self {
            id: PageId::next(),
            object,
            provenance,
            history: History::new(),
        }
    }

    /// Load page `page_number` (1-based) of the PDF at `path`
    pub fn load(path: &Path, page_number: u32) -> Result<Self> {
        let object = PageObject::load(path, page_number)?;
        Ok(Self::new(
            object,
            Provenance::new(basename(path), PageLabel::Number(page_number)),
        ))
    }

    /// Wrap the raster image at `path` as a page
    pub fn from_image(path: &Path, size: Option<PageDimensions>) -> Result<Self> {
        let object = PageObject::from_image(path, size)?;
        Ok(Self::new(
            object,
            Provenance::new(basename(path), PageLabel::Tag("image".to_string())),
        ))
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn object(&self) -> &PageObject {
        &self.object
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Display label: provenance followed by history, e.g. `a.pdf<1>RM`
    pub fn label(&self) -> String {
        format!("{}{}", self.provenance, self.history)
    }

    /// Turn the page 90 degrees counter-clockwise
    pub fn rotate_left(&mut self) -> Result<()> {
        self.object.rotate(-1)?;
        self.history.turn(-1);
        Ok(())
    }

    /// Turn the page 90 degrees clockwise
    pub fn rotate_right(&mut self) -> Result<()> {
        self.object.rotate(1)?;
        self.history.turn(1);
        Ok(())
    }
}

/// One page per page of the PDF at `path`, in page order
pub fn load_pages(path: &Path) -> Result<Vec<Page>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if numbers.is_empty() {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let source = basename(path);
    let mut pages = Vec::with_capacity(numbers.len());
    for number in numbers {
        let object = PageObject::from_document(&doc, number)?;
        pages.push(Page::new(object, Provenance::new(source.clone(), PageLabel::Number(number))));
    }

    debug!(path = %path.display(), pages = pages.len(), "Loaded pages");
    Ok(pages)
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Combine `donor` with `receiver` and return the resulting page.
///
/// The donor is turned back by its own `/Rotate` so it appears upright, and
/// lands at `offset` (points, origin bottom-left) within the receiver.
/// `Merge` and `Stamp` draw the donor over the receiver's content;
/// `Background` draws it underneath and the result carries the donor's id,
/// provenance and history.
pub fn compose(receiver: Page, donor: &Page, op: Composition, offset: Offset) -> Result<Page> {
    let rotation = donor.object.rotation()?;
    let adjusted = composition_offset(rotation, receiver.object.extent()?, donor.object.extent()?, offset);
    let back = -rotation.degrees();

    debug!(
        receiver = %receiver.id,
        donor = %donor.id,
        ?op,
        rotation = rotation.degrees(),
        tx = adjusted.tx,
        ty = adjusted.ty,
        "Composing pages"
    );

    match op {
        Composition::Merge | Composition::Stamp => {
            let Page { id, mut object, mut provenance, mut history } = receiver;
            object.merge_transformed(&donor.object, back, 1.0, adjusted.tx, adjusted.ty)?;

            if op == Composition::Merge {
                provenance.append(&donor.provenance);
            }
            history.push(op.token());

            Ok(Page { id, object, provenance, history })
        }
        Composition::Background => {
            let mut object = PageObject::blank(receiver.object.media_box()?);
            object.merge_transformed(&donor.object, back, 1.0, adjusted.tx, adjusted.ty)?;
            object.merge_transformed(&receiver.object, 0, 1.0, 0.0, 0.0)?;
            object.set_rotation(receiver.object.rotation()?)?;

            let mut history = donor.history.clone();
            history.push(op.token());

            Ok(Page {
                id: donor.id,
                object,
                provenance: donor.provenance.clone(),
                history,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Rotation;

    fn blank_page(source: &str, number: u32, width: f64, height: f64) -> Page {
        Page::new(
            PageObject::blank([0.0, 0.0, width, height]),
            Provenance::new(source, PageLabel::Number(number)),
        )
    }

    fn last_content(page: &Page) -> String {
        let dict = page.object().page_dict().unwrap();
        let contents = dict.get(b"Contents").unwrap().as_array().unwrap();
        let id = contents.last().unwrap().as_reference().unwrap();
        let stream = page.object().document().get_object(id).unwrap().as_stream().unwrap();
        String::from_utf8_lossy(&stream.content).into_owned()
    }

    #[test]
    fn test_page_ids_are_unique() {
        let a = blank_page("a.pdf", 1, 100.0, 100.0);
        let b = blank_page("a.pdf", 1, 100.0, 100.0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_four_left_turns_cancel() {
        let mut page = blank_page("a.pdf", 1, 100.0, 100.0);
        let before = page.history().clone();
        for _ in 0..4 {
            page.rotate_left().unwrap();
        }
        assert_eq!(page.history(), &before);
        assert!(page.history().is_empty());
        assert_eq!(page.object().rotation().unwrap(), Rotation::Deg0);
    }

    #[test]
    fn test_left_then_right_cancel() {
        let mut page = blank_page("a.pdf", 1, 100.0, 100.0);
        page.rotate_left().unwrap();
        page.rotate_right().unwrap();
        assert!(page.history().is_empty());
    }

    #[test]
    fn test_three_turns_collapse_to_opposite() {
        let mut page = blank_page("a.pdf", 1, 100.0, 100.0);
        for _ in 0..3 {
            page.rotate_left().unwrap();
        }
        assert_eq!(page.history().to_string(), "R");
        assert_eq!(page.object().rotation().unwrap(), Rotation::Deg90);

        let mut page = blank_page("a.pdf", 1, 100.0, 100.0);
        for _ in 0..3 {
            page.rotate_right().unwrap();
        }
        assert_eq!(page.history().to_string(), "L");
        assert_eq!(page.object().rotation().unwrap(), Rotation::Deg270);
    }

    #[test]
    fn test_two_turns_stay_as_written() {
        let mut page = blank_page("a.pdf", 1, 100.0, 100.0);
        page.rotate_right().unwrap();
        page.rotate_right().unwrap();
        assert_eq!(page.history().to_string(), "RR");
    }

    #[test]
    fn test_composition_ends_rotation_run() {
        let mut receiver = blank_page("a.pdf", 1, 100.0, 100.0);
        let donor = blank_page("b.pdf", 1, 100.0, 100.0);
        receiver.rotate_right().unwrap();

        let mut page = compose(receiver, &donor, Composition::Stamp, Offset::default()).unwrap();
        page.rotate_left().unwrap();
        assert_eq!(page.history().to_string(), "R⊙L");
    }

    #[test]
    fn test_provenance_display() {
        let mut provenance = Provenance::new("a.pdf", PageLabel::Number(1));
        provenance.append(&Provenance::new("a.pdf", PageLabel::Number(3)));
        provenance.append(&Provenance::new("b.pdf", PageLabel::Number(2)));
        provenance.append(&Provenance::new("scan.png", PageLabel::Tag("image".to_string())));
        assert_eq!(provenance.to_string(), "a.pdf<1,3>b.pdf<2>scan.png<image>");
    }

    #[test]
    fn test_merge_appends_provenance() {
        let receiver = blank_page("a.pdf", 1, 100.0, 100.0);
        let same = blank_page("a.pdf", 3, 100.0, 100.0);
        let other = blank_page("b.pdf", 2, 100.0, 100.0);
        let id = receiver.id();

        let page = compose(receiver, &same, Composition::Merge, Offset::default()).unwrap();
        let page = compose(page, &other, Composition::Merge, Offset::default()).unwrap();

        assert_eq!(page.id(), id);
        assert_eq!(page.provenance().to_string(), "a.pdf<1,3>b.pdf<2>");
        assert_eq!(page.history().to_string(), "MM");
        assert_eq!(page.label(), "a.pdf<1,3>b.pdf<2>MM");
    }

    #[test]
    fn test_stamp_keeps_provenance() {
        let receiver = blank_page("a.pdf", 1, 100.0, 100.0);
        let stamp = blank_page("logo.pdf", 1, 10.0, 10.0);
        let before = receiver.provenance().clone();

        let page = compose(receiver, &stamp, Composition::Stamp, Offset::new(5.0, 5.0)).unwrap();
        assert_eq!(page.provenance(), &before);
        assert_eq!(page.history().to_string(), "⊙");
        assert_eq!(last_content(&page), "q 1 0 0 1 5 5 cm /Pg1 Do Q\n");
    }

    #[test]
    fn test_background_takes_donor_identity() {
        let mut receiver = blank_page("a.pdf", 1, 200.0, 300.0);
        receiver.rotate_right().unwrap();
        let mut donor = blank_page("paper.pdf", 1, 200.0, 300.0);
        donor.rotate_left().unwrap();
        donor.rotate_left().unwrap();
        let donor_id = donor.id();

        let page = compose(receiver, &donor, Composition::Background, Offset::default()).unwrap();

        assert_eq!(page.id(), donor_id);
        assert_eq!(page.provenance(), donor.provenance());
        assert_eq!(page.history().to_string(), "LL▣");
        // receiver keeps its orientation and size
        assert_eq!(page.object().rotation().unwrap(), Rotation::Deg90);
        assert_eq!(page.object().width().unwrap(), 200.0);
        assert_eq!(page.object().height().unwrap(), 300.0);

        // donor first, receiver on top
        let xobjects = page
            .object()
            .page_dict()
            .unwrap()
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(xobjects.len(), 2);
        assert_eq!(last_content(&page), "q 1 0 0 1 0 0 cm /Pg2 Do Q\n");
    }

    #[test]
    fn test_rotated_donor_is_turned_back() {
        let receiver = blank_page("a.pdf", 1, 600.0, 800.0);
        let mut donor = blank_page("b.pdf", 1, 200.0, 300.0);
        donor.rotate_right().unwrap();

        let page = compose(receiver, &donor, Composition::Merge, Offset::default()).unwrap();
        assert_eq!(last_content(&page), "q 0 -1 1 0 0 800 cm /Pg1 Do Q\n");
    }

    #[test]
    fn test_invalid_donor_rotation_is_rejected() {
        let receiver = blank_page("a.pdf", 1, 100.0, 100.0);
        let object = PageObject::blank([0.0, 0.0, 100.0, 100.0]);
        let mut doc = object.clone().into_document();
        let page_id = object.page_id();
        doc.get_dictionary_mut(page_id).unwrap().set("Rotate", 45);
        let donor = Page::new(
            PageObject::from_document(&doc, 1).unwrap(),
            Provenance::new("bad.pdf", PageLabel::Number(1)),
        );

        let err = compose(receiver, &donor, Composition::Merge, Offset::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidRotationValue(45)));
    }
}
