//! Single-page document handle
//!
//! Every [`PageObject`] owns a complete one-page `lopdf::Document`, so a page
//! can be rotated, composed and written out without dragging its source
//! document along.

use std::collections::HashMap;
use std::path::Path;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};
use crate::layout::{Extent, Rotation, TransformMatrix};
use crate::pdf::images::{self, ImageResource};
use crate::pdf::merge;

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// US Letter, used when neither the page nor its ancestors carry a MediaBox
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// A page rectangle `[llx lly urx ury]` in points
pub type Rect = [f64; 4];

/// One page, detached into its own document
#[derive(Debug, Clone)]
pub struct PageObject {
    doc: Document,
    page_id: ObjectId,
}

impl PageObject {
    /// Load page `page_number` (1-based) of the PDF at `path`
    pub fn load(path: &Path, page_number: u32) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let doc = Document::load(path)?;
        Self::from_document(&doc, page_number)
    }

    /// Copy page `page_number` (1-based) of `source` into a new one-page document.
    ///
    /// Inherited attributes are written onto the copied page and only the
    /// objects the page references are carried over.
    pub fn from_document(source: &Document, page_number: u32) -> Result<Self> {
        let pages = source.get_pages();
        let source_page_id = *pages.get(&page_number).ok_or(Error::PageOutOfRange {
            page: page_number,
            count: pages.len(),
        })?;

        let source_page = source.get_dictionary(source_page_id)?;

        let mut doc = Document::with_version("1.5");
        let page_id = doc.new_object_id();

        // References back to the page itself (annotations' /P) point at the copy
        let mut cache: HashMap<ObjectId, ObjectId> = HashMap::new();
        cache.insert(source_page_id, page_id);

        let mut page = Dictionary::new();
        for (key, value) in source_page.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            page.set(key.clone(), merge::copy_object_deep(&mut doc, source, value, &mut cache)?);
        }

        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, source_page_id, key) {
                let copied = merge::copy_object_deep(&mut doc, source, value, &mut cache)?;
                page.set(key.to_vec(), copied);
            }
        }

        if !page.has(b"MediaBox") {
            page.set("MediaBox", rect_to_object(DEFAULT_MEDIA_BOX));
        }

        Ok(Self::assemble(doc, page_id, page))
    }

    /// A page with no content covering `media_box`
    pub fn blank(media_box: Rect) -> Self {
        let mut doc = Document::with_version("1.5");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let page_id = doc.new_object_id();

        let page = dictionary! {
            "MediaBox" => rect_to_object(media_box),
            "Contents" => Object::Reference(content_id),
            "Resources" => Dictionary::new(),
        };

        Self::assemble(doc, page_id, page)
    }

    /// Wrap `page` (stored under the pre-allocated `page_id`) with a page tree
    /// and catalog so `doc` becomes a valid one-page document.
    pub(crate) fn assemble(mut doc: Document, page_id: ObjectId, mut page: Dictionary) -> Self {
        let pages_id = doc.new_object_id();

        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        doc.objects.insert(page_id, Object::Dictionary(page));

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        Self { doc, page_id }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    /// The page dictionary
    pub fn page_dict(&self) -> Result<&Dictionary> {
        Ok(self.doc.get_dictionary(self.page_id)?)
    }

    fn page_dict_mut(&mut self) -> Result<&mut Dictionary> {
        Ok(self.doc.get_dictionary_mut(self.page_id)?)
    }

    /// Media box `[llx lly urx ury]`
    pub fn media_box(&self) -> Result<Rect> {
        let page = self.page_dict()?;
        let obj = match page.get(b"MediaBox") {
            Ok(obj) => resolve_object(&self.doc, obj),
            Err(_) => return Ok(DEFAULT_MEDIA_BOX),
        };

        let values = obj.as_array()?;
        if values.len() != 4 {
            return Err(Error::General(format!(
                "MediaBox has {} entries, expected 4",
                values.len()
            )));
        }

        let mut rect = [0.0; 4];
        for (slot, value) in rect.iter_mut().zip(values) {
            *slot = resolve_object(&self.doc, value).as_float()? as f64;
        }
        Ok(rect)
    }

    /// Media box width in points
    pub fn width(&self) -> Result<f64> {
        let [llx, _, urx, _] = self.media_box()?;
        Ok((urx - llx).abs())
    }

    /// Media box height in points
    pub fn height(&self) -> Result<f64> {
        let [_, lly, _, ury] = self.media_box()?;
        Ok((ury - lly).abs())
    }

    pub fn extent(&self) -> Result<Extent> {
        Ok(Extent {
            width: self.width()?,
            height: self.height()?,
        })
    }

    /// The `/Rotate` entry, normalized modulo 360
    pub fn rotation(&self) -> Result<Rotation> {
        let page = self.page_dict()?;
        let degrees = match page.get(b"Rotate") {
            Ok(obj) => match resolve_object(&self.doc, obj) {
                Object::Integer(i) => *i,
                Object::Real(r) if r.fract() == 0.0 => *r as i64,
                other => {
                    return Err(Error::General(format!(
                        "Rotate is not an integer: {:?}",
                        other
                    )));
                }
            },
            Err(_) => 0,
        };
        Rotation::from_degrees(degrees)
    }

    pub fn set_rotation(&mut self, rotation: Rotation) -> Result<()> {
        let page = self.page_dict_mut()?;
        if rotation == Rotation::Deg0 {
            page.remove(b"Rotate");
        } else {
            page.set("Rotate", Object::Integer(rotation.degrees()));
        }
        Ok(())
    }

    /// Turn the page by `quarter_turns` clockwise 90 degree steps
    /// (negative values turn counter-clockwise).
    pub fn rotate(&mut self, quarter_turns: i32) -> Result<()> {
        let rotation = self.rotation()?.turned(quarter_turns);
        self.set_rotation(rotation)
    }

    /// Draw `donor` on top of this page.
    ///
    /// The donor's content is turned counter-clockwise by `rotation_degrees`
    /// (a multiple of 90), scaled, then translated by `(tx, ty)`. The donor's
    /// own `/Rotate` entry plays no part; callers counteract it through
    /// `rotation_degrees`.
    pub fn merge_transformed(
        &mut self,
        donor: &PageObject,
        rotation_degrees: i64,
        scale: f64,
        tx: f64,
        ty: f64,
    ) -> Result<()> {
        let matrix = TransformMatrix::rotate_scale_translate(rotation_degrees, scale, tx, ty)?;

        let xobject_id = merge::import_page_as_form(&mut self.doc, &donor.doc, donor.page_id)?;
        let name = merge::add_xobject_to_page_resources(&mut self.doc, self.page_id, xobject_id)?;
        merge::wrap_page_content_in_graphics_state(&mut self.doc, self.page_id)?;

        let content = format!("q {} /{} Do Q\n", matrix.to_cm_operator(), name);
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        merge::append_content_to_page(&mut self.doc, self.page_id, content_id)?;

        Ok(())
    }

    /// The page's image XObjects in resource order
    pub fn image_resources(&self) -> Result<Vec<ImageResource>> {
        images::image_resources(self)
    }

    /// Save the page as a standalone PDF
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut doc = self.doc.clone();
        doc.compress();
        doc.save(path)?;
        Ok(())
    }
}

/// Follow one level of reference indirection
pub(crate) fn resolve_object<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Look `key` up on the page, then on each ancestor in the page tree
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    // bounded walk in case of a cyclic /Parent chain
    for _ in 0..64 {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
    }

    None
}

pub(crate) fn rect_to_object(rect: Rect) -> Object {
    Object::Array(
        rect.iter()
            .map(|&v| {
                if v.fract() == 0.0 {
                    Object::Integer(v as i64)
                } else {
                    Object::Real(v as f32)
                }
            })
            .collect(),
    )
}
