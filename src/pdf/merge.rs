//! Writing page sequences and drawing one page onto another, using lopdf

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};
use crate::error::{Error, Result};
use crate::page::{load_pages, Page};
use crate::pdf::object::resolve_object;

/// Options for concatenating PDFs
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

/// Concatenate the pages of several PDF files into one PDF
///
/// # Example
///
/// ```no_run
/// use pdf_toolkit::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     input_paths: vec![
///         PathBuf::from("1. first.pdf"),
///         PathBuf::from("2. second.pdf"),
///     ],
///     output_path: PathBuf::from("merged.pdf"),
/// };
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<()> {
    if options.input_paths.is_empty() {
        return Err(Error::General("No input files provided".to_string()));
    }

    // Validate all input files exist before loading anything
    for path in &options.input_paths {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let mut pages = Vec::new();
    for path in &options.input_paths {
        pages.extend(load_pages(path)?);
    }

    write_pages(&pages, &options.output_path)
}

/// Write `pages` in order as a single PDF file.
///
/// Each page is cloned out of its own document, so the pages stay usable
/// afterwards.
pub fn write_pages(pages: &[Page], output: &Path) -> Result<()> {
    if pages.is_empty() {
        return Err(Error::General("No pages to write".to_string()));
    }

    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for page in pages {
        let mut doc = page.object().document().clone();

        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());
        objects.extend(doc.objects);
    }

    let mut merged_doc = Document::with_version("1.5");
    merged_doc.objects.extend(objects);

    // new_object_id() must hand out ids above everything just inserted
    merged_doc.max_id = max_id - 1;

    let pages_id = merged_doc.new_object_id();

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = merged_doc.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged_doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged_doc.objects.insert(pages_id, Object::Dictionary(pages_object));
    merged_doc.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = merged_doc.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    // Each page brought its own catalog and page tree along
    let pruned = merged_doc.prune_objects();
    debug!(pruned = pruned.len(), "Dropped unreachable objects");

    merged_doc.compress();
    merged_doc.save(output)?;

    info!(pages = page_ids.len(), output = %output.display(), "Wrote PDF");
    Ok(())
}

/// Copy the page `page_id` of `source` into `output` as a Form XObject.
///
/// The form's bounding box is the page's media box; its resources are deep
/// copied so the form is self-contained in `output`.
pub(crate) fn import_page_as_form(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;
    let mut cache: HashMap<ObjectId, ObjectId> = HashMap::new();

    let media_box = match page_dict.get(b"MediaBox") {
        Ok(obj) => copy_object_deep(output, source, obj, &mut cache)?,
        Err(_) => Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]),
    };

    let content = page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set("BBox", media_box);

    if let Ok(resources) = page_dict.get(b"Resources") {
        xobject_dict.set("Resources", copy_object_deep(output, source, resources, &mut cache)?);
    }

    Ok(output.add_object(Stream::new(xobject_dict, content)))
}

/// Decoded content of a page, with multiple streams joined by newlines.
///
/// `/Contents` may be a stream or an array of streams, either one direct or
/// behind a reference. A stream lopdf cannot decode is an error.
fn page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let streams: Vec<&Object> = match page_dict.get(b"Contents").map(|obj| resolve_object(doc, obj)) {
        Ok(Object::Array(items)) => items.iter().map(|item| resolve_object(doc, item)).collect(),
        Ok(Object::Null) | Err(_) => return Ok(Vec::new()),
        Ok(other) => vec![other],
    };

    let mut result = Vec::new();
    for (i, obj) in streams.into_iter().enumerate() {
        let stream = obj.as_stream()?;
        if i > 0 {
            result.push(b'\n');
        }
        result.extend_from_slice(&stream.get_plain_content()?);
    }

    Ok(result)
}

/// Deep copy `obj` from `source` into `output`, following references.
///
/// `cache` maps source ids to ids already allocated in `output`; ids are
/// reserved before recursing so reference cycles terminate. References to
/// other pages become null, as following their `/Parent` would pull in the
/// whole source page tree.
pub(crate) fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let referenced = match source.get_object(*id) {
                Ok(referenced) => referenced,
                // dangling references read as null
                Err(_) => return Ok(Object::Null),
            };
            if is_page(referenced) {
                return Ok(Object::Null);
            }

            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(output, source, dict, cache)?)),
        Object::Array(arr) => {
            let mut new_arr = Vec::with_capacity(arr.len());
            for item in arr {
                new_arr.push(copy_object_deep(output, source, item, cache)?);
            }
            Ok(Object::Array(new_arr))
        }
        Object::Stream(stream) => Ok(Object::Stream(Stream {
            dict: copy_dictionary(output, source, &stream.dict, cache)?,
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: None,
        })),
        _ => Ok(obj.clone()),
    }
}

fn copy_dictionary(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Dictionary> {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    Ok(new_dict)
}

fn is_page(obj: &Object) -> bool {
    obj.as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|ty| ty.as_name().ok())
        == Some(b"Page".as_slice())
}

/// Register `xobject_id` in the page's `/XObject` resources under a fresh
/// `/PgN` name and return that name.
///
/// Indirect resource dictionaries are copied onto the page so the change
/// stays local to it.
pub(crate) fn add_xobject_to_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    xobject_id: ObjectId,
) -> Result<String> {
    let mut resources = match doc.get_dictionary(page_id)?.get(b"Resources") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(res_id)) => doc.get_dictionary(*res_id).cloned().unwrap_or_default(),
        _ => Dictionary::new(),
    };

    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(xo_id)) => doc.get_dictionary(*xo_id).cloned().unwrap_or_default(),
        _ => Dictionary::new(),
    };

    let name = (1..)
        .map(|n| format!("Pg{}", n))
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| "Pg0".to_string());

    xobjects.set(name.clone(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Replace the page's content with a single stream wrapped in `q`/`Q`, so
/// state left behind by the existing content cannot leak into streams
/// appended later.
pub(crate) fn wrap_page_content_in_graphics_state(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let page_dict = doc.get_dictionary(page_id)?;
    if !page_dict.has(b"Contents") {
        return Ok(());
    }

    let mut combined = b"q\n".to_vec();
    combined.extend(page_content(doc, page_dict)?);
    combined.extend_from_slice(b"\nQ\n");

    let wrapped_id = doc.add_object(Stream::new(Dictionary::new(), combined));
    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Reference(wrapped_id));

    Ok(())
}

/// Append a content stream after the page's existing content
pub(crate) fn append_content_to_page(doc: &mut Document, page_id: ObjectId, content_id: ObjectId) -> Result<()> {
    let current = doc.get_dictionary(page_id)?.get(b"Contents").ok().cloned();

    let contents = match current {
        Some(Object::Reference(existing)) => match doc.get_object(existing) {
            Ok(Object::Array(items)) => {
                let mut items = items.clone();
                items.push(Object::Reference(content_id));
                items
            }
            _ => vec![Object::Reference(existing), Object::Reference(content_id)],
        },
        Some(Object::Array(mut existing)) => {
            existing.push(Object::Reference(content_id));
            existing
        }
        _ => vec![Object::Reference(content_id)],
    };
    doc.get_dictionary_mut(page_id)?.set("Contents", Object::Array(contents));

    Ok(())
}
