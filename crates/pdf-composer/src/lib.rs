//! PDF composition utilities for stacking overlay pages onto a template.
//!
//! This crate provides low-level PDF manipulation using lopdf:
//! - Deep object copying between documents with cycle detection
//! - Wrapping a page (content + inherited resources) as a Form XObject
//! - Building a new document whose pages draw a template page first and an
//!   overlay page on top, cycling through the template pages

mod error;

pub use error::ComposerError;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::collections::HashMap;

/// XObject name of the template layer inside a composed page.
pub const TEMPLATE_LAYER: &str = "Tpl";
/// XObject name of the overlay layer inside a composed page.
pub const OVERLAY_LAYER: &str = "Ovl";

/// Fallback page box when neither the page nor its ancestors carry one (A4).
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 595.2756, 841.8898];
/// Guard against malformed page trees with `Parent` cycles.
const MAX_TREE_DEPTH: usize = 64;

/// A helper struct to manage the state of copying objects between documents.
struct ObjectCopier<'a> {
    source_doc: &'a Document,
    target_doc: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source_doc: &'a Document, target_doc: &'a mut Document) -> Self {
        Self {
            source_doc,
            target_doc,
            id_map: HashMap::new(),
        }
    }

    /// Deep copies an object from the source document to the target document.
    /// Each source object is copied at most once; later references reuse the
    /// id recorded in `id_map`.
    fn copy_object(&mut self, source_id: ObjectId) -> Result<ObjectId, lopdf::Error> {
        if let Some(target_id) = self.id_map.get(&source_id) {
            return Ok(*target_id);
        }

        // Reserve the id before recursing so reference cycles terminate.
        let new_id = self.target_doc.add_object(Object::Null);
        self.id_map.insert(source_id, new_id);

        let obj = self.source_doc.get_object(source_id)?.clone();
        let new_obj = self.remap_references(obj)?;

        match self.target_doc.objects.get_mut(&new_id) {
            Some(target_obj) => *target_obj = new_obj,
            None => return Err(lopdf::Error::ObjectNotFound(new_id)),
        }

        Ok(new_id)
    }

    /// Replaces every `Object::Reference` inside `obj` with the id of its
    /// copy in the target document.
    fn remap_references(&mut self, obj: Object) -> Result<Object, lopdf::Error> {
        match obj {
            Object::Reference(id) => Ok(Object::Reference(self.copy_object(id)?)),
            Object::Array(arr) => {
                let new_arr = arr
                    .into_iter()
                    .map(|o| self.remap_references(o))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Object::Array(new_arr))
            }
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.remap_dictionary(dict)?)),
            Object::Stream(mut stream) => {
                stream.dict = self.remap_dictionary(stream.dict)?;
                Ok(Object::Stream(stream))
            }
            _ => Ok(obj),
        }
    }

    fn remap_dictionary(&mut self, mut dict: Dictionary) -> Result<Dictionary, lopdf::Error> {
        for (_, value) in dict.iter_mut() {
            *value = self.remap_references(value.clone())?;
        }
        Ok(dict)
    }

    /// Copies one source page into the target as a Form XObject.
    ///
    /// The form carries the page's concatenated content, its (possibly
    /// inherited) resources and its media box as `BBox`, shifted so the box
    /// starts at the origin.
    fn copy_page_as_form(&mut self, page_id: ObjectId) -> Result<PageForm, ComposerError> {
        let media_box = media_box(self.source_doc, page_id);
        let resources = match inherited_attribute(self.source_doc, page_id, b"Resources") {
            Some(obj) => self.remap_references(obj.clone())?,
            None => Object::Dictionary(Dictionary::new()),
        };
        let content = page_content(self.source_doc, page_id)?;

        let bbox: Vec<Object> = media_box.iter().copied().map(Object::Real).collect();
        let matrix: Vec<Object> = vec![
            1.into(),
            0.into(),
            0.into(),
            1.into(),
            (-media_box[0]).into(),
            (-media_box[1]).into(),
        ];
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "FormType" => 1,
                "BBox" => bbox,
                "Matrix" => matrix,
                "Resources" => resources,
            },
            content,
        );
        stream.compress()?;
        let id = self.target_doc.add_object(stream);

        Ok(PageForm {
            id,
            width: media_box[2] - media_box[0],
            height: media_box[3] - media_box[1],
        })
    }
}

/// A source page re-homed into the output document as a Form XObject.
#[derive(Debug, Clone, Copy)]
struct PageForm {
    id: ObjectId,
    width: f32,
    height: f32,
}

/// Index of the template page that backs overlay page `overlay_index`.
///
/// Templates shorter than the overlay repeat from their first page.
pub fn template_page_index(overlay_index: usize, template_page_count: usize) -> usize {
    if template_page_count == 0 {
        0
    } else {
        overlay_index % template_page_count
    }
}

/// Looks up a page attribute, following `Parent` links for inheritable keys
/// such as `Resources` and `MediaBox`. References are resolved.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            };
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let parsed = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .filter(|arr| arr.len() == 4)
        .and_then(|arr| {
            let mut rect = [0.0f32; 4];
            for (slot, value) in rect.iter_mut().zip(arr) {
                *slot = value.as_float().ok()?;
            }
            Some(rect)
        });
    match parsed {
        Some(rect) => rect,
        None => {
            log::warn!("page {:?} has no usable /MediaBox, assuming A4", page_id);
            DEFAULT_MEDIA_BOX
        }
    }
}

/// Decoded content of all of a page's content streams, newline separated so
/// operators at stream boundaries never fuse.
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, ComposerError> {
    let mut content = Vec::new();
    for stream_id in doc.get_page_contents(page_id) {
        let stream = doc.get_object(stream_id)?.as_stream()?;
        let data = stream
            .get_plain_content()
            .unwrap_or_else(|_| stream.content.clone());
        content.extend_from_slice(&data);
        content.push(b'\n');
    }
    Ok(content)
}

fn page_ids(doc: &Document) -> Vec<ObjectId> {
    // get_pages is keyed by 1-based page number, so values come out in order
    doc.get_pages().into_values().collect()
}

/// Builds a new document with one page per overlay page.
///
/// Output page `i` has the size of template page `i mod N` and draws that
/// template page first and overlay page `i` on top of it. Template pages past
/// the overlay's length are never copied.
pub fn compose_on_template(
    template: &Document,
    overlay: &Document,
) -> Result<Document, ComposerError> {
    if template.is_encrypted() {
        return Err(ComposerError::Encrypted);
    }
    let template_pages = page_ids(template);
    let overlay_pages = page_ids(overlay);
    if template_pages.is_empty() {
        return Err(ComposerError::EmptyTemplate);
    }
    if overlay_pages.is_empty() {
        return Err(ComposerError::EmptyOverlay);
    }

    let mut output = Document::with_version("1.7");
    let pages_id = output.new_object_id();

    let used_templates = template_pages.len().min(overlay_pages.len());
    let template_forms = {
        let mut copier = ObjectCopier::new(template, &mut output);
        template_pages[..used_templates]
            .iter()
            .map(|&id| copier.copy_page_as_form(id))
            .collect::<Result<Vec<_>, _>>()?
    };
    let overlay_forms = {
        let mut copier = ObjectCopier::new(overlay, &mut output);
        overlay_pages
            .iter()
            .map(|&id| copier.copy_page_as_form(id))
            .collect::<Result<Vec<_>, _>>()?
    };

    let layer_ops = format!(
        "q /{} Do Q\nq /{} Do Q\n",
        TEMPLATE_LAYER, OVERLAY_LAYER
    )
    .into_bytes();

    let mut kids = Vec::with_capacity(overlay_forms.len());
    for (index, overlay_form) in overlay_forms.iter().enumerate() {
        let template_form = template_forms[template_page_index(index, template_pages.len())];
        log::debug!(
            "composing output page {} from template page {}",
            index + 1,
            template_page_index(index, template_pages.len()) + 1
        );

        let content_id = output.add_object(Stream::new(dictionary! {}, layer_ops.clone()));
        let page_id = output.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                template_form.width.into(),
                template_form.height.into(),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    TEMPLATE_LAYER => template_form.id,
                    OVERLAY_LAYER => overlay_form.id,
                },
            },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    output.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = output.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    output.trailer.set("Root", catalog_id);

    Ok(output)
}
