//! Stacks overlay pages onto the pages of a template PDF.

use lopdf::Document;
use overprint_composer::compose_on_template;
use overprint_traits::{ResourceError, ResourceProvider};

use crate::error::OverprintError;

/// Loads the template at `template_path` and composes `overlay` on top of it.
///
/// Output page `i` is template page `i mod N` with overlay page `i` drawn
/// over it; the result has exactly as many pages as `overlay`.
pub fn merge(
    templates: &dyn ResourceProvider,
    template_path: &str,
    overlay: &Document,
) -> Result<Vec<u8>, OverprintError> {
    let template = load_template(templates, template_path)?;
    merge_documents(&template, overlay)
}

/// Reads and parses a template PDF.
pub fn load_template(
    templates: &dyn ResourceProvider,
    template_path: &str,
) -> Result<Document, OverprintError> {
    let bytes = templates.load(template_path).map_err(|e| match e {
        ResourceError::NotFound(_) => OverprintError::TemplateNotFound(template_path.to_string()),
        other => OverprintError::Resource(other),
    })?;
    Ok(Document::load_mem(&bytes)?)
}

/// Composes two parsed documents and serializes the result.
pub fn merge_documents(template: &Document, overlay: &Document) -> Result<Vec<u8>, OverprintError> {
    let mut output = compose_on_template(template, overlay)?;
    output.compress();
    let mut bytes = Vec::new();
    output.save_to(&mut bytes)?;
    Ok(bytes)
}
