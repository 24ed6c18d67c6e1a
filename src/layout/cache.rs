use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use overprint_traits::{ResourceError, ResourceProvider};

use super::LayoutConfig;
use super::loader::{layout_candidates, parse_layout};
use crate::error::OverprintError;

struct CacheEntry {
    source: String,
    modified: SystemTime,
    layout: Arc<LayoutConfig>,
}

/// Process-wide store of parsed layouts, keyed by template id.
///
/// An entry is reused while the modification time of its source file is
/// unchanged; otherwise the file is parsed again and the entry replaced.
/// A failed parse leaves the previous entry in place.
#[derive(Default)]
pub struct LayoutCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl std::fmt::Debug for LayoutCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutCache")
            .field("len", &self.len())
            .finish()
    }
}

fn poisoned(template_id: &str) -> OverprintError {
    OverprintError::Resource(ResourceError::LoadFailed {
        path: template_id.to_string(),
        message: "layout cache lock poisoned".to_string(),
    })
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the layout for `template_id`, parsing its file when it is not
    /// cached yet or has been modified since it was cached.
    pub fn get_or_load(
        &self,
        provider: &dyn ResourceProvider,
        template_id: &str,
    ) -> Result<Arc<LayoutConfig>, OverprintError> {
        let source = resolve_source(provider, template_id)?;
        let modified = provider.modified(&source)?;

        {
            let entries = self.entries.read().map_err(|_| poisoned(template_id))?;
            if let Some(entry) = entries.get(template_id)
                && entry.source == source
                && entry.modified == modified
            {
                log::debug!("layout cache hit for '{}'", template_id);
                return Ok(Arc::clone(&entry.layout));
            }
        }

        let mut entries = self.entries.write().map_err(|_| poisoned(template_id))?;
        // Another caller may have loaded it while we waited for the write lock.
        if let Some(entry) = entries.get(template_id)
            && entry.source == source
            && entry.modified == modified
        {
            return Ok(Arc::clone(&entry.layout));
        }

        let bytes = provider.load(&source)?;
        let text = std::str::from_utf8(&bytes).map_err(|e| {
            OverprintError::invalid("$", format!("layout is not valid UTF-8: {e}"))
        })?;
        let layout = Arc::new(parse_layout(template_id, text)?);
        log::info!(
            "loaded layout '{}' from {}/{}",
            template_id,
            provider.base_path().unwrap_or(provider.name()),
            source
        );

        entries.insert(
            template_id.to_string(),
            CacheEntry {
                source,
                modified,
                layout: Arc::clone(&layout),
            },
        );
        Ok(layout)
    }

    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// First existing candidate file for `template_id`.
fn resolve_source(
    provider: &dyn ResourceProvider,
    template_id: &str,
) -> Result<String, OverprintError> {
    let candidates = layout_candidates(template_id);
    candidates
        .iter()
        .find(|candidate| provider.exists(candidate))
        .cloned()
        .ok_or_else(|| OverprintError::ConfigNotFound {
            template_id: template_id.to_string(),
            tried: candidates.clone(),
        })
}
