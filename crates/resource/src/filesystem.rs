//! Filesystem-based resource provider.
//!
//! Assets are resolved relative to a base directory. Resolved paths must stay
//! inside that directory; absolute paths and `..` escapes are rejected.

use overprint_traits::{ResourceError, ResourceProvider, SharedResourceData};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// A resource provider that reads assets from one directory.
#[derive(Debug)]
pub struct FilesystemResourceProvider {
    base_path: PathBuf,
    /// Canonicalized base path for containment checks
    canonical_base: Option<PathBuf>,
}

impl FilesystemResourceProvider {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base = base_path.as_ref().to_path_buf();
        // May fail if the directory doesn't exist yet
        let canonical = base.canonicalize().ok();
        Self {
            base_path: base,
            canonical_base: canonical,
        }
    }

    /// Resolves a relative asset path, or `None` if it would escape the base.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        if Path::new(path).is_absolute() {
            return None;
        }

        let full_path = self.base_path.join(path);

        if let Ok(canonical) = full_path.canonicalize()
            && let Some(ref base) = self.canonical_base
        {
            if canonical.starts_with(base) {
                return Some(canonical);
            }
            return None;
        }

        // Not on disk (yet): fall back to a lexical check
        if Path::new(path)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return None;
        }

        Some(full_path)
    }

    fn resolve_or_not_found(&self, path: &str) -> Result<PathBuf, ResourceError> {
        self.resolve(path).ok_or_else(|| {
            ResourceError::NotFound(format!("{} (outside {})", path, self.base_path.display()))
        })
    }

    fn map_io(path: &str, e: std::io::Error) -> ResourceError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ResourceError::NotFound(path.to_string())
        } else {
            ResourceError::LoadFailed {
                path: path.to_string(),
                message: e.to_string(),
            }
        }
    }
}

impl ResourceProvider for FilesystemResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let full_path = self.resolve_or_not_found(path)?;
        std::fs::read(&full_path)
            .map(Arc::new)
            .map_err(|e| Self::map_io(path, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn modified(&self, path: &str) -> Result<SystemTime, ResourceError> {
        let full_path = self.resolve_or_not_found(path)?;
        std::fs::metadata(&full_path)
            .and_then(|m| m.modified())
            .map_err(|e| Self::map_io(path, e))
    }

    fn base_path(&self) -> Option<&str> {
        self.base_path.to_str()
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceProvider"
    }
}
