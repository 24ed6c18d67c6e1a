//! ResourceProvider trait for abstracting asset loading.
//!
//! The engine reads three kinds of assets: layout descriptions, template
//! PDFs and the font file. None of them is tied to the filesystem; the
//! engine only talks to a `ResourceProvider`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug, Clone)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to load resource '{path}': {message}")]
    LoadFailed { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        ResourceError::Io(err.to_string())
    }
}

/// Shared resource data type (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// A trait for loading assets from various sources.
///
/// # Implementations
///
/// - `FilesystemResourceProvider` (overprint-resource): local directory
/// - `InMemoryResourceProvider`: pre-populated memory store
pub trait ResourceProvider: Send + Sync + Debug {
    /// Load a resource by its relative path.
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError>;

    /// Check if a resource exists.
    fn exists(&self, path: &str) -> bool;

    /// Last modification stamp of a resource.
    ///
    /// Two calls return the same value as long as the resource has not been
    /// replaced or touched in between. Callers only compare stamps for
    /// equality.
    fn modified(&self, path: &str) -> Result<SystemTime, ResourceError>;

    /// Get the base path for resolving relative resources.
    fn base_path(&self) -> Option<&str> {
        None
    }

    /// Returns a human-readable name for this provider (for logging/debugging).
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct StoredResource {
    data: SharedResourceData,
    revision: u64,
}

/// An in-memory resource provider.
///
/// Every `add` or `touch` assigns a fresh revision number, which is reported
/// through `modified` as an offset from the Unix epoch.
#[derive(Debug, Default)]
pub struct InMemoryResourceProvider {
    resources: RwLock<HashMap<String, StoredResource>>,
    next_revision: AtomicU64,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next_revision.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn poisoned(path: &str) -> ResourceError {
        ResourceError::LoadFailed {
            path: path.to_string(),
            message: "resource store lock poisoned".to_string(),
        }
    }

    /// Add (or replace) a resource.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::LoadFailed` if the internal lock is poisoned.
    pub fn add(&self, path: impl Into<String>, data: Vec<u8>) -> Result<(), ResourceError> {
        self.add_shared(path, Arc::new(data))
    }

    /// Add a resource from shared data.
    pub fn add_shared(
        &self,
        path: impl Into<String>,
        data: SharedResourceData,
    ) -> Result<(), ResourceError> {
        let path_string = path.into();
        let revision = self.bump();
        let mut resources = self
            .resources
            .write()
            .map_err(|_| Self::poisoned(&path_string))?;
        resources.insert(path_string, StoredResource { data, revision });
        Ok(())
    }

    /// Give an existing resource a new revision without changing its bytes.
    pub fn touch(&self, path: &str) -> Result<(), ResourceError> {
        let revision = self.bump();
        let mut resources = self.resources.write().map_err(|_| Self::poisoned(path))?;
        let entry = resources
            .get_mut(path)
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))?;
        entry.revision = revision;
        Ok(())
    }

    /// Remove a resource from the store.
    pub fn remove(&self, path: &str) -> Option<SharedResourceData> {
        self.resources.write().ok()?.remove(path).map(|r| r.data)
    }

    pub fn len(&self) -> usize {
        self.resources.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().map(|r| r.is_empty()).unwrap_or(true)
    }
}

impl ResourceProvider for InMemoryResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let resources = self.resources.read().map_err(|_| Self::poisoned(path))?;
        resources
            .get(path)
            .map(|r| r.data.clone())
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resources
            .read()
            .map(|r| r.contains_key(path))
            .unwrap_or(false)
    }

    fn modified(&self, path: &str) -> Result<SystemTime, ResourceError> {
        let resources = self.resources.read().map_err(|_| Self::poisoned(path))?;
        resources
            .get(path)
            .map(|r| UNIX_EPOCH + Duration::from_nanos(r.revision))
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn name(&self) -> &'static str {
        "InMemoryResourceProvider"
    }
}
