#![allow(dead_code)]

pub mod fixtures;
pub mod pdf_assertions;

use lopdf::{Document as LopdfDocument, ObjectId};
use overprint::fonts::FontFace;
use overprint::{EngineConfig, Overprinter};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub const TEST_FONT_FILE: &str = "TestSans.ttf";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Wrapper around a generated PDF with helper methods
pub struct GeneratedPdf {
    pub bytes: Vec<u8>,
    pub doc: LopdfDocument,
}

impl GeneratedPdf {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Box<dyn std::error::Error>> {
        let doc = LopdfDocument::load_mem(&bytes)?;
        Ok(Self { bytes, doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }
}

/// Bytes of a TrueType font installed on this machine, if any.
pub fn system_font_bytes() -> Option<Vec<u8>> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    db.faces().find_map(|face| {
        let fontdb::Source::File(path) = &face.source else {
            return None;
        };
        let is_ttf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("ttf"));
        if !is_ttf || face.index != 0 {
            return None;
        }
        let data = std::fs::read(path).ok()?;
        let parsed = FontFace::parse("Test", Arc::new(data.clone())).ok()?;
        "ACMEItem0123456789,/"
            .chars()
            .all(|c| parsed.glyph_id(c).is_some())
            .then_some(data)
    })
}

/// An assets directory laid out the way `EngineConfig` expects:
/// `layouts/`, `templates/` and `fonts/` under one root.
pub struct TestAssets {
    pub dir: TempDir,
    pub font: Option<Arc<FontFace>>,
}

impl TestAssets {
    /// Assets without a font file.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        for sub in ["layouts", "templates", "fonts"] {
            std::fs::create_dir_all(dir.path().join(sub)).expect("create assets subdir");
        }
        Self { dir, font: None }
    }

    /// Assets with a system font installed as `fonts/TestSans.ttf`, or `None`
    /// when this machine has no usable TrueType font.
    pub fn with_font() -> Option<Self> {
        let bytes = system_font_bytes()?;
        let mut assets = Self::new();
        std::fs::write(assets.fonts_dir().join(TEST_FONT_FILE), &bytes).ok()?;
        assets.font = Some(Arc::new(FontFace::parse("Test", Arc::new(bytes)).ok()?));
        Some(assets)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.root().join("layouts")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root().join("templates")
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.root().join("fonts")
    }

    pub fn write_layout(&self, file_name: &str, layout: &Value) -> PathBuf {
        let text = serde_json::to_string_pretty(layout).expect("serialize layout");
        self.write_layout_text(file_name, &text)
    }

    pub fn write_layout_text(&self, file_name: &str, text: &str) -> PathBuf {
        let path = self.layouts_dir().join(file_name);
        std::fs::write(&path, text).expect("write layout");
        path
    }

    pub fn write_template(&self, file_name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.templates_dir().join(file_name);
        std::fs::write(&path, bytes).expect("write template");
        path
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::new(self.root()).with_font(TEST_FONT_FILE, "TestSans")
    }

    pub fn engine(&self) -> Overprinter {
        Overprinter::new(self.config())
    }

    pub fn face(&self) -> &FontFace {
        self.font.as_deref().expect("assets were created without a font")
    }
}
