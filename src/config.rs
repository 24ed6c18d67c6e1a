//! Engine configuration: where assets live and which font to use.

use std::path::{Path, PathBuf};

/// Environment variable overriding [`EngineConfig::assets_root`].
pub const ASSETS_DIR_ENV: &str = "OVERPRINT_ASSETS_DIR";
/// Environment variable overriding [`EngineConfig::font_file`].
pub const FONT_FILE_ENV: &str = "OVERPRINT_FONT_FILE";

/// Page size of the overlay canvas in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// ISO A4, 210 × 297 mm.
    pub const A4: PageSize = PageSize {
        width: 595.2756,
        height: 841.8898,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// Locations of the layout, template and font assets.
///
/// `layouts_dir`, `templates_dir` and `fonts_dir` default to subdirectories
/// of `assets_root` unless set explicitly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub assets_root: PathBuf,
    pub layouts_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
    pub fonts_dir: Option<PathBuf>,
    /// Font file name, relative to the fonts directory.
    pub font_file: String,
    /// Name the font is registered under in generated PDFs.
    pub font_name: String,
    pub page_size: PageSize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assets_root: PathBuf::from("assets"),
            layouts_dir: None,
            templates_dir: None,
            fonts_dir: None,
            font_file: "IPAexGothic.ttf".to_string(),
            font_name: "IPAexGothic".to_string(),
            page_size: PageSize::A4,
        }
    }
}

impl EngineConfig {
    pub fn new<P: AsRef<Path>>(assets_root: P) -> Self {
        Self {
            assets_root: assets_root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Defaults, overridden by `OVERPRINT_ASSETS_DIR` and `OVERPRINT_FONT_FILE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var(ASSETS_DIR_ENV)
            && !root.trim().is_empty()
        {
            config.assets_root = PathBuf::from(root);
        }
        if let Ok(font) = std::env::var(FONT_FILE_ENV)
            && !font.trim().is_empty()
        {
            config.font_file = font;
        }
        config
    }

    pub fn with_layouts_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.layouts_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_templates_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.templates_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_fonts_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.fonts_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_font(mut self, file: impl Into<String>, name: impl Into<String>) -> Self {
        self.font_file = file.into();
        self.font_name = name.into();
        self
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.layouts_dir
            .clone()
            .unwrap_or_else(|| self.assets_root.join("layouts"))
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.templates_dir
            .clone()
            .unwrap_or_else(|| self.assets_root.join("templates"))
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.fonts_dir
            .clone()
            .unwrap_or_else(|| self.assets_root.join("fonts"))
    }
}
