//! The single font face used for every measurement and every drawn string.

pub mod subset;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use overprint_traits::{ResourceError, ResourceProvider, SharedResourceData};
use ttf_parser::{Face, GlyphId, name_id};

use crate::error::OverprintError;

pub use subset::{FontSubset, SubsetError, subset_font};

/// Glyph metrics and raw bytes of a parsed TrueType face.
///
/// Widths are kept in integer font units so that measuring the same string
/// twice always gives the same answer.
pub struct FontFace {
    base_font: String,
    data: SharedResourceData,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
    italic_angle: f32,
    glyphs: HashMap<char, u16>,
    advances: Vec<u16>,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("base_font", &self.base_font)
            .field("units_per_em", &self.units_per_em)
            .field("glyphs", &self.glyphs.len())
            .finish()
    }
}

impl FontFace {
    /// Parses `data` as a TrueType/OpenType face. `fallback_name` is used when
    /// the face carries no PostScript name.
    pub fn parse(fallback_name: &str, data: SharedResourceData) -> Result<Self, String> {
        let face = Face::parse(&data, 0).map_err(|e| e.to_string())?;

        let units_per_em = face.units_per_em().max(1);
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);
        let italic_angle = face.italic_angle();
        let bbox = face.global_bounding_box();

        let mut glyphs = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(ch) = char::from_u32(cp)
                        && let Some(gid) = subtable.glyph_index(cp)
                    {
                        glyphs.entry(ch).or_insert(gid.0);
                    }
                });
            }
        }

        let advances: Vec<u16> = (0..face.number_of_glyphs())
            .map(|gid| face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0))
            .collect();

        let ps_name = face
            .names()
            .into_iter()
            .find(|n| n.name_id == name_id::POST_SCRIPT_NAME)
            .and_then(|n| n.to_string());
        let base_font = sanitize_name(ps_name.as_deref().unwrap_or(fallback_name));

        Ok(Self {
            base_font,
            data,
            units_per_em,
            ascender,
            descender,
            cap_height,
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            italic_angle,
            glyphs,
            advances,
        })
    }

    /// PDF `/BaseFont` name.
    pub fn base_font(&self) -> &str {
        &self.base_font
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn ascender(&self) -> i16 {
        self.ascender
    }

    pub fn descender(&self) -> i16 {
        self.descender
    }

    pub fn cap_height(&self) -> i16 {
        self.cap_height
    }

    /// `[x_min, y_min, x_max, y_max]` in font units.
    pub fn bbox(&self) -> [i16; 4] {
        self.bbox
    }

    pub fn italic_angle(&self) -> f32 {
        self.italic_angle
    }

    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        self.glyphs.get(&ch).copied()
    }

    /// Glyph for `ch`, or `.notdef` when the face has none.
    pub fn glyph_or_notdef(&self, ch: char) -> u16 {
        self.glyph_id(ch).unwrap_or(0)
    }

    pub fn advance(&self, gid: u16) -> u16 {
        self.advances.get(usize::from(gid)).copied().unwrap_or(0)
    }

    pub fn char_units(&self, ch: char) -> u32 {
        u32::from(self.advance(self.glyph_or_notdef(ch)))
    }

    /// Advance width of `text` in font units.
    pub fn text_units(&self, text: &str) -> u32 {
        text.chars().map(|ch| self.char_units(ch)).sum()
    }

    /// Advance width of `text` in points at `size`.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        self.units_to_points(self.text_units(text), size)
    }

    pub fn units_to_points(&self, units: u32, size: f32) -> f32 {
        (f64::from(units) * f64::from(size) / f64::from(self.units_per_em)) as f32
    }

    /// Largest width in font units that fits in `max_width` points at `size`.
    pub fn budget_units(&self, max_width: f32, size: f32) -> i64 {
        if size <= 0.0 {
            return i64::MAX;
        }
        (f64::from(max_width) * f64::from(self.units_per_em) / f64::from(size)).floor() as i64
    }
}

/// Keeps the characters allowed in a PDF name token.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

/// Lazily loads the configured font file and hands out the parsed face.
///
/// Loading happens at most once per registry, even under concurrent first
/// calls; a failed attempt is not cached and is retried on the next call.
pub struct FontRegistry {
    provider: Arc<dyn ResourceProvider>,
    font_file: String,
    font_name: String,
    face: OnceCell<Arc<FontFace>>,
}

impl std::fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRegistry")
            .field("provider", &self.provider.name())
            .field("font_file", &self.font_file)
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl FontRegistry {
    pub fn new(
        provider: Arc<dyn ResourceProvider>,
        font_file: impl Into<String>,
        font_name: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            font_file: font_file.into(),
            font_name: font_name.into(),
            face: OnceCell::new(),
        }
    }

    /// Returns the registered face, loading it on first use.
    pub fn ensure_font(&self) -> Result<Arc<FontFace>, OverprintError> {
        self.face
            .get_or_try_init(|| {
                let data = self.provider.load(&self.font_file).map_err(|e| match e {
                    ResourceError::NotFound(_) => {
                        OverprintError::FontNotFound(self.font_file.clone())
                    }
                    other => OverprintError::Resource(other),
                })?;
                let face = FontFace::parse(&self.font_name, data).map_err(|e| {
                    OverprintError::FontInvalid(format!("{}: {}", self.font_file, e))
                })?;
                log::debug!(
                    "registered font '{}' from {} ({} glyphs mapped)",
                    face.base_font(),
                    self.font_file,
                    face.glyphs.len()
                );
                Ok(Arc::new(face))
            })
            .cloned()
    }

    pub fn is_registered(&self) -> bool {
        self.face.get().is_some()
    }

    pub fn font_file(&self) -> &str {
        &self.font_file
    }
}
