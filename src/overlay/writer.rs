//! Encodes overlay pages as a PDF document with one embedded font.
//!
//! Text is written with 2-byte glyph ids under `Identity-H`, so any glyph the
//! face has can be drawn. Only the drawn glyphs are embedded, and a
//! `ToUnicode` CMap keeps the text extractable.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

use super::OverlayPage;
use crate::error::OverprintError;
use crate::fonts::{FontFace, FontSubset, subset_font};

/// Resource name of the embedded font on every overlay page.
pub const FONT_RESOURCE: &str = "F1";

/// Builds an in-memory PDF with one page per overlay page.
pub fn write_overlay(pages: &[OverlayPage], face: &FontFace) -> Result<Document, OverprintError> {
    let used = used_glyphs(pages, face);
    let program = embedded_program(face, &used);

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = write_font(&mut doc, face, &program, &used)?;
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_RESOURCE => font_id },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = page_content(page, face, &program).encode()?;
        let mut content = Stream::new(dictionary! {}, content);
        content.compress()?;
        let content_id = doc.add_object(content);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page.width.into(), page.height.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

/// Glyph id to the character it was drawn for, over all non-empty runs.
fn used_glyphs(pages: &[OverlayPage], face: &FontFace) -> BTreeMap<u16, char> {
    let mut used = BTreeMap::new();
    let mut missing = HashSet::new();
    let chars = pages
        .iter()
        .flat_map(|page| page.runs.iter())
        .flat_map(|run| run.text.chars());
    for ch in chars {
        match face.glyph_id(ch) {
            Some(gid) => {
                used.entry(gid).or_insert(ch);
            }
            None => {
                if missing.insert(ch) {
                    log::warn!(
                        "font '{}' has no glyph for {:?} (U+{:04X}), drawing .notdef",
                        face.base_font(),
                        ch,
                        u32::from(ch)
                    );
                }
            }
        }
    }
    used
}

/// The drawn glyphs of `face` as a subset program, or the whole font when it
/// cannot be subset.
fn embedded_program(face: &FontFace, used: &BTreeMap<u16, char>) -> FontSubset {
    match subset_font(face.data(), used) {
        Ok(program) => {
            log::debug!(
                "embedding {} glyph(s) of '{}': {} of {} bytes",
                used.len(),
                face.base_font(),
                program.data.len(),
                face.data().len()
            );
            program
        }
        Err(e) => {
            log::warn!(
                "cannot subset font '{}' ({}), embedding it whole",
                face.base_font(),
                e
            );
            FontSubset::full(face.data().to_vec())
        }
    }
}

fn page_content(page: &OverlayPage, face: &FontFace, program: &FontSubset) -> Content {
    let mut operations = Vec::new();
    for run in page.runs.iter().filter(|r| !r.text.is_empty()) {
        let glyphs: Vec<u8> = run
            .text
            .chars()
            .flat_map(|ch| program.glyph(face.glyph_or_notdef(ch)).to_be_bytes())
            .collect();
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![FONT_RESOURCE.into(), run.font_size.into()],
        ));
        operations.push(Operation::new("Td", vec![run.x.into(), run.y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(glyphs, StringFormat::Hexadecimal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Writes the Type0 font, its CIDFontType2 descendant, the descriptor with the
/// embedded TrueType program and the ToUnicode CMap. Returns the Type0 id.
fn write_font(
    doc: &mut Document,
    face: &FontFace,
    program: &FontSubset,
    used: &BTreeMap<u16, char>,
) -> Result<ObjectId, OverprintError> {
    let base_font = if program.is_subset() {
        format!("{}+{}", subset_tag(used), face.base_font())
    } else {
        face.base_font().to_string()
    };
    let base_font = base_font.as_str();
    let scale = 1000.0 / f64::from(face.units_per_em());
    let scaled = |v: f64| (v * scale).round() as i64;
    // glyph widths stay fractional so drawn advances match measured ones
    let width = |gid: u16| Object::Real((f64::from(face.advance(gid)) * scale) as f32);

    let mut font_file = Stream::new(
        dictionary! { "Length1" => program.data.len() as i64 },
        program.data.clone(),
    );
    font_file.compress()?;
    let font_file_id = doc.add_object(font_file);

    let [x_min, y_min, x_max, y_max] = face.bbox();
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => base_font,
        "Flags" => 4,
        "FontBBox" => vec![
            scaled(f64::from(x_min)).into(),
            scaled(f64::from(y_min)).into(),
            scaled(f64::from(x_max)).into(),
            scaled(f64::from(y_max)).into(),
        ],
        "ItalicAngle" => face.italic_angle(),
        "Ascent" => scaled(f64::from(face.ascender())),
        "Descent" => scaled(f64::from(face.descender())),
        "CapHeight" => scaled(f64::from(face.cap_height())),
        "StemV" => 80,
        "FontFile2" => font_file_id,
    });

    let widths: Vec<Object> = used
        .keys()
        .flat_map(|&gid| {
            let cid = i64::from(program.glyph(gid));
            [Object::Integer(cid), Object::Array(vec![width(gid)])]
        })
        .collect();

    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => base_font,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => width(0),
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let cmap = to_unicode_cmap(face.base_font(), program, used);
    let mut to_unicode = Stream::new(Dictionary::new(), cmap.into_bytes());
    to_unicode.compress()?;
    let to_unicode_id = doc.add_object(to_unicode);

    Ok(doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => base_font,
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![cid_font_id.into()],
        "ToUnicode" => to_unicode_id,
    }))
}

/// Six uppercase letters naming a subset, stable for the same glyph set.
fn subset_tag(used: &BTreeMap<u16, char>) -> String {
    let hash = used
        .keys()
        .flat_map(|gid| gid.to_be_bytes())
        .fold(0x811C_9DC5u32, |hash, byte| {
            (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
        });
    (0..6)
        .map(|i| char::from(b'A' + ((hash >> (i * 5)) % 26) as u8))
        .collect()
}

fn to_unicode_cmap(
    font_name: &str,
    program: &FontSubset,
    used: &BTreeMap<u16, char>,
) -> String {
    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
    cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
    cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let entries: Vec<(u16, char)> = used
        .iter()
        .map(|(gid, ch)| (program.glyph(*gid), *ch))
        .filter(|(cid, _)| *cid != 0)
        .collect();
    // bfchar blocks are limited to 100 entries
    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            let _ = writeln!(cmap, "<{gid:04X}> <{utf16}>");
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}
