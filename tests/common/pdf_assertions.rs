use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};
use std::collections::HashMap;

/// A `Tj` from an overlay layer with the text position in effect.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnText {
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    /// Shown glyphs mapped back through the font's `ToUnicode` CMap.
    pub text: String,
}

fn resolve_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Dictionary {
    match obj {
        Object::Reference(id) => doc.get_dictionary(*id).expect("referenced dictionary"),
        other => other.as_dict().expect("dictionary"),
    }
}

/// The Form XObject `layer` on a composed page.
pub fn layer_form<'a>(doc: &'a LopdfDocument, page_id: ObjectId, layer: &str) -> &'a Stream {
    let page = doc.get_dictionary(page_id).expect("page dictionary");
    let resources = resolve_dict(doc, page.get(b"Resources").expect("page resources"));
    let xobjects = resolve_dict(doc, resources.get(b"XObject").expect("XObject dictionary"));
    let form_id = xobjects
        .get(layer.as_bytes())
        .and_then(Object::as_reference)
        .expect("layer reference");
    doc.get_object(form_id)
        .and_then(Object::as_stream)
        .expect("layer stream")
}

/// Decoded content of the Form XObject `layer` on a composed page.
pub fn layer_content(doc: &LopdfDocument, page_id: ObjectId, layer: &str) -> Vec<u8> {
    layer_form(doc, page_id, layer)
        .get_plain_content()
        .expect("decode layer content")
}

/// Glyph id to text, from the `bfchar` entries of a ToUnicode CMap.
pub fn parse_to_unicode(cmap: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();
    let mut in_bfchar = false;
    for line in cmap.lines() {
        if line.ends_with("beginbfchar") {
            in_bfchar = true;
            continue;
        }
        if line == "endbfchar" {
            in_bfchar = false;
            continue;
        }
        if !in_bfchar {
            continue;
        }
        let mut parts = line.split(['<', '>']).filter(|p| !p.trim().is_empty());
        let (Some(cid), Some(hex)) = (parts.next(), parts.next()) else {
            continue;
        };
        let cid = u16::from_str_radix(cid, 16).expect("cid");
        let units: Vec<u16> = (0..hex.len())
            .step_by(4)
            .map(|i| u16::from_str_radix(&hex[i..i + 4], 16).expect("utf-16 unit"))
            .collect();
        map.insert(cid, String::from_utf16_lossy(&units));
    }
    map
}

/// ToUnicode map of the overlay font `F1` on a composed page.
fn overlay_to_unicode(doc: &LopdfDocument, page_id: ObjectId) -> HashMap<u16, String> {
    let form = layer_form(doc, page_id, "Ovl");
    let resources = resolve_dict(doc, form.dict.get(b"Resources").expect("form resources"));
    let fonts = resolve_dict(doc, resources.get(b"Font").expect("font resources"));
    let font = resolve_dict(doc, fonts.get(b"F1").expect("overlay font"));
    let cmap_id = font
        .get(b"ToUnicode")
        .and_then(Object::as_reference)
        .expect("ToUnicode reference");
    let cmap = doc
        .get_object(cmap_id)
        .and_then(Object::as_stream)
        .expect("ToUnicode stream")
        .get_plain_content()
        .expect("decode ToUnicode");
    parse_to_unicode(&String::from_utf8_lossy(&cmap))
}

/// Literal strings shown by the template layer of a composed page.
pub fn template_text(doc: &LopdfDocument, page_id: ObjectId) -> String {
    let content =
        Content::decode(&layer_content(doc, page_id, "Tpl")).expect("parse template layer");
    let mut text = String::new();
    for op in content.operations.iter().filter(|op| op.operator == "Tj") {
        if let Some(Object::String(bytes, _)) = op.operands.first() {
            text.push_str(&String::from_utf8_lossy(bytes));
            text.push('\n');
        }
    }
    text
}

/// Every string drawn by the overlay layer of a composed page.
pub fn overlay_texts(doc: &LopdfDocument, page_id: ObjectId) -> Vec<DrawnText> {
    let content =
        Content::decode(&layer_content(doc, page_id, "Ovl")).expect("parse overlay layer");
    let to_unicode = overlay_to_unicode(doc, page_id);
    let mut drawn = Vec::new();
    let (mut x, mut y, mut size) = (0.0, 0.0, 0.0);
    for op in &content.operations {
        match op.operator.as_str() {
            "Tf" => size = op.operands[1].as_float().expect("font size"),
            "Td" => {
                x = op.operands[0].as_float().expect("x");
                y = op.operands[1].as_float().expect("y");
            }
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    drawn.push(DrawnText {
                        x,
                        y,
                        font_size: size,
                        text: bytes
                            .chunks(2)
                            .map(|pair| {
                                let cid = u16::from_be_bytes([pair[0], pair[1]]);
                                to_unicode.get(&cid).map_or("\u{FFFD}", String::as_str)
                            })
                            .collect(),
                    });
                }
            }
            _ => {}
        }
    }
    drawn
}

pub fn find_text<'a>(drawn: &'a [DrawnText], text: &str) -> Option<&'a DrawnText> {
    drawn.iter().find(|d| d.text == text)
}

/// Extract font names from the PDF, including fonts of Form XObjects.
pub fn extract_font_names(doc: &LopdfDocument) -> Vec<String> {
    let mut fonts: Vec<String> = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_dict().ok())
        .filter(|dict| {
            dict.get(b"Type").and_then(Object::as_name).ok() == Some(b"Font".as_slice())
        })
        .filter_map(|dict| dict.get(b"BaseFont").and_then(Object::as_name).ok())
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect();
    fonts.sort();
    fonts.dedup();
    fonts
}
