//! Parses and validates layout description files.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{FieldSpec, HeaderField, ItemField, LayoutConfig, mm_to_pt};
use crate::error::OverprintError;

/// Extensions tried, in order, when resolving a layout file.
pub const LAYOUT_EXTENSIONS: [&str; 2] = ["json", "jsonc"];

/// Candidate file names for `template_id`, in lookup order.
pub fn layout_candidates(template_id: &str) -> Vec<String> {
    LAYOUT_EXTENSIONS
        .iter()
        .map(|ext| format!("{template_id}.{ext}"))
        .collect()
}

/// Top-level keys of a layout file. Values stay untyped so that each one can
/// be validated with a precise error path.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLayout {
    template_pdf_name: Option<Value>,
    offset_x_mm: Option<Value>,
    offset_y_mm: Option<Value>,
    header: Option<Value>,
    items_per_page: Option<Value>,
    block_top_y_mm: Option<Value>,
    block_pitch_mm: Option<Value>,
    item_name_max_width_mm: Option<Value>,
    item_fields: Option<Value>,
}

/// Parses the text of a layout file into a validated [`LayoutConfig`].
pub fn parse_layout(template_id: &str, text: &str) -> Result<LayoutConfig, OverprintError> {
    let value = overprint_jsonc::parse_str(text)
        .map_err(|e| OverprintError::invalid("$", e.to_string()))?;
    if !value.is_object() {
        return Err(OverprintError::invalid("$", "layout must be a JSON object"));
    }
    let raw: RawLayout =
        serde_json::from_value(value).map_err(|e| OverprintError::invalid("$", e.to_string()))?;

    let template_pdf_name = match present(raw.template_pdf_name.as_ref()) {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        Some(_) => {
            return Err(OverprintError::invalid(
                "template_pdf_name",
                "must be a non-empty string",
            ));
        }
        None => return Err(OverprintError::invalid("template_pdf_name", "is required")),
    };

    let items_per_page = items_per_page(raw.items_per_page.as_ref())?;

    let offset_x = optional_mm(raw.offset_x_mm.as_ref(), "offset_x_mm")?;
    let offset_y = optional_mm(raw.offset_y_mm.as_ref(), "offset_y_mm")?;
    let block_top_y = required_mm(raw.block_top_y_mm.as_ref(), "block_top_y_mm")?;
    let block_pitch = required_mm(raw.block_pitch_mm.as_ref(), "block_pitch_mm")?;
    let item_name_max_width =
        required_mm(raw.item_name_max_width_mm.as_ref(), "item_name_max_width_mm")?;

    let header_fields = field_section(raw.header.as_ref(), "header")?;
    let item_fields = field_section(raw.item_fields.as_ref(), "item_fields")?;

    for field in HeaderField::REQUIRED {
        require_key(&header_fields, "header", field.key())?;
    }
    for field in ItemField::REQUIRED {
        require_key(&item_fields, "item_fields", field.key())?;
    }

    if block_pitch <= 0.0 {
        log::warn!(
            "layout '{}' has a non-positive block pitch; item blocks will overlap",
            template_id
        );
    }

    Ok(LayoutConfig {
        template_id: template_id.to_string(),
        template_pdf_name,
        offset_x,
        offset_y,
        header_fields,
        item_fields,
        items_per_page,
        block_top_y,
        block_pitch,
        item_name_max_width,
    })
}

/// `null` counts as absent.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Reads a JSON number or a numeric string.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn required_mm(value: Option<&Value>, path: &str) -> Result<f32, OverprintError> {
    let value = present(value).ok_or_else(|| OverprintError::invalid(path, "is required"))?;
    number(value)
        .map(mm_to_pt)
        .ok_or_else(|| OverprintError::invalid(path, "must be numeric"))
}

fn optional_mm(value: Option<&Value>, path: &str) -> Result<f32, OverprintError> {
    match present(value) {
        None => Ok(0.0),
        Some(v) => number(v)
            .map(mm_to_pt)
            .ok_or_else(|| OverprintError::invalid(path, "must be numeric")),
    }
}

fn items_per_page(value: Option<&Value>) -> Result<usize, OverprintError> {
    const PATH: &str = "items_per_page";
    let value = present(value).ok_or_else(|| OverprintError::invalid(PATH, "is required"))?;
    let n = number(value).ok_or_else(|| OverprintError::invalid(PATH, "must be an integer"))?;
    if n.fract() != 0.0 {
        return Err(OverprintError::invalid(PATH, "must be an integer"));
    }
    if n < 1.0 {
        return Err(OverprintError::invalid(PATH, "must be a positive integer"));
    }
    Ok(n as usize)
}

fn field_section(
    value: Option<&Value>,
    section: &str,
) -> Result<BTreeMap<String, FieldSpec>, OverprintError> {
    let Some(value) = present(value) else {
        return Ok(BTreeMap::new());
    };
    let entries = value
        .as_object()
        .ok_or_else(|| OverprintError::invalid(section, "must be an object"))?;

    entries
        .iter()
        .map(|(key, entry)| {
            let path = format!("{section}.{key}");
            field_spec(entry, &path).map(|spec| (key.clone(), spec))
        })
        .collect()
}

/// A field entry is either `{"pos": [x, y], "font_size": n}` or a bare `[x, y]`.
fn field_spec(entry: &Value, path: &str) -> Result<FieldSpec, OverprintError> {
    match entry {
        Value::Array(pair) => {
            let (x, y) = position(pair, &format!("{path}.pos"))?;
            Ok(FieldSpec::new(x, y))
        }
        Value::Object(obj) => {
            let pos_path = format!("{path}.pos");
            let pos = position_entry(obj).ok_or_else(|| {
                OverprintError::invalid(&pos_path, "pos=[x_mm, y_mm] is required")
            })?;
            let pair = pos
                .as_array()
                .ok_or_else(|| OverprintError::invalid(&pos_path, "must be a 2-element array"))?;
            let (x, y) = position(pair, &pos_path)?;

            let font_size = match present(obj.get("font_size")) {
                None => None,
                Some(v) => Some(number(v).ok_or_else(|| {
                    OverprintError::invalid(format!("{path}.font_size"), "must be numeric")
                })? as f32),
            };

            Ok(FieldSpec { x, y, font_size })
        }
        _ => Err(OverprintError::invalid(
            path,
            "must be an object or a [x_mm, y_mm] pair",
        )),
    }
}

/// `pos` wins over its `position` alias.
fn position_entry(obj: &Map<String, Value>) -> Option<&Value> {
    present(obj.get("pos")).or_else(|| present(obj.get("position")))
}

fn position(pair: &[Value], path: &str) -> Result<(f32, f32), OverprintError> {
    match pair {
        [x, y] => match (number(x), number(y)) {
            (Some(x), Some(y)) => Ok((mm_to_pt(x), mm_to_pt(y))),
            _ => Err(OverprintError::invalid(path, "coordinates must be numeric")),
        },
        _ => Err(OverprintError::invalid(
            path,
            format!("must have exactly 2 elements, found {}", pair.len()),
        )),
    }
}

fn require_key(
    fields: &BTreeMap<String, FieldSpec>,
    section: &str,
    key: &str,
) -> Result<(), OverprintError> {
    if fields.contains_key(key) {
        Ok(())
    } else {
        Err(OverprintError::invalid(
            format!("{section}.{key}"),
            "required field is missing",
        ))
    }
}
