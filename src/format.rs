//! Text formatting for drawn values: grouped integers, normalized dates and
//! width-bounded truncation.

use chrono::NaiveDate;

use crate::fonts::FontFace;
use crate::order::{DateValue, FieldValue};

/// Appended to names cut short by [`truncate_to_width`].
pub const ELLIPSIS: &str = "\u{2026}";

const OUTPUT_DATE: &str = "%Y/%m/%d";
const DATE_PATTERNS: [&str; 3] = ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d"];

/// Plain display text; absent values are empty.
pub fn format_text(value: Option<&FieldValue>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

/// Formats a value as an integer with `,` thousands separators.
///
/// Fractional numbers are truncated toward zero. Values that are not numeric
/// come back as their plain text.
pub fn format_int(value: Option<&FieldValue>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match to_int(value) {
        Some(n) => group_thousands(n),
        None => value.to_string(),
    }
}

fn to_int(value: &FieldValue) -> Option<i128> {
    match value {
        FieldValue::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| n.as_f64().and_then(truncate_float)),
        FieldValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<i128>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_float))
        }
        FieldValue::Bool(b) => Some(i128::from(*b)),
        FieldValue::Other(_) => None,
    }
}

fn truncate_float(f: f64) -> Option<i128> {
    (f.is_finite() && f.abs() < 1e30).then(|| f.trunc() as i128)
}

pub fn group_thousands(n: i128) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Normalizes a date to `YYYY/MM/DD`.
///
/// Strings are tried against `YYYY/MM/DD`, `YYYY-MM-DD`, `YYYY.MM.DD` and
/// `YYYYMMDD` in that order; anything else is returned trimmed.
pub fn format_date(value: Option<&DateValue>) -> String {
    match value {
        None => String::new(),
        Some(DateValue::Date(d)) => d.format(OUTPUT_DATE).to_string(),
        Some(DateValue::DateTime(dt)) => dt.format(OUTPUT_DATE).to_string(),
        Some(DateValue::Raw(raw)) => {
            let text = raw.to_string();
            let text = text.trim();
            match parse_date(text) {
                Some(d) => d.format(OUTPUT_DATE).to_string(),
                None => text.to_string(),
            }
        }
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDate::parse_from_str(text, pattern).ok())
        .or_else(|| parse_compact_date(text))
}

/// `YYYYMMDD`. Split by hand since `%Y` would consume all eight digits.
fn parse_compact_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = text[0..4].parse().ok()?;
    let month = text[4..6].parse().ok()?;
    let day = text[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Cuts `text` so that it fits in `max_width` points at `size`, ending it
/// with [`ELLIPSIS`] when anything was removed.
///
/// Returns `text` unchanged when it already fits and an empty string when not
/// even the ellipsis fits. Measurement uses the same glyph advances as
/// drawing.
pub fn truncate_to_width(face: &FontFace, text: &str, size: f32, max_width: f32) -> String {
    if text.is_empty() {
        return String::new();
    }
    let budget = face.budget_units(max_width, size);
    if i64::from(face.text_units(text)) <= budget {
        return text.to_string();
    }

    let room = budget - i64::from(face.text_units(ELLIPSIS));
    if room <= 0 {
        return String::new();
    }

    let mut used = 0i64;
    let mut out = String::new();
    for ch in text.chars() {
        let w = i64::from(face.char_units(ch));
        if used + w > room {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push_str(ELLIPSIS);
    out
}
