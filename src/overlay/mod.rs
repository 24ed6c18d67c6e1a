//! Text-only overlay pages.
//!
//! [`render_overlay`] decides what goes where: one page per chunk of
//! `items_per_page` items, the header repeated on each page, and item blocks
//! stepped down by the block pitch. [`writer`] turns the pages into PDF
//! objects.

pub mod writer;

use crate::config::PageSize;
use crate::fonts::FontFace;
use crate::format::truncate_to_width;
use crate::layout::{Align, FieldSpec, HeaderField, ItemField, LayoutConfig};
use crate::order::{OrderHeader, OrderItem};

pub use writer::write_overlay;

/// What a run of text displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSource {
    Header(HeaderField),
    /// `slot` is the item's index within its page.
    Item { slot: usize, field: ItemField },
}

/// One string placed on an overlay page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub source: RunSource,
    pub text: String,
    /// Configured anchor: left edge, or right edge for right-aligned runs.
    pub anchor_x: f32,
    /// Baseline origin where drawing starts.
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub align: Align,
    /// Advance width in points.
    pub width: f32,
}

impl TextRun {
    fn new(
        face: &FontFace,
        source: RunSource,
        text: String,
        (anchor_x, y): (f32, f32),
        font_size: f32,
        align: Align,
    ) -> Self {
        let width = face.text_width(&text, font_size);
        let x = match align {
            Align::Left => anchor_x,
            Align::Right => anchor_x - width,
        };
        Self {
            source,
            text,
            anchor_x,
            x,
            y,
            font_size,
            align,
            width,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPage {
    pub width: f32,
    pub height: f32,
    pub runs: Vec<TextRun>,
}

impl OverlayPage {
    pub fn header_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.runs
            .iter()
            .filter(|r| matches!(r.source, RunSource::Header(_)))
    }

    pub fn item_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.runs
            .iter()
            .filter(|r| matches!(r.source, RunSource::Item { .. }))
    }

    /// Number of item blocks drawn on this page.
    pub fn item_count(&self) -> usize {
        self.item_runs()
            .filter_map(|r| match r.source {
                RunSource::Item { slot, .. } => Some(slot + 1),
                RunSource::Header(_) => None,
            })
            .max()
            .unwrap_or(0)
    }
}

fn header_fields() -> impl Iterator<Item = HeaderField> {
    HeaderField::REQUIRED
        .into_iter()
        .chain(HeaderField::OPTIONAL)
}

fn item_fields() -> impl Iterator<Item = ItemField> {
    ItemField::REQUIRED.into_iter().chain(ItemField::OPTIONAL)
}

/// Lays out the header and items on as many pages as the layout requires.
///
/// Always returns at least one page, even for an empty item list.
pub fn render_overlay(
    layout: &LayoutConfig,
    face: &FontFace,
    page_size: PageSize,
    header: &OrderHeader,
    items: &[OrderItem],
) -> Vec<OverlayPage> {
    let page_count = layout.page_count(items.len());
    let mut chunks = items.chunks(layout.items_per_page.max(1));

    (0..page_count)
        .map(|page_index| {
            let chunk = chunks.next().unwrap_or(&[]);
            log::debug!(
                "overlay page {}/{}: {} item(s)",
                page_index + 1,
                page_count,
                chunk.len()
            );

            let mut runs = header_runs(layout, face, header);
            for (slot, item) in chunk.iter().enumerate() {
                runs.extend(item_runs(layout, face, slot, item));
            }
            OverlayPage {
                width: page_size.width,
                height: page_size.height,
                runs,
            }
        })
        .collect()
}

fn header_runs(layout: &LayoutConfig, face: &FontFace, header: &OrderHeader) -> Vec<TextRun> {
    header_fields()
        .filter_map(|field| {
            let spec = layout.header_field(field)?;
            Some(TextRun::new(
                face,
                RunSource::Header(field),
                header.text_for(field),
                layout.header_position(spec),
                spec.resolve_font_size(field.default_font_size()),
                Align::Left,
            ))
        })
        .collect()
}

fn item_runs(
    layout: &LayoutConfig,
    face: &FontFace,
    slot: usize,
    item: &OrderItem,
) -> Vec<TextRun> {
    item_fields()
        .filter_map(|field| {
            let spec: &FieldSpec = layout.item_field(field)?;
            let font_size = spec.resolve_font_size(field.default_font_size());
            let mut text = item.text_for(field);
            if field == ItemField::ItemName {
                text = truncate_to_width(face, &text, font_size, layout.item_name_max_width);
            }
            Some(TextRun::new(
                face,
                RunSource::Item { slot, field },
                text,
                layout.item_position(slot, spec),
                font_size,
                field.align(),
            ))
        })
        .collect()
}
