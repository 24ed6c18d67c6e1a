//! Layout descriptions: where each header and item field is drawn.
//!
//! A [`LayoutConfig`] is produced once per layout file by [`loader`], stored
//! in the [`cache::LayoutCache`] behind an `Arc`, and never mutated
//! afterwards. All lengths are PDF points; millimeter inputs are converted
//! at load time.

pub mod cache;
pub mod loader;

use std::collections::BTreeMap;

pub use cache::LayoutCache;
pub use loader::{layout_candidates, parse_layout};

/// Points per millimeter.
pub const MM_TO_PT: f32 = 72.0 / 25.4;

/// Font size used when a field has neither an override nor a keyed default.
pub const FALLBACK_FONT_SIZE: f32 = 8.0;

const FONT_SIZE_HEADER: f32 = 8.0;
const FONT_SIZE_MAIN: f32 = 8.0;
const FONT_SIZE_SMALL: f32 = 6.0;

/// Converts millimeters to points.
pub fn mm_to_pt(mm: f64) -> f32 {
    (mm * f64::from(MM_TO_PT)) as f32
}

/// Number of overlay pages for `item_count` items: `max(1, ceil(n / per_page))`.
pub fn page_count(item_count: usize, items_per_page: usize) -> usize {
    item_count.div_ceil(items_per_page.max(1)).max(1)
}

/// Position and optional font size of one field.
///
/// For header fields `(x, y)` is an absolute page coordinate. For item fields
/// `x` is absolute and `y` is measured downward from the top of the item's
/// block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub x: f32,
    pub y: f32,
    pub font_size: Option<f32>,
}

impl FieldSpec {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            font_size: None,
        }
    }

    /// Override if present, else the keyed default, else [`FALLBACK_FONT_SIZE`].
    pub fn resolve_font_size(&self, keyed_default: Option<f32>) -> f32 {
        self.font_size
            .or(keyed_default)
            .unwrap_or(FALLBACK_FONT_SIZE)
    }
}

/// Horizontal anchoring of a drawn string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Header fields the renderer knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeaderField {
    OrderDate,
    Tantou,
    TantouCode,
    CustomerCode,
    CustomerName,
    ShipToCode,
    ShipToName,
    OrderNo,
}

impl HeaderField {
    /// Must be present in every layout.
    pub const REQUIRED: [HeaderField; 6] = [
        HeaderField::OrderDate,
        HeaderField::Tantou,
        HeaderField::CustomerCode,
        HeaderField::CustomerName,
        HeaderField::ShipToCode,
        HeaderField::ShipToName,
    ];

    /// Drawn only when the layout configures them.
    pub const OPTIONAL: [HeaderField; 2] = [HeaderField::OrderNo, HeaderField::TantouCode];

    /// Key of this field in the layout's `header` section.
    pub fn key(self) -> &'static str {
        match self {
            HeaderField::OrderDate => "order_date",
            HeaderField::Tantou => "tantou",
            HeaderField::TantouCode => "tantou_cd",
            HeaderField::CustomerCode => "customer_cd",
            HeaderField::CustomerName => "customer_name",
            HeaderField::ShipToCode => "shipto_cd",
            HeaderField::ShipToName => "shipto_name",
            HeaderField::OrderNo => "order_no",
        }
    }

    pub fn default_font_size(self) -> Option<f32> {
        match self {
            HeaderField::OrderDate | HeaderField::Tantou => Some(FONT_SIZE_HEADER),
            HeaderField::CustomerCode
            | HeaderField::CustomerName
            | HeaderField::ShipToCode
            | HeaderField::ShipToName => Some(FONT_SIZE_SMALL),
            HeaderField::TantouCode | HeaderField::OrderNo => None,
        }
    }
}

/// Item fields the renderer knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemField {
    ItemName,
    Spec,
    ItemCode,
    Qty,
    UnitName,
    IrisuName,
    SalesUnit,
    SalesAmount,
    BuyUnit,
    BuyAmount,
    SupplierCode,
    SupplierName,
    DeliveryPlaceCode,
    DeliveryPlaceName,
    LineNote,
}

impl ItemField {
    /// Must be present in every layout.
    pub const REQUIRED: [ItemField; 14] = [
        ItemField::ItemName,
        ItemField::Spec,
        ItemField::ItemCode,
        ItemField::Qty,
        ItemField::UnitName,
        ItemField::IrisuName,
        ItemField::SalesUnit,
        ItemField::SalesAmount,
        ItemField::BuyUnit,
        ItemField::BuyAmount,
        ItemField::SupplierCode,
        ItemField::SupplierName,
        ItemField::DeliveryPlaceName,
        ItemField::LineNote,
    ];

    /// Drawn only when the layout configures them.
    pub const OPTIONAL: [ItemField; 1] = [ItemField::DeliveryPlaceCode];

    /// Key of this field in the layout's `item_fields` section.
    pub fn key(self) -> &'static str {
        match self {
            ItemField::ItemName => "item_name",
            ItemField::Spec => "spec",
            ItemField::ItemCode => "item_cd",
            ItemField::Qty => "qty",
            ItemField::UnitName => "unit_name",
            ItemField::IrisuName => "irisu_name",
            ItemField::SalesUnit => "sales_unit",
            ItemField::SalesAmount => "sales_amount",
            ItemField::BuyUnit => "buy_unit",
            ItemField::BuyAmount => "buy_amount",
            ItemField::SupplierCode => "supplier_cd",
            ItemField::SupplierName => "supplier_name",
            ItemField::DeliveryPlaceCode => "delivery_place_cd",
            ItemField::DeliveryPlaceName => "delivery_place_name",
            ItemField::LineNote => "line_note",
        }
    }

    pub fn default_font_size(self) -> Option<f32> {
        match self {
            ItemField::Qty
            | ItemField::SalesUnit
            | ItemField::SalesAmount
            | ItemField::BuyUnit
            | ItemField::BuyAmount => Some(FONT_SIZE_MAIN),
            ItemField::DeliveryPlaceCode => None,
            _ => Some(FONT_SIZE_SMALL),
        }
    }

    /// Quantities, units, prices and amounts line up on their right edge.
    pub fn align(self) -> Align {
        match self {
            ItemField::Qty
            | ItemField::UnitName
            | ItemField::IrisuName
            | ItemField::SalesUnit
            | ItemField::SalesAmount
            | ItemField::BuyUnit
            | ItemField::BuyAmount => Align::Right,
            _ => Align::Left,
        }
    }
}

/// A validated layout description.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub template_id: String,
    /// Template file name, relative to the templates directory.
    pub template_pdf_name: String,
    pub offset_x: f32,
    pub offset_y: f32,
    pub header_fields: BTreeMap<String, FieldSpec>,
    pub item_fields: BTreeMap<String, FieldSpec>,
    /// Always at least 1.
    pub items_per_page: usize,
    pub block_top_y: f32,
    pub block_pitch: f32,
    pub item_name_max_width: f32,
}

impl LayoutConfig {
    pub fn header_field(&self, field: HeaderField) -> Option<&FieldSpec> {
        self.header_fields.get(field.key())
    }

    pub fn item_field(&self, field: ItemField) -> Option<&FieldSpec> {
        self.item_fields.get(field.key())
    }

    pub fn page_count(&self, item_count: usize) -> usize {
        page_count(item_count, self.items_per_page)
    }

    /// Top of the block for the `slot`-th item on a page.
    pub fn block_top_for_slot(&self, slot: usize) -> f32 {
        self.block_top_y - slot as f32 * self.block_pitch
    }

    /// Absolute position of a header field.
    pub fn header_position(&self, spec: &FieldSpec) -> (f32, f32) {
        (spec.x + self.offset_x, spec.y + self.offset_y)
    }

    /// Absolute position of an item field in the `slot`-th block.
    pub fn item_position(&self, slot: usize, spec: &FieldSpec) -> (f32, f32) {
        (
            spec.x + self.offset_x,
            self.block_top_for_slot(slot) - spec.y + self.offset_y,
        )
    }
}
