//! Order header and line item records, as handed over by the caller.
//!
//! Every field is optional; missing values render as empty strings.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::OverprintError;
use crate::format::{format_date, format_int, format_text};
use crate::layout::{HeaderField, ItemField};

/// A scalar value of an order field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(serde_json::Number),
    Text(String),
    Bool(bool),
    Other(serde_json::Value),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Other(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(FieldValue::Number)
            .unwrap_or_else(|| FieldValue::Text(n.to_string()))
    }
}

/// The order date: a calendar date, a timestamp, or anything else the caller
/// had at hand.
///
/// Values read from JSON are always [`DateValue::Raw`]; date normalization
/// happens at formatting time. `Date` and `DateTime` are for callers that
/// already hold chrono values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DateValue {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Raw(FieldValue),
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        FieldValue::deserialize(deserializer).map(DateValue::Raw)
    }
}

impl From<NaiveDate> for DateValue {
    fn from(d: NaiveDate) -> Self {
        DateValue::Date(d)
    }
}

impl From<NaiveDateTime> for DateValue {
    fn from(dt: NaiveDateTime) -> Self {
        DateValue::DateTime(dt)
    }
}

impl From<&str> for DateValue {
    fn from(s: &str) -> Self {
        DateValue::Raw(FieldValue::from(s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderHeader {
    pub order_date: Option<DateValue>,
    pub order_no: Option<FieldValue>,
    pub tantou_cd: Option<FieldValue>,
    pub tantou_name: Option<FieldValue>,
    pub customer_cd: Option<FieldValue>,
    pub customer_name: Option<FieldValue>,
    pub shipto_cd: Option<FieldValue>,
    pub shipto_name: Option<FieldValue>,
}

impl OrderHeader {
    /// Display text for `field`.
    pub fn text_for(&self, field: HeaderField) -> String {
        match field {
            HeaderField::OrderDate => format_date(self.order_date.as_ref()),
            HeaderField::Tantou => format_text(self.tantou_name.as_ref()),
            HeaderField::TantouCode => format_text(self.tantou_cd.as_ref()),
            HeaderField::CustomerCode => format_text(self.customer_cd.as_ref()),
            HeaderField::CustomerName => format_text(self.customer_name.as_ref()),
            HeaderField::ShipToCode => format_text(self.shipto_cd.as_ref()),
            HeaderField::ShipToName => format_text(self.shipto_name.as_ref()),
            HeaderField::OrderNo => format_text(self.order_no.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderItem {
    pub item_name: Option<FieldValue>,
    pub item_cd: Option<FieldValue>,
    pub spec: Option<FieldValue>,
    pub qty: Option<FieldValue>,
    pub unit_name: Option<FieldValue>,
    pub irisu_name: Option<FieldValue>,
    pub sales_unit_price: Option<FieldValue>,
    pub sales_amount: Option<FieldValue>,
    pub buy_unit_price: Option<FieldValue>,
    pub buy_amount: Option<FieldValue>,
    pub supplier_cd: Option<FieldValue>,
    pub supplier_name: Option<FieldValue>,
    pub delivery_place_cd: Option<FieldValue>,
    pub delivery_place_name: Option<FieldValue>,
    pub line_note: Option<FieldValue>,
}

impl OrderItem {
    /// Display text for `field`, before any width truncation.
    pub fn text_for(&self, field: ItemField) -> String {
        match field {
            ItemField::ItemName => format_text(self.item_name.as_ref()),
            ItemField::Spec => format_text(self.spec.as_ref()),
            ItemField::ItemCode => format_text(self.item_cd.as_ref()),
            ItemField::Qty => format_int(self.qty.as_ref()),
            ItemField::UnitName => format_text(self.unit_name.as_ref()),
            ItemField::IrisuName => format_text(self.irisu_name.as_ref()),
            ItemField::SalesUnit => format_int(self.sales_unit_price.as_ref()),
            ItemField::SalesAmount => format_int(self.sales_amount.as_ref()),
            ItemField::BuyUnit => format_int(self.buy_unit_price.as_ref()),
            ItemField::BuyAmount => format_int(self.buy_amount.as_ref()),
            ItemField::SupplierCode => format_text(self.supplier_cd.as_ref()),
            ItemField::SupplierName => format_text(self.supplier_name.as_ref()),
            ItemField::DeliveryPlaceCode => format_text(self.delivery_place_cd.as_ref()),
            ItemField::DeliveryPlaceName => format_text(self.delivery_place_name.as_ref()),
            ItemField::LineNote => format_text(self.line_note.as_ref()),
        }
    }
}

/// A complete order as exchanged on the wire: `{"header": {...}, "items": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDocument {
    pub header: OrderHeader,
    pub items: Vec<OrderItem>,
}

impl OrderDocument {
    pub fn from_json(text: &str) -> Result<Self, OverprintError> {
        Ok(serde_json::from_str(text)?)
    }
}
