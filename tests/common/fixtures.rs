use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};
use overprint::{OrderHeader, OrderItem};
use serde_json::{Map, Value, json};

pub const TEMPLATE_PDF: &str = "order_sheet.pdf";

pub const HEADER_KEYS: [&str; 6] = [
    "order_date",
    "tantou",
    "customer_cd",
    "customer_name",
    "shipto_cd",
    "shipto_name",
];

pub const ITEM_KEYS: [&str; 14] = [
    "item_name",
    "spec",
    "item_cd",
    "qty",
    "unit_name",
    "irisu_name",
    "sales_unit",
    "sales_amount",
    "buy_unit",
    "buy_amount",
    "supplier_cd",
    "supplier_name",
    "delivery_place_name",
    "line_note",
];

/// A layout with every required key. Header fields sit on one row near the
/// top of an A4 page; item fields are spread across one row of each block.
pub fn layout_json(items_per_page: usize) -> Value {
    let mut header = Map::new();
    for (i, key) in HEADER_KEYS.iter().enumerate() {
        header.insert(
            key.to_string(),
            json!({ "pos": [15 + 30 * i as i64, 280] }),
        );
    }
    let mut items = Map::new();
    for (i, key) in ITEM_KEYS.iter().enumerate() {
        items.insert(
            key.to_string(),
            json!({ "pos": [10 + 13 * i as i64, 4] }),
        );
    }
    json!({
        "template_pdf_name": TEMPLATE_PDF,
        "offset_x_mm": 0,
        "offset_y_mm": 0,
        "header": header,
        "items_per_page": items_per_page,
        "block_top_y_mm": 250,
        "block_pitch_mm": 12,
        "item_name_max_width_mm": 40,
        "item_fields": items,
    })
}

/// A template PDF with `pages` A4 pages; page `i` shows "Template Page <i+1>"
/// in Helvetica.
pub fn template_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for i in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![40.into(), 40.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        format!("Template Page {}", i + 1).into_bytes(),
                        StringFormat::Literal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode template content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save template");
    bytes
}

pub fn sample_header() -> OrderHeader {
    OrderHeader {
        order_date: Some("2024-01-05".into()),
        customer_name: Some("ACME".into()),
        ..OrderHeader::default()
    }
}

/// Items named "Item 1", "Item 2", ... with a quantity of `1000 * n`.
pub fn sample_items(count: usize) -> Vec<OrderItem> {
    (1..=count)
        .map(|n| OrderItem {
            item_name: Some(format!("Item {n}").into()),
            qty: Some((n as i64 * 1000).into()),
            ..OrderItem::default()
        })
        .collect()
}
