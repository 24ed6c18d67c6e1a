mod common;

use common::fixtures::{TEMPLATE_PDF, layout_json, sample_header, sample_items, template_pdf};
use common::pdf_assertions::{extract_font_names, find_text, overlay_texts, template_text};
use common::{GeneratedPdf, TestAssets, TestResult, init_logging};
use overprint::fonts::subset_font;
use overprint::layout::mm_to_pt;
use overprint::{OrderHeader, OverprintError};
use std::sync::Arc;

#[test]
fn test_three_items_two_per_page() -> TestResult {
    init_logging();
    let Some(assets) = TestAssets::with_font() else {
        eprintln!("no system TrueType font available; skipping");
        return Ok(());
    };
    assets.write_layout("default.json", &layout_json(2));
    assets.write_template(TEMPLATE_PDF, &template_pdf(1));

    let bytes = assets
        .engine()
        .build(&sample_header(), &sample_items(3), "default")?;
    let pdf = GeneratedPdf::from_bytes(bytes)?;
    assert_eq!(pdf.page_count(), 2);

    let pages = pdf.page_ids();
    let first = overlay_texts(&pdf.doc, pages[0]);
    let second = overlay_texts(&pdf.doc, pages[1]);

    // header on both pages at the same spot
    for text in ["ACME", "2024/01/05"] {
        let a = find_text(&first, text).expect("header on page 1");
        let b = find_text(&second, text).expect("header on page 2");
        assert_eq!((a.x, a.y), (b.x, b.y));
    }

    assert!(find_text(&first, "Item 1").is_some());
    assert!(find_text(&first, "Item 2").is_some());
    assert!(find_text(&first, "Item 3").is_none());
    assert!(find_text(&second, "Item 3").is_some());
    assert!(find_text(&second, "Item 1").is_none());
    assert!(find_text(&second, "Item 2").is_none());
    Ok(())
}

#[test]
fn test_item_blocks_follow_pitch() -> TestResult {
    let Some(assets) = TestAssets::with_font() else {
        eprintln!("no system TrueType font available; skipping");
        return Ok(());
    };
    assets.write_layout("default.json", &layout_json(3));
    assets.write_template(TEMPLATE_PDF, &template_pdf(1));

    let bytes = assets
        .engine()
        .build(&sample_header(), &sample_items(3), "default")?;
    let pdf = GeneratedPdf::from_bytes(bytes)?;
    let drawn = overlay_texts(&pdf.doc, pdf.page_ids()[0]);

    let pitch = mm_to_pt(12.0);
    let top = mm_to_pt(250.0);
    let rel_y = mm_to_pt(4.0);
    for slot in 0..3 {
        let name = find_text(&drawn, &format!("Item {}", slot + 1)).expect("item name");
        let expected = top - slot as f32 * pitch - rel_y;
        assert!((name.y - expected).abs() < 0.01, "slot {slot}: {} vs {expected}", name.y);
        assert!((name.x - mm_to_pt(10.0)).abs() < 0.01);
    }
    Ok(())
}

#[test]
fn test_quantities_are_grouped_and_right_aligned() -> TestResult {
    let Some(assets) = TestAssets::with_font() else {
        eprintln!("no system TrueType font available; skipping");
        return Ok(());
    };
    assets.write_layout("default.json", &layout_json(5));
    assets.write_template(TEMPLATE_PDF, &template_pdf(1));

    let bytes = assets
        .engine()
        .build(&sample_header(), &sample_items(2), "default")?;
    let pdf = GeneratedPdf::from_bytes(bytes)?;
    let drawn = overlay_texts(&pdf.doc, pdf.page_ids()[0]);
    let face = assets.face();

    // qty anchor is the fourth item key: x = 10 + 13 * 3 mm
    let anchor = mm_to_pt(49.0);
    for text in ["1,000", "2,000"] {
        let qty = find_text(&drawn, text).expect("grouped quantity");
        let right_edge = qty.x + face.text_width(text, qty.font_size);
        assert!((right_edge - anchor).abs() < 0.01);
        assert_eq!(qty.font_size, 8.0);
    }
    Ok(())
}

#[test]
fn test_short_template_cycles() -> TestResult {
    let Some(assets) = TestAssets::with_font() else {
        eprintln!("no system TrueType font available; skipping");
        return Ok(());
    };
    assets.write_layout("default.json", &layout_json(1));
    assets.write_template(TEMPLATE_PDF, &template_pdf(2));

    let bytes = assets
        .engine()
        .build(&sample_header(), &sample_items(5), "default")?;
    let pdf = GeneratedPdf::from_bytes(bytes)?;
    assert_eq!(pdf.page_count(), 5);

    let sources: Vec<String> = pdf
        .page_ids()
        .into_iter()
        .map(|id| template_text(&pdf.doc, id).trim().to_string())
        .collect();
    assert_eq!(
        sources,
        vec![
            "Template Page 1",
            "Template Page 2",
            "Template Page 1",
            "Template Page 2",
            "Template Page 1"
        ]
    );
    Ok(())
}

#[test]
fn test_long_template_is_cut_to_overlay_length() -> TestResult {
    let Some(assets) = TestAssets::with_font() else {
        eprintln!("no system TrueType font available; skipping");
        return Ok(());
    };
    assets.write_layout("default.json", &layout_json(20));
    assets.write_template(TEMPLATE_PDF, &template_pdf(3));

    let bytes = assets.engine().build(&OrderHeader::default(), &[], "default")?;
    let pdf = GeneratedPdf::from_bytes(bytes)?;
    assert_eq!(pdf.page_count(), 1);
    assert_eq!(template_text(&pdf.doc, pdf.page_ids()[0]).trim(), "Template Page 1");
    Ok(())
}

#[test]
fn test_embedded_font_is_present() -> TestResult {
    let Some(assets) = TestAssets::with_font() else {
        eprintln!("no system TrueType font available; skipping");
        return Ok(());
    };
    assets.write_layout("default.json", &layout_json(2));
    assets.write_template(TEMPLATE_PDF, &template_pdf(1));

    let bytes = assets
        .engine()
        .build(&sample_header(), &sample_items(1), "")?;
    let pdf = GeneratedPdf::from_bytes(bytes)?;
    let fonts = extract_font_names(&pdf.doc);
    let base_font = assets.face().base_font();
    assert!(fonts.iter().any(|f| f.rsplit('+').next() == Some(base_font)));
    assert!(fonts.iter().any(|f| f == "Helvetica"));
    Ok(())
}

#[test]
fn test_output_embeds_only_drawn_glyphs() -> TestResult {
    let Some(assets) = TestAssets::with_font() else {
        eprintln!("no system TrueType font available; skipping");
        return Ok(());
    };
    let face = assets.face();
    let used = [('A', face.glyph_id('A')), ('1', face.glyph_id('1'))]
        .into_iter()
        .filter_map(|(ch, gid)| Some((gid?, ch)))
        .collect();
    if subset_font(face.data(), &used).is_err() {
        eprintln!("system font is not subsettable; skipping");
        return Ok(());
    }
    assets.write_layout("default.json", &layout_json(2));
    assets.write_template(TEMPLATE_PDF, &template_pdf(1));

    let header = OrderHeader {
        customer_name: Some("A1".into()),
        ..OrderHeader::default()
    };
    let bytes = assets.engine().build(&header, &[], "default")?;
    assert!(
        bytes.len() * 4 < face.data().len(),
        "{} byte PDF for a {} byte font",
        bytes.len(),
        face.data().len()
    );

    let pdf = GeneratedPdf::from_bytes(bytes)?;
    let drawn = overlay_texts(&pdf.doc, pdf.page_ids()[0]);
    assert!(find_text(&drawn, "A1").is_some());
    Ok(())
}

#[test]
fn test_render_lays_out_without_template() -> TestResult {
    let Some(assets) = TestAssets::with_font() else {
        eprintln!("no system TrueType font available; skipping");
        return Ok(());
    };
    assets.write_layout("default.json", &layout_json(2));

    let pages = assets
        .engine()
        .render(&sample_header(), &sample_items(5), "default")?;
    assert_eq!(pages.len(), 3);
    assert_eq!(
        pages.iter().map(|p| p.item_count()).collect::<Vec<_>>(),
        vec![2, 2, 1]
    );
    assert!(pages.iter().all(|p| p.header_runs().any(|r| r.text == "ACME")));
    Ok(())
}

#[test]
fn test_missing_template_pdf() -> TestResult {
    let assets = TestAssets::new();
    assets.write_layout("default.json", &layout_json(2));

    let err = assets
        .engine()
        .build(&sample_header(), &sample_items(1), "default")
        .unwrap_err();
    assert!(matches!(err, OverprintError::TemplateNotFound(name) if name == TEMPLATE_PDF));
    Ok(())
}

#[test]
fn test_missing_font() -> TestResult {
    let assets = TestAssets::new();
    assets.write_layout("default.json", &layout_json(2));
    assets.write_template(TEMPLATE_PDF, &template_pdf(1));

    let err = assets
        .engine()
        .build(&sample_header(), &sample_items(1), "default")
        .unwrap_err();
    assert!(matches!(err, OverprintError::FontNotFound(_)));
    Ok(())
}

#[test]
fn test_missing_layout() -> TestResult {
    let assets = TestAssets::new();
    let err = assets
        .engine()
        .build(&sample_header(), &[], "invoice")
        .unwrap_err();
    match err {
        OverprintError::ConfigNotFound { template_id, tried } => {
            assert_eq!(template_id, "invoice");
            assert_eq!(tried, vec!["invoice.json", "invoice.jsonc"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn test_concurrent_builds_share_one_layout() -> TestResult {
    let Some(assets) = TestAssets::with_font() else {
        eprintln!("no system TrueType font available; skipping");
        return Ok(());
    };
    assets.write_layout("default.json", &layout_json(2));
    assets.write_template(TEMPLATE_PDF, &template_pdf(1));
    let engine = Arc::new(assets.engine());

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                engine
                    .build(&sample_header(), &sample_items(n + 1), "default")
                    .map(|bytes| bytes.len())
            })
        })
        .collect();
    for handle in handles {
        let len = handle.join().expect("build thread panicked")?;
        assert!(len > 0);
    }
    assert_eq!(engine.layout_cache().len(), 1);
    Ok(())
}
