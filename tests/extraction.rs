//! Extraction & classification engine tests over programmatically built
//! snapshots: no browser involved.

use slidesmith::dom::{DomSnapshot, LayoutRect};
use slidesmith::extract::extract;
use slidesmith::model::{Background, Bullet, ElementKind, SlideDocument};

const CANVAS: f64 = 1280.0;

fn body() -> DomSnapshot {
    DomSnapshot::with_body(
        &[("display", "block")],
        LayoutRect::new(0.0, 0.0, CANVAS, 720.0),
    )
}

fn text_style() -> Vec<(&'static str, &'static str)> {
    vec![
        ("display", "block"),
        ("font-size", "16px"),
        ("line-height", "24px"),
        ("color", "rgb(34, 34, 34)"),
        ("font-family", "Helvetica, sans-serif"),
    ]
}

fn run_extract(snap: &DomSnapshot) -> SlideDocument {
    let mut doc = SlideDocument::default();
    extract(snap, &mut doc);
    doc
}

#[test]
fn minimal_paragraph_yields_one_text_element() {
    let mut snap = body();
    let p = snap.add_element(
        snap.root(),
        "p",
        &[],
        &text_style(),
        LayoutRect::new(100.0, 100.0, 400.0, 24.0),
    );
    snap.add_text(p, "Hello world");

    let doc = run_extract(&snap);
    assert!(doc.errors.is_empty(), "{:?}", doc.errors);
    assert!(doc.placeholders.is_empty());
    assert_eq!(doc.elements.len(), 1);
    match &doc.elements[0].kind {
        ElementKind::Text(t) => {
            assert_eq!(t.plain_text(), "Hello world");
            assert_eq!(t.style.font_size_pt, Some(12.0));
            assert_eq!(t.style.color.as_deref(), Some("222222"));
        }
        other => panic!("expected text, got {other:?}"),
    }
    // 100px => 1.0417in
    assert!((doc.elements[0].position.x - 100.0 / 96.0).abs() < 1e-9);
}

#[test]
fn rotation_quarter_turn_swaps_box_and_keeps_center() {
    let mut snap = body();
    let mut style = text_style();
    style.push(("transform", "matrix(0, 1, -1, 0, 0, 0)"));
    // measured (rotated) bounding box of a 200x50 box about center (300, 100)
    let p = snap.add_element(
        snap.root(),
        "p",
        &[],
        &style,
        LayoutRect::new(275.0, 0.0, 50.0, 200.0),
    );
    snap.add_text(p, "sideways");

    let doc = run_extract(&snap);
    let el = &doc.elements[0];
    assert!((el.position.w - 200.0 / 96.0).abs() < 1e-9);
    assert!((el.position.h - 50.0 / 96.0).abs() < 1e-9);
    // center preserved: x + w/2 == 300px
    assert!(((el.position.x + el.position.w / 2.0) - 300.0 / 96.0).abs() < 1e-9);
    match &el.kind {
        ElementKind::Text(t) => assert_eq!(t.style.rotation_deg, Some(90.0)),
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn rotation_half_turn_keeps_box() {
    let mut snap = body();
    let mut style = text_style();
    style.push(("transform", "matrix(-1, 0, 0, -1, 0, 0)"));
    let p = snap.add_element(
        snap.root(),
        "p",
        &[],
        &style,
        LayoutRect::new(100.0, 50.0, 200.0, 40.0),
    );
    snap.add_text(p, "upside down");

    let doc = run_extract(&snap);
    let el = &doc.elements[0];
    assert!((el.position.w - 200.0 / 96.0).abs() < 1e-9);
    assert!((el.position.h - 40.0 / 96.0).abs() < 1e-9);
}

#[test]
fn placeholder_is_reported_not_emitted() {
    let mut snap = body();
    snap.add_element(
        snap.root(),
        "div",
        &[("class", "placeholder"), ("id", "chart-1")],
        &[("display", "block")],
        LayoutRect::new(96.0, 96.0, 480.0, 288.0),
    );

    let doc = run_extract(&snap);
    assert!(doc.elements.is_empty());
    assert_eq!(doc.placeholders.len(), 1);
    let ph = &doc.placeholders[0];
    assert_eq!(ph.id, "chart-1");
    assert_eq!(ph.x, 1.0);
    assert_eq!(ph.w, 5.0);
    assert_eq!(ph.h, 3.0);
}

#[test]
fn zero_area_placeholder_is_a_finding() {
    let mut snap = body();
    snap.add_element(
        snap.root(),
        "div",
        &[("class", "placeholder"), ("id", "empty")],
        &[("display", "block")],
        LayoutRect::new(0.0, 0.0, 0.0, 0.0),
    );

    let doc = run_extract(&snap);
    assert!(doc.placeholders.is_empty());
    assert_eq!(doc.errors.len(), 1);
    assert!(doc.errors[0].contains("empty"));
}

#[test]
fn decorated_container_layers_shape_below_text() {
    let mut snap = body();
    let card = snap.add_element(
        snap.root(),
        "div",
        &[],
        &[
            ("display", "block"),
            ("background-color", "rgb(0, 51, 102)"),
            ("border-radius", "8px"),
            ("font-size", "16px"),
            ("color", "rgb(255, 255, 255)"),
        ],
        LayoutRect::new(96.0, 96.0, 384.0, 96.0),
    );
    snap.add_text(card, "card body");

    let doc = run_extract(&snap);
    assert_eq!(doc.elements.len(), 2);
    match &doc.elements[0].kind {
        ElementKind::Shape(s) => {
            assert_eq!(s.fill.as_ref().unwrap().color, "003366");
            assert_eq!(s.corner_radius_pt, Some(6.0));
        }
        other => panic!("expected shape first, got {other:?}"),
    }
    match &doc.elements[1].kind {
        ElementKind::Text(t) => assert_eq!(t.plain_text(), "card body"),
        other => panic!("expected text second, got {other:?}"),
    }
}

#[test]
fn background_image_with_uneven_border_emits_line_and_raster() {
    let mut snap = body();
    snap.add_element(
        snap.root(),
        "div",
        &[],
        &[
            ("display", "block"),
            ("background-image", "linear-gradient(rgb(0, 0, 0), rgb(255, 255, 255))"),
            ("border-top-width", "2px"),
            ("border-top-style", "solid"),
            ("border-top-color", "rgb(200, 0, 0)"),
        ],
        LayoutRect::new(0.0, 0.0, 480.0, 96.0),
    );

    let doc = run_extract(&snap);
    let rasters = doc
        .elements
        .iter()
        .filter(|e| matches!(e.kind, ElementKind::Raster(_)))
        .count();
    let lines: Vec<_> = doc
        .elements
        .iter()
        .filter_map(|e| match &e.kind {
            ElementKind::Line(l) => Some((e, l)),
            _ => None,
        })
        .collect();
    let shapes = doc
        .elements
        .iter()
        .filter(|e| matches!(e.kind, ElementKind::Shape(_)))
        .count();
    assert_eq!(rasters, 1);
    assert_eq!(lines.len(), 1);
    assert_eq!(shapes, 0, "never a combined shape stroke");
    // inset by half the 2px thickness: y = 1px
    let (line_el, line) = lines[0];
    assert!((line_el.position.y - 1.0 / 96.0).abs() < 1e-9);
    assert_eq!(line_el.position.h, 0.0);
    assert_eq!(line.width_pt, 1.5);
    assert_eq!(line.color, "C80000");
}

#[test]
fn table_columns_rescale_to_rendered_box() {
    let mut snap = body();
    let cell_style = [("display", "table-cell"), ("font-size", "14px")];
    let table = snap.add_element(
        snap.root(),
        "table",
        &[],
        &[("display", "table")],
        LayoutRect::new(0.0, 0.0, 288.0, 96.0),
    );
    for row in 0..2 {
        let tr = snap.add_element(
            table,
            "tr",
            &[],
            &[("display", "table-row")],
            LayoutRect::new(0.0, row as f64 * 48.0, 288.0, 48.0),
        );
        let td1 = snap.add_element(
            tr,
            "td",
            &[],
            &cell_style,
            LayoutRect::new(0.0, row as f64 * 48.0, 200.0, 48.0),
        );
        snap.add_text(td1, "wide");
        let td2 = snap.add_element(
            tr,
            "td",
            &[],
            &cell_style,
            LayoutRect::new(200.0, row as f64 * 48.0, 100.0, 48.0),
        );
        snap.add_text(td2, "narrow");
    }

    let doc = run_extract(&snap);
    assert_eq!(doc.elements.len(), 1, "cells are consumed by the table");
    match &doc.elements[0].kind {
        ElementKind::Table(t) => {
            assert_eq!(t.rows.len(), 2);
            assert_eq!(t.rows[0].len(), 2);
            assert!((t.col_widths_in[0] - 2.0).abs() < 1e-9);
            assert!((t.col_widths_in[1] - 1.0).abs() < 1e-9);
            let sum: f64 = t.col_widths_in.iter().sum();
            assert!((sum - 3.0).abs() < 1e-9, "columns sum exactly to 3in");
            let hsum: f64 = t.row_heights_in.iter().sum();
            assert!((hsum - 1.0).abs() < 1e-9);
            assert_eq!(t.rows[0][0].runs[0].text, "wide");
        }
        other => panic!("expected table, got {other:?}"),
    }
}

#[test]
fn empty_table_is_a_structural_finding() {
    let mut snap = body();
    snap.add_element(
        snap.root(),
        "table",
        &[],
        &[("display", "table")],
        LayoutRect::new(0.0, 0.0, 100.0, 50.0),
    );

    let doc = run_extract(&snap);
    assert!(doc.elements.is_empty());
    assert_eq!(doc.errors.len(), 1);
    assert!(doc.errors[0].contains("no measurable cells"));
}

#[test]
fn nested_list_levels_cycle_three_default_glyphs() {
    let mut snap = body();
    let list_style = [("display", "block"), ("font-size", "16px")];
    let item_style = [("display", "list-item"), ("font-size", "16px")];
    let ul0 = snap.add_element(
        snap.root(),
        "ul",
        &[],
        &list_style,
        LayoutRect::new(0.0, 0.0, 400.0, 120.0),
    );
    let li0 = snap.add_element(
        ul0,
        "li",
        &[],
        &item_style,
        LayoutRect::new(0.0, 0.0, 400.0, 40.0),
    );
    snap.add_text(li0, "first");
    let ul1 = snap.add_element(
        li0,
        "ul",
        &[],
        &list_style,
        LayoutRect::new(20.0, 40.0, 380.0, 80.0),
    );
    let li1 = snap.add_element(
        ul1,
        "li",
        &[],
        &item_style,
        LayoutRect::new(20.0, 40.0, 380.0, 40.0),
    );
    snap.add_text(li1, "second");
    let ul2 = snap.add_element(
        li1,
        "ul",
        &[],
        &list_style,
        LayoutRect::new(40.0, 80.0, 360.0, 40.0),
    );
    let li2 = snap.add_element(
        ul2,
        "li",
        &[],
        &item_style,
        LayoutRect::new(40.0, 80.0, 360.0, 40.0),
    );
    snap.add_text(li2, "third");

    let doc = run_extract(&snap);
    assert_eq!(doc.elements.len(), 1);
    match &doc.elements[0].kind {
        ElementKind::List(l) => {
            assert_eq!(l.items.len(), 3);
            let glyphs: Vec<char> = l.items.iter().map(|i| i.glyph().unwrap()).collect();
            assert_eq!(glyphs, vec!['\u{2022}', '\u{25E6}', '\u{25AA}']);
            assert_eq!(l.items[0].level, 0);
            assert_eq!(l.items[2].level, 2);
        }
        other => panic!("expected list, got {other:?}"),
    }
}

#[test]
fn explicit_glyph_overrides_level_default() {
    let mut snap = body();
    let ul = snap.add_element(
        snap.root(),
        "ul",
        &[],
        &[("display", "block"), ("font-size", "16px")],
        LayoutRect::new(0.0, 0.0, 400.0, 40.0),
    );
    let li = snap.add_element(
        ul,
        "li",
        &[],
        &[("display", "list-item"), ("font-size", "16px")],
        LayoutRect::new(0.0, 0.0, 400.0, 40.0),
    );
    snap.add_text(li, "\u{25B6} action item");

    let doc = run_extract(&snap);
    match &doc.elements[0].kind {
        ElementKind::List(l) => {
            assert_eq!(l.items[0].bullet, Bullet::Glyph('\u{25B6}'));
            assert_eq!(l.items[0].runs[0].text, "action item");
        }
        other => panic!("expected list, got {other:?}"),
    }
}

#[test]
fn ordered_list_items_are_numbered() {
    let mut snap = body();
    let ol = snap.add_element(
        snap.root(),
        "ol",
        &[],
        &[("display", "block"), ("font-size", "16px")],
        LayoutRect::new(0.0, 0.0, 400.0, 40.0),
    );
    let li = snap.add_element(
        ol,
        "li",
        &[],
        &[("display", "list-item"), ("font-size", "16px")],
        LayoutRect::new(0.0, 0.0, 400.0, 40.0),
    );
    snap.add_text(li, "step one");

    let doc = run_extract(&snap);
    match &doc.elements[0].kind {
        ElementKind::List(l) => {
            assert_eq!(l.items[0].bullet, Bullet::Number);
            assert_eq!(l.items[0].glyph(), None);
        }
        other => panic!("expected list, got {other:?}"),
    }
}

#[test]
fn flex_list_is_processed_item_by_item() {
    let mut snap = body();
    let ul = snap.add_element(
        snap.root(),
        "ul",
        &[],
        &[("display", "flex"), ("font-size", "16px")],
        LayoutRect::new(0.0, 0.0, 400.0, 40.0),
    );
    let li = snap.add_element(
        ul,
        "li",
        &[],
        &[("display", "block"), ("font-size", "16px")],
        LayoutRect::new(0.0, 0.0, 200.0, 40.0),
    );
    snap.add_text(li, "tab one");

    let doc = run_extract(&snap);
    assert_eq!(doc.elements.len(), 1);
    assert!(
        matches!(doc.elements[0].kind, ElementKind::Text(_)),
        "items fall through to the text-tag rule"
    );
}

#[test]
fn text_tag_with_border_emits_lines_and_finding() {
    let mut snap = body();
    let mut style = text_style();
    style.extend([
        ("border-top-width", "1px"),
        ("border-top-style", "solid"),
        ("border-top-color", "rgb(0, 0, 0)"),
        ("border-bottom-width", "1px"),
        ("border-bottom-style", "solid"),
        ("border-bottom-color", "rgb(0, 0, 0)"),
    ]);
    let p = snap.add_element(
        snap.root(),
        "p",
        &[],
        &style,
        LayoutRect::new(0.0, 0.0, 400.0, 30.0),
    );
    snap.add_text(p, "ruled text");

    let doc = run_extract(&snap);
    let lines = doc
        .elements
        .iter()
        .filter(|e| matches!(e.kind, ElementKind::Line(_)))
        .count();
    let texts = doc
        .elements
        .iter()
        .filter(|e| matches!(e.kind, ElementKind::Text(_)))
        .count();
    assert_eq!(lines, 2);
    assert_eq!(texts, 1);
    assert_eq!(doc.errors.len(), 1);
    assert!(doc.errors[0].contains("<p>"));
}

#[test]
fn literal_bullet_outside_a_list_is_a_finding() {
    let mut snap = body();
    let p = snap.add_element(
        snap.root(),
        "p",
        &[],
        &text_style(),
        LayoutRect::new(0.0, 0.0, 400.0, 24.0),
    );
    snap.add_text(p, "\u{2022} fake bullet");

    let doc = run_extract(&snap);
    assert_eq!(doc.errors.len(), 1);
    assert!(doc.errors[0].contains("use list markup"));
}

#[test]
fn image_node_keeps_fit_and_opacity() {
    let mut snap = body();
    snap.add_element(
        snap.root(),
        "img",
        &[("src", "figure.png")],
        &[
            ("display", "inline"),
            ("object-fit", "cover"),
            ("opacity", "0.8"),
        ],
        LayoutRect::new(96.0, 0.0, 192.0, 192.0),
    );

    let doc = run_extract(&snap);
    assert_eq!(doc.elements.len(), 1);
    match &doc.elements[0].kind {
        ElementKind::Image(img) => {
            assert_eq!(img.src, "figure.png");
            assert_eq!(img.transparency, Some(20.0));
            assert!(img.needs_raster(), "non-fill object-fit needs the fallback");
        }
        other => panic!("expected image, got {other:?}"),
    }
}

#[test]
fn zero_area_image_is_dropped_silently() {
    let mut snap = body();
    snap.add_element(
        snap.root(),
        "img",
        &[("src", "x.png")],
        &[("display", "inline")],
        LayoutRect::new(0.0, 0.0, 0.0, 0.0),
    );

    let doc = run_extract(&snap);
    assert!(doc.elements.is_empty());
    assert!(doc.errors.is_empty());
}

#[test]
fn svg_queues_for_rasterization_with_markup() {
    let mut snap = body();
    let svg = snap.add_element(
        snap.root(),
        "svg",
        &[("viewBox", "0 0 24 24")],
        &[("display", "inline")],
        LayoutRect::new(0.0, 0.0, 48.0, 48.0),
    );
    snap.set_svg_markup(svg, "<svg viewBox=\"0 0 24 24\"><circle r=\"12\"/></svg>");

    let doc = run_extract(&snap);
    match &doc.elements[0].kind {
        ElementKind::Raster(t) => {
            assert!(t.inner_html.as_deref().unwrap().contains("circle"));
        }
        other => panic!("expected raster target, got {other:?}"),
    }
}

#[test]
fn inline_flex_item_honors_centering() {
    let mut snap = body();
    let flexbox = snap.add_element(
        snap.root(),
        "div",
        &[],
        &[
            ("display", "flex"),
            ("justify-content", "center"),
            ("align-items", "center"),
        ],
        LayoutRect::new(0.0, 0.0, 400.0, 100.0),
    );
    // flex items are blockified: the span's computed display is block
    let span = snap.add_element(
        flexbox,
        "span",
        &[],
        &[("display", "block"), ("font-size", "20px")],
        LayoutRect::new(150.0, 40.0, 100.0, 20.0),
    );
    snap.add_text(span, "centered");

    let doc = run_extract(&snap);
    assert_eq!(doc.elements.len(), 1);
    match &doc.elements[0].kind {
        ElementKind::Text(t) => {
            assert_eq!(t.style.align, Some(slidesmith::model::HAlign::Center));
            assert_eq!(t.style.valign, Some(slidesmith::model::VAlign::Middle));
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn body_background_color_is_lifted() {
    let mut snap = DomSnapshot::with_body(
        &[("display", "block"), ("background-color", "rgb(18, 18, 18)")],
        LayoutRect::new(0.0, 0.0, CANVAS, 720.0),
    );
    let p = snap.add_element(
        snap.root(),
        "p",
        &[],
        &text_style(),
        LayoutRect::new(0.0, 0.0, 100.0, 24.0),
    );
    snap.add_text(p, "dark mode");

    let doc = run_extract(&snap);
    assert_eq!(doc.background, Some(Background::Color("121212".to_string())));
}

#[test]
fn gradient_body_background_queues_for_rasterization() {
    let snap = DomSnapshot::with_body(
        &[
            ("display", "block"),
            (
                "background-image",
                "linear-gradient(rgb(0, 0, 0), rgb(40, 40, 40))",
            ),
        ],
        LayoutRect::new(0.0, 0.0, CANVAS, 720.0),
    );

    let doc = run_extract(&snap);
    assert!(matches!(doc.background, Some(Background::Raster(_))));
}

#[test]
fn bare_text_in_mixed_container_is_a_finding() {
    let mut snap = body();
    let div = snap.add_element(
        snap.root(),
        "div",
        &[],
        &[("display", "block")],
        LayoutRect::new(0.0, 0.0, 400.0, 100.0),
    );
    snap.add_text(div, "loose words");
    let p = snap.add_element(
        div,
        "p",
        &[],
        &text_style(),
        LayoutRect::new(0.0, 30.0, 400.0, 24.0),
    );
    snap.add_text(p, "wrapped words");

    let doc = run_extract(&snap);
    assert_eq!(doc.errors.len(), 1);
    assert!(doc.errors[0].contains("loose words"));
    // the wrapped paragraph still extracts
    assert_eq!(doc.elements.len(), 1);
}
