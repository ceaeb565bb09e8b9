//! The classifier rules, in the priority order the engine applies them.
//!
//! Each rule inspects one unconsumed element and either declines (`None`)
//! or constructs its output and reports whether the traversal should still
//! descend. Rules mark consumed subtrees themselves.

use crate::dom::{BorderSide, ElementData, LayoutRect, NodeId, SIDES};
use crate::extract::{flex_alignment, runs::is_inline_tag, Extractor, Outcome};
use crate::model::{
    ElementKind, Fill, ImageElement, ImageStyle, LineElement, Placeholder, Position, RasterTarget,
    ShadowStyle, ShapeElement, StrokeStyle,
};
use crate::units::px_to_pt;

/// Marker class designating caller-filled regions.
pub const PLACEHOLDER_CLASS: &str = "placeholder";

/// Glyphs recognized as explicit bullet markers.
pub(crate) const BULLET_GLYPHS: &[char] = &[
    '\u{2022}', '\u{25E6}', '\u{25AA}', '\u{2023}', '\u{00B7}', '\u{25CF}', '\u{25CB}',
    '\u{25A0}', '\u{25A1}', '\u{2013}', '-', '*', '\u{2192}', '\u{25B6}', '\u{25BA}',
    '\u{2713}', '\u{2714}', '\u{27A4}', '\u{2756}', '\u{25C6}', '\u{2726}',
];

pub(crate) fn is_container_tag(tag: &str) -> bool {
    matches!(
        tag,
        "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "main"
            | "aside"
            | "nav"
            | "figure"
            | "form"
    )
}

pub(crate) fn is_text_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "li" | "blockquote" | "figcaption"
    )
}

/// Rule 1: caller-designated placeholder regions.
pub(crate) fn placeholder(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if !el.has_class(PLACEHOLDER_CLASS) {
        return None;
    }
    let given = el.attr("id").map(str::to_string);
    if el.rect.area() <= 0.0 {
        let name = given.unwrap_or_else(|| "unnamed".to_string());
        ex.push_error(format!("placeholder '{name}' has zero layout area"));
        ex.consume_subtree(id);
        return Outcome::consumed();
    }
    let id_str = given.unwrap_or_else(|| ex.next_placeholder_id());
    let (pos, _) = ex.positioned(el);
    ex.doc.placeholders.push(Placeholder {
        id: id_str,
        x: pos.x,
        y: pos.y,
        w: pos.w,
        h: pos.h,
    });
    ex.consume_subtree(id);
    Outcome::consumed()
}

/// Rule 2: image nodes.
pub(crate) fn image(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if el.tag != "img" {
        return None;
    }
    if el.rect.area() <= 0.0 {
        log::debug!("dropping zero-area <img>");
        ex.consume_subtree(id);
        return Outcome::consumed();
    }
    let src = el.attr("src").unwrap_or("").to_string();
    let (position, rotation) = ex.positioned(el);

    let mut style = ImageStyle {
        object_fit: non_empty_or(el.style.get("object-fit"), "fill"),
        object_position: non_empty_or(el.style.get("object-position"), "50% 50%"),
        filter: non_empty_or(el.style.get("filter"), "none"),
        shadow: el.style.box_shadow(),
        rounded: el.style.clips_to_circle(&el.rect),
        radius_px: el.style.corner_radius_px(&el.rect),
        border: el.style.uniform_border().as_ref().map(stroke_of),
    };
    // A clipping ancestor with a radius turns the image circular and may
    // contribute the visible ring.
    for anc in ex.snap().ancestors(id) {
        if let Some(ael) = ex.el(anc) {
            if ael.style.clips_to_circle(&ael.rect) {
                style.rounded = true;
                if style.border.is_none() {
                    style.border = ael.style.uniform_border().as_ref().map(stroke_of);
                }
                break;
            }
        }
    }

    let opacity = el.style.opacity();
    let transparency = if opacity < 1.0 {
        Some(((1.0 - opacity) * 100.0).round())
    } else {
        None
    };

    ex.push_element(
        position,
        ElementKind::Image(ImageElement {
            src,
            style: Some(style),
            transparency,
            rotation_deg: rotation,
        }),
    );
    ex.consume_subtree(id);
    Outcome::consumed()
}

/// Rule 3: inline vector graphics, serialized verbatim for rasterization.
pub(crate) fn vector(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if el.tag != "svg" {
        return None;
    }
    if el.rect.area() <= 0.0 {
        ex.consume_subtree(id);
        return Outcome::consumed();
    }
    let markup = match &el.svg_markup {
        Some(m) => m.clone(),
        None => {
            log::warn!("<svg> without serialized markup in snapshot; dropping");
            ex.consume_subtree(id);
            return Outcome::consumed();
        }
    };
    let (position, _) = ex.positioned(el);
    ex.push_element(
        position,
        ElementKind::Raster(RasterTarget {
            tag: "div".to_string(),
            attrs: Vec::new(),
            css: Vec::new(),
            inner_html: Some(markup),
            shadow: el.style.box_shadow(),
        }),
    );
    ex.consume_subtree(id);
    Outcome::consumed()
}

/// Rule 4: an inline tag used as a flex/grid item holding only text.
pub(crate) fn inline_layout_item(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if !is_inline_tag(&el.tag) {
        return None;
    }
    let parent = ex.snap().parent(id)?;
    let pel = ex.el(parent)?;
    if !matches!(
        pel.style.display(),
        "flex" | "inline-flex" | "grid" | "inline-grid"
    ) {
        return None;
    }
    if el.rect.area() <= 0.0 || !ex.is_inline_text_only(id) {
        return None;
    }
    let out = ex.runs_for(id, false, &[]);
    if out.runs.is_empty() {
        return None;
    }
    let (position, rotation) = ex.positioned(el);
    let mut style = ex.text_style_of(el, out.max_font_px);
    style.rotation_deg = rotation;
    let (h, v) = flex_alignment(&pel.style);
    if style.align.is_none() {
        style.align = h;
    }
    style.valign = v;
    ex.push_element(
        position,
        ElementKind::Text(crate::model::TextElement {
            runs: out.runs,
            style,
        }),
    );
    ex.consume_subtree(id);
    Outcome::consumed()
}

/// Rule 6: block container with a decorative visual.
pub(crate) fn decorated_container(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if !is_container_tag(&el.tag) {
        return None;
    }
    classify_decorated_block(ex, id, el)
}

/// Rule 7: undecorated container whose children are inline text only.
pub(crate) fn text_container(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if !is_container_tag(&el.tag) {
        return None;
    }
    if container_decoration(el).is_some() || !ex.is_inline_text_only(id) {
        return None;
    }
    ex.emit_text(id, false);
    ex.consume_subtree(id);
    Outcome::consumed()
}

/// Rule 9: inline tag styled `display: block`, so text with decorative
/// borders survives even when authored with emphasis tags.
pub(crate) fn block_styled_inline(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if !is_inline_tag(&el.tag) || el.style.display() != "block" {
        return None;
    }
    if container_decoration(el).is_some() {
        return classify_decorated_block(ex, id, el);
    }
    if ex.is_inline_text_only(id) {
        ex.emit_text(id, false);
        ex.consume_subtree(id);
        return Outcome::consumed();
    }
    None
}

/// Rule 10: generic text tags.
pub(crate) fn text_tag(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if !is_text_tag(&el.tag) {
        return None;
    }
    // nested text tags are folded into their outermost ancestor
    let nested = ex
        .snap()
        .ancestors(id)
        .any(|a| ex.el(a).map(|ael| is_text_tag(&ael.tag)).unwrap_or(false));
    if nested {
        return None;
    }
    if el.rect.area() <= 0.0 {
        ex.consume_subtree(id);
        return Outcome::consumed();
    }
    // A bare list item wrapping block containers (styled card lists) is
    // not text; its parts are classified individually instead.
    if el.tag == "li" {
        let holds_blocks = ex.snap().children(id).iter().any(|&c| {
            ex.el(c)
                .map(|cel| {
                    is_container_tag(&cel.tag)
                        || matches!(cel.tag.as_str(), "table" | "ul" | "ol")
                })
                .unwrap_or(false)
        });
        if holds_blocks {
            return None;
        }
    }

    if text_tag_decorated(el) {
        ex.push_error(format!(
            "text tag <{}> carries background/border/shadow styling; move the decoration to a container",
            el.tag
        ));
    }

    let allow_breaks = el.tag == "li";
    let out = ex.runs_for(id, allow_breaks, &[]);

    if let Some(first) = out.runs.first() {
        if el.tag != "li" {
            if let Some(c) = first.text.chars().next() {
                if BULLET_GLYPHS.contains(&c) {
                    let excerpt: String = first.text.chars().take(50).collect();
                    ex.push_error(format!(
                        "literal bullet glyph '{c}' in text '{excerpt}'; use list markup instead"
                    ));
                }
            }
        }
    }

    // Borders on text tags cannot ride on the text box; emit them as
    // discrete segments regardless of uniformity.
    emit_border_lines(ex, &el.rect, &el.style.borders());

    if !out.runs.is_empty() {
        let (position, rotation) = ex.positioned(el);
        let mut style = ex.text_style_of(el, out.max_font_px);
        style.rotation_deg = rotation;
        ex.push_element(
            position,
            ElementKind::Text(crate::model::TextElement {
                runs: out.runs,
                style,
            }),
        );
    }
    ex.consume_subtree(id);
    Outcome::consumed()
}

/// What makes a block container decorated.
pub(crate) struct Decoration {
    pub fill: Option<Fill>,
    pub has_bg_image: bool,
    pub uniform_border: Option<BorderSide>,
    pub has_border: bool,
    pub shadow: Option<ShadowStyle>,
    pub radius_px: f64,
}

/// Decoration predicate for the container path. The text-tag and
/// inline-block paths keep their own checks; the contexts are not
/// guaranteed to agree.
pub(crate) fn container_decoration(el: &ElementData) -> Option<Decoration> {
    let style = &el.style;
    let fill = style.background_color().map(|c| {
        let alpha = c.a * style.opacity();
        Fill {
            color: c.hex(),
            transparency: if alpha < 1.0 {
                Some(((1.0 - alpha) * 100.0).round())
            } else {
                None
            },
        }
    });
    let has_bg_image = style.background_image().is_some();
    let has_border = style.has_any_border();
    let shadow = style.box_shadow().map(|s| ShadowStyle::from_info(&s));
    let radius_px = style.corner_radius_px(&el.rect);
    if fill.is_none() && !has_bg_image && !has_border && shadow.is_none() {
        return None;
    }
    Some(Decoration {
        fill,
        has_bg_image,
        uniform_border: style.uniform_border(),
        has_border,
        shadow,
        radius_px,
    })
}

/// Decoration predicate for generic text tags; kept separate from the
/// container predicate on purpose.
fn text_tag_decorated(el: &ElementData) -> bool {
    el.style.background_color().is_some()
        || el.style.background_image().is_some()
        || el.style.has_any_border()
        || el.style.box_shadow().is_some()
}

/// Shared body of rules 6 and 9 for a decorated block.
fn classify_decorated_block(
    ex: &mut Extractor<'_>,
    id: NodeId,
    el: &ElementData,
) -> Option<Outcome> {
    let deco = container_decoration(el)?;
    if el.rect.area() <= 0.0 {
        ex.consume_subtree(id);
        return Outcome::consumed();
    }
    let (position, rotation) = ex.positioned(el);

    if deco.has_bg_image {
        // Background images cannot share a shape; the whole painted box
        // goes through rasterization and any border becomes segments.
        let mut css = Vec::new();
        for prop in [
            "background-color",
            "background-image",
            "background-size",
            "background-position",
            "background-repeat",
            "border-radius",
            "filter",
        ] {
            let value = el.style.get(prop);
            if !value.is_empty() && value != "none" {
                css.push((prop.to_string(), value.to_string()));
            }
        }
        ex.push_element(
            position,
            ElementKind::Raster(RasterTarget {
                tag: "div".to_string(),
                attrs: Vec::new(),
                css,
                inner_html: None,
                shadow: el.style.box_shadow(),
            }),
        );
        emit_border_lines(ex, &el.rect, &el.style.borders());
    } else {
        let stroke = deco.uniform_border.as_ref().map(stroke_of);
        let shape = ShapeElement {
            fill: deco.fill.clone(),
            line: stroke.clone(),
            corner_radius_pt: if deco.radius_px > 0.0 {
                Some(px_to_pt(deco.radius_px))
            } else {
                None
            },
            shadow: deco.shadow.clone(),
            rotation_deg: rotation,
        };
        let has_shape = shape.fill.is_some()
            || shape.line.is_some()
            || shape.shadow.is_some()
            || shape.corner_radius_pt.is_some();
        if has_shape {
            ex.push_element(position, ElementKind::Shape(shape));
        }
        if deco.has_border && deco.uniform_border.is_none() {
            emit_border_lines(ex, &el.rect, &el.style.borders());
        }
    }

    if ex.is_inline_text_only(id) {
        ex.emit_text(id, false);
        ex.consume_subtree(id);
        Outcome::consumed()
    } else {
        ex.consume(id);
        Outcome::descend()
    }
}

/// Emit one Line per present border side, each segment inset by half its
/// own thickness so the stroke is centered on the geometric edge.
pub(crate) fn emit_border_lines(
    ex: &mut Extractor<'_>,
    rect: &LayoutRect,
    borders: &[Option<BorderSide>; 4],
) {
    for (i, _side) in SIDES.iter().enumerate() {
        if let Some(b) = &borders[i] {
            let half = b.width / 2.0;
            let line = match i {
                // top
                0 => LayoutRect::new(rect.left, rect.top + half, rect.width, 0.0),
                // right
                1 => LayoutRect::new(rect.left + rect.width - half, rect.top, 0.0, rect.height),
                // bottom
                2 => LayoutRect::new(rect.left, rect.top + rect.height - half, rect.width, 0.0),
                // left
                _ => LayoutRect::new(rect.left + half, rect.top, 0.0, rect.height),
            };
            ex.push_element(
                Position::from_rect(&line),
                ElementKind::Line(LineElement {
                    color: b.color.hex(),
                    width_pt: px_to_pt(b.width),
                }),
            );
        }
    }
}

pub(crate) fn stroke_of(b: &BorderSide) -> StrokeStyle {
    StrokeStyle {
        color: b.color.hex(),
        width_pt: px_to_pt(b.width),
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
