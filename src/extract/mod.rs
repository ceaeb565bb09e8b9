//! Extraction & classification engine.
//!
//! One depth-first traversal of the snapshot in document order. Every
//! unvisited element is offered to an ordered rule table; the first rule
//! that matches constructs elements (or a placeholder) and decides whether
//! the walk still descends into the subtree. A consumed set over stable
//! node ids guarantees no subtree is folded into two elements.

pub(crate) mod lists;
pub(crate) mod rules;
pub(crate) mod runs;
pub(crate) mod tables;

use std::collections::HashSet;

use crate::dom::{DomSnapshot, ElementData, NodeId};
use crate::model::{
    Background, Element, ElementKind, HAlign, Position, RasterTarget, ShadowStyle, SlideDocument,
    TextElement, TextStyle, VAlign,
};
use crate::units::{pre_rotation_box, px_to_pt};

use runs::RunOutput;

/// What a matched rule tells the traversal to do next.
pub(crate) struct Outcome {
    /// Walk into the children (the rule classified only the node itself)
    pub descend: bool,
}

impl Outcome {
    pub fn consumed() -> Option<Outcome> {
        Some(Outcome { descend: false })
    }

    pub fn descend() -> Option<Outcome> {
        Some(Outcome { descend: true })
    }
}

pub(crate) type Rule = for<'a, 'b> fn(&'a mut Extractor<'b>, NodeId) -> Option<Outcome>;

/// Classification rules in strict priority order; first match wins.
pub(crate) const RULES: &[(&str, Rule)] = &[
    ("placeholder", rules::placeholder),
    ("image", rules::image),
    ("vector", rules::vector),
    ("inline-flex-item", rules::inline_layout_item),
    ("table", tables::table),
    ("decorated-container", rules::decorated_container),
    ("text-container", rules::text_container),
    ("list", lists::list),
    ("block-styled-inline", rules::block_styled_inline),
    ("text-tag", rules::text_tag),
];

/// Run the engine over a snapshot, filling the document's elements,
/// placeholders, background, and findings.
pub fn extract(snap: &DomSnapshot, doc: &mut SlideDocument) {
    let mut ex = Extractor {
        snap,
        doc,
        consumed: HashSet::new(),
        placeholder_seq: 0,
    };
    ex.background();
    let root = snap.root();
    for &child in snap.children(root) {
        ex.walk(child);
    }
}

pub(crate) struct Extractor<'b> {
    snap: &'b DomSnapshot,
    pub(crate) doc: &'b mut SlideDocument,
    consumed: HashSet<NodeId>,
    placeholder_seq: usize,
}

impl<'b> Extractor<'b> {
    pub(crate) fn snap(&self) -> &'b DomSnapshot {
        self.snap
    }

    pub(crate) fn el(&self, id: NodeId) -> Option<&'b ElementData> {
        self.snap.as_element(id)
    }

    fn walk(&mut self, id: NodeId) {
        if self.consumed.contains(&id) {
            return;
        }
        let el = match self.el(id) {
            Some(el) => el,
            None => return, // bare text is folded in by its parent's rules
        };
        if el.style.is_hidden() {
            self.consume_subtree(id);
            return;
        }

        let mut outcome = None;
        for (name, rule) in RULES {
            if let Some(o) = rule(self, id) {
                log::debug!("rule '{}' classified <{}>", name, el.tag);
                outcome = Some(o);
                break;
            }
        }

        let descend = outcome.map(|o| o.descend).unwrap_or(true);
        if descend {
            if rules::is_container_tag(&el.tag) {
                self.check_bare_text(id);
            }
            let children: Vec<NodeId> = self.snap.children(id).to_vec();
            for child in children {
                self.walk(child);
            }
        }
    }

    /// A container we descend into loses its direct text nodes; flag them.
    fn check_bare_text(&mut self, id: NodeId) {
        let snap = self.snap;
        for &child in snap.children(id) {
            if let Some(t) = snap.as_text(child) {
                if !t.trim().is_empty() {
                    let tag = snap.tag(id);
                    let excerpt: String = t.trim().chars().take(50).collect();
                    self.doc.errors.push(format!(
                        "<{tag}> container holds bare text '{excerpt}' next to block children; wrap it in a text tag"
                    ));
                }
            }
        }
    }

    pub(crate) fn consume(&mut self, id: NodeId) {
        self.consumed.insert(id);
    }

    pub(crate) fn consume_subtree(&mut self, id: NodeId) {
        self.consumed.insert(id);
        for n in self.snap.descendants(id) {
            self.consumed.insert(n);
        }
    }

    pub(crate) fn push_error(&mut self, message: String) {
        self.doc.errors.push(message);
    }

    pub(crate) fn push_element(&mut self, position: Position, kind: ElementKind) {
        self.doc.elements.push(Element { position, kind });
    }

    pub(crate) fn next_placeholder_id(&mut self) -> String {
        self.placeholder_seq += 1;
        format!("placeholder-{}", self.placeholder_seq)
    }

    /// Rotation-aware geometry: the measured box un-rotated back to the
    /// pre-rotation box the deck expects, plus the angle when non-zero.
    pub(crate) fn positioned(&self, el: &ElementData) -> (Position, Option<f64>) {
        let deg = el.style.rotation_deg();
        let rect = pre_rotation_box(&el.rect, deg);
        let rotation = if deg.abs() < 0.01 { None } else { Some(deg) };
        (Position::from_rect(&rect), rotation)
    }

    /// Whether every child is a text node or an inline element, with at
    /// least some non-whitespace text in the subtree.
    pub(crate) fn is_inline_text_only(&self, id: NodeId) -> bool {
        let snap = self.snap;
        let mut has_text = false;
        for &child in snap.children(id) {
            match snap.as_element(child) {
                None => {
                    if !snap.as_text(child).unwrap_or("").trim().is_empty() {
                        has_text = true;
                    }
                }
                Some(cel) => {
                    if cel.style.is_hidden() {
                        continue;
                    }
                    let display = cel.style.display();
                    let inline = display.starts_with("inline")
                        || (display.is_empty() && runs::is_inline_tag(&cel.tag));
                    if !inline {
                        return false;
                    }
                    if !self.is_inline_text_only(child)
                        && !snap.text_content(child).trim().is_empty()
                    {
                        // inline wrapper around block content
                        return false;
                    }
                    if !snap.text_content(child).trim().is_empty() || cel.tag == "br" {
                        has_text = true;
                    }
                }
            }
        }
        has_text
    }

    /// Format `id`'s inline content into runs against its own base style.
    pub(crate) fn runs_for(
        &mut self,
        id: NodeId,
        allow_block_breaks: bool,
        skip_tags: &[&str],
    ) -> RunOutput {
        let snap = self.snap;
        runs::format_runs(snap, id, allow_block_breaks, skip_tags, &mut self.doc.errors)
    }

    /// Base text style of an element, with line spacing rescaled against
    /// the largest run font so the visual line height stays consistent.
    pub(crate) fn text_style_of(&self, el: &ElementData, max_run_font_px: f64) -> TextStyle {
        let style = &el.style;
        let base_px = style.font_size_px();
        let denom = base_px.max(max_run_font_px);
        let line_spacing = if denom > 0.0 {
            Some(style.line_height_px() / denom)
        } else {
            None
        };

        let margin = [
            style.px("padding-left"),
            style.px("padding-top"),
            style.px("padding-right"),
            style.px("padding-bottom"),
        ];
        let margin_pt = if margin.iter().any(|&m| m > 0.0) {
            Some(margin.map(px_to_pt))
        } else {
            None
        };

        let letter = style.get("letter-spacing");
        let letter_spacing_pt = if letter.is_empty() || letter == "normal" {
            None
        } else {
            Some(px_to_pt(style.px("letter-spacing")))
        };

        let opacity = style.opacity();
        let transparency = if opacity < 1.0 {
            Some(((1.0 - opacity) * 100.0).round())
        } else {
            None
        };

        TextStyle {
            font_face: style.font_face(),
            font_size_pt: Some(px_to_pt(base_px)),
            color: style.color("color").map(|c| c.hex()),
            bold: style.is_bold(),
            italic: style.is_italic(),
            underline: style.is_underlined(),
            align: h_align(style.get("text-align")),
            valign: None,
            line_spacing,
            margin_pt,
            letter_spacing_pt,
            rotation_deg: None,
            transparency,
            shadow: style.text_shadow().map(|s| ShadowStyle::from_info(&s)),
        }
    }

    /// Build a text element for `id` and push it; shared by several rules.
    pub(crate) fn emit_text(&mut self, id: NodeId, allow_block_breaks: bool) -> bool {
        let el = match self.el(id) {
            Some(el) => el,
            None => return false,
        };
        if el.rect.area() <= 0.0 {
            log::debug!("dropping zero-area <{}>", el.tag);
            return false;
        }
        let out = self.runs_for(id, allow_block_breaks, &[]);
        if out.runs.is_empty() {
            return false;
        }
        let (position, rotation) = self.positioned(el);
        let mut style = self.text_style_of(el, out.max_font_px);
        style.rotation_deg = rotation;
        // a flex/grid box holding bare text centers it through the layout,
        // not through text-align
        if matches!(
            el.style.display(),
            "flex" | "inline-flex" | "grid" | "inline-grid"
        ) {
            let (h, v) = flex_alignment(&el.style);
            if style.align.is_none() {
                style.align = h;
            }
            if style.valign.is_none() {
                style.valign = v;
            }
        }
        self.push_element(
            position,
            ElementKind::Text(TextElement {
                runs: out.runs,
                style,
            }),
        );
        true
    }

    /// Extract the slide background from the body element.
    fn background(&mut self) {
        let body = match self.el(self.snap.root()) {
            Some(el) => el,
            None => return,
        };
        let style = &body.style;
        if style.background_image().is_some() {
            let mut css = Vec::new();
            for prop in [
                "background-color",
                "background-image",
                "background-size",
                "background-position",
                "background-repeat",
            ] {
                let value = style.get(prop);
                if !value.is_empty() {
                    css.push((prop.to_string(), value.to_string()));
                }
            }
            self.doc.background = Some(Background::Raster(RasterTarget {
                tag: "div".to_string(),
                attrs: Vec::new(),
                css,
                inner_html: None,
                shadow: None,
            }));
        } else if let Some(color) = style.background_color() {
            self.doc.background = Some(Background::Color(color.hex()));
        }
    }
}

pub(crate) fn h_align(text_align: &str) -> Option<HAlign> {
    match text_align {
        "center" => Some(HAlign::Center),
        "right" | "end" => Some(HAlign::Right),
        "justify" => Some(HAlign::Justify),
        "left" | "start" => Some(HAlign::Left),
        _ => None,
    }
}

/// Map flex centering of a layout container onto text alignment.
pub(crate) fn flex_alignment(style: &crate::dom::ComputedStyle) -> (Option<HAlign>, Option<VAlign>) {
    let column = style.get("flex-direction").starts_with("column");
    let main = match style.get("justify-content") {
        "center" => Some(Centering::Middle),
        "flex-end" | "end" => Some(Centering::End),
        _ => None,
    };
    let cross = match style.get("align-items") {
        "center" => Some(Centering::Middle),
        "flex-end" | "end" => Some(Centering::End),
        _ => None,
    };
    let (h, v) = if column { (cross, main) } else { (main, cross) };
    (
        h.map(|c| match c {
            Centering::Middle => HAlign::Center,
            Centering::End => HAlign::Right,
        }),
        v.map(|c| match c {
            Centering::Middle => VAlign::Middle,
            Centering::End => VAlign::Bottom,
        }),
    )
}

enum Centering {
    Middle,
    End,
}
