//! DOM snapshot arena and computed-style parsing.
//!
//! The rendering surface resolves cascade and layout, then hands the core a
//! flat snapshot: one entry per node with its tag, attributes, a subset of
//! computed style properties, and the final layout rect. Nodes are addressed
//! by stable arena indices (`NodeId`) so the extraction pass can keep a
//! consumed set without relying on node identity in a live tree.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Stable identity of a node inside one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// A node's resolved on-canvas bounding box, in CSS pixels.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct LayoutRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// An sRGB color with alpha, parsed from a computed style value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 1.0,
    };

    /// Parse a computed color value. Computed styles normalize to
    /// `rgb(...)`/`rgba(...)`; `#rrggbb` is accepted for authored values
    /// that reach us unresolved. Fully transparent values parse to `None`.
    pub fn parse(value: &str) -> Option<Color> {
        let v = value.trim();
        if v.is_empty() || v == "none" || v == "transparent" {
            return None;
        }
        if let Some(hex) = v.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        if v.starts_with("rgb") {
            let open = v.find('(')?;
            let close = v.rfind(')')?;
            let inner = &v[open + 1..close];
            let nums: Vec<f64> = inner
                .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .filter_map(|s| s.trim_end_matches('%').parse::<f64>().ok())
                .collect();
            if nums.len() < 3 {
                return None;
            }
            let a = nums.get(3).copied().unwrap_or(1.0);
            if a <= 0.0 {
                return None;
            }
            return Some(Color {
                r: nums[0].round() as u8,
                g: nums[1].round() as u8,
                b: nums[2].round() as u8,
                a,
            });
        }
        None
    }

    fn parse_hex(hex: &str) -> Option<Color> {
        let hex = hex.trim();
        let expand = |c: u8| (c << 4) | c;
        match hex.len() {
            3 => {
                let v = u32::from_str_radix(hex, 16).ok()?;
                Some(Color {
                    r: expand(((v >> 8) & 0xF) as u8),
                    g: expand(((v >> 4) & 0xF) as u8),
                    b: expand((v & 0xF) as u8),
                    a: 1.0,
                })
            }
            6 => {
                let v = u32::from_str_radix(hex, 16).ok()?;
                Some(Color {
                    r: ((v >> 16) & 0xFF) as u8,
                    g: ((v >> 8) & 0xFF) as u8,
                    b: (v & 0xFF) as u8,
                    a: 1.0,
                })
            }
            _ => None,
        }
    }

    /// Uppercase `RRGGBB` without the leading hash, the form the
    /// slide-building API consumes.
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// One side of a CSS border, resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderSide {
    pub width: f64,
    pub style: String,
    pub color: Color,
}

/// A parsed `box-shadow`/`text-shadow` value (first shadow only), in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowInfo {
    pub dx: f64,
    pub dy: f64,
    pub blur: f64,
    pub spread: f64,
    pub color: Color,
}

/// Resolved computed-style subset for one element.
///
/// Values are exactly what the surface reported; the typed accessors do
/// the unit and token parsing the extraction rules need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    props: HashMap<String, String>,
}

pub const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

impl ComputedStyle {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            props: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn from_map(props: HashMap<String, String>) -> Self {
        Self { props }
    }

    /// Raw property value; empty string when the snapshot did not carry it.
    pub fn get(&self, name: &str) -> &str {
        self.props.get(name).map(String::as_str).unwrap_or("")
    }

    /// Parse a pixel length (`"12px"` or bare number); 0 when absent or
    /// non-numeric (`"auto"`, `"normal"`).
    pub fn px(&self, name: &str) -> f64 {
        parse_px(self.get(name))
    }

    pub fn display(&self) -> &str {
        self.get("display")
    }

    pub fn is_hidden(&self) -> bool {
        self.display() == "none" || self.get("visibility") == "hidden"
    }

    pub fn opacity(&self) -> f64 {
        let raw = self.get("opacity");
        if raw.is_empty() {
            1.0
        } else {
            raw.parse().unwrap_or(1.0)
        }
    }

    pub fn color(&self, name: &str) -> Option<Color> {
        Color::parse(self.get(name))
    }

    pub fn font_size_px(&self) -> f64 {
        let v = self.px("font-size");
        if v > 0.0 {
            v
        } else {
            16.0
        }
    }

    /// First family of `font-family`, quotes stripped.
    pub fn font_face(&self) -> Option<String> {
        let fam = self.get("font-family");
        let first = fam.split(',').next()?.trim().trim_matches(&['"', '\''][..]);
        if first.is_empty() {
            None
        } else {
            Some(first.to_string())
        }
    }

    pub fn is_bold(&self) -> bool {
        let w = self.get("font-weight");
        match w {
            "bold" | "bolder" => true,
            _ => w.parse::<f64>().map(|n| n >= 600.0).unwrap_or(false),
        }
    }

    pub fn is_italic(&self) -> bool {
        matches!(self.get("font-style"), "italic" | "oblique")
    }

    pub fn is_underlined(&self) -> bool {
        self.get("text-decoration-line").contains("underline")
            || self.get("text-decoration").contains("underline")
    }

    /// Resolved line height in pixels; `normal` falls back to 1.2x the
    /// font size, matching how browsers lay the line out.
    pub fn line_height_px(&self) -> f64 {
        let raw = self.get("line-height");
        let px = parse_px(raw);
        if px > 0.0 {
            px
        } else {
            self.font_size_px() * 1.2
        }
    }

    pub fn background_color(&self) -> Option<Color> {
        self.color("background-color")
    }

    pub fn background_image(&self) -> Option<&str> {
        let v = self.get("background-image");
        if v.is_empty() || v == "none" {
            None
        } else {
            Some(v)
        }
    }

    pub fn border_side(&self, side: &str) -> Option<BorderSide> {
        let width = self.px(&format!("border-{side}-width"));
        let style = self.get(&format!("border-{side}-style"));
        if width <= 0.0 || style.is_empty() || style == "none" || style == "hidden" {
            return None;
        }
        let color = self
            .color(&format!("border-{side}-color"))
            .unwrap_or(Color::BLACK);
        Some(BorderSide {
            width,
            style: style.to_string(),
            color,
        })
    }

    /// All four sides in top/right/bottom/left order.
    pub fn borders(&self) -> [Option<BorderSide>; 4] {
        SIDES.map(|side| self.border_side(side))
    }

    /// The border when all four sides are present and identical.
    pub fn uniform_border(&self) -> Option<BorderSide> {
        let [top, right, bottom, left] = self.borders();
        let top = top?;
        if [&right?, &bottom?, &left?].iter().all(|s| **s == top) {
            Some(top)
        } else {
            None
        }
    }

    pub fn has_any_border(&self) -> bool {
        self.borders().iter().any(Option::is_some)
    }

    /// Corner radius in pixels, resolving `%` against the given box.
    pub fn corner_radius_px(&self, rect: &LayoutRect) -> f64 {
        let raw = {
            let shorthand = self.get("border-radius");
            if shorthand.is_empty() {
                self.get("border-top-left-radius")
            } else {
                shorthand
            }
        };
        // shorthand may carry two values per axis; first is enough
        let first = raw.split_whitespace().next().unwrap_or("");
        if let Some(pct) = first.strip_suffix('%') {
            let pct: f64 = pct.parse().unwrap_or(0.0);
            rect.width.min(rect.height) * pct / 100.0
        } else {
            parse_px(first)
        }
    }

    /// Whether radius plus clipped overflow turn this box into a circle/pill.
    pub fn clips_to_circle(&self, rect: &LayoutRect) -> bool {
        let clipped = matches!(self.get("overflow"), "hidden" | "clip");
        clipped && self.corner_radius_px(rect) >= rect.width.min(rect.height) / 2.0 - 0.5
    }

    pub fn box_shadow(&self) -> Option<ShadowInfo> {
        parse_shadow(self.get("box-shadow"))
    }

    pub fn text_shadow(&self) -> Option<ShadowInfo> {
        parse_shadow(self.get("text-shadow"))
    }

    /// Rotation from the writing mode composed with the transform matrix,
    /// normalized to `[0, 360)`.
    pub fn rotation_deg(&self) -> f64 {
        let mut deg = match self.get("writing-mode") {
            "vertical-rl" | "sideways-rl" => 90.0,
            "vertical-lr" | "sideways-lr" => 270.0,
            _ => 0.0,
        };
        let transform = self.get("transform");
        if let Some(inner) = transform
            .strip_prefix("matrix(")
            .and_then(|s| s.strip_suffix(')'))
        {
            let nums: Vec<f64> = inner
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if nums.len() >= 2 {
                deg += nums[1].atan2(nums[0]).to_degrees();
            }
        }
        crate::units::normalize_deg(deg)
    }
}

fn parse_px(value: &str) -> f64 {
    let v = value.trim();
    let v = v.strip_suffix("px").unwrap_or(v);
    v.trim().parse().unwrap_or(0.0)
}

/// Parse the first shadow of a computed shadow list. Computed values put
/// the color first (`rgba(0, 0, 0, 0.5) 4px 0px 10px 2px`); authored
/// values may put it last. `inset` is ignored.
pub fn parse_shadow(value: &str) -> Option<ShadowInfo> {
    let v = value.trim();
    if v.is_empty() || v == "none" {
        return None;
    }
    let first = split_top_level_commas(v).into_iter().next()?;

    let mut color = None;
    let mut rest = String::new();
    let mut chars = first.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if color.is_none() && first[i..].starts_with("rgb") {
            if let Some(close) = first[i..].find(')') {
                color = Color::parse(&first[i..i + close + 1]);
                // skip past the color token
                while let Some(&(j, _)) = chars.peek() {
                    if j <= i + close {
                        chars.next();
                    } else {
                        break;
                    }
                }
                continue;
            }
        }
        rest.push(c);
    }

    let mut lengths = Vec::new();
    for token in rest.split_whitespace() {
        if token == "inset" {
            continue;
        }
        if let Some(c) = Color::parse(token) {
            color.get_or_insert(c);
            continue;
        }
        lengths.push(parse_px(token));
    }
    if lengths.len() < 2 {
        return None;
    }
    Some(ShadowInfo {
        dx: lengths[0],
        dy: lengths[1],
        blur: lengths.get(2).copied().unwrap_or(0.0),
        spread: lengths.get(3).copied().unwrap_or(0.0),
        color: color.unwrap_or(Color::BLACK),
    })
}

fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

/// Element payload of a snapshot node.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub style: ComputedStyle,
    pub rect: LayoutRect,
    /// Verbatim markup, carried only for vector (`svg`) nodes
    pub svg_markup: Option<String>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|p| p == class))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

/// Flat, index-addressed snapshot of one rendered document, rooted at
/// `body`. Node 0 is always the body element.
#[derive(Debug, Clone)]
pub struct DomSnapshot {
    nodes: Vec<Node>,
}

impl DomSnapshot {
    /// Build a snapshot containing only the body element; used by tests
    /// and fake surfaces to assemble documents programmatically.
    pub fn with_body(style: &[(&str, &str)], rect: LayoutRect) -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Element(ElementData {
                    tag: "body".to_string(),
                    attrs: Vec::new(),
                    style: ComputedStyle::from_pairs(style),
                    rect,
                    svg_markup: None,
                }),
            }],
        }
    }

    pub fn add_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
        style: &[(&str, &str)],
        rect: LayoutRect,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data: NodeData::Element(ElementData {
                tag: tag.to_string(),
                attrs: attrs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                style: ComputedStyle::from_pairs(style),
                rect,
                svg_markup: None,
            }),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data: NodeData::Text(text.to_string()),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn set_svg_markup(&mut self, id: NodeId, markup: &str) {
        if let NodeData::Element(el) = &mut self.nodes[id.0].data {
            el.svg_markup = Some(markup.to_string());
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => Some(t),
            NodeData::Element(_) => None,
        }
    }

    /// Tag name; empty for text nodes.
    pub fn tag(&self, id: NodeId) -> &str {
        self.as_element(id).map(|e| e.tag.as_str()).unwrap_or("")
    }

    /// Ancestor chain from the immediate parent up to the body.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// All descendants of `id` in document order, not including `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev());
        }
        out
    }

    /// Concatenated text content of the subtree, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(t) = self.as_text(id) {
            out.push_str(t);
        }
        for n in self.descendants(id) {
            if let Some(t) = self.as_text(n) {
                out.push_str(t);
            }
        }
        out
    }

    /// Decode the JSON produced by the in-page collection script.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(json)
            .map_err(|e| Error::Snapshot(format!("snapshot decode failed: {e}")))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSnapshot) -> Result<Self> {
        let mut nodes: Vec<Node> = Vec::with_capacity(raw.nodes.len());
        for (idx, rn) in raw.nodes.into_iter().enumerate() {
            if let Some(p) = rn.parent {
                if p >= idx {
                    return Err(Error::Snapshot(format!(
                        "node {idx} references parent {p} out of order"
                    )));
                }
            } else if idx != 0 {
                return Err(Error::Snapshot(format!("node {idx} has no parent")));
            }
            let data = match rn.tag {
                Some(tag) => NodeData::Element(ElementData {
                    tag: tag.to_lowercase(),
                    attrs: rn.attrs.into_iter().collect(),
                    style: ComputedStyle::from_map(rn.style),
                    rect: rn.rect.unwrap_or_default(),
                    svg_markup: rn.svg,
                }),
                None => NodeData::Text(rn.text.unwrap_or_default()),
            };
            if let Some(p) = rn.parent {
                nodes[p].children.push(NodeId(idx));
            }
            nodes.push(Node {
                parent: rn.parent.map(NodeId),
                children: Vec::new(),
                data,
            });
        }
        if nodes.is_empty() {
            return Err(Error::Snapshot("empty snapshot".to_string()));
        }
        if !matches!(nodes[0].data, NodeData::Element(_)) {
            return Err(Error::Snapshot("root node is not an element".to_string()));
        }
        Ok(Self { nodes })
    }
}

#[derive(Deserialize)]
struct RawSnapshot {
    nodes: Vec<RawNode>,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    parent: Option<usize>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    attrs: HashMap<String, String>,
    #[serde(default)]
    style: HashMap<String, String>,
    #[serde(default)]
    rect: Option<LayoutRect>,
    #[serde(default)]
    svg: Option<String>,
}
