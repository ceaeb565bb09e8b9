//! The positioned element model one slide converts into.
//!
//! A `SlideDocument` is created once per conversion, mutated in place by
//! the extraction and rasterization stages, and consumed by the assembler.
//! Paint order is vector order: earlier elements are drawn first, so a
//! container's shape precedes the text laid over it.

use crate::dom::{LayoutRect, ShadowInfo};
use crate::units::{px_to_in, px_to_pt};

/// Absolute element geometry in inches.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Position {
    pub fn from_rect(rect: &LayoutRect) -> Self {
        Self {
            x: px_to_in(rect.left),
            y: px_to_in(rect.top),
            w: px_to_in(rect.width),
            h: px_to_in(rect.height),
        }
    }
}

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
    Justify,
}

/// Vertical anchor inside the element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Middle,
    Bottom,
}

/// Outer drop shadow in the deck API's terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowStyle {
    pub color: String,
    /// 0..=1, derived from the shadow color's alpha
    pub opacity: f64,
    pub blur_pt: f64,
    pub offset_pt: f64,
    /// Direction of the offset, degrees clockwise from +x
    pub angle_deg: f64,
}

impl ShadowStyle {
    pub fn from_info(info: &ShadowInfo) -> Self {
        let offset_px = (info.dx * info.dx + info.dy * info.dy).sqrt();
        Self {
            color: info.color.hex(),
            opacity: info.color.a.clamp(0.0, 1.0),
            blur_pt: px_to_pt(info.blur),
            offset_pt: px_to_pt(offset_px),
            angle_deg: crate::units::normalize_deg(info.dy.atan2(info.dx).to_degrees()),
        }
    }
}

/// A stroke: line elements, shape outlines, cell borders.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: String,
    pub width_pt: f64,
}

/// Solid fill with optional transparency percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub color: String,
    pub transparency: Option<f64>,
}

/// Style overrides one run applies on top of its element's base style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub superscript: bool,
    pub subscript: bool,
    pub color: Option<String>,
    pub font_size_pt: Option<f64>,
    pub font_face: Option<String>,
}

impl RunStyle {
    pub fn is_plain(&self) -> bool {
        *self == RunStyle::default()
    }
}

/// A contiguous span of text sharing one resolved style.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineRun {
    pub text: String,
    pub style: RunStyle,
    /// Hard line break after this run
    pub break_after: bool,
}

impl InlineRun {
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            style: RunStyle::default(),
            break_after: false,
        }
    }
}

/// Base style of a text-bearing element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextStyle {
    pub font_face: Option<String>,
    pub font_size_pt: Option<f64>,
    pub color: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: Option<HAlign>,
    pub valign: Option<VAlign>,
    /// Line spacing as a multiple of the largest font on the line
    pub line_spacing: Option<f64>,
    /// Inset from padding, points, in left/top/right/bottom order
    pub margin_pt: Option<[f64; 4]>,
    pub letter_spacing_pt: Option<f64>,
    pub rotation_deg: Option<f64>,
    /// 0..100, derived from CSS opacity
    pub transparency: Option<f64>,
    pub shadow: Option<ShadowStyle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub runs: Vec<InlineRun>,
    pub style: TextStyle,
}

impl TextElement {
    /// Concatenated text, used by validation messages.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeElement {
    pub fill: Option<Fill>,
    pub line: Option<StrokeStyle>,
    pub corner_radius_pt: Option<f64>,
    pub shadow: Option<ShadowStyle>,
    pub rotation_deg: Option<f64>,
}

/// Visual treatment an image carries beyond its bitmap. Any of these
/// present means the image cannot be placed natively and must go through
/// the rasterization fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStyle {
    pub object_fit: String,
    pub object_position: String,
    pub filter: String,
    pub shadow: Option<ShadowInfo>,
    /// Clipped to a circle/pill by radius + hidden overflow
    pub rounded: bool,
    pub radius_px: f64,
    pub border: Option<StrokeStyle>,
}

impl ImageStyle {
    pub fn needs_raster(&self) -> bool {
        self.object_fit != "fill"
            || !matches!(self.object_position.as_str(), "" | "50% 50%")
            || !matches!(self.filter.as_str(), "" | "none")
            || self.shadow.is_some()
            || self.rounded
            || self.radius_px > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageElement {
    /// Source as authored, or the capture path after rasterization
    pub src: String,
    pub style: Option<ImageStyle>,
    pub transparency: Option<f64>,
    pub rotation_deg: Option<f64>,
}

impl ImageElement {
    pub fn needs_raster(&self) -> bool {
        self.style.as_ref().map(ImageStyle::needs_raster).unwrap_or(false)
    }
}

/// A straight border segment. The position encodes the segment: a zero
/// height is a horizontal line, a zero width a vertical one.
#[derive(Debug, Clone, PartialEq)]
pub struct LineElement {
    pub color: String,
    pub width_pt: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStyle {
    pub fill: Option<String>,
    pub color: Option<String>,
    pub font_face: Option<String>,
    pub font_size_pt: Option<f64>,
    pub bold: bool,
    pub align: Option<HAlign>,
    pub valign: Option<VAlign>,
    /// Per-side borders in top/right/bottom/left order
    pub borders: [Option<StrokeStyle>; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub runs: Vec<InlineRun>,
    pub style: CellStyle,
    pub col_span: u32,
    pub row_span: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableElement {
    pub rows: Vec<Vec<TableCell>>,
    /// Normalized column widths summing exactly to the element width
    pub col_widths_in: Vec<f64>,
    /// Normalized row heights summing exactly to the element height
    pub row_heights_in: Vec<f64>,
}

/// Bullet glyph defaults cycle through these by `level mod 3` when no
/// explicit marker is present.
pub const DEFAULT_BULLETS: [char; 3] = ['\u{2022}', '\u{25E6}', '\u{25AA}'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bullet {
    /// Explicit marker detected in the markup; overrides level defaults
    Glyph(char),
    /// Level-default glyph (`DEFAULT_BULLETS[level % 3]`)
    Default,
    /// Ordered-list numbering
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub runs: Vec<InlineRun>,
    pub level: u32,
    pub bullet: Bullet,
}

impl ListItem {
    /// The glyph this item renders with, `None` for numbered items.
    pub fn glyph(&self) -> Option<char> {
        match self.bullet {
            Bullet::Glyph(c) => Some(c),
            Bullet::Default => Some(DEFAULT_BULLETS[self.level as usize % 3]),
            Bullet::Number => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListElement {
    pub items: Vec<ListItem>,
    pub style: TextStyle,
}

/// An element whose visual has no native deck representation and is
/// pending rasterization: the fields describe the proxy node the fallback
/// stage rebuilds in the cleared document before capturing it.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterTarget {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub css: Vec<(String, String)>,
    /// Verbatim inner markup (inline SVG)
    pub inner_html: Option<String>,
    pub shadow: Option<ShadowInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Text(TextElement),
    Shape(ShapeElement),
    Image(ImageElement),
    Line(LineElement),
    Table(TableElement),
    List(ListElement),
    Raster(RasterTarget),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub position: Position,
    pub kind: ElementKind,
}

/// Slide background: a solid color, a captured/authored image, or a CSS
/// background pending rasterization.
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Color(String),
    Image(String),
    Raster(RasterTarget),
}

/// A caller-designated region whose content is supplied later (charts,
/// live data). Output-only; never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// The conversion's working state: built by extraction, resolved by the
/// rasterization fallback, consumed by the assembler.
#[derive(Debug, Clone, Default)]
pub struct SlideDocument {
    pub background: Option<Background>,
    pub elements: Vec<Element>,
    pub placeholders: Vec<Placeholder>,
    pub errors: Vec<String>,
}

impl SlideDocument {
    /// True once no element is left pending rasterization; the assembler
    /// refuses documents where this does not hold.
    pub fn is_resolved(&self) -> bool {
        !matches!(self.background, Some(Background::Raster(_)))
            && self.elements.iter().all(|e| {
                !matches!(e.kind, ElementKind::Raster(_))
                    && match &e.kind {
                        ElementKind::Image(img) => !img.needs_raster(),
                        _ => true,
                    }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Color;

    #[test]
    fn shadow_style_derives_offset_and_angle() {
        let info = ShadowInfo {
            dx: 3.0,
            dy: 4.0,
            blur: 8.0,
            spread: 0.0,
            color: Color {
                r: 0,
                g: 0,
                b: 0,
                a: 0.5,
            },
        };
        let s = ShadowStyle::from_info(&info);
        assert!((s.offset_pt - 5.0 * 0.75).abs() < 1e-9);
        assert_eq!(s.blur_pt, 6.0);
        assert_eq!(s.opacity, 0.5);
        assert!((s.angle_deg - 53.13).abs() < 0.01);
    }

    #[test]
    fn default_bullets_cycle_by_level() {
        let item = |level| ListItem {
            runs: vec![InlineRun::plain("x")],
            level,
            bullet: Bullet::Default,
        };
        assert_eq!(item(0).glyph(), Some('\u{2022}'));
        assert_eq!(item(1).glyph(), Some('\u{25E6}'));
        assert_eq!(item(2).glyph(), Some('\u{25AA}'));
        assert_eq!(item(3).glyph(), Some('\u{2022}'));
    }

    #[test]
    fn unresolved_raster_blocks_assembly() {
        let mut doc = SlideDocument::default();
        assert!(doc.is_resolved());
        doc.elements.push(Element {
            position: Position::default(),
            kind: ElementKind::Raster(RasterTarget {
                tag: "div".to_string(),
                attrs: Vec::new(),
                css: Vec::new(),
                inner_html: None,
                shadow: None,
            }),
        });
        assert!(!doc.is_resolved());
    }
}
