//! Validation aggregation.
//!
//! Findings from every stage accumulate on the document; nothing halts
//! extraction early. Before rasterization and assembly the aggregate is
//! turned into one failure that numbers the individual findings.

use std::path::Path;

use crate::error::Error;
use crate::model::{ElementKind, SlideDocument};

/// Text smaller than this is exempt from the bottom-margin guard.
pub const MIN_GUARDED_FONT_PT: f64 = 8.0;

/// Minimum distance between guarded text and the canvas bottom edge.
pub const MIN_BOTTOM_MARGIN_IN: f64 = 0.5;

/// Flag text-class elements that sit too close to the bottom edge; text
/// there clips or drifts off-slide across deck renderers.
pub fn check_bottom_margin(doc: &mut SlideDocument, canvas_height_in: f64) {
    let limit = canvas_height_in - MIN_BOTTOM_MARGIN_IN;
    let mut findings = Vec::new();
    for element in &doc.elements {
        let (font_pt, text) = match &element.kind {
            ElementKind::Text(t) => (t.style.font_size_pt.unwrap_or(0.0), t.plain_text()),
            ElementKind::List(l) => (
                l.style.font_size_pt.unwrap_or(0.0),
                l.items
                    .first()
                    .map(|i| i.runs.iter().map(|r| r.text.as_str()).collect())
                    .unwrap_or_default(),
            ),
            _ => continue,
        };
        if font_pt <= MIN_GUARDED_FONT_PT {
            continue;
        }
        let bottom = element.position.y + element.position.h;
        if bottom > limit {
            let excerpt: String = text.chars().take(50).collect();
            findings.push(format!(
                "text '{excerpt}' ends {:.2}in from the bottom edge; keep at least {MIN_BOTTOM_MARGIN_IN}in clear",
                (canvas_height_in - bottom).max(0.0)
            ));
        }
    }
    doc.errors.extend(findings);
}

/// Resolve local image sources against the document directory and flag
/// files that do not exist. Remote and data URIs are not checked.
pub fn check_image_paths(doc: &mut SlideDocument, base_dir: Option<&Path>) {
    let mut findings = Vec::new();
    for element in &mut doc.elements {
        if let ElementKind::Image(img) = &mut element.kind {
            if img.src.is_empty()
                || img.src.starts_with("http://")
                || img.src.starts_with("https://")
                || img.src.starts_with("data:")
            {
                continue;
            }
            let raw = img.src.strip_prefix("file://").unwrap_or(&img.src);
            let mut path = std::path::PathBuf::from(raw);
            if path.is_relative() {
                if let Some(base) = base_dir {
                    path = base.join(path);
                }
            }
            if path.exists() {
                img.src = path.display().to_string();
            } else {
                findings.push(format!("image file not found: {}", path.display()));
            }
        }
    }
    doc.errors.extend(findings);
}

/// One aggregated failure from the accumulated findings; numbered
/// (1-based) when more than one applies.
pub fn aggregate(errors: &[String]) -> Error {
    let message = if errors.len() == 1 {
        errors[0].clone()
    } else {
        errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}. {}", i + 1, e))
            .collect::<Vec<_>>()
            .join("\n")
    };
    Error::Validation(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, InlineRun, Position, TextElement, TextStyle};

    fn text_element(y: f64, h: f64, font_pt: f64, text: &str) -> Element {
        Element {
            position: Position {
                x: 1.0,
                y,
                w: 4.0,
                h,
            },
            kind: ElementKind::Text(TextElement {
                runs: vec![InlineRun::plain(text)],
                style: TextStyle {
                    font_size_pt: Some(font_pt),
                    ..TextStyle::default()
                },
            }),
        }
    }

    #[test]
    fn low_text_is_flagged_with_excerpt() {
        let mut doc = SlideDocument::default();
        doc.elements.push(text_element(7.0, 0.4, 18.0, "closing remarks"));
        check_bottom_margin(&mut doc, 7.5);
        assert_eq!(doc.errors.len(), 1);
        assert!(doc.errors[0].contains("closing remarks"));
    }

    #[test]
    fn small_or_high_text_passes() {
        let mut doc = SlideDocument::default();
        doc.elements.push(text_element(7.0, 0.4, 7.0, "footnote"));
        doc.elements.push(text_element(1.0, 0.5, 24.0, "title"));
        check_bottom_margin(&mut doc, 7.5);
        assert!(doc.errors.is_empty());
    }

    #[test]
    fn aggregate_numbers_multiple_findings() {
        let err = aggregate(&["first".to_string(), "second".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains("1. first"));
        assert!(msg.contains("2. second"));

        let single = aggregate(&["only".to_string()]).to_string();
        assert!(!single.contains("1."));
    }
}
