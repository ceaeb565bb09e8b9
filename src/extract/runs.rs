//! Inline-run formatting: nested inline markup becomes an ordered run
//! sequence with merge and break semantics.

use crate::dom::{ComputedStyle, DomSnapshot, NodeData, NodeId};
use crate::model::{InlineRun, RunStyle};
use crate::pseudo::PSEUDO_CLASS;
use crate::units::px_to_pt;

/// Result of formatting one element's inline content.
pub(crate) struct RunOutput {
    pub runs: Vec<InlineRun>,
    /// Largest font size contributing a run, pixels; drives the
    /// line-spacing rescale on the owning element.
    pub max_font_px: f64,
}

/// Format the inline content of `root` into runs against its own computed
/// style as the base. `allow_block_breaks` lets block-level descendants
/// act as soft line breaks (list items); elsewhere they are skipped.
/// `skip_tags` subtrees are ignored entirely (nested lists).
pub(crate) fn format_runs(
    snap: &DomSnapshot,
    root: NodeId,
    allow_block_breaks: bool,
    skip_tags: &[&str],
    errors: &mut Vec<String>,
) -> RunOutput {
    let base = match snap.as_element(root) {
        Some(el) => &el.style,
        None => {
            return RunOutput {
                runs: Vec::new(),
                max_font_px: 0.0,
            }
        }
    };
    let mut walker = Walker {
        snap,
        base,
        allow_block_breaks,
        skip_tags,
        errors,
        runs: Vec::new(),
        max_font_px: 0.0,
    };
    walker.element(root, false, false);
    let mut runs = walker.runs;
    let max_font_px = walker.max_font_px;
    trim_sequence(&mut runs);
    merge_adjacent(&mut runs);
    RunOutput { runs, max_font_px }
}

struct Walker<'a> {
    snap: &'a DomSnapshot,
    base: &'a ComputedStyle,
    allow_block_breaks: bool,
    skip_tags: &'a [&'a str],
    errors: &'a mut Vec<String>,
    runs: Vec<InlineRun>,
    max_font_px: f64,
}

impl Walker<'_> {
    fn element(&mut self, id: NodeId, sup: bool, sub: bool) {
        let el = match self.snap.as_element(id) {
            Some(el) => el,
            None => return,
        };
        for &child in self.snap.children(id) {
            match &self.snap.node(child).data {
                NodeData::Text(t) => self.text(t, &el.style, sup, sub),
                NodeData::Element(cel) => {
                    if cel.style.is_hidden() || self.skip_tags.contains(&cel.tag.as_str()) {
                        continue;
                    }
                    if cel.tag == "br" {
                        self.break_last();
                        continue;
                    }
                    let display = cel.style.display();
                    let inline = display.starts_with("inline")
                        || (display.is_empty() && is_inline_tag(&cel.tag));
                    if inline {
                        if !cel.has_class(PSEUDO_CLASS)
                            && (cel.style.px("margin-left") > 0.0
                                || cel.style.px("margin-right") > 0.0)
                        {
                            self.errors.push(format!(
                                "inline <{}> uses horizontal margin, which shifts converted text; use padding on the container instead",
                                cel.tag
                            ));
                        }
                        let c_sup = sup || cel.tag == "sup" || cel.style.get("vertical-align") == "super";
                        let c_sub = sub || cel.tag == "sub" || cel.style.get("vertical-align") == "sub";
                        self.element(child, c_sup, c_sub);
                    } else if self.allow_block_breaks {
                        // paragraph-like break: continue the sequence on a
                        // new line rather than opening a new element
                        self.break_last();
                        self.element(child, sup, sub);
                        self.break_last();
                    } else {
                        log::debug!("skipping block <{}> inside inline content", cel.tag);
                    }
                }
            }
        }
    }

    fn text(&mut self, raw: &str, style: &ComputedStyle, sup: bool, sub: bool) {
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            return;
        }
        if collapsed == " " {
            // inter-element whitespace: keep a single separator on the
            // previous run instead of opening a styled run for it
            if let Some(last) = self.runs.last_mut() {
                if !last.break_after && !last.text.ends_with(' ') {
                    last.text.push(' ');
                }
            }
            return;
        }
        let text = apply_transform(&collapsed, style.get("text-transform"));
        let run_style = diff_style(style, self.base, sup, sub);
        self.max_font_px = self.max_font_px.max(style.font_size_px());
        match self.runs.last_mut() {
            Some(last) if !last.break_after && last.style == run_style => {
                last.text.push_str(&text);
            }
            _ => self.runs.push(InlineRun {
                text,
                style: run_style,
                break_after: false,
            }),
        }
    }

    fn break_last(&mut self) {
        if let Some(last) = self.runs.last_mut() {
            last.break_after = true;
        }
    }
}

pub(crate) fn is_inline_tag(tag: &str) -> bool {
    matches!(
        tag,
        "span"
            | "a"
            | "b"
            | "strong"
            | "i"
            | "em"
            | "u"
            | "s"
            | "sub"
            | "sup"
            | "code"
            | "small"
            | "mark"
            | "abbr"
            | "time"
            | "label"
            | "br"
    )
}

/// Style delta of a run against the element base style.
fn diff_style(style: &ComputedStyle, base: &ComputedStyle, sup: bool, sub: bool) -> RunStyle {
    let mut out = RunStyle {
        bold: style.is_bold() && !base.is_bold(),
        italic: style.is_italic() && !base.is_italic(),
        underline: style.is_underlined() && !base.is_underlined(),
        superscript: sup,
        subscript: sub,
        ..RunStyle::default()
    };
    let color = style.color("color");
    if color != base.color("color") {
        out.color = color.map(|c| c.hex());
    }
    let size = style.font_size_px();
    if (size - base.font_size_px()).abs() > 0.1 {
        out.font_size_pt = Some(px_to_pt(size));
    }
    let face = style.font_face();
    if face != base.font_face() {
        out.font_face = face;
    }
    out
}

fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_ws = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}

fn apply_transform(text: &str, transform: &str) -> String {
    match transform {
        "uppercase" => text.to_uppercase(),
        "lowercase" => text.to_lowercase(),
        "capitalize" => {
            let mut out = String::with_capacity(text.len());
            let mut at_word_start = true;
            for c in text.chars() {
                if at_word_start {
                    out.extend(c.to_uppercase());
                } else {
                    out.push(c);
                }
                at_word_start = c.is_whitespace();
            }
            out
        }
        _ => text.to_string(),
    }
}

/// Trim leading/trailing whitespace of the whole sequence, once.
fn trim_sequence(runs: &mut Vec<InlineRun>) {
    while let Some(first) = runs.first_mut() {
        first.text = first.text.trim_start().to_string();
        if first.text.is_empty() {
            runs.remove(0);
        } else {
            break;
        }
    }
    while let Some(last) = runs.last_mut() {
        last.text = last.text.trim_end().to_string();
        if last.text.is_empty() {
            runs.pop();
        } else {
            break;
        }
    }
}

fn merge_adjacent(runs: &mut Vec<InlineRun>) {
    let mut i = 1;
    while i < runs.len() {
        if !runs[i - 1].break_after && runs[i - 1].style == runs[i].style {
            let text = runs.remove(i).text;
            runs[i - 1].text.push_str(&text);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LayoutRect;

    fn rect() -> LayoutRect {
        LayoutRect::new(0.0, 0.0, 100.0, 20.0)
    }

    const BASE: &[(&str, &str)] = &[
        ("font-size", "16px"),
        ("color", "rgb(0, 0, 0)"),
        ("display", "block"),
    ];

    #[test]
    fn adjacent_plain_text_merges_into_one_run() {
        let mut snap = DomSnapshot::with_body(&[], rect());
        let p = snap.add_element(snap.root(), "p", &[], BASE, rect());
        snap.add_text(p, "Hello ");
        snap.add_text(p, "world");
        let mut errors = Vec::new();
        let out = format_runs(&snap, p, false, &[], &mut errors);
        assert_eq!(out.runs.len(), 1);
        assert_eq!(out.runs[0].text, "Hello world");
        assert!(errors.is_empty());
    }

    #[test]
    fn bold_span_opens_a_styled_run() {
        let mut snap = DomSnapshot::with_body(&[], rect());
        let p = snap.add_element(snap.root(), "p", &[], BASE, rect());
        snap.add_text(p, "plain ");
        let b = snap.add_element(
            p,
            "strong",
            &[],
            &[
                ("font-size", "16px"),
                ("color", "rgb(0, 0, 0)"),
                ("font-weight", "700"),
                ("display", "inline"),
            ],
            rect(),
        );
        snap.add_text(b, "loud");
        let mut errors = Vec::new();
        let out = format_runs(&snap, p, false, &[], &mut errors);
        assert_eq!(out.runs.len(), 2);
        assert!(out.runs[1].style.bold);
        assert_eq!(out.runs[1].text, "loud");
    }

    #[test]
    fn br_sets_break_on_preceding_run() {
        let mut snap = DomSnapshot::with_body(&[], rect());
        let p = snap.add_element(snap.root(), "p", &[], BASE, rect());
        snap.add_text(p, "one");
        snap.add_element(p, "br", &[], &[("display", "inline")], rect());
        snap.add_text(p, "two");
        let mut errors = Vec::new();
        let out = format_runs(&snap, p, false, &[], &mut errors);
        assert_eq!(out.runs.len(), 2);
        assert!(out.runs[0].break_after);
        assert_eq!(out.runs[1].text, "two");
    }

    #[test]
    fn sequence_whitespace_trimmed_once() {
        let mut snap = DomSnapshot::with_body(&[], rect());
        let p = snap.add_element(snap.root(), "p", &[], BASE, rect());
        snap.add_text(p, "  padded  ");
        let mut errors = Vec::new();
        let out = format_runs(&snap, p, false, &[], &mut errors);
        assert_eq!(out.runs[0].text, "padded");
    }

    #[test]
    fn uppercase_transform_applies_to_run_text() {
        let mut snap = DomSnapshot::with_body(&[], rect());
        let style: Vec<(&str, &str)> = BASE
            .iter()
            .copied()
            .chain([("text-transform", "uppercase")])
            .collect();
        let p = snap.add_element(snap.root(), "p", &[], &style, rect());
        snap.add_text(p, "shout");
        let mut errors = Vec::new();
        let out = format_runs(&snap, p, false, &[], &mut errors);
        assert_eq!(out.runs[0].text, "SHOUT");
    }

    #[test]
    fn inline_horizontal_margin_is_flagged() {
        let mut snap = DomSnapshot::with_body(&[], rect());
        let p = snap.add_element(snap.root(), "p", &[], BASE, rect());
        let s = snap.add_element(
            p,
            "span",
            &[],
            &[("display", "inline"), ("margin-left", "8px")],
            rect(),
        );
        snap.add_text(s, "pushed");
        let mut errors = Vec::new();
        format_runs(&snap, p, false, &[], &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("inline <span>"));
    }

    #[test]
    fn larger_run_font_is_reported_for_spacing_rescale() {
        let mut snap = DomSnapshot::with_body(&[], rect());
        let p = snap.add_element(snap.root(), "p", &[], BASE, rect());
        snap.add_text(p, "small ");
        let big = snap.add_element(
            p,
            "span",
            &[],
            &[
                ("font-size", "32px"),
                ("color", "rgb(0, 0, 0)"),
                ("display", "inline"),
            ],
            rect(),
        );
        snap.add_text(big, "LARGE");
        let mut errors = Vec::new();
        let out = format_runs(&snap, p, false, &[], &mut errors);
        assert_eq!(out.max_font_px, 32.0);
        assert_eq!(out.runs[1].style.font_size_pt, Some(24.0));
    }
}
