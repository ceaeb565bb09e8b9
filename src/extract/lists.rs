//! Rule 8: list flattening.
//!
//! A `ul`/`ol` becomes one List element: every item contributes a run
//! group, nesting raises the indent level, and explicit bullet markers
//! (materialized pseudo content or a leading glyph) override the
//! level-default glyph cycle. Lists that lean on layout containers,
//! block-level sub-elements, or per-item borders render wrong as native
//! lists, so the rule declines and their parts are classified one by one.

use crate::dom::NodeId;
use crate::extract::{Extractor, Outcome};
use crate::model::{Bullet, ElementKind, ListElement, ListItem};
use crate::pseudo::PSEUDO_CLASS;

use super::rules::{is_container_tag, BULLET_GLYPHS};

const LIST_TAGS: [&str; 2] = ["ul", "ol"];

pub(crate) fn list(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if !LIST_TAGS.contains(&el.tag.as_str()) {
        return None;
    }
    if el.rect.area() <= 0.0 {
        ex.consume_subtree(id);
        return Outcome::consumed();
    }
    if !suits_native_list(ex, id) {
        log::debug!("<{}> handled item-by-item instead of as a list", el.tag);
        return None;
    }

    let mut items = Vec::new();
    collect_items(ex, id, 0, &mut items);
    if items.is_empty() {
        ex.consume_subtree(id);
        return Outcome::consumed();
    }

    let max_font = items
        .iter()
        .flat_map(|i| &i.runs)
        .filter_map(|r| r.style.font_size_pt)
        .fold(0.0, f64::max)
        / crate::units::PT_PER_PX;
    let (position, rotation) = ex.positioned(el);
    let mut style = ex.text_style_of(el, max_font);
    style.rotation_deg = rotation;

    ex.push_element(position, ElementKind::List(ListElement { items, style }));
    ex.consume_subtree(id);
    Outcome::consumed()
}

/// Whether this list (and its nested lists) can be rendered natively.
fn suits_native_list(ex: &Extractor<'_>, list_id: NodeId) -> bool {
    let snap = ex.snap();
    let list_el = match ex.el(list_id) {
        Some(el) => el,
        None => return false,
    };
    if is_layout_container(list_el.style.display()) {
        return false;
    }
    for &item in snap.children(list_id) {
        let iel = match ex.el(item) {
            Some(el) if el.tag == "li" => el,
            _ => continue,
        };
        if is_layout_container(iel.style.display()) {
            return false;
        }
        // per-item borders have no list rendering
        if iel.style.has_any_border() {
            return false;
        }
        for &child in snap.children(item) {
            if let Some(cel) = ex.el(child) {
                if LIST_TAGS.contains(&cel.tag.as_str()) {
                    if !suits_native_list(ex, child) {
                        return false;
                    }
                    continue;
                }
                // styled card lists nest decorated containers; generic
                // block content also forces item-by-item handling
                if is_container_tag(&cel.tag) || cel.tag == "table" {
                    return false;
                }
            }
        }
    }
    true
}

fn is_layout_container(display: &str) -> bool {
    matches!(display, "flex" | "inline-flex" | "grid" | "inline-grid")
}

fn collect_items(ex: &mut Extractor<'_>, list_id: NodeId, level: u32, out: &mut Vec<ListItem>) {
    let ordered = ex.snap().tag(list_id) == "ol";
    let children: Vec<NodeId> = ex.snap().children(list_id).to_vec();
    for item in children {
        let iel = match ex.el(item) {
            Some(el) if el.tag == "li" => el,
            _ => continue,
        };
        if iel.style.is_hidden() {
            continue;
        }
        let had_pseudo_marker = ex
            .snap()
            .children(item)
            .iter()
            .find_map(|&c| ex.el(c))
            .map(|c| c.has_class(PSEUDO_CLASS))
            .unwrap_or(false);

        let run_out = ex.runs_for(item, true, &["ul", "ol"]);
        let mut runs = run_out.runs;
        let mut bullet = if ordered { Bullet::Number } else { Bullet::Default };
        if let Some(glyph) = take_leading_glyph(&mut runs, had_pseudo_marker) {
            bullet = Bullet::Glyph(glyph);
        }
        if !runs.is_empty() {
            out.push(ListItem {
                runs,
                level,
                bullet,
            });
        }
        // nested lists continue one level deeper, after their parent item
        let nested: Vec<NodeId> = ex
            .snap()
            .children(item)
            .iter()
            .copied()
            .filter(|&c| LIST_TAGS.contains(&ex.snap().tag(c)))
            .collect();
        for sub in nested {
            collect_items(ex, sub, level + 1, out);
        }
    }
}

/// Detect and strip an explicit marker: the first character of the item
/// text when it is a known glyph, or whatever the materialized pseudo
/// content starts with. Returns the recorded code point.
fn take_leading_glyph(runs: &mut Vec<crate::model::InlineRun>, from_pseudo: bool) -> Option<char> {
    let (glyph, emptied) = {
        let first = runs.first_mut()?;
        let c = first.text.chars().next()?;
        if !from_pseudo && !BULLET_GLYPHS.contains(&c) {
            return None;
        }
        first.text = first.text[c.len_utf8()..].trim_start().to_string();
        (c, first.text.is_empty())
    };
    if emptied {
        runs.remove(0);
    }
    Some(glyph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InlineRun, RunStyle};

    fn run(text: &str) -> InlineRun {
        InlineRun {
            text: text.to_string(),
            style: RunStyle::default(),
            break_after: false,
        }
    }

    #[test]
    fn leading_known_glyph_is_stripped_and_recorded() {
        let mut runs = vec![run("\u{2023} point one")];
        let glyph = take_leading_glyph(&mut runs, false);
        assert_eq!(glyph, Some('\u{2023}'));
        assert_eq!(runs[0].text, "point one");
    }

    #[test]
    fn ordinary_text_is_left_alone() {
        let mut runs = vec![run("no marker here")];
        assert_eq!(take_leading_glyph(&mut runs, false), None);
        assert_eq!(runs[0].text, "no marker here");
    }

    #[test]
    fn pseudo_marker_accepts_any_leading_character() {
        let mut runs = vec![run("\u{2192} follow up")];
        let glyph = take_leading_glyph(&mut runs, true);
        assert_eq!(glyph, Some('\u{2192}'));
        assert_eq!(runs[0].text, "follow up");
    }
}
