//! Rule 5: table extraction.
//!
//! Cells are measured where they rendered; per-column maxima (with colspan
//! widths distributed evenly) and per-row natural heights are then scaled
//! uniformly so the vectors sum exactly to the table's rendered box.

use crate::dom::{ElementData, NodeId, SIDES};
use crate::extract::{h_align, Extractor, Outcome};
use crate::model::{CellStyle, ElementKind, TableCell, TableElement, VAlign};
use crate::units::{px_to_in, px_to_pt};

use super::rules::stroke_of;

pub(crate) fn table(ex: &mut Extractor<'_>, id: NodeId) -> Option<Outcome> {
    let el = ex.el(id)?;
    if el.tag != "table" {
        return None;
    }
    if el.rect.area() <= 0.0 {
        ex.consume_subtree(id);
        return Outcome::consumed();
    }

    let row_ids = collect_rows(ex, id);
    let mut grid = GridBuilder::default();
    let mut rows: Vec<Vec<TableCell>> = Vec::new();
    let mut row_heights_px: Vec<f64> = Vec::new();

    for row_id in &row_ids {
        let row_el = ex.el(*row_id)?;
        let mut cells = Vec::new();
        grid.begin_row();
        for &child in ex.snap().children(*row_id) {
            let cel = match ex.el(child) {
                Some(c) if matches!(c.tag.as_str(), "td" | "th") => c,
                _ => continue,
            };
            let col_span = span_attr(cel, "colspan");
            let row_span = span_attr(cel, "rowspan");
            grid.place(cel.rect.width, col_span, row_span);
            cells.push(build_cell(ex, child, cel, col_span, row_span));
        }
        let natural = if row_el.rect.height > 0.0 {
            row_el.rect.height
        } else {
            ex.snap()
                .children(*row_id)
                .iter()
                .filter_map(|&c| ex.el(c))
                .map(|c| c.rect.height)
                .fold(0.0, f64::max)
        };
        row_heights_px.push(natural);
        rows.push(cells);
    }

    if rows.iter().all(|r| r.is_empty()) {
        let (pos, _) = ex.positioned(el);
        ex.push_error(format!(
            "table at {:.2},{:.2}in has no measurable cells",
            pos.x, pos.y
        ));
        ex.consume_subtree(id);
        return Outcome::consumed();
    }

    let col_widths_px = grid.column_widths();
    let (position, _) = ex.positioned(el);
    let col_widths_in = rescale(&col_widths_px, position.w);
    let row_heights_in = rescale(&row_heights_px, position.h);

    ex.push_element(
        position,
        ElementKind::Table(TableElement {
            rows,
            col_widths_in,
            row_heights_in,
        }),
    );
    ex.consume_subtree(id);
    Outcome::consumed()
}

/// `tr` rows of the table in document order, looking through
/// `thead`/`tbody`/`tfoot` but not into nested tables.
fn collect_rows(ex: &Extractor<'_>, table_id: NodeId) -> Vec<NodeId> {
    let snap = ex.snap();
    let mut rows = Vec::new();
    for &child in snap.children(table_id) {
        match snap.tag(child) {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                for &row in snap.children(child) {
                    if snap.tag(row) == "tr" {
                        rows.push(row);
                    }
                }
            }
            _ => {}
        }
    }
    rows
}

fn span_attr(el: &ElementData, name: &str) -> u32 {
    el.attr(name)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&v| v >= 1)
        .unwrap_or(1)
}

fn build_cell(
    ex: &mut Extractor<'_>,
    id: NodeId,
    el: &ElementData,
    col_span: u32,
    row_span: u32,
) -> TableCell {
    let out = ex.runs_for(id, true, &[]);
    let style = &el.style;
    let borders = style.borders();
    let mut cell_borders: [Option<crate::model::StrokeStyle>; 4] = Default::default();
    for (i, _) in SIDES.iter().enumerate() {
        cell_borders[i] = borders[i].as_ref().map(stroke_of);
    }
    TableCell {
        runs: out.runs,
        style: CellStyle {
            fill: style.background_color().map(|c| c.hex()),
            color: style.color("color").map(|c| c.hex()),
            font_face: style.font_face(),
            font_size_pt: Some(px_to_pt(style.font_size_px())),
            bold: style.is_bold(),
            align: h_align(style.get("text-align")),
            valign: match style.get("vertical-align") {
                "top" => Some(VAlign::Top),
                "bottom" => Some(VAlign::Bottom),
                "middle" => Some(VAlign::Middle),
                _ => None,
            },
            borders: cell_borders,
        },
        col_span,
        row_span,
    }
}

/// Column occupancy tracker: spans reserve columns in following rows and
/// spanned widths distribute evenly across the covered columns.
#[derive(Default)]
struct GridBuilder {
    /// Remaining rowspan per column
    pending: Vec<u32>,
    /// Per-column maximum measured width
    widths: Vec<f64>,
    cursor: usize,
}

impl GridBuilder {
    fn begin_row(&mut self) {
        for p in &mut self.pending {
            *p = p.saturating_sub(1);
        }
        self.cursor = 0;
    }

    fn place(&mut self, width_px: f64, col_span: u32, row_span: u32) {
        while self.pending.get(self.cursor).copied().unwrap_or(0) > 0 {
            self.cursor += 1;
        }
        let share = width_px / col_span as f64;
        for i in 0..col_span as usize {
            let col = self.cursor + i;
            if self.widths.len() <= col {
                self.widths.resize(col + 1, 0.0);
                self.pending.resize(col + 1, 0);
            }
            self.widths[col] = self.widths[col].max(share);
            if row_span > 1 {
                self.pending[col] = self.pending[col].max(row_span);
            }
        }
        self.cursor += col_span as usize;
    }

    fn column_widths(&self) -> Vec<f64> {
        self.widths.clone()
    }
}

/// Scale measured pixel sizes so they sum exactly to `total_in` inches.
fn rescale(measured_px: &[f64], total_in: f64) -> Vec<f64> {
    let sum: f64 = measured_px.iter().sum();
    if sum <= 0.0 {
        let n = measured_px.len().max(1);
        return vec![total_in / n as f64; measured_px.len()];
    }
    let factor = total_in / px_to_in(sum);
    measured_px.iter().map(|&m| px_to_in(m) * factor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_preserves_ratio_and_sum() {
        // 200px and 100px columns into a 3in table
        let cols = rescale(&[200.0, 100.0], 3.0);
        assert!((cols[0] - 2.0).abs() < 1e-9);
        assert!((cols[1] - 1.0).abs() < 1e-9);
        assert!((cols.iter().sum::<f64>() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn colspan_distributes_width_evenly() {
        let mut grid = GridBuilder::default();
        grid.begin_row();
        grid.place(300.0, 2, 1);
        grid.begin_row();
        grid.place(100.0, 1, 1);
        grid.place(220.0, 1, 1);
        let w = grid.column_widths();
        assert_eq!(w.len(), 2);
        assert_eq!(w[0], 150.0);
        assert_eq!(w[1], 220.0);
    }

    #[test]
    fn rowspan_reserves_columns_in_following_rows() {
        let mut grid = GridBuilder::default();
        grid.begin_row();
        grid.place(100.0, 1, 2);
        grid.place(50.0, 1, 1);
        grid.begin_row();
        // first column still occupied by the rowspan
        grid.place(80.0, 1, 1);
        let w = grid.column_widths();
        assert_eq!(w[0], 100.0);
        assert_eq!(w[1], 80.0);
    }
}
