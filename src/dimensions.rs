//! Canvas dimension checks: declared size versus content extent, and the
//! configured deck layout.

use crate::surface::PageMetrics;
use crate::units::{px_to_in, px_to_pt, PX_PER_IN};
use crate::LayoutSize;

/// Declared canvas size of the loaded document, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width_px: f64,
    pub height_px: f64,
}

impl Canvas {
    pub fn width_in(&self) -> f64 {
        px_to_in(self.width_px)
    }

    pub fn height_in(&self) -> f64 {
        px_to_in(self.height_px)
    }
}

/// Sub-pixel rounding slack before content counts as overflowing.
const OVERFLOW_SLACK_PX: f64 = 1.0;

/// Allowed deviation between the body size and the deck layout.
const LAYOUT_TOLERANCE_IN: f64 = 0.1;

/// Read the declared canvas and append findings for content overflow and
/// layout mismatch. Findings accumulate; extraction proceeds regardless.
pub fn read(metrics: &PageMetrics, layout: LayoutSize, errors: &mut Vec<String>) -> Canvas {
    let canvas = Canvas {
        width_px: metrics.width,
        height_px: metrics.height,
    };

    let overflow_x = (metrics.content_width - metrics.width - OVERFLOW_SLACK_PX).max(0.0);
    if overflow_x > 0.0 {
        errors.push(format!(
            "content overflows the canvas horizontally by {:.1}pt",
            px_to_pt(overflow_x)
        ));
    }
    let overflow_y = (metrics.content_height - metrics.height - OVERFLOW_SLACK_PX).max(0.0);
    if overflow_y > 0.0 {
        errors.push(format!(
            "content overflows the canvas vertically by {:.1}pt",
            px_to_pt(overflow_y)
        ));
    }

    let dw = (canvas.width_in() - layout.width_in).abs();
    let dh = (canvas.height_in() - layout.height_in).abs();
    if dw > LAYOUT_TOLERANCE_IN || dh > LAYOUT_TOLERANCE_IN {
        errors.push(format!(
            "body renders at {:.2}x{:.2}in but the deck layout is {:.2}x{:.2}in; size the body to {:.0}x{:.0}px",
            canvas.width_in(),
            canvas.height_in(),
            layout.width_in,
            layout.height_in,
            layout.width_in * PX_PER_IN,
            layout.height_in * PX_PER_IN,
        ));
    }

    canvas
}
