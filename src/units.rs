//! Unit conversion constants and rotation-aware geometry helpers.
//!
//! Every measured value arrives from the surface in CSS pixels; elements
//! leave the pipeline in inches (deck geometry) or points (typography and
//! stroke widths). The conversion factors are process-wide constants.

use crate::dom::LayoutRect;

/// CSS pixels per inch at the reference density the surface renders at
pub const PX_PER_IN: f64 = 96.0;

/// Points per CSS pixel (72 pt/in over 96 px/in)
pub const PT_PER_PX: f64 = 0.75;

/// English Metric Units per inch, the deck format's native unit
pub const EMU_PER_IN: i64 = 914_400;

pub fn px_to_in(px: f64) -> f64 {
    px / PX_PER_IN
}

pub fn px_to_pt(px: f64) -> f64 {
    px * PT_PER_PX
}

pub fn in_to_emu(inches: f64) -> i64 {
    (inches * EMU_PER_IN as f64).round() as i64
}

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_deg(deg: f64) -> f64 {
    let mut d = deg % 360.0;
    if d < 0.0 {
        d += 360.0;
    }
    // -1e-9 % 360 can round back up to 360.0
    if d >= 360.0 {
        d = 0.0;
    }
    d
}

fn is_quarter_turn(deg: f64) -> bool {
    (deg - 90.0).abs() < 0.5 || (deg - 270.0).abs() < 0.5
}

/// Recover the pre-rotation box the deck format expects from a measured
/// (already rotated) bounding box.
///
/// At 90 deg or 270 deg the measured width and height are swapped and the
/// box is re-centered on the original center point; all other angles keep
/// the measured box because the deck rotates elements about their center.
pub fn pre_rotation_box(rect: &LayoutRect, rotation_deg: f64) -> LayoutRect {
    if !is_quarter_turn(rotation_deg) {
        return rect.clone();
    }
    let cx = rect.left + rect.width / 2.0;
    let cy = rect.top + rect.height / 2.0;
    LayoutRect {
        left: cx - rect.height / 2.0,
        top: cy - rect.width / 2.0,
        width: rect.height,
        height: rect.width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn px_conversions() {
        assert_eq!(px_to_in(96.0), 1.0);
        assert_eq!(px_to_pt(100.0), 75.0);
        assert_eq!(in_to_emu(1.0), 914_400);
    }

    #[test]
    fn normalize_wraps_negative_angles() {
        assert_eq!(normalize_deg(-90.0), 270.0);
        assert_eq!(normalize_deg(450.0), 90.0);
        assert_eq!(normalize_deg(0.0), 0.0);
    }

    #[test]
    fn quarter_turn_swaps_dimensions_about_center() {
        let rect = LayoutRect {
            left: 100.0,
            top: 50.0,
            width: 40.0,
            height: 200.0,
        };
        let swapped = pre_rotation_box(&rect, 90.0);
        assert_eq!(swapped.width, 200.0);
        assert_eq!(swapped.height, 40.0);
        // center preserved
        assert_eq!(
            swapped.left + swapped.width / 2.0,
            rect.left + rect.width / 2.0
        );
        assert_eq!(
            swapped.top + swapped.height / 2.0,
            rect.top + rect.height / 2.0
        );
    }

    #[test]
    fn half_turn_keeps_dimensions() {
        let rect = LayoutRect {
            left: 0.0,
            top: 0.0,
            width: 10.0,
            height: 20.0,
        };
        let same = pre_rotation_box(&rect, 180.0);
        assert_eq!(same.width, 10.0);
        assert_eq!(same.height, 20.0);
    }
}
