//! Slidesmith
//!
//! Converts one rendered HTML/CSS document (a presentation slide) into a
//! structured, positioned element model and drives a slide-building API
//! with it. The heavy lifting is a single-pass extraction & classification
//! engine over a DOM snapshot — placeholders, images, vector graphics,
//! tables, lists, styled containers, inline-formatted text, borders — and
//! a rasterization fallback that redraws CSS effects the deck format
//! cannot express and captures them as bitmaps with exact shadow-extent
//! accounting.
//!
//! # Boundaries
//!
//! The crate consumes a *rendering surface* (headless Chrome over CDP by
//! default, behind the `cdp` feature) and produces calls into a caller-
//! supplied [`assemble::SlideBuilder`]. Browser process management, the
//! deck file format, CLI concerns, and bitmap post-processing all live
//! outside.
//!
//! # Example
//!
//! ```no_run
//! use slidesmith::{convert_document, surface, Config};
//! # use slidesmith::assemble::DeckBuilder;
//! # async fn run<D: DeckBuilder>(deck: &mut D) -> slidesmith::Result<()> {
//! let config = Config::default();
//! let surface = surface::launch(&config).await?;
//! let conversion =
//!     convert_document(&surface, "slide-01.html".as_ref(), deck, &config).await?;
//! println!("{} placeholder(s)", conversion.placeholders.len());
//! surface.close().await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod units;

pub mod dom;
pub mod model;

pub mod dimensions;
pub mod extract;
pub mod pseudo;

pub mod raster;
pub mod validate;

pub mod assemble;
pub mod surface;

#[cfg(feature = "cdp")]
pub mod cdp;

mod convert;
pub use convert::{convert_document, Conversion};

pub use model::{Element, ElementKind, Placeholder, Position, SlideDocument};
pub use surface::{Surface, SurfaceBackend};

/// Deck slide layout size, in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl LayoutSize {
    /// 16:9, the common widescreen layout.
    pub const WIDESCREEN: LayoutSize = LayoutSize {
        width_in: 13.333,
        height_in: 7.5,
    };

    /// 4:3 legacy layout.
    pub const STANDARD: LayoutSize = LayoutSize {
        width_in: 10.0,
        height_in: 7.5,
    };
}

impl Default for LayoutSize {
    fn default() -> Self {
        Self::WIDESCREEN
    }
}

/// Conversion configuration.
///
/// The defaults are the common case: a widescreen deck, a generous fixed
/// surface timeout, and captures written to the system temp directory.
/// The caller owns the capture directory's lifetime; this crate only
/// produces paths inside it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Slide size of the target deck; the document body must match it
    /// within a tenth of an inch.
    pub layout: LayoutSize,
    /// Timeout applied to every surface round-trip, in milliseconds.
    pub timeout_ms: u64,
    /// Directory rasterization captures are written into.
    pub capture_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: LayoutSize::default(),
            timeout_ms: 30_000,
            capture_dir: std::env::temp_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.layout.width_in, 13.333);
        assert_eq!(config.layout.height_in, 7.5);
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn layout_presets() {
        assert_eq!(LayoutSize::STANDARD.width_in, 10.0);
        assert_eq!(LayoutSize::default(), LayoutSize::WIDESCREEN);
    }
}
