//! The conversion entry point: one rendered document in, one assembled
//! slide plus its placeholders out.

use std::path::Path;

use crate::assemble::{assemble, DeckBuilder};
use crate::error::Result;
use crate::model::{Placeholder, SlideDocument};
use crate::surface::Surface;
use crate::{dimensions, extract, pseudo, raster, validate, Config};

/// What a successful conversion hands back: the built slide and the
/// caller-filled regions found in the document. Placeholder ownership
/// passes to the caller here.
#[derive(Debug)]
pub struct Conversion<S> {
    pub slide: S,
    pub placeholders: Vec<Placeholder>,
}

/// Convert the document at `path` into one slide appended to `deck`.
///
/// Validation findings from all stages accumulate and fail as a single
/// aggregated error before any rasterization or assembly happens; surface
/// failures propagate immediately. The surface must be exclusive to this
/// conversion for its duration.
pub async fn convert_document<D: DeckBuilder>(
    surface: &Surface,
    path: &Path,
    deck: &mut D,
    config: &Config,
) -> Result<Conversion<D::Slide>> {
    surface.load(path).await?;

    let mut doc = SlideDocument::default();
    let metrics = surface.metrics().await?;
    let canvas = dimensions::read(&metrics, config.layout, &mut doc.errors);

    pseudo::materialize(surface).await?;
    let snapshot = surface.snapshot().await?;
    extract::extract(&snapshot, &mut doc);

    validate::check_bottom_margin(&mut doc, canvas.height_in());
    validate::check_image_paths(&mut doc, path.parent());
    if !doc.errors.is_empty() {
        log::warn!(
            "conversion of {} failed with {} finding(s)",
            path.display(),
            doc.errors.len()
        );
        return Err(validate::aggregate(&doc.errors));
    }

    raster::resolve(&mut doc, surface, config).await?;

    let mut slide = deck.add_slide(config.layout)?;
    assemble(&doc, &mut slide)?;

    Ok(Conversion {
        slide,
        placeholders: doc.placeholders,
    })
}
