//! Rasterization fallback.
//!
//! Elements whose style has no native deck representation (inline SVG,
//! CSS gradients and background images, object fitting, corner radii,
//! filters, box shadows) are redrawn in isolation and captured as PNG.
//! The document body is cleared once, then for each target a single
//! absolutely-positioned proxy node is inserted at the origin, padded by
//! the shadow extent so no rendered shadow is clipped, captured, and
//! removed again before the next target — the one live document makes
//! this stage strictly sequential. Afterwards the element is an Image:
//! geometry grown by the extent, style gone.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

use crate::dom::ShadowInfo;
use crate::error::Result;
use crate::model::{
    Background, ElementKind, ImageElement, ImageStyle, RasterTarget, SlideDocument,
};
use crate::surface::{CaptureRegion, Surface};
use crate::units::{px_to_in, PX_PER_IN};
use crate::Config;

const CLEAR_BODY_JS: &str = r#"(function () {
    document.body.innerHTML = '';
    document.body.style.background = 'transparent';
    return JSON.stringify({ ok: true });
})()"#;

const REMOVE_PROXY_JS: &str = r#"(function () {
    var el = document.getElementById('__slidesmith_proxy');
    if (el) el.remove();
    return JSON.stringify({ ok: true });
})()"#;

const INSERT_PROXY_JS: &str = r#"(function () {
    var p = JSON.parse(atob('{{B64}}'));
    var el = document.createElement(p.tag);
    var i;
    for (i = 0; i < p.attrs.length; i++) el.setAttribute(p.attrs[i][0], p.attrs[i][1]);
    for (i = 0; i < p.css.length; i++) el.style.setProperty(p.css[i][0], p.css[i][1]);
    if (p.inner) el.innerHTML = p.inner;
    el.id = '__slidesmith_proxy';
    el.style.position = 'absolute';
    el.style.left = p.padLeft + 'px';
    el.style.top = p.padTop + 'px';
    el.style.width = p.width + 'px';
    el.style.height = p.height + 'px';
    el.style.margin = '0';
    el.style.boxSizing = 'border-box';
    document.body.appendChild(el);
    return JSON.stringify({ ok: true });
})()"#;

/// Additional margin a drop shadow needs beyond the box edges, per side,
/// in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadowExtent {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl ShadowExtent {
    pub fn any(&self) -> bool {
        self.left > 0.0 || self.right > 0.0 || self.top > 0.0 || self.bottom > 0.0
    }
}

/// Per-side extent: blur plus spread, shifted by the offset independently
/// per axis, clamped at zero.
pub fn shadow_extent(shadow: Option<&ShadowInfo>) -> ShadowExtent {
    match shadow {
        None => ShadowExtent::default(),
        Some(s) => {
            let reach = s.blur + s.spread;
            ShadowExtent {
                left: (reach - s.dx).max(0.0),
                right: (reach + s.dx).max(0.0),
                top: (reach - s.dy).max(0.0),
                bottom: (reach + s.dy).max(0.0),
            }
        }
    }
}

#[derive(Serialize)]
struct ProxyPayload {
    tag: String,
    attrs: Vec<(String, String)>,
    css: Vec<(String, String)>,
    inner: Option<String>,
    width: f64,
    height: f64,
    #[serde(rename = "padLeft")]
    pad_left: f64,
    #[serde(rename = "padTop")]
    pad_top: f64,
}

/// Resolve every pending raster target in the document. After this pass
/// no `Raster` element and no raster-demanding image style remains.
pub async fn resolve(doc: &mut SlideDocument, surface: &Surface, config: &Config) -> Result<()> {
    let mut session = RasterSession {
        surface,
        dir: config.capture_dir.clone(),
        cleared: false,
        counter: 0,
    };

    let background_target = match &doc.background {
        Some(Background::Raster(target)) => Some(target.clone()),
        _ => None,
    };
    if let Some(target) = background_target {
        let width = config.layout.width_in * PX_PER_IN;
        let height = config.layout.height_in * PX_PER_IN;
        let path = session
            .capture(target, width, height, Some("background"))
            .await?;
        doc.background = Some(Background::Image(path.display().to_string()));
    }

    for element in &mut doc.elements {
        let target = match &element.kind {
            ElementKind::Raster(target) => target.clone(),
            ElementKind::Image(img) if img.needs_raster() => image_target(img),
            _ => continue,
        };
        let extent = shadow_extent(target.shadow.as_ref());
        let width = element.position.w * PX_PER_IN;
        let height = element.position.h * PX_PER_IN;
        let path = session.capture(target, width, height, None).await?;

        // grow the geometry on the sides the capture was padded on
        element.position.x -= px_to_in(extent.left);
        element.position.y -= px_to_in(extent.top);
        element.position.w += px_to_in(extent.left + extent.right);
        element.position.h += px_to_in(extent.top + extent.bottom);

        let (transparency, rotation) = match &element.kind {
            ElementKind::Image(img) => (img.transparency, img.rotation_deg),
            _ => (None, None),
        };
        element.kind = ElementKind::Image(ImageElement {
            src: path.display().to_string(),
            style: None,
            transparency,
            rotation_deg: rotation,
        });
    }
    Ok(())
}

struct RasterSession<'a> {
    surface: &'a Surface,
    dir: PathBuf,
    cleared: bool,
    counter: usize,
}

impl RasterSession<'_> {
    /// Insert the proxy, capture it, and remove it again; the removal is
    /// attempted on every exit path so a failed capture cannot leave a
    /// stray node for the next target.
    async fn capture(
        &mut self,
        target: RasterTarget,
        width_px: f64,
        height_px: f64,
        name: Option<&str>,
    ) -> Result<PathBuf> {
        if !self.cleared {
            self.surface.eval(CLEAR_BODY_JS).await?;
            self.cleared = true;
        }

        let extent = shadow_extent(target.shadow.as_ref());
        let mut css = target.css;
        if let Some(shadow) = &target.shadow {
            css.push(("box-shadow".to_string(), shadow_css(shadow)));
        }
        let payload = ProxyPayload {
            tag: target.tag,
            attrs: target.attrs,
            css,
            inner: target.inner_html,
            width: width_px,
            height: height_px,
            pad_left: extent.left,
            pad_top: extent.top,
        };
        let encoded = BASE64.encode(serde_json::to_vec(&payload).map_err(|e| {
            crate::error::Error::Other(format!("proxy payload serialization failed: {e}"))
        })?);
        let insert = INSERT_PROXY_JS.replace("{{B64}}", &encoded);

        let path = match name {
            Some(n) => self.dir.join(format!("{n}.png")),
            None => {
                self.counter += 1;
                self.dir.join(format!("raster-{}.png", self.counter))
            }
        };

        // A significant shadow extent widens the clip; otherwise the clip
        // is exactly the proxy box.
        let region = CaptureRegion {
            x: 0.0,
            y: 0.0,
            width: width_px + extent.left + extent.right,
            height: height_px + extent.top + extent.bottom,
        };

        self.surface.eval(&insert).await?;
        let captured = self.surface.capture(Some(region), &path).await;
        let removed = self.surface.eval(REMOVE_PROXY_JS).await;
        captured?;
        removed?;
        Ok(path)
    }
}

/// Rebuild the proxy node for an image that cannot be placed natively.
fn image_target(img: &ImageElement) -> RasterTarget {
    let mut css = Vec::new();
    let style = img.style.as_ref();
    if let Some(s) = style {
        push_image_css(&mut css, s);
    }
    RasterTarget {
        tag: "img".to_string(),
        attrs: vec![("src".to_string(), img.src.clone())],
        css,
        inner_html: None,
        shadow: style.and_then(|s| s.shadow.clone()),
    }
}

fn push_image_css(css: &mut Vec<(String, String)>, style: &ImageStyle) {
    css.push(("object-fit".to_string(), style.object_fit.clone()));
    if style.object_position != "50% 50%" {
        css.push(("object-position".to_string(), style.object_position.clone()));
    }
    if style.filter != "none" {
        css.push(("filter".to_string(), style.filter.clone()));
    }
    if style.rounded {
        css.push(("border-radius".to_string(), "50%".to_string()));
    } else if style.radius_px > 0.0 {
        css.push(("border-radius".to_string(), format!("{}px", style.radius_px)));
    }
    if let Some(border) = &style.border {
        css.push((
            "border".to_string(),
            format!("{}px solid #{}", border.width_pt / 0.75, border.color),
        ));
    }
}

fn shadow_css(s: &ShadowInfo) -> String {
    format!(
        "{}px {}px {}px {}px rgba({}, {}, {}, {})",
        s.dx, s.dy, s.blur, s.spread, s.color.r, s.color.g, s.color.b, s.color.a
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Color;

    #[test]
    fn extent_shifts_by_offset_per_side() {
        let shadow = ShadowInfo {
            dx: 4.0,
            dy: 0.0,
            blur: 10.0,
            spread: 0.0,
            color: Color::BLACK,
        };
        let e = shadow_extent(Some(&shadow));
        assert_eq!(e.left, 6.0);
        assert_eq!(e.right, 14.0);
        assert_eq!(e.top, 10.0);
        assert_eq!(e.bottom, 10.0);
        assert!(e.any());
    }

    #[test]
    fn fully_offset_shadow_clamps_at_zero() {
        let shadow = ShadowInfo {
            dx: 20.0,
            dy: 0.0,
            blur: 4.0,
            spread: 0.0,
            color: Color::BLACK,
        };
        let e = shadow_extent(Some(&shadow));
        assert_eq!(e.left, 0.0);
        assert_eq!(e.right, 24.0);
    }

    #[test]
    fn no_shadow_means_no_extent() {
        assert!(!shadow_extent(None).any());
    }

    #[test]
    fn image_target_carries_fit_and_ring() {
        let img = ImageElement {
            src: "logo.png".to_string(),
            style: Some(ImageStyle {
                object_fit: "cover".to_string(),
                object_position: "50% 50%".to_string(),
                filter: "none".to_string(),
                shadow: None,
                rounded: true,
                radius_px: 40.0,
                border: Some(crate::model::StrokeStyle {
                    color: "FF0000".to_string(),
                    width_pt: 3.0,
                }),
            }),
            transparency: None,
            rotation_deg: None,
        };
        let t = image_target(&img);
        assert_eq!(t.tag, "img");
        assert!(t.css.iter().any(|(k, v)| k == "object-fit" && v == "cover"));
        assert!(t.css.iter().any(|(k, v)| k == "border-radius" && v == "50%"));
        assert!(t
            .css
            .iter()
            .any(|(k, v)| k == "border" && v.contains("#FF0000")));
    }

    #[test]
    fn proxy_id_is_consistent_across_scripts() {
        assert!(INSERT_PROXY_JS.contains("__slidesmith_proxy"));
        assert!(REMOVE_PROXY_JS.contains("__slidesmith_proxy"));
    }
}
