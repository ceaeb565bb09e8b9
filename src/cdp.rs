//! Chrome DevTools Protocol surface backend (uses the `headless_chrome`
//! crate).
//!
//! This adapter launches a headless Chrome instance sized to the deck
//! layout, manages a single tab, and implements the `SurfaceBackend`
//! contract over it: measurement and the DOM snapshot are in-page script
//! evaluations, captures are clipped CDP screenshots.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};

use crate::dom::DomSnapshot;
use crate::error::{Error, Result};
use crate::surface::{CaptureRegion, PageMetrics, SurfaceBackend};
use crate::units::PX_PER_IN;
use crate::Config;

const SNAPSHOT_JS: &str = include_str!("snapshot.js");

const METRICS_JS: &str = r#"(function () {
    var body = document.body;
    var root = document.documentElement;
    return JSON.stringify({
        width: body.offsetWidth,
        height: body.offsetHeight,
        contentWidth: Math.max(root.scrollWidth, body.scrollWidth),
        contentHeight: Math.max(root.scrollHeight, body.scrollHeight)
    });
})()"#;

/// CDP-backed rendering surface.
pub struct CdpSurface {
    /// Held for its lifetime: dropping the browser ends the Chrome process
    _browser: Browser,
    tab: Arc<Tab>,
}

impl CdpSurface {
    pub fn new(config: &Config) -> Result<Self> {
        let width = (config.layout.width_in * PX_PER_IN).round() as u32;
        let height = (config.layout.height_in * PX_PER_IN).round() as u32;
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((width, height)))
            .build()
            .map_err(|e| Error::Initialization(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Initialization(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::Initialization(format!("Failed to create tab: {}", e)))?;

        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    /// Evaluate a script whose result is a `JSON.stringify` string and
    /// parse it back into a value.
    fn eval_json(&self, script: &str) -> Result<serde_json::Value> {
        let eval = self
            .tab
            .evaluate(script, false)
            .map_err(|e| Error::Surface(format!("Evaluation failed: {}", e)))?;
        let value = match eval.value {
            Some(v) => v,
            None => return Ok(serde_json::Value::Null),
        };
        if let Some(s) = value.as_str() {
            match serde_json::from_str(s) {
                Ok(parsed) => Ok(parsed),
                Err(_) => Ok(serde_json::Value::String(s.to_string())),
            }
        } else {
            Ok(value)
        }
    }
}

impl SurfaceBackend for CdpSurface {
    fn load(&mut self, path: &Path) -> Result<()> {
        let absolute = path
            .canonicalize()
            .map_err(|e| Error::Load(format!("cannot resolve {}: {}", path.display(), e)))?;
        let url = format!("file://{}", absolute.display());

        self.tab
            .navigate_to(&url)
            .map_err(|e| Error::Load(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::Load(format!("Wait for navigation failed: {}", e)))?;

        // Let fonts and images settle before anything is measured
        std::thread::sleep(Duration::from_millis(500));
        Ok(())
    }

    fn metrics(&mut self) -> Result<PageMetrics> {
        let v = self.eval_json(METRICS_JS)?;
        let num = |name: &str| v.get(name).and_then(|x| x.as_f64());
        match (
            num("width"),
            num("height"),
            num("contentWidth"),
            num("contentHeight"),
        ) {
            (Some(width), Some(height), Some(content_width), Some(content_height)) => {
                Ok(PageMetrics {
                    width,
                    height,
                    content_width,
                    content_height,
                })
            }
            _ => Err(Error::Surface(format!("malformed metrics reply: {v}"))),
        }
    }

    fn snapshot(&mut self) -> Result<DomSnapshot> {
        let eval = self
            .tab
            .evaluate(SNAPSHOT_JS, false)
            .map_err(|e| Error::Surface(format!("Snapshot script failed: {}", e)))?;
        let json = eval
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| Error::Snapshot("snapshot script returned no value".to_string()))?;
        DomSnapshot::from_json_str(&json)
    }

    fn eval(&mut self, script: &str) -> Result<serde_json::Value> {
        self.eval_json(script)
    }

    fn capture(&mut self, region: Option<CaptureRegion>, out: &Path) -> Result<()> {
        let clip = region.map(|r| Page::Viewport {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
            scale: 1.0,
        });
        let png = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, clip, true)
            .map_err(|e| Error::Capture(format!("Screenshot failed: {}", e)))?;
        std::fs::write(out, png)
            .map_err(|e| Error::Capture(format!("cannot write {}: {}", out.display(), e)))?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // The browser child process terminates when `CdpSurface` drops
        // with the worker thread; nothing to flush here.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdp_surface_creation() {
        // Requires a local Chrome; skipped on CI and when launch fails.
        if std::env::var("CI").is_ok() {
            return;
        }
        let config = Config::default();
        match CdpSurface::new(&config) {
            Ok(_) => {}
            Err(e) => {
                eprintln!("Skipping CDP surface test; Chrome unavailable: {e}");
            }
        }
    }
}
