//! The rendering surface boundary.
//!
//! A `SurfaceBackend` is a synchronous engine (headless Chrome, or a fake
//! in tests) owned by a dedicated worker thread. `Surface` is the async
//! facade the pipeline talks to: commands flow over a channel and answers
//! come back on oneshot senders, so every surface round-trip is awaited
//! before the next begins — the worker thread serializes them by
//! construction, which is exactly the exclusivity rasterization needs.
//! Every operation is bounded by one generous fixed timeout; there is no
//! retry and no cancellation beyond abandoning the conversion.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::dom::DomSnapshot;
use crate::error::{Error, Result};

/// Measured page dimensions, in CSS pixels: the declared canvas (layout
/// size of the body) and the scrollable content extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    pub width: f64,
    pub height: f64,
    pub content_width: f64,
    pub content_height: f64,
}

/// A capture clip in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Synchronous rendering-surface contract, executed on the worker thread.
/// Backends are constructed by the factory on the worker itself, so they
/// never cross a thread boundary.
pub trait SurfaceBackend: 'static {
    /// Load a document and wait until it is ready to measure.
    fn load(&mut self, path: &Path) -> Result<()>;

    /// Declared canvas size versus scrollable content extent.
    fn metrics(&mut self) -> Result<PageMetrics>;

    /// Full node snapshot: tags, attributes, computed styles, layout rects.
    fn snapshot(&mut self) -> Result<DomSnapshot>;

    /// Evaluate a script against the live document and return its JSON
    /// result. Used for document mutation (pseudo materialization, proxy
    /// node management).
    fn eval(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Capture a region of the rendered page as a PNG at `out`. `None`
    /// captures the whole viewport.
    fn capture(&mut self, region: Option<CaptureRegion>, out: &Path) -> Result<()>;

    /// Release the surface.
    fn close(&mut self) -> Result<()>;
}

enum Command {
    Load(PathBuf, oneshot::Sender<Result<()>>),
    Metrics(oneshot::Sender<Result<PageMetrics>>),
    Snapshot(oneshot::Sender<Result<DomSnapshot>>),
    Eval(String, oneshot::Sender<Result<serde_json::Value>>),
    Capture(
        Option<CaptureRegion>,
        PathBuf,
        oneshot::Sender<Result<()>>,
    ),
    Close(oneshot::Sender<Result<()>>),
}

/// Async facade over a worker-owned backend.
#[derive(Clone)]
pub struct Surface {
    cmd_tx: Sender<Command>,
    timeout_ms: u64,
}

impl Surface {
    /// Spawn a worker thread owning the backend produced by `factory`.
    /// The factory runs on the worker so the backend never has to be
    /// `Send`-safe across await points.
    pub async fn start<B, F>(factory: F, timeout_ms: u64) -> Result<Self>
    where
        B: SurfaceBackend,
        F: FnOnce() -> Result<B> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::spawn(move || {
            let mut backend = match factory() {
                Ok(b) => b,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Load(path, resp) => {
                        let _ = resp.send(backend.load(&path));
                    }
                    Command::Metrics(resp) => {
                        let _ = resp.send(backend.metrics());
                    }
                    Command::Snapshot(resp) => {
                        let _ = resp.send(backend.snapshot());
                    }
                    Command::Eval(script, resp) => {
                        let _ = resp.send(backend.eval(&script));
                    }
                    Command::Capture(region, out, resp) => {
                        let _ = resp.send(backend.capture(region, &out));
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(backend.close());
                        break;
                    }
                }
            }
        });

        init_rx
            .await
            .map_err(|_| Error::Initialization("surface worker exited during init".to_string()))??;

        Ok(Self {
            cmd_tx,
            timeout_ms,
        })
    }

    async fn roundtrip<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(build(tx))
            .map_err(|_| Error::Surface("surface worker is gone".to_string()))?;
        match tokio::time::timeout(Duration::from_millis(self.timeout_ms), rx).await {
            Err(_) => Err(Error::Timeout(self.timeout_ms)),
            Ok(Err(_)) => Err(Error::Surface(
                "surface worker dropped the reply".to_string(),
            )),
            Ok(Ok(result)) => result,
        }
    }

    pub async fn load(&self, path: &Path) -> Result<()> {
        let path = path.to_path_buf();
        self.roundtrip(|tx| Command::Load(path, tx)).await
    }

    pub async fn metrics(&self) -> Result<PageMetrics> {
        self.roundtrip(Command::Metrics).await
    }

    pub async fn snapshot(&self) -> Result<DomSnapshot> {
        self.roundtrip(Command::Snapshot).await
    }

    pub async fn eval(&self, script: &str) -> Result<serde_json::Value> {
        let script = script.to_string();
        self.roundtrip(|tx| Command::Eval(script, tx)).await
    }

    pub async fn capture(&self, region: Option<CaptureRegion>, out: &Path) -> Result<()> {
        let out = out.to_path_buf();
        self.roundtrip(|tx| Command::Capture(region, out, tx)).await
    }

    pub async fn close(&self) -> Result<()> {
        self.roundtrip(Command::Close).await
    }
}

/// Launch a surface over the default CDP backend.
#[cfg(feature = "cdp")]
pub async fn launch(config: &crate::Config) -> Result<Surface> {
    let cfg = config.clone();
    let timeout = config.timeout_ms;
    Surface::start(move || crate::cdp::CdpSurface::new(&cfg), timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LayoutRect;

    struct Scripted;

    impl SurfaceBackend for Scripted {
        fn load(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn metrics(&mut self) -> Result<PageMetrics> {
            Ok(PageMetrics {
                width: 1280.0,
                height: 720.0,
                content_width: 1280.0,
                content_height: 720.0,
            })
        }

        fn snapshot(&mut self) -> Result<DomSnapshot> {
            Ok(DomSnapshot::with_body(
                &[],
                LayoutRect::new(0.0, 0.0, 1280.0, 720.0),
            ))
        }

        fn eval(&mut self, _script: &str) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }

        fn capture(&mut self, _region: Option<CaptureRegion>, _out: &Path) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn commands_roundtrip_through_the_worker() {
        let surface = Surface::start(|| Ok(Scripted), 5_000)
            .await
            .unwrap();
        surface.load(Path::new("slide.html")).await.unwrap();
        let metrics = surface.metrics().await.unwrap();
        assert_eq!(metrics.width, 1280.0);
        let snap = surface.snapshot().await.unwrap();
        assert_eq!(snap.len(), 1);
        surface.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_factory_reports_initialization_error() {
        let result = Surface::start::<Scripted, _>(
            || Err(Error::Initialization("no backend".to_string())),
            5_000,
        )
        .await;
        assert!(matches!(result, Err(Error::Initialization(_))));
    }
}
