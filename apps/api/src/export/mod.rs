// Export pipeline: Snapshot Capture → Page Tiler → Document Assembler → save.
// Linear, fail-fast, no retries. A failed run leaves no file behind.

pub mod assembler;
pub mod capture;
pub mod filename;
pub mod gate;
pub mod handlers;
pub mod sink;
pub mod tiler;

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::Rgba;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::surface::{FontBook, RenderSurface};

pub use assembler::assemble_pdf;
pub use capture::{capture_snapshot, OffscreenContainer};
pub use filename::export_filename;
pub use gate::ExportGate;
pub use sink::{DocumentSink, FsDocumentSink, S3DocumentSink};
pub use tiler::{mm_per_bitmap_px, plan_pages, PageGeometry};

/// Terminal failures of one export run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("render surface is not available for capture")]
    CaptureUnavailable,

    #[error("rasterization failed: {0}")]
    Rasterization(String),

    #[error("document assembly failed: {0}")]
    Assembly(String),
}

/// Fixed knobs of the pipeline, loaded once from config.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Device pixels per logical px (2.0 = print quality).
    pub pixel_density: f32,
    /// Capture width in logical px, independent of the preview scale.
    pub target_width: f32,
    pub page: PageGeometry,
    /// Fill behind the surface; PDF pages get no transparency.
    pub background: Rgba<u8>,
    /// Wait before rasterizing so late style/layout changes land.
    pub settle_delay: Duration,
    /// Largest bitmap (width × height) capture may allocate.
    pub max_pixels: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            pixel_density: 2.0,
            target_width: 850.0,
            page: PageGeometry::A4,
            background: Rgba([255, 255, 255, 255]),
            settle_delay: Duration::ZERO,
            max_pixels: 64_000_000,
        }
    }
}

/// Long-lived collaborators shared by every export run.
pub struct ExportContext {
    pub settings: ExportSettings,
    pub fonts: Arc<FontBook>,
    pub container: Arc<OffscreenContainer>,
    pub sink: Arc<dyn DocumentSink>,
}

/// Successful outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReceipt {
    pub filename: String,
    pub location: String,
    pub page_count: usize,
    pub size_bytes: usize,
}

/// Runs the whole pipeline for one surface.
///
/// `owner_name` drives the filename; `scope` groups outputs in the sink
/// (the resume id, or `adhoc`).
pub async fn export_document(
    surface: Option<&dyn RenderSurface>,
    owner_name: &str,
    scope: &str,
    ctx: &ExportContext,
) -> Result<ExportReceipt, ExportError> {
    let started = Instant::now();
    let result = run_pipeline(surface, owner_name, scope, ctx).await;
    let elapsed_ms = started.elapsed().as_millis();

    match &result {
        Ok(receipt) => info!(
            "Exported {} ({} pages, {} bytes) in {elapsed_ms}ms",
            receipt.filename, receipt.page_count, receipt.size_bytes
        ),
        Err(ExportError::CaptureUnavailable) => {
            warn!("Export aborted after {elapsed_ms}ms: surface unavailable")
        }
        Err(e) => error!("Export failed after {elapsed_ms}ms: {e}"),
    }
    result
}

async fn run_pipeline(
    surface: Option<&dyn RenderSurface>,
    owner_name: &str,
    scope: &str,
    ctx: &ExportContext,
) -> Result<ExportReceipt, ExportError> {
    let settings = &ctx.settings;
    let fonts = Arc::clone(&ctx.fonts);
    let bitmap = capture_snapshot(surface, settings, fonts, &ctx.container).await?;

    let plan = plan_pages(
        bitmap.width(),
        bitmap.height(),
        &settings.page,
        mm_per_bitmap_px(settings.pixel_density),
    );
    debug!(
        "Tiling {}x{} px bitmap into {} page(s), {} rows per page, scale {:.4}",
        bitmap.width(),
        bitmap.height(),
        plan.page_count(),
        plan.rows_per_page,
        plan.scale
    );
    let filename = export_filename(owner_name);

    // Assembly compresses every page and is CPU-bound like rasterization.
    // The bitmap is dropped inside the task.
    let geometry = settings.page;
    let title = filename::sanitize_stem(owner_name);
    let document = tokio::task::spawn_blocking(move || {
        assemble_pdf(&bitmap, &plan, &geometry, &title)
    })
    .await
    .map_err(|e| ExportError::Assembly(format!("assembly task failed: {e}")))??;

    let page_count = document.page_count;
    let size_bytes = document.bytes.len();
    let location = ctx.sink.persist(scope, &filename, document.bytes).await?;

    Ok(ExportReceipt {
        filename,
        location,
        page_count,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DisplayItem, DisplayTransform, RenderTree};
    use async_trait::async_trait;
    use flate2::read::ZlibDecoder;
    use lopdf::Document;
    use std::io::Read;
    use std::sync::Mutex;

    /// Test surface: every logical row is painted in a colour derived from its y.
    struct StripedSurface {
        height: f32,
    }

    fn row_color(y: u32) -> Rgba<u8> {
        Rgba([(y % 256) as u8, (y / 256) as u8, 99, 255])
    }

    impl RenderSurface for StripedSurface {
        fn is_mounted(&self) -> bool {
            true
        }

        fn display_transform(&self) -> DisplayTransform {
            DisplayTransform { scale: 0.6 }
        }

        fn clone_tree(&self, width: f32) -> RenderTree {
            let items = (0..self.height as u32)
                .map(|y| DisplayItem::Rect {
                    x: 0.0,
                    y: y as f32,
                    width,
                    height: 1.0,
                    color: row_color(y),
                })
                .collect();
            RenderTree {
                width,
                height: self.height,
                transform: self.display_transform(),
                items,
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentSink for RecordingSink {
        async fn persist(
            &self,
            _scope: &str,
            filename: &str,
            _bytes: Vec<u8>,
        ) -> Result<String, ExportError> {
            self.calls.lock().unwrap().push(filename.to_string());
            Ok(filename.to_string())
        }
    }

    fn make_context(sink: Arc<dyn DocumentSink>) -> ExportContext {
        ExportContext {
            settings: ExportSettings::default(),
            fonts: Arc::new(FontBook::builtin()),
            container: OffscreenContainer::new(),
            sink,
        }
    }

    #[tokio::test]
    async fn test_missing_surface_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context(Arc::new(FsDocumentSink::new(dir.path())));

        let err = export_document(None, "Ana María Ruiz", "adhoc", &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::CaptureUnavailable));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(ctx.container.attached(), 0);
    }

    #[tokio::test]
    async fn test_two_page_export_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = make_context(Arc::new(FsDocumentSink::new(dir.path())));
        // 1800 logical rows → 3600 bitmap rows at 2x, about 1.45 A4 pages.
        let surface = StripedSurface { height: 1800.0 };

        let receipt = export_document(Some(&surface), "Ana María Ruiz", "adhoc", &ctx)
            .await
            .unwrap();

        assert_eq!(receipt.filename, "Ana_Maria_Ruiz.pdf");
        assert_eq!(receipt.page_count, 2);
        assert_eq!(ctx.container.attached(), 0);

        let bytes = std::fs::read(&receipt.location).unwrap();
        assert_eq!(bytes.len(), receipt.size_bytes);
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);

        let plan = plan_pages(1700, 3600, &PageGeometry::A4, mm_per_bitmap_px(2.0));
        let page = doc.get_object(pages[&2]).unwrap().as_dict().unwrap();
        let xobjects = page
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"XObject")
            .unwrap()
            .as_dict()
            .unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(
            stream.dict.get(b"Height").unwrap().as_i64().unwrap() as u32,
            plan.slices[1].slice_height_px
        );

        let mut raw = Vec::new();
        ZlibDecoder::new(stream.content.as_slice())
            .read_to_end(&mut raw)
            .unwrap();
        // Bitmap row r comes from logical row r / 2 at density 2.
        let expected = row_color(plan.slices[1].source_y_offset / 2);
        assert_eq!(&raw[..3], &expected.0[..3]);
    }

    #[tokio::test]
    async fn test_rasterization_failure_never_reaches_sink() {
        let sink = Arc::new(RecordingSink::default());
        let mut ctx = make_context(sink.clone());
        ctx.settings.max_pixels = 10;
        let surface = StripedSurface { height: 100.0 };

        let err = export_document(Some(&surface), "Ana", "adhoc", &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Rasterization(_)));
        assert!(sink.calls.lock().unwrap().is_empty());
        assert_eq!(ctx.container.attached(), 0);
    }

    #[tokio::test]
    async fn test_short_resume_is_one_page() {
        let sink = Arc::new(RecordingSink::default());
        let ctx = make_context(sink.clone());
        let surface = StripedSurface { height: 600.0 };

        let receipt = export_document(Some(&surface), "", "adhoc", &ctx)
            .await
            .unwrap();

        assert_eq!(receipt.page_count, 1);
        assert_eq!(receipt.filename, "resume.pdf");
        assert_eq!(*sink.calls.lock().unwrap(), vec!["resume.pdf".to_string()]);
    }
}
