//! Live surface → full-resolution bitmap.
//!
//! The surface is cloned into an off-screen container and the clone's display
//! transform is reset to 1:1 before rasterizing, so a shrunken preview is never
//! what gets captured. The clone is an RAII guard and detaches on drop, on
//! every exit path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::export::{ExportError, ExportSettings};
use crate::surface::raster::rasterize;
use crate::surface::{DisplayTransform, FontBook, RenderSurface, RenderTree};

/// Holds surface clones while they are being captured.
#[derive(Debug, Default)]
pub struct OffscreenContainer {
    attached: AtomicUsize,
}

impl OffscreenContainer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of clones currently attached.
    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::Acquire)
    }

    pub fn attach(self: &Arc<Self>, tree: RenderTree) -> OffscreenClone {
        self.attached.fetch_add(1, Ordering::AcqRel);
        debug!(
            "Attached off-screen clone ({}x{} logical px)",
            tree.width, tree.height
        );
        OffscreenClone {
            tree,
            container: Arc::clone(self),
        }
    }
}

/// A surface clone living in the off-screen container. Detaches on drop.
pub struct OffscreenClone {
    tree: RenderTree,
    container: Arc<OffscreenContainer>,
}

impl OffscreenClone {
    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    /// Neutralizes any preview scale. Only the clone is touched.
    pub fn reset_transform(&mut self) {
        self.tree.transform = DisplayTransform::IDENTITY;
    }
}

impl Drop for OffscreenClone {
    fn drop(&mut self) {
        self.container.attached.fetch_sub(1, Ordering::AcqRel);
        debug!("Detached off-screen clone");
    }
}

/// Immutable, fully opaque RGBA snapshot of a surface.
#[derive(Debug, Clone)]
pub struct Bitmap {
    image: RgbaImage,
}

impl Bitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

#[cfg(test)]
impl Bitmap {
    pub(crate) fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }
}

/// Captures `surface` at `settings.target_width` × `settings.pixel_density`.
///
/// Fails with `CaptureUnavailable` before touching anything when the surface
/// is absent or unmounted.
pub async fn capture_snapshot(
    surface: Option<&dyn RenderSurface>,
    settings: &ExportSettings,
    fonts: Arc<FontBook>,
    container: &Arc<OffscreenContainer>,
) -> Result<Bitmap, ExportError> {
    let surface = surface
        .filter(|s| s.is_mounted())
        .ok_or(ExportError::CaptureUnavailable)?;

    let mut clone = container.attach(surface.clone_tree(settings.target_width));
    clone.reset_transform();

    if !settings.settle_delay.is_zero() {
        tokio::time::sleep(settings.settle_delay).await;
    }
    if !surface.is_mounted() {
        warn!("Surface was unmounted while capture was settling");
        return Err(ExportError::Rasterization(
            "surface was detached during capture".to_string(),
        ));
    }

    let density = settings.pixel_density;
    let background = settings.background;
    let max_pixels = settings.max_pixels;

    // CPU-bound, so off the runtime. The clone moves into the task and is
    // released there even if rasterization panics.
    let image = tokio::task::spawn_blocking(move || {
        let result = rasterize(clone.tree(), density, background, &fonts, max_pixels);
        drop(clone);
        result
    })
    .await
    .map_err(|e| ExportError::Rasterization(format!("rasterization task failed: {e}")))?
    .map_err(|e| ExportError::Rasterization(e.to_string()))?;

    debug!(
        "Captured bitmap {}x{} px at density {density}",
        image.width(),
        image.height()
    );
    Ok(Bitmap { image })
}
