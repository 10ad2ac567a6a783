// Render surfaces: the laid-out visual form of a resume that export captures.
// Layout is pure (resume + options → display list). Painting lives in `raster`.

pub mod fonts;
pub mod layout;
pub mod raster;
pub mod text;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::models::resume::{ResumeDocument, TemplateStyle};

pub use fonts::{FontBook, FontFamily, FontWeight};
pub use layout::layout_resume;

// ────────────────────────────────────────────────────────────────────────────
// Display list
// ────────────────────────────────────────────────────────────────────────────

/// Where an embedded image's bytes come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Encoded PNG/JPEG bytes already held by the surface.
    Embedded(Arc<Vec<u8>>),
    /// Content on another origin. Cannot be read back into a bitmap.
    Remote(String),
}

#[derive(Debug, Clone)]
pub enum DisplayItem {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgba<u8>,
    },
    Text {
        x: f32,
        /// Baseline, in logical px from the top of the surface.
        baseline: f32,
        size: f32,
        family: FontFamily,
        weight: FontWeight,
        color: Rgba<u8>,
        text: String,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        source: ImageSource,
    },
}

/// Display-only scale applied when the surface is shown (e.g. a 0.6 preview fit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    pub scale: f32,
}

impl DisplayTransform {
    pub const IDENTITY: DisplayTransform = DisplayTransform { scale: 1.0 };
}

impl Default for DisplayTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A laid-out display list. `width`/`height` are the natural, untransformed size
/// in logical px.
#[derive(Debug, Clone)]
pub struct RenderTree {
    pub width: f32,
    pub height: f32,
    pub transform: DisplayTransform,
    pub items: Vec<DisplayItem>,
}

impl RenderTree {
    /// Size in logical px after the display transform.
    pub fn displayed_size(&self) -> (f32, f32) {
        (
            self.width * self.transform.scale,
            self.height * self.transform.scale,
        )
    }
}

/// Explicit styling for one render call. Nothing about appearance is read from
/// shared state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub template: TemplateStyle,
    /// Show "Your Name"-style placeholders for empty header fields.
    pub placeholders: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            template: TemplateStyle::Professional,
            placeholders: true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Surface trait
// ────────────────────────────────────────────────────────────────────────────

/// A live rendered view that can be captured.
pub trait RenderSurface: Send + Sync {
    /// False once the view has been torn down.
    fn is_mounted(&self) -> bool;

    /// The transform currently applied on screen.
    fn display_transform(&self) -> DisplayTransform;

    /// Deep copy of the view laid out at `width` logical px, carrying the
    /// current display transform. Mutating the copy never affects the view.
    fn clone_tree(&self, width: f32) -> RenderTree;
}

/// Server-side stand-in for the editor preview of one resume.
pub struct PreviewSurface {
    resume: ResumeDocument,
    options: RenderOptions,
    fonts: Arc<FontBook>,
    transform: DisplayTransform,
    mounted: AtomicBool,
}

impl PreviewSurface {
    pub fn new(
        resume: ResumeDocument,
        options: RenderOptions,
        fonts: Arc<FontBook>,
        preview_scale: f32,
    ) -> Self {
        Self {
            resume,
            options,
            fonts,
            transform: DisplayTransform {
                scale: preview_scale,
            },
            mounted: AtomicBool::new(true),
        }
    }

    /// The editor closing the preview.
    #[cfg(test)]
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

impl RenderSurface for PreviewSurface {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    fn display_transform(&self) -> DisplayTransform {
        self.transform
    }

    fn clone_tree(&self, width: f32) -> RenderTree {
        let mut tree = layout_resume(&self.resume, &self.options, &self.fonts, width);
        tree.transform = self.display_transform();
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::ResumeContent;

    fn make_surface(scale: f32) -> PreviewSurface {
        PreviewSurface::new(
            ResumeDocument::new(ResumeContent::default()),
            RenderOptions::default(),
            Arc::new(FontBook::builtin()),
            scale,
        )
    }

    #[test]
    fn test_clone_carries_display_transform() {
        let surface = make_surface(0.6);
        let tree = surface.clone_tree(850.0);
        assert_eq!(tree.transform.scale, 0.6);
        assert_eq!(tree.width, 850.0);
        let (w, _) = tree.displayed_size();
        assert!((w - 510.0).abs() < 1e-3);
    }

    #[test]
    fn test_mutating_clone_leaves_surface_alone() {
        let surface = make_surface(0.6);
        let mut tree = surface.clone_tree(850.0);
        tree.transform = DisplayTransform::IDENTITY;
        assert_eq!(surface.display_transform().scale, 0.6);
    }

    #[test]
    fn test_unmount() {
        let surface = make_surface(1.0);
        assert!(surface.is_mounted());
        surface.unmount();
        assert!(!surface.is_mounted());
    }
}
