//! Paints a `RenderTree` into an RGBA bitmap.
//!
//! Output size is `natural size × display scale × density`. The canvas starts as
//! the opaque background colour and every pixel is forced opaque at the end.

use ab_glyph::{point, Font, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::surface::fonts::{FontBook, FontFamily, FontWeight};
use crate::surface::{DisplayItem, ImageSource, RenderTree};

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("surface has no visible area ({width}x{height} px)")]
    EmptySurface { width: u32, height: u32 },

    #[error("bitmap of {width}x{height} px exceeds the {limit} pixel limit")]
    TooLarge { width: u32, height: u32, limit: u64 },

    #[error("image from another origin cannot be read back: {0}")]
    CrossOrigin(String),

    #[error("embedded image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}

fn opaque(color: Rgba<u8>) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], 255])
}

/// Source-over blend of `color` at `coverage` (0..=1) onto one pixel.
fn blend(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
        return;
    }
    let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32 / 255.0).clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let px = canvas.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let dst = px[c] as f32;
        px[c] = (dst * (1.0 - alpha) + color[c] as f32 * alpha).round() as u8;
    }
}

fn fill_rect(canvas: &mut RgbaImage, x: f32, y: f32, width: f32, height: f32, color: Rgba<u8>) {
    let x0 = x.round().max(0.0) as i64;
    let y0 = y.round().max(0.0) as i64;
    let x1 = ((x + width).round() as i64).min(canvas.width() as i64);
    let y1 = ((y + height).round() as i64).min(canvas.height() as i64);
    // Hairlines still get one device pixel.
    let y1 = if y1 <= y0 && height > 0.0 { y0 + 1 } else { y1 };
    let x1 = if x1 <= x0 && width > 0.0 { x0 + 1 } else { x1 };
    for py in y0..y1 {
        for px in x0..x1 {
            blend(canvas, px, py, color, 1.0);
        }
    }
}

struct TextRun<'a> {
    x: f32,
    baseline: f32,
    size: f32,
    family: FontFamily,
    weight: FontWeight,
    color: Rgba<u8>,
    text: &'a str,
}

/// Draws text with real outlines when a face is loaded.
fn draw_outlined(canvas: &mut RgbaImage, fonts: &FontBook, run: &TextRun<'_>, factor: f32) -> bool {
    let Some(face) = fonts.face() else {
        return false;
    };
    let px_scale = PxScale::from(run.size * factor);
    let scaled = face.as_scaled(px_scale);
    let strokes: &[f32] = match run.weight {
        FontWeight::Regular => &[0.0],
        FontWeight::Bold => &[0.0, factor.max(1.0) * 0.6],
    };

    for offset in strokes {
        let mut pen_x = run.x * factor + offset;
        for c in run.text.chars() {
            let id = scaled.glyph_id(c);
            let glyph = id.with_scale_and_position(px_scale, point(pen_x, run.baseline * factor));
            if let Some(outlined) = face.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    blend(
                        canvas,
                        bounds.min.x as i64 + gx as i64,
                        bounds.min.y as i64 + gy as i64,
                        run.color,
                        coverage,
                    );
                });
            }
            pen_x += scaled.h_advance(id);
        }
    }
    true
}

/// Fallback: each visible character becomes a solid block sized from the
/// static metrics, so text mass and line positions are still faithful.
fn draw_blocks(canvas: &mut RgbaImage, fonts: &FontBook, run: &TextRun<'_>, factor: f32) {
    let mut pen_x = run.x * factor;
    let baseline = run.baseline * factor;
    let size = run.size * factor;
    let coverage = match run.weight {
        FontWeight::Regular => 0.8,
        FontWeight::Bold => 1.0,
    };
    for c in run.text.chars() {
        let advance = fonts.advance(c, run.family, run.weight, run.size) * factor;
        if !c.is_whitespace() {
            let tall = c.is_uppercase() || c.is_ascii_digit() || "bdfhklt".contains(c);
            let h = if tall { 0.7 } else { 0.5 } * size;
            let w = (advance * 0.75).max(1.0);
            let mut color = run.color;
            color[3] = (color[3] as f32 * coverage) as u8;
            fill_rect(canvas, pen_x, baseline - h, w, h, color);
        }
        pen_x += advance;
    }
}

fn draw_image(
    canvas: &mut RgbaImage,
    source: &ImageSource,
    rect: (f32, f32, f32, f32),
    factor: f32,
) -> Result<(), RasterError> {
    let bytes = match source {
        ImageSource::Embedded(bytes) => bytes,
        ImageSource::Remote(url) => return Err(RasterError::CrossOrigin(url.clone())),
    };
    let decoded = image::load_from_memory(bytes)?.to_rgba8();
    let (x, y, width, height) = rect;
    let w = (width * factor).round().max(1.0) as u32;
    let h = (height * factor).round().max(1.0) as u32;
    let resized = imageops::resize(&decoded, w, h, FilterType::Triangle);
    imageops::overlay(
        canvas,
        &resized,
        (x * factor).round() as i64,
        (y * factor).round() as i64,
    );
    Ok(())
}

/// Rasterizes `tree` at `density` device pixels per logical px.
///
/// The tree's display transform is honoured. Callers that want natural size
/// must reset it first.
pub fn rasterize(
    tree: &RenderTree,
    density: f32,
    background: Rgba<u8>,
    fonts: &FontBook,
    max_pixels: u64,
) -> Result<RgbaImage, RasterError> {
    let factor = tree.transform.scale * density;
    let (shown_width, shown_height) = tree.displayed_size();
    let width = (shown_width * density).round().max(0.0) as u32;
    let height = (shown_height * density).round().max(0.0) as u32;
    if width == 0 || height == 0 {
        return Err(RasterError::EmptySurface { width, height });
    }
    if width as u64 * height as u64 > max_pixels {
        return Err(RasterError::TooLarge {
            width,
            height,
            limit: max_pixels,
        });
    }

    let mut canvas = RgbaImage::from_pixel(width, height, opaque(background));

    for item in &tree.items {
        match item {
            DisplayItem::Rect {
                x,
                y,
                width,
                height,
                color,
            } => fill_rect(
                &mut canvas,
                x * factor,
                y * factor,
                width * factor,
                height * factor,
                *color,
            ),
            DisplayItem::Text {
                x,
                baseline,
                size,
                family,
                weight,
                color,
                text,
            } => {
                let run = TextRun {
                    x: *x,
                    baseline: *baseline,
                    size: *size,
                    family: *family,
                    weight: *weight,
                    color: *color,
                    text,
                };
                if !draw_outlined(&mut canvas, fonts, &run, factor) {
                    draw_blocks(&mut canvas, fonts, &run, factor);
                }
            }
            DisplayItem::Image {
                x,
                y,
                width,
                height,
                source,
            } => draw_image(&mut canvas, source, (*x, *y, *width, *height), factor)?,
        }
    }

    for px in canvas.pixels_mut() {
        px[3] = 255;
    }
    Ok(canvas)
}
