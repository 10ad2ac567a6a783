//! Text metrics for resume rendering.
//!
//! Two sources of glyph advances:
//! - a TrueType face loaded at startup (`EXPORT_FONT_PATH`), measured with `ab_glyph`;
//! - otherwise a static em-width table for a humanist sans, scaled per family.
//!
//! The static table is an approximation. It keeps layout deterministic when no
//! face is configured, which is also what the tests rely on.
//! Table index = (char as usize) - 32, covering ASCII 0x20..=0x7E.

use std::path::Path;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::resume::TemplateStyle;

/// Type family a template asks for. Only affects the static table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    Sans,
    Serif,
    Mono,
    Condensed,
}

impl FontFamily {
    pub fn for_template(template: TemplateStyle) -> Self {
        match template {
            TemplateStyle::Professional | TemplateStyle::Elegant => FontFamily::Serif,
            TemplateStyle::Minimalist => FontFamily::Sans,
            TemplateStyle::Tech => FontFamily::Mono,
            TemplateStyle::Creative => FontFamily::Condensed,
        }
    }

    /// Width relative to the sans table. Mono ignores the table entirely.
    fn width_factor(self) -> f32 {
        match self {
            FontFamily::Sans => 1.0,
            FontFamily::Serif => 0.88,
            FontFamily::Condensed => 0.82,
            FontFamily::Mono => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

#[rustfmt::skip]
static SANS_WIDTHS: [f32; 95] = [
    // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
    0.25, 0.30, 0.38, 0.56, 0.56, 0.89, 0.67, 0.22, 0.33, 0.33, 0.39, 0.59, 0.28, 0.33, 0.28, 0.31,
    // 0-9
    0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56, 0.56,
    // :     ;     <     =     >     ?     @
    0.28, 0.28, 0.59, 0.59, 0.59, 0.50, 1.02,
    // A-M
    0.67, 0.61, 0.61, 0.67, 0.56, 0.50, 0.67, 0.67, 0.25, 0.39, 0.61, 0.53, 0.78,
    // N-Z
    0.67, 0.72, 0.56, 0.72, 0.61, 0.50, 0.56, 0.67, 0.67, 0.89, 0.61, 0.61, 0.56,
    // [     \     ]     ^     _     `
    0.28, 0.31, 0.28, 0.47, 0.56, 0.34,
    // a-m
    0.56, 0.56, 0.50, 0.56, 0.56, 0.31, 0.56, 0.56, 0.22, 0.22, 0.53, 0.22, 0.83,
    // n-z
    0.56, 0.56, 0.56, 0.56, 0.33, 0.44, 0.39, 0.56, 0.50, 0.72, 0.50, 0.50, 0.44,
    // {     |     }     ~
    0.33, 0.26, 0.33, 0.59,
];

const AVERAGE_CHAR_WIDTH: f32 = 0.52;
const MONO_CHAR_WIDTH: f32 = 0.6;
/// Bold glyphs run slightly wider in the static table.
const BOLD_FACTOR: f32 = 1.06;

/// Measures text and, when a face is loaded, provides outlines for drawing.
#[derive(Clone, Default)]
pub struct FontBook {
    face: Option<FontArc>,
}

impl FontBook {
    /// Static-table metrics only.
    pub fn builtin() -> Self {
        Self { face: None }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file {}", path.display()))?;
        let face = FontArc::try_from_vec(bytes)
            .with_context(|| format!("{} is not a usable TrueType/OpenType font", path.display()))?;
        Ok(Self { face: Some(face) })
    }

    pub fn face(&self) -> Option<&FontArc> {
        self.face.as_ref()
    }

    /// Em-relative advance of one character in the static table.
    fn table_advance_em(c: char, family: FontFamily, weight: FontWeight) -> f32 {
        let base = if family == FontFamily::Mono {
            MONO_CHAR_WIDTH
        } else {
            let code = c as usize;
            let w = if (32..=126).contains(&code) {
                SANS_WIDTHS[code - 32]
            } else {
                AVERAGE_CHAR_WIDTH
            };
            w * family.width_factor()
        };
        match weight {
            FontWeight::Regular => base,
            FontWeight::Bold => base * BOLD_FACTOR,
        }
    }

    /// Advance of one character in logical px at `size` px.
    pub fn advance(&self, c: char, family: FontFamily, weight: FontWeight, size: f32) -> f32 {
        match &self.face {
            Some(face) => {
                let scaled = face.as_scaled(PxScale::from(size));
                scaled.h_advance(scaled.glyph_id(c))
            }
            None => Self::table_advance_em(c, family, weight) * size,
        }
    }

    pub fn measure(&self, text: &str, family: FontFamily, weight: FontWeight, size: f32) -> f32 {
        text.chars()
            .map(|c| self.advance(c, family, weight, size))
            .sum()
    }

    /// Splits a word wider than `max_width` into pieces that each fit.
    /// A piece always holds at least one character.
    fn break_word(
        &self,
        word: &str,
        family: FontFamily,
        weight: FontWeight,
        size: f32,
        max_width: f32,
    ) -> Vec<(String, f32)> {
        let mut pieces = Vec::new();
        let mut piece = String::new();
        let mut piece_width = 0.0_f32;
        for c in word.chars() {
            let w = self.advance(c, family, weight, size);
            if !piece.is_empty() && piece_width + w > max_width {
                pieces.push((std::mem::take(&mut piece), piece_width));
                piece_width = 0.0;
            }
            piece.push(c);
            piece_width += w;
        }
        if !piece.is_empty() {
            pieces.push((piece, piece_width));
        }
        pieces
    }

    /// Greedy word wrap at `max_width` logical px.
    ///
    /// A word wider than the line is broken by character width, starting on a
    /// fresh line.
    pub fn wrap(
        &self,
        text: &str,
        family: FontFamily,
        weight: FontWeight,
        size: f32,
        max_width: f32,
    ) -> Vec<String> {
        let space_w = self.advance(' ', family, weight, size);
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for word in text.split_whitespace() {
            let word_w = self.measure(word, family, weight, size);
            if word_w > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let mut pieces = self.break_word(word, family, weight, size, max_width);
                if let Some((last, last_w)) = pieces.pop() {
                    lines.extend(pieces.into_iter().map(|(piece, _)| piece));
                    current = last;
                    current_width = last_w;
                }
            } else if current.is_empty() {
                current.push_str(word);
                current_width = word_w;
            } else if current_width + space_w + word_w > max_width {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
                current_width = word_w;
            } else {
                current.push(' ');
                current.push_str(word);
                current_width += space_w + word_w;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_empty_is_zero() {
        let book = FontBook::builtin();
        assert_eq!(book.measure("", FontFamily::Sans, FontWeight::Regular, 12.0), 0.0);
    }

    #[test]
    fn test_measure_scales_with_size() {
        let book = FontBook::builtin();
        let small = book.measure("Resume", FontFamily::Sans, FontWeight::Regular, 10.0);
        let large = book.measure("Resume", FontFamily::Sans, FontWeight::Regular, 20.0);
        assert!((large - 2.0 * small).abs() < 1e-3);
    }

    #[test]
    fn test_non_ascii_falls_back_to_average() {
        let book = FontBook::builtin();
        let w = book.measure("é", FontFamily::Sans, FontWeight::Regular, 10.0);
        assert!((w - AVERAGE_CHAR_WIDTH * 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_condensed_narrower_than_sans() {
        let book = FontBook::builtin();
        let text = "Distributed systems engineer";
        let sans = book.measure(text, FontFamily::Sans, FontWeight::Regular, 12.0);
        let condensed = book.measure(text, FontFamily::Condensed, FontWeight::Regular, 12.0);
        assert!(condensed < sans);
    }

    #[test]
    fn test_wrap_respects_width() {
        let book = FontBook::builtin();
        let text =
            "Led the migration of a monolith to services across four teams and three regions";
        let max = 200.0;
        let lines = book.wrap(text, FontFamily::Sans, FontWeight::Regular, 12.0, max);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(book.measure(line, FontFamily::Sans, FontWeight::Regular, 12.0) <= max);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_breaks_overlong_word() {
        let book = FontBook::builtin();
        let link = "https://example.com/a/very/long/link";
        let max = 60.0;
        let lines = book.wrap(
            &format!("see {link}"),
            FontFamily::Sans,
            FontWeight::Regular,
            12.0,
            max,
        );
        assert!(lines.len() > 2);
        assert_eq!(lines[0], "see");
        for line in &lines {
            assert!(book.measure(line, FontFamily::Sans, FontWeight::Regular, 12.0) <= max);
        }
        assert_eq!(lines[1..].concat(), link);
    }

    #[test]
    fn test_wrap_narrower_than_one_glyph_still_progresses() {
        let book = FontBook::builtin();
        let lines = book.wrap("abc", FontFamily::Sans, FontWeight::Regular, 12.0, 1.0);
        assert_eq!(lines, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_template_families() {
        assert_eq!(FontFamily::for_template(TemplateStyle::Tech), FontFamily::Mono);
        assert_eq!(
            FontFamily::for_template(TemplateStyle::Professional),
            FontFamily::Serif
        );
    }
}
