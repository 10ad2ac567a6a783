//! Resume → display list.
//!
//! Single-column block layout. Each template is a `Theme` (type family,
//! colours, heading treatment); the block flow is the same for all of them.
//! All units are logical px at the requested surface width.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::Rgba;

use crate::models::resume::{ResumeDocument, TemplateStyle};
use crate::surface::fonts::{FontBook, FontFamily, FontWeight};
use crate::surface::text::{date_range, display_date, paragraphs};
use crate::surface::{DisplayItem, DisplayTransform, ImageSource, RenderOptions, RenderTree};

const PADDING: f32 = 48.0;
const NAME_SIZE: f32 = 28.0;
const TITLE_SIZE: f32 = 16.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT: f32 = 1.45;
const SECTION_GAP: f32 = 18.0;
const ITEM_GAP: f32 = 10.0;
const PHOTO_SIZE: f32 = 96.0;

const BLACK: Rgba<u8> = Rgba([17, 17, 17, 255]);
const GRAY: Rgba<u8> = Rgba([107, 114, 128, 255]);

struct Theme {
    family: FontFamily,
    accent: Rgba<u8>,
    centered_header: bool,
    uppercase_headings: bool,
    heading_rule: bool,
    /// Solid accent band behind the header.
    header_band: bool,
}

impl Theme {
    fn for_template(template: TemplateStyle) -> Self {
        let family = FontFamily::for_template(template);
        match template {
            TemplateStyle::Professional => Theme {
                family,
                accent: Rgba([55, 65, 81, 255]),
                centered_header: true,
                uppercase_headings: true,
                heading_rule: true,
                header_band: false,
            },
            TemplateStyle::Minimalist => Theme {
                family,
                accent: Rgba([37, 99, 235, 255]),
                centered_header: false,
                uppercase_headings: false,
                heading_rule: false,
                header_band: false,
            },
            TemplateStyle::Tech => Theme {
                family,
                accent: Rgba([22, 163, 74, 255]),
                centered_header: false,
                uppercase_headings: true,
                heading_rule: true,
                header_band: false,
            },
            TemplateStyle::Elegant => Theme {
                family,
                accent: Rgba([120, 53, 15, 255]),
                centered_header: true,
                uppercase_headings: false,
                heading_rule: true,
                header_band: false,
            },
            TemplateStyle::Creative => Theme {
                family,
                accent: Rgba([147, 51, 234, 255]),
                centered_header: false,
                uppercase_headings: true,
                heading_rule: false,
                header_band: true,
            },
        }
    }
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

/// Accumulates display items while flowing blocks down the page.
struct Composer<'a> {
    fonts: &'a FontBook,
    theme: Theme,
    width: f32,
    y: f32,
    items: Vec<DisplayItem>,
}

impl<'a> Composer<'a> {
    fn content_width(&self) -> f32 {
        (self.width - 2.0 * PADDING).max(1.0)
    }

    fn push_text(
        &mut self,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        weight: FontWeight,
        color: Rgba<u8>,
    ) {
        self.items.push(DisplayItem::Text {
            x,
            baseline,
            size,
            family: self.theme.family,
            weight,
            color,
            text: text.to_string(),
        });
    }

    fn aligned_x(
        &self,
        text: &str,
        size: f32,
        weight: FontWeight,
        align: Align,
        left: f32,
        right: f32,
    ) -> f32 {
        let w = self.fonts.measure(text, self.theme.family, weight, size);
        match align {
            Align::Left => left,
            Align::Center => left + ((right - left) - w).max(0.0) / 2.0,
        }
    }

    /// Wrapped block of text between `left` and `right`.
    #[allow(clippy::too_many_arguments)]
    fn block(
        &mut self,
        text: &str,
        size: f32,
        weight: FontWeight,
        color: Rgba<u8>,
        align: Align,
        left: f32,
        right: f32,
    ) {
        let lines = self
            .fonts
            .wrap(text, self.theme.family, weight, size, (right - left).max(1.0));
        for line in lines {
            let line_h = size * LINE_HEIGHT;
            let baseline = self.y + size;
            let x = self.aligned_x(&line, size, weight, align, left, right);
            self.push_text(&line, x, baseline, size, weight, color);
            self.y += line_h;
        }
    }

    fn full_block(
        &mut self,
        text: &str,
        size: f32,
        weight: FontWeight,
        color: Rgba<u8>,
        align: Align,
    ) {
        let right = self.width - PADDING;
        self.block(text, size, weight, color, align, PADDING, right);
    }

    /// Title on the left, secondary text (dates) flush right on the same baseline.
    fn split_line(&mut self, left_text: &str, right_text: &str, size: f32) {
        let right_edge = self.width - PADDING;
        let right_w = self
            .fonts
            .measure(right_text, self.theme.family, FontWeight::Regular, size);
        let start_y = self.y;
        if !right_text.is_empty() {
            let x = (right_edge - right_w).max(PADDING);
            self.push_text(right_text, x, start_y + size, size, FontWeight::Regular, GRAY);
        }
        let gutter = if right_text.is_empty() { 0.0 } else { right_w + 12.0 };
        let right = right_edge - gutter;
        self.block(left_text, size, FontWeight::Bold, BLACK, Align::Left, PADDING, right);
        if self.y == start_y {
            self.y += size * LINE_HEIGHT;
        }
    }

    fn rule(&mut self, color: Rgba<u8>, thickness: f32) {
        self.items.push(DisplayItem::Rect {
            x: PADDING,
            y: self.y,
            width: self.content_width(),
            height: thickness,
            color,
        });
        self.y += thickness;
    }

    fn heading(&mut self, label: &str) {
        self.y += SECTION_GAP;
        let text = if self.theme.uppercase_headings {
            label.to_uppercase()
        } else {
            label.to_string()
        };
        let align = if self.theme.centered_header && !self.theme.uppercase_headings {
            Align::Center
        } else {
            Align::Left
        };
        let accent = self.theme.accent;
        self.full_block(&text, HEADING_SIZE, FontWeight::Bold, accent, align);
        if self.theme.heading_rule {
            self.rule(accent, 1.0);
        }
        self.y += 6.0;
    }

    fn rich_text(&mut self, markup: &str) {
        for para in paragraphs(markup) {
            self.full_block(&para, BODY_SIZE, FontWeight::Regular, BLACK, Align::Left);
        }
    }
}

fn photo_source(photo: &str) -> Option<ImageSource> {
    let photo = photo.trim();
    if photo.is_empty() {
        return None;
    }
    if let Some(rest) = photo.strip_prefix("data:") {
        // data:image/png;base64,<payload>
        let payload = rest.split_once(";base64,").map(|(_, p)| p)?;
        let bytes = BASE64.decode(payload).ok()?;
        return Some(ImageSource::Embedded(Arc::new(bytes)));
    }
    Some(ImageSource::Remote(photo.to_string()))
}

fn header(c: &mut Composer<'_>, resume: &ResumeDocument, options: &RenderOptions) {
    let info = &resume.content.personal_info;
    let band_top = c.y;
    // Band goes under everything else in the header, so reserve its slot first.
    let band_index = c.items.len();

    let name = if info.full_name.trim().is_empty() && options.placeholders {
        "Your Name"
    } else {
        info.full_name.trim()
    };
    let title = if info.title.trim().is_empty() && options.placeholders {
        "Professional Title"
    } else {
        info.title.trim()
    };

    let photo = photo_source(&info.photo);
    let mut right = c.width - PADDING;
    if let Some(source) = photo {
        c.items.push(DisplayItem::Image {
            x: c.width - PADDING - PHOTO_SIZE,
            y: c.y,
            width: PHOTO_SIZE,
            height: PHOTO_SIZE,
            source,
        });
        right -= PHOTO_SIZE + 16.0;
    }

    let align = if c.theme.centered_header {
        Align::Center
    } else {
        Align::Left
    };
    let name_color = if c.theme.header_band {
        Rgba([255, 255, 255, 255])
    } else {
        BLACK
    };
    let sub_color = if c.theme.header_band {
        Rgba([237, 233, 254, 255])
    } else {
        GRAY
    };
    if !name.is_empty() {
        c.block(name, NAME_SIZE, FontWeight::Bold, name_color, align, PADDING, right);
    }
    if !title.is_empty() {
        c.block(title, TITLE_SIZE, FontWeight::Regular, sub_color, align, PADDING, right);
    }

    let contact: Vec<&str> = [
        info.email.as_str(),
        info.phone.as_str(),
        info.location.as_str(),
        info.website.as_str(),
        info.linkedin.as_str(),
    ]
    .into_iter()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect();
    if !contact.is_empty() {
        c.y += 4.0;
        let line = contact.join("  |  ");
        c.block(&line, BODY_SIZE, FontWeight::Regular, sub_color, align, PADDING, right);
    }

    if c.items.iter().any(|i| matches!(i, DisplayItem::Image { .. })) {
        c.y = c.y.max(band_top + PHOTO_SIZE);
    }

    if c.theme.header_band {
        c.y += 12.0;
        let band = DisplayItem::Rect {
            x: 0.0,
            y: 0.0,
            width: c.width,
            height: c.y,
            color: c.theme.accent,
        };
        c.items.insert(band_index, band);
    } else if c.theme.heading_rule && c.theme.centered_header {
        c.y += 10.0;
        c.rule(GRAY, 2.0);
    }
}

/// Lays out a resume at `width` logical px.
///
/// Pure: the same inputs always give the same tree. The returned tree has an
/// identity transform; surfaces apply their own display scale on top.
pub fn layout_resume(
    resume: &ResumeDocument,
    options: &RenderOptions,
    fonts: &FontBook,
    width: f32,
) -> RenderTree {
    let mut c = Composer {
        fonts,
        theme: Theme::for_template(options.template),
        width,
        y: PADDING,
        items: Vec::new(),
    };
    let content = &resume.content;

    header(&mut c, resume, options);

    if !paragraphs(&content.summary).is_empty() {
        c.heading("Professional Summary");
        c.rich_text(&content.summary);
    }

    if !content.experience.is_empty() {
        c.heading("Experience");
        for (i, exp) in content.experience.iter().enumerate() {
            if i > 0 {
                c.y += ITEM_GAP;
            }
            c.split_line(&exp.title, &date_range(&exp.start_date, &exp.end_date), BODY_SIZE + 1.0);
            let org = match (exp.company.trim(), exp.location.trim()) {
                ("", loc) => loc.to_string(),
                (company, "") => company.to_string(),
                (company, loc) => format!("{company}, {loc}"),
            };
            if !org.is_empty() {
                c.full_block(&org, BODY_SIZE, FontWeight::Regular, GRAY, Align::Left);
            }
            c.rich_text(&exp.description);
        }
    }

    if !content.projects.is_empty() {
        c.heading("Projects");
        for (i, project) in content.projects.iter().enumerate() {
            if i > 0 {
                c.y += ITEM_GAP;
            }
            c.split_line(
                &project.title,
                &date_range(&project.start_date, &project.end_date),
                BODY_SIZE + 1.0,
            );
            if !project.link.trim().is_empty() {
                let accent = c.theme.accent;
                c.full_block(
                    project.link.trim(),
                    BODY_SIZE,
                    FontWeight::Regular,
                    accent,
                    Align::Left,
                );
            }
            if !project.technologies.trim().is_empty() {
                c.full_block(
                    project.technologies.trim(),
                    BODY_SIZE,
                    FontWeight::Regular,
                    GRAY,
                    Align::Left,
                );
            }
            c.rich_text(&project.description);
        }
    }

    if !content.education.is_empty() {
        c.heading("Education");
        for (i, edu) in content.education.iter().enumerate() {
            if i > 0 {
                c.y += ITEM_GAP;
            }
            let graduated = if edu.graduation_date.trim().is_empty() {
                String::new()
            } else {
                display_date(&edu.graduation_date)
            };
            c.split_line(&edu.degree, &graduated, BODY_SIZE + 1.0);
            let org = match (edu.school.trim(), edu.location.trim()) {
                ("", loc) => loc.to_string(),
                (school, "") => school.to_string(),
                (school, loc) => format!("{school}, {loc}"),
            };
            if !org.is_empty() {
                c.full_block(&org, BODY_SIZE, FontWeight::Regular, GRAY, Align::Left);
            }
            c.rich_text(&edu.description);
        }
    }

    let skills: Vec<&str> = content
        .skills
        .iter()
        .map(|s| s.name.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !skills.is_empty() {
        c.heading("Skills");
        c.full_block(
            &skills.join(" \u{2022} "),
            BODY_SIZE,
            FontWeight::Regular,
            BLACK,
            Align::Left,
        );
    }

    if !content.certificates.is_empty() {
        c.heading("Certifications");
        for cert in &content.certificates {
            let mut line = cert.name.trim().to_string();
            if !cert.issuer.trim().is_empty() {
                line = format!("{line}, {}", cert.issuer.trim());
            }
            let date = if cert.date.trim().is_empty() {
                String::new()
            } else {
                display_date(&cert.date)
            };
            c.split_line(&line, &date, BODY_SIZE);
        }
    }

    let languages: Vec<String> = content
        .languages
        .iter()
        .filter(|l| !l.name.trim().is_empty())
        .map(|l| match l.proficiency.trim() {
            "" => l.name.trim().to_string(),
            level => format!("{} ({level})", l.name.trim()),
        })
        .collect();
    if !languages.is_empty() {
        c.heading("Languages");
        c.full_block(&languages.join(", "), BODY_SIZE, FontWeight::Regular, BLACK, Align::Left);
    }

    let height = (c.y + PADDING).ceil();
    RenderTree {
        width,
        height,
        transform: DisplayTransform::IDENTITY,
        items: c.items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{Experience, ResumeContent};

    fn make_resume(experience_count: usize) -> ResumeDocument {
        let mut content = ResumeContent::default();
        content.personal_info.full_name = "Ana María Ruiz".to_string();
        content.personal_info.email = "ana@example.com".to_string();
        content.summary = "<p>Backend engineer.</p>".to_string();
        for i in 0..experience_count {
            content.experience.push(Experience {
                id: format!("exp-{i}"),
                title: "Senior Engineer".to_string(),
                company: "Acme".to_string(),
                start_date: "2020-01".to_string(),
                description: concat!(
                    "<ul><li>Shipped a billing pipeline handling millions of events per day</li>",
                    "<li>Mentored four engineers</li></ul>",
                )
                .to_string(),
                ..Default::default()
            });
        }
        ResumeDocument::new(content)
    }

    fn texts(tree: &RenderTree) -> Vec<String> {
        tree.items
            .iter()
            .filter_map(|i| match i {
                DisplayItem::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_layout_is_deterministic() {
        let resume = make_resume(3);
        let fonts = FontBook::builtin();
        let a = layout_resume(&resume, &RenderOptions::default(), &fonts, 850.0);
        let b = layout_resume(&resume, &RenderOptions::default(), &fonts, 850.0);
        assert_eq!(a.height, b.height);
        assert_eq!(texts(&a), texts(&b));
    }

    #[test]
    fn test_more_content_is_taller() {
        let fonts = FontBook::builtin();
        let short = layout_resume(&make_resume(1), &RenderOptions::default(), &fonts, 850.0);
        let long = layout_resume(&make_resume(20), &RenderOptions::default(), &fonts, 850.0);
        assert!(long.height > short.height);
    }

    #[test]
    fn test_items_stay_within_width() {
        let fonts = FontBook::builtin();
        let tree = layout_resume(&make_resume(4), &RenderOptions::default(), &fonts, 850.0);
        for item in &tree.items {
            if let DisplayItem::Text { x, size, family, weight, text, .. } = item {
                let w = fonts.measure(text, *family, *weight, *size);
                assert!(*x >= 0.0);
                assert!(x + w <= 850.0 + 0.5, "text {text:?} overflows");
            }
        }
    }

    #[test]
    fn test_placeholders_only_when_enabled() {
        let fonts = FontBook::builtin();
        let resume = ResumeDocument::new(ResumeContent::default());
        let with = layout_resume(&resume, &RenderOptions::default(), &fonts, 850.0);
        assert!(texts(&with).contains(&"Your Name".to_string()));

        let options = RenderOptions {
            placeholders: false,
            ..RenderOptions::default()
        };
        let without = layout_resume(&resume, &options, &fonts, 850.0);
        assert!(!texts(&without).contains(&"Your Name".to_string()));
    }

    #[test]
    fn test_uppercase_headings_follow_template() {
        let fonts = FontBook::builtin();
        let resume = make_resume(1);
        let professional = layout_resume(&resume, &RenderOptions::default(), &fonts, 850.0);
        assert!(texts(&professional).contains(&"EXPERIENCE".to_string()));

        let options = RenderOptions {
            template: TemplateStyle::Minimalist,
            ..RenderOptions::default()
        };
        let minimalist = layout_resume(&resume, &options, &fonts, 850.0);
        assert!(texts(&minimalist).contains(&"Experience".to_string()));
    }

    #[test]
    fn test_photo_sources() {
        assert!(photo_source("").is_none());
        assert!(matches!(
            photo_source("https://cdn.example.com/me.png"),
            Some(ImageSource::Remote(_))
        ));
        assert!(matches!(
            photo_source("data:image/png;base64,iVBORw0KGgo="),
            Some(ImageSource::Embedded(_))
        ));
        assert!(photo_source("data:image/png,raw").is_none());
    }
}
