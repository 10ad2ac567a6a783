//! Plain-text helpers for rich-text fields and dates.

use chrono::NaiveDate;
use scraper::{ElementRef, Html};

const BULLET: &str = "\u{2022}";

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div" | "li" | "ul" | "ol" | "blockquote" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

/// Accumulates inline text and cuts it into paragraphs at block boundaries.
#[derive(Default)]
struct ParagraphCollector {
    paragraphs: Vec<String>,
    current: String,
}

impl ParagraphCollector {
    fn flush(&mut self) {
        // Newlines only survive in plain-text input; HTML whitespace is already
        // collapsed to spaces below.
        for line in self.current.lines() {
            let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
            if !line.is_empty() && line != BULLET {
                self.paragraphs.push(line);
            }
        }
        self.current.clear();
    }

    fn walk(&mut self, element: ElementRef<'_>, plain: bool) {
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                let name = child_element.value().name();
                if name == "br" {
                    self.flush();
                    continue;
                }
                let block = is_block(name);
                if block {
                    self.flush();
                }
                if name == "li" {
                    self.current.push_str(BULLET);
                    self.current.push(' ');
                }
                self.walk(child_element, plain);
                if block {
                    self.flush();
                }
            } else if let Some(text_node) = child.value().as_text() {
                let text: &str = text_node;
                if plain {
                    self.current.push_str(text);
                } else {
                    self.current.extend(text.chars().map(|c| if c == '\n' { ' ' } else { c }));
                }
            }
        }
    }
}

/// Flattens editor markup into display paragraphs.
///
/// The markup is parsed as an HTML fragment, so every named and numeric entity
/// is decoded. Block elements and `<br>` end a paragraph, list items get a
/// bullet prefix, inline tags are dropped. Markup without any element keeps
/// its line breaks. Empty paragraphs are removed.
pub fn paragraphs(markup: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(markup);
    let root = fragment.root_element();
    let plain = !root.children().any(|child| child.value().is_element());

    let mut collector = ParagraphCollector::default();
    collector.walk(root, plain);
    collector.flush();
    collector.paragraphs
}

/// Formats `YYYY-MM` or `YYYY-MM-DD` as `Mon YYYY`. Anything else is returned unchanged.
pub fn display_date(raw: &str) -> String {
    let raw = raw.trim();
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d"));
    match parsed {
        Ok(date) => date.format("%b %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// `Mar 2021 - Jun 2023`, `Mar 2021 - Present`, or empty when no start date.
pub fn date_range(start: &str, end: &str) -> String {
    if start.trim().is_empty() {
        return String::new();
    }
    let end = if end.trim().is_empty() {
        "Present".to_string()
    } else {
        display_date(end)
    };
    format!("{} - {}", display_date(start), end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_from_list_markup() {
        let html = concat!(
            "<p>Built <strong>things</strong></p>",
            "<ul><li>Cut latency 40%</li><li>Led 3 engineers</li></ul>",
        );
        assert_eq!(
            paragraphs(html),
            vec![
                "Built things".to_string(),
                "\u{2022} Cut latency 40%".to_string(),
                "\u{2022} Led 3 engineers".to_string(),
            ]
        );
    }

    #[test]
    fn test_paragraphs_plain_text_and_entities() {
        assert_eq!(paragraphs("R&amp;D  lead"), vec!["R&D lead".to_string()]);
        assert!(paragraphs("<p></p>").is_empty());
    }

    #[test]
    fn test_numeric_and_named_entities_are_decoded() {
        assert_eq!(
            paragraphs("<p>Team&#8217;s lead &eacute;t&eacute;</p>"),
            vec!["Team\u{2019}s lead \u{e9}t\u{e9}".to_string()]
        );
        assert_eq!(
            paragraphs("<p>5 &lt; 7&nbsp;&amp;&#x20AC;10</p>"),
            vec!["5 < 7 &\u{20ac}10".to_string()]
        );
    }

    #[test]
    fn test_breaks_and_plain_lines() {
        assert_eq!(
            paragraphs("First<br>Second<div>Third</div>"),
            vec!["First".to_string(), "Second".to_string(), "Third".to_string()]
        );
        assert_eq!(
            paragraphs("Line one\nLine two"),
            vec!["Line one".to_string(), "Line two".to_string()]
        );
        assert_eq!(
            paragraphs("<p>Wrapped\n source line</p>"),
            vec!["Wrapped source line".to_string()]
        );
    }

    #[test]
    fn test_display_date_formats() {
        assert_eq!(display_date("2021-03"), "Mar 2021");
        assert_eq!(display_date("2021-03-15"), "Mar 2021");
        assert_eq!(display_date("Summer 2020"), "Summer 2020");
    }

    #[test]
    fn test_date_range() {
        assert_eq!(date_range("2021-03", "2023-06"), "Mar 2021 - Jun 2023");
        assert_eq!(date_range("2021-03", ""), "Mar 2021 - Present");
        assert_eq!(date_range("", "2023-06"), "");
    }
}
