//! Plain-text extraction from fetched HTML
//!
//! Pulls the page title and the text of common block elements, in document
//! order. Code blocks are set apart with blank lines.

use scraper::{ElementRef, Html, Selector};
use std::fmt;

const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, div, span, li, code, pre";
const NO_TITLE: &str = "No title found";

/// Text content of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Text of each matched element, in document order
    pub blocks: Vec<String>,
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().unwrap_or(NO_TITLE);
        let text = format!("{}\n\n{}", title, self.blocks.join("\n"));
        f.write_str(text.trim())
    }
}

/// Extracts the title and block text from an HTML document
///
/// # Example
///
/// ```
/// use scrape_guard::extract::extract_text;
///
/// let page = extract_text("<title>Hi</title><p>Hello <b>world</b></p>");
/// assert_eq!(page.title.as_deref(), Some("Hi"));
/// assert_eq!(page.blocks, vec!["Hello world".to_string()]);
/// ```
pub fn extract_text(html: &str) -> ExtractedText {
    let document = Html::parse_document(html);

    ExtractedText {
        title: extract_title(&document),
        blocks: extract_blocks(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_blocks(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse(BLOCK_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let text = element_text(&element);
            if text.is_empty() {
                return None;
            }

            match element.value().name() {
                "code" | "pre" => Some(format!("\n{}\n", text)),
                _ => Some(text),
            }
        })
        .collect()
}

/// Joins the element's trimmed text nodes with single spaces
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
