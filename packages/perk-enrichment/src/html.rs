//! HTML helpers built on `scraper` and `htmd`.
//!
//! Title and heading checks for liveness, link discovery for crawling
//! and a markdown rendering for the extractor.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Tags dropped before conversion to markdown.
const SKIPPED_TAGS: [&str; 4] = ["script", "style", "noscript", "svg"];

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(html: &str, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let document = Html::parse_document(html);
    document.select(&selector).next().map(element_text)
}

/// Text of the `<title>` element.
pub fn extract_title(html: &str) -> Option<String> {
    first_text(html, "title").filter(|t| !t.is_empty())
}

/// Text of the first `<h1>` element.
pub fn first_heading(html: &str) -> Option<String> {
    first_text(html, "h1")
}

/// Every `class` attribute value, in document order.
pub fn class_attributes(html: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("[class]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("class"))
        .map(str::to_string)
        .collect()
}

/// Absolute links, skipping anchors and non-navigational schemes.
pub fn extract_links(base_url: &Url, html: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    for href in document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
    {
        if href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }

        if let Ok(resolved) = base_url.join(href) {
            let resolved = resolved.to_string();
            if !links.contains(&resolved) {
                links.push(resolved);
            }
        }
    }

    links
}

/// Convert HTML to markdown. Falls back to the document's plain text.
pub fn html_to_markdown(html: &str) -> String {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();

    match converter.convert(html) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(_) => {
            let document = Html::parse_document(html);
            element_text(document.root_element())
        }
    }
}
