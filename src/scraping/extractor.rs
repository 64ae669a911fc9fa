//! Link and text extraction from HTML

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text is never page content
const NON_CONTENT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Absolute, fragment-free targets of every `<a href>` in document order,
/// without repeats.
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Ok(mut url) = base.join(href.trim()) {
            url.set_fragment(None);
            let link = url.to_string();
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    links
}

/// Visible text of the page body, whitespace-joined
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let root = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .unwrap_or_else(|| document.root_element());

    collect_text(root)
}

fn collect_text(root: ElementRef<'_>) -> String {
    let mut pieces: Vec<&str> = Vec::new();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map_or(false, |e| NON_CONTENT_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let text = text.trim();
        if !text.is_empty() {
            pieces.push(text);
        }
    }

    pieces.join(" ")
}
