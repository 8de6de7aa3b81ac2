//! HTML helpers for turning a fetched listing page into raw product blocks
//!
//! - Selecting the product blocks matched by the configured CSS selector
//! - Falling back to the page's visible text when nothing matched, so
//!   end-of-catalog banners still reach the page processor

use scraper::{Html, Selector};

/// Returns the outer HTML of every element matching `selector`, in document order
///
/// # Example
///
/// ```
/// use listing_harvest::crawler::select_blocks;
/// use scraper::Selector;
///
/// let html = r#"<ul><li class="sku">Kettle</li><li class="sku">Toaster</li></ul>"#;
/// let selector = Selector::parse("li.sku").unwrap();
/// let blocks = select_blocks(html, &selector);
/// assert_eq!(blocks.len(), 2);
/// assert!(blocks[0].contains("Kettle"));
/// ```
pub fn select_blocks(html: &str, selector: &Selector) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(selector)
        .map(|element| element.html())
        .collect()
}

/// Extracts the visible text of a document, one text node per line
///
/// Text inside `<script>`, `<style>` and `<noscript>` is skipped.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    body.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?;
            let hidden = parent
                .value()
                .as_element()
                .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
                .unwrap_or(false);
            if hidden {
                return None;
            }
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Blocks matched by `selector`, joined by newlines, or the visible text when
/// nothing matched
pub fn listing_content(html: &str, selector: &Selector) -> String {
    let blocks = select_blocks(html, selector);
    if blocks.is_empty() {
        visible_text(html)
    } else {
        blocks.join("\n")
    }
}
