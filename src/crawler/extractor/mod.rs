
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

/// Containers whose text is kept when it is long enough
const MIN_BLOCK_CHARS: usize = 200;

static UNWANTED: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("script, style, header, footer, nav, aside, form").ok());
static MAIN: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("main").ok());
static BLOCKS: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("article, section, div").ok());

/// Pull the readable text out of a page.
///
/// Page chrome (scripts, styles, headers, footers, navigation, asides and
/// forms) is removed first. The text of `<main>` is collected, followed by
/// every `article`, `section` or `div` holding more than 200 characters. If
/// nothing qualifies the whole document's text is used. Pieces are separated
/// by a blank line; text nodes within a piece by a newline.
#[inline]
pub fn extract_relevant_text(html: &str) -> String {
    let mut document = Html::parse_document(html);
    if let Some(unwanted) = UNWANTED.as_ref() {
        remove_unwanted_elements(&mut document, unwanted);
    }

    let mut pieces = Vec::new();

    if let Some(main) = MAIN
        .as_ref()
        .and_then(|selector| document.select(selector).next())
    {
        pieces.push(element_text(main));
    }

    if let Some(blocks) = BLOCKS.as_ref() {
        for element in document.select(blocks) {
            let text = element_text(element);
            let text = text.trim();
            if text.chars().count() > MIN_BLOCK_CHARS {
                pieces.push(text.to_string());
            }
        }
    }

    if pieces.is_empty() {
        pieces.push(element_text(document.root_element()));
    }

    debug!("Extracted {} text blocks", pieces.len());
    pieces.join("\n\n")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("\n")
}

// Collect ids first; detaching while iterating a selection would alias the tree
fn remove_unwanted_elements(document: &mut Html, unwanted_selector: &Selector) {
    let unwanted_node_ids: Vec<_> = document
        .select(unwanted_selector)
        .map(|element| element.id())
        .collect();

    for node_id in unwanted_node_ids {
        if let Some(mut node) = document.tree.get_mut(node_id) {
            node.detach();
        }
    }
}
