use scraper::{Html, Selector};

use crate::error::{Result, ScoutError};
use crate::table::{self, Table};

use super::RANKING_COLUMNS;

/// Parse the rankings page: event name from the `event-name` anchor, rankings
/// table from the `rankingsTable` anchor, reshaped to 11 columns with the
/// first row promoted to header.
pub fn parse_rankings_page(body: &str) -> Result<(String, Table)> {
    let doc = Html::parse_document(body);

    let event_name = element_text(&doc, "#event-name")
        .ok_or_else(|| ScoutError::MalformedPage("event-name anchor not found".into()))?;

    let rankings_text = element_text(&doc, "#rankingsTable")
        .ok_or_else(|| ScoutError::MalformedPage("rankingsTable anchor not found".into()))?;

    let tokens = table::tokenize(&rankings_text);
    let table = Table::from_tokens(tokens, RANKING_COLUMNS)?;
    Ok((event_name, table))
}

/// Text content of the first element matching `selector`, with each text node
/// on its own line so the tokenizer can split cell values apart. Leading and
/// trailing whitespace is trimmed; `None` if no element matches.
fn element_text(doc: &Html, selector: &str) -> Option<String> {
    // Selectors here are compile-time-known id selectors; parse failure would
    // be a programming error, not bad input.
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    let text: String = el
        .text()
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
