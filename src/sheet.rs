use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

use crate::error::{Result, ScoutError};

/// Separator used when one team has several scouting notes.
const NOTE_SEPARATOR: &str = ", ";

/// Loader for the shared scouting spreadsheet, published as an HTML page by
/// Google Sheets. One sheet serves every event; rows are keyed by team.
#[derive(Clone)]
pub struct SheetClient {
    http: Client,
    url: String,
}

impl SheetClient {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(SheetClient {
            http,
            url: url.to_string(),
        })
    }

    /// Fetch and aggregate the scouting notes: one combined string per team.
    ///
    /// Any failure here is recoverable — qualitative data is enrichment, and
    /// the caller proceeds with null notes.
    pub async fn fetch_notes(&self) -> Result<HashMap<String, String>> {
        debug!("Fetching scouting sheet: {}", self.url);
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ScoutError::SheetUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ScoutError::SheetUnavailable(format!(
                "unexpected status {}",
                resp.status()
            )));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| ScoutError::SheetUnavailable(e.to_string()))?;
        parse_notes(&body)
    }
}

/// Parse the published sheet HTML into a team -> combined-notes map.
///
/// The first table on the page is the sheet body. Its first content row
/// carries the real column names (the form response header); the `Timestamp`
/// bookkeeping column and the unnamed placeholder column are dropped, as are
/// the two leading non-data rows. Remaining rows are grouped by team with
/// all notes joined by `", "`.
pub fn parse_notes(body: &str) -> Result<HashMap<String, String>> {
    let doc = Html::parse_document(body);
    let table_sel =
        Selector::parse("table").map_err(|e| ScoutError::SheetUnavailable(e.to_string()))?;
    let row_sel =
        Selector::parse("tr").map_err(|e| ScoutError::SheetUnavailable(e.to_string()))?;
    let cell_sel =
        Selector::parse("td, th").map_err(|e| ScoutError::SheetUnavailable(e.to_string()))?;

    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| ScoutError::SheetUnavailable("no table in sheet page".into()))?;

    let rows: Vec<Vec<String>> = table
        .select(&row_sel)
        .map(|tr| {
            tr.select(&cell_sel)
                .map(|td| td.text().collect::<String>().trim().to_string())
                .collect()
        })
        .collect();

    // Row 0 is the real header; row 1 is bookkeeping, not data.
    if rows.len() < 2 {
        return Err(ScoutError::SheetUnavailable(format!(
            "sheet has only {} row(s)",
            rows.len()
        )));
    }
    let header = &rows[0];
    let team_col = column(header, "Team")
        .ok_or_else(|| ScoutError::SheetUnavailable("no Team column in sheet".into()))?;
    let notes_col = column(header, "Notes")
        .ok_or_else(|| ScoutError::SheetUnavailable("no Notes column in sheet".into()))?;

    let mut notes: HashMap<String, String> = HashMap::new();
    for row in rows.iter().skip(2) {
        let team = match row.get(team_col) {
            Some(t) if !t.is_empty() => t.clone(),
            _ => continue,
        };
        let note = row.get(notes_col).map(String::as_str).unwrap_or("");
        match notes.get_mut(&team) {
            Some(existing) => {
                existing.push_str(NOTE_SEPARATOR);
                existing.push_str(note);
            }
            None => {
                notes.insert(team, note.to_string());
            }
        }
    }
    Ok(notes)
}

fn column(header: &[String], name: &str) -> Option<usize> {
    header.iter().position(|h| h == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_page(data_rows: &str) -> String {
        format!(
            r#"<html><body><table>
            <tr><td>Timestamp</td><td>Team</td><td>Notes</td><td></td></tr>
            <tr><td>bookkeeping</td><td></td><td></td><td></td></tr>
            {data_rows}
            </table></body></html>"#
        )
    }

    #[test]
    fn test_single_note_per_team() {
        let body = sheet_page(
            r#"<tr><td>3/1 10:22</td><td>254</td><td>fast cycles</td><td></td></tr>"#,
        );
        let notes = parse_notes(&body).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes["254"], "fast cycles");
    }

    #[test]
    fn test_multiple_notes_joined() {
        let body = sheet_page(
            r#"<tr><td>t1</td><td>1114</td><td>strong auto</td><td></td></tr>
               <tr><td>t2</td><td>254</td><td>fast cycles</td><td></td></tr>
               <tr><td>t3</td><td>1114</td><td>weak endgame</td><td></td></tr>"#,
        );
        let notes = parse_notes(&body).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes["1114"], "strong auto, weak endgame");
        assert_eq!(notes["254"], "fast cycles");
    }

    #[test]
    fn test_rows_without_team_are_skipped() {
        let body = sheet_page(
            r#"<tr><td>t1</td><td></td><td>orphan note</td><td></td></tr>
               <tr><td>t2</td><td>254</td><td>ok</td><td></td></tr>"#,
        );
        let notes = parse_notes(&body).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes["254"], "ok");
    }

    #[test]
    fn test_no_table_is_unavailable() {
        let err = parse_notes("<html><body><p>gone</p></body></html>").unwrap_err();
        assert!(matches!(err, ScoutError::SheetUnavailable(_)));
    }

    #[test]
    fn test_missing_team_column_is_unavailable() {
        let body = r#"<table>
            <tr><td>Timestamp</td><td>Squad</td><td>Notes</td></tr>
            <tr><td>a</td><td>b</td><td>c</td></tr>
            <tr><td>a</td><td>b</td><td>c</td></tr>
        </table>"#;
        let err = parse_notes(body).unwrap_err();
        assert!(matches!(err, ScoutError::SheetUnavailable(msg) if msg.contains("Team")));
    }
}
