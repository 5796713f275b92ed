use serde::Serialize;

use crate::error::{Result, ScoutError};

/// A rectangular table of raw string cells with a named header row.
///
/// This is the working shape for everything scraped out of a page: every row
/// carries exactly `header.len()` cells, enforced at construction.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Split a cell-per-line text blob into trimmed, non-empty tokens.
///
/// The rankings table serializes with one cell value per line and plenty of
/// indentation noise; everything empty after trimming is dropped.
pub fn tokenize(blob: &str) -> Vec<String> {
    blob.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Table {
    /// Reshape a flat token stream into rows of `columns` cells, treating the
    /// first row as the header.
    ///
    /// Fails when the token count is not a multiple of `columns` — that means
    /// the page structure shifted and nothing downstream can be trusted.
    pub fn from_tokens(tokens: Vec<String>, columns: usize) -> Result<Table> {
        if columns == 0 {
            return Err(ScoutError::MalformedPage("column count is zero".into()));
        }
        if tokens.is_empty() || tokens.len() % columns != 0 {
            return Err(ScoutError::MalformedPage(format!(
                "cannot reshape {} tokens into rows of {}",
                tokens.len(),
                columns
            )));
        }
        let header = tokens[..columns].to_vec();
        let rows = tokens[columns..].chunks(columns).map(|c| c.to_vec()).collect();
        Ok(Table { header, rows })
    }

    /// Index of a named column, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Value of a named column in `row`, if the column exists.
    pub fn cell<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        self.column(name).map(|i| row[i].as_str())
    }

    /// A copy of this table without the named columns. Unknown names are
    /// ignored.
    pub fn drop_columns(&self, names: &[&str]) -> Table {
        let keep: Vec<usize> = (0..self.header.len())
            .filter(|&i| !names.contains(&self.header[i].as_str()))
            .collect();
        Table {
            header: keep.iter().map(|&i| self.header[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| keep.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    /// Render as an HTML table with every row centered, matching the
    /// presentation the front-end pages expect.
    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(256 + self.rows.len() * 64);
        out.push_str(r#"<table border="1" class="dataframe table-bordered table-striped table-hover">"#);
        out.push_str("\n<thead>\n");
        out.push_str(r#"<tr align="center">"#);
        for h in &self.header {
            out.push_str("<th>");
            out.push_str(&escape(h));
            out.push_str("</th>");
        }
        out.push_str("</tr>\n</thead>\n<tbody>\n");
        for row in &self.rows {
            out.push_str(r#"<tr align="center">"#);
            for cell in row {
                out.push_str("<td>");
                out.push_str(&escape(cell));
                out.push_str("</td>");
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
