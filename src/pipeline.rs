use chrono::Utc;
use tracing::{info, warn};

use crate::analysis::{self, AnalysisResult};
use crate::error::Result;
use crate::sheet::SheetClient;
use crate::tba::{MetricLocator, TbaClient};

/// Normalize a user-supplied event code: trimmed and lower-cased.
pub fn normalize_event_code(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Run the full pipeline for one event code.
///
/// The rankings page, insights page, and scouting sheet are independent
/// reads, fetched concurrently; all three complete (or fail) before
/// reconciliation. Rankings or metric failures are fatal to the request. A
/// sheet failure is not: the result carries null notes and a warning is
/// logged once.
pub async fn run_analysis(
    tba: &TbaClient,
    sheet: &SheetClient,
    locator: &MetricLocator,
    event_code: &str,
) -> Result<AnalysisResult> {
    let (rankings_res, opr_res, notes_res) = tokio::join!(
        tba.fetch_rankings(event_code),
        tba.fetch_opr(event_code, locator),
        sheet.fetch_notes(),
    );

    let (event_name, rankings) = rankings_res?;
    let opr = opr_res?;
    let notes = match notes_res {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Scouting sheet unavailable, proceeding with null notes: {}", e);
            None
        }
    };

    let analyzed = analysis::reconcile(&rankings, &opr, notes.as_ref())?;
    info!(
        "Analyzed event '{}' ({}): {} teams, {} with OPR, notes {}",
        event_code,
        event_name,
        analyzed.len(),
        analyzed.iter().filter(|r| r.opr.is_some()).count(),
        if notes.is_some() { "loaded" } else { "unavailable" },
    );

    Ok(AnalysisResult {
        event_name,
        raw: rankings,
        analyzed,
        notes_available: notes.is_some(),
        computed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet;
    use crate::tba::insights;
    use crate::tba::rankings::parse_rankings_page;

    #[test]
    fn test_normalize_event_code() {
        assert_eq!(normalize_event_code("  CAUT \n"), "caut");
        assert_eq!(normalize_event_code("caut"), "caut");
        assert_eq!(normalize_event_code("   "), "");
    }

    /// End-to-end over synthetic pages: two ranked teams, a metric blob
    /// containing both, and an unreachable scouting sheet. The analyzed
    /// output has exactly 2 rows sorted by prediction descending with null
    /// notes throughout.
    #[test]
    fn test_end_to_end_with_failed_sheet() {
        let rankings_page = r#"<html>
          <h1 id="event-name">Utah Regional</h1>
          <table id="rankingsTable">
            <tr><th>Rank</th><th>Team</th><th>Ranking Score</th><th>Avg Coop</th>
                <th>Avg Match</th><th>Avg Auto</th><th>Avg Stage</th>
                <th>Record (W-L-T)</th><th>DQ</th><th>Played</th>
                <th>Total Ranking Points*</th></tr>
            <tr><td>1</td><td>254</td><td>3.1</td><td>0.4</td><td>90.0</td>
                <td>25.5</td><td>11.2</td><td>10-2-0</td><td>0</td><td>12</td><td>37</td></tr>
            <tr><td>2</td><td>1114</td><td>2.9</td><td>0.5</td><td>85.0</td>
                <td>22.0</td><td>10.1</td><td>9-3-0</td><td>0</td><td>12</td><td>35</td></tr>
          </table></html>"#;

        let insights_page = format!(
            "{}OPR\": [[\"254\",30.0],[\"1114\",21.0]]] tail",
            "OPR noise\n".repeat(4)
        );

        let (event_name, table) = parse_rankings_page(rankings_page).unwrap();
        assert_eq!(event_name, "Utah Regional");

        let opr = insights::extract_metric(&insights_page, &MetricLocator::default()).unwrap();
        assert_eq!(opr.len(), 2);

        // Sheet fetch failed upstream
        let notes = sheet::parse_notes("<html>oops, no table</html>");
        assert!(notes.is_err());

        let rows = analysis::reconcile(&table, &opr, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].prediction.unwrap() >= rows[1].prediction.unwrap());
        for row in &rows {
            assert!(row.win_pct.is_some());
            assert!(row.opr.is_some());
            assert!(row.prediction.is_some());
            assert!(row.notes.is_none());
        }
    }
}
