use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, ScoutError};
use crate::table::Table;
use crate::tba::insights::round2;

/// Prediction weights: raw metric, auto average, stage average, and the
/// penalty on disagreement between metric-implied rank and official rank.
const W_OPR: f64 = 0.35;
const W_AUTO: f64 = 0.3;
const W_STAGE: f64 = 0.1;
const W_RANK_GAP: f64 = 0.25;

/// Ranking columns that do not survive into the analyzed table.
/// `Record (W-L-T)` is dropped only after win % has been derived from it.
const DROPPED_COLUMNS: &[&str] = &[
    "Ranking Score",
    "Avg Coop",
    "Avg Match",
    "Record (W-L-T)",
    "DQ",
    "Played",
    "Total Ranking Points*",
];

/// One fully reconciled team record.
///
/// `win_pct` is null for an all-zero record, `opr` and `notes` are null when
/// the join found no match, and `prediction` is null whenever `opr` or
/// `win_pct` is.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedRow {
    pub team: String,
    pub avg_auto: f64,
    pub avg_stage: f64,
    pub win_pct: Option<f64>,
    pub opr: Option<f64>,
    pub notes: Option<String>,
    pub prediction: Option<f64>,
}

/// Everything one analysis run produces. Held in the session cache so the
/// raw and analyzed pages can be re-rendered without another scrape.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub event_name: String,
    pub raw: Table,
    pub analyzed: Vec<AnalyzedRow>,
    /// False when the scouting sheet was unreachable and notes are all null.
    pub notes_available: bool,
    pub computed_at: DateTime<Utc>,
}

/// Win percentage from a `"W-L-T"` record string.
///
/// `Ok(None)` for a 0-0-0 record: zero matches played means the percentage
/// is undefined, not a crash. An unparseable record is a malformed page.
pub fn win_percentage(record: &str) -> Result<Option<f64>> {
    let parts: Vec<&str> = record.split('-').collect();
    if parts.len() != 3 {
        return Err(ScoutError::MalformedPage(format!(
            "record '{}' is not W-L-T",
            record
        )));
    }
    let mut nums = [0u32; 3];
    for (i, p) in parts.iter().enumerate() {
        nums[i] = p.trim().parse().map_err(|_| {
            ScoutError::MalformedPage(format!("record '{}' has a non-integer part", record))
        })?;
    }
    let total = nums.iter().sum::<u32>();
    if total == 0 {
        return Ok(None);
    }
    Ok(Some(round2(f64::from(nums[0]) / f64::from(total) * 100.0)))
}

/// Merge the three sources into the final analyzed rows.
///
/// Left-joins on team identifier: every ranked team appears exactly once in
/// the output, with nulls where the metric or notes did not match. The
/// 0-indexed position in the metric-descending sort is the metric rank fed
/// into the prediction; the output is sorted by prediction descending.
pub fn reconcile(
    rankings: &Table,
    opr: &HashMap<String, f64>,
    notes: Option<&HashMap<String, String>>,
) -> Result<Vec<AnalyzedRow>> {
    // Win % comes from the full table; everything else from the slimmed one.
    let base = rankings.drop_columns(DROPPED_COLUMNS);
    let mut rows = Vec::with_capacity(base.rows.len());
    for (raw, slim) in rankings.rows.iter().zip(&base.rows) {
        let team = required_cell(&base, slim, "Team")?.to_string();
        let rank = parse_float(&base, slim, "Rank")?;
        let avg_auto = parse_float(&base, slim, "Avg Auto")?;
        let avg_stage = parse_float(&base, slim, "Avg Stage")?;
        let win_pct = win_percentage(required_cell(rankings, raw, "Record (W-L-T)")?)?;
        rows.push((rank, AnalyzedRow {
            opr: opr.get(&team).copied(),
            notes: notes.and_then(|n| n.get(&team).cloned()),
            team,
            avg_auto,
            avg_stage,
            win_pct,
            prediction: None,
        }));
    }

    // Metric rank: stable sort by OPR descending, nulls sinking to the end.
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        match (rows[a].1.opr, rows[b].1.opr) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });

    for (metric_rank, &i) in order.iter().enumerate() {
        let (official_rank, row) = &mut rows[i];
        if let (Some(opr), Some(_)) = (row.opr, row.win_pct) {
            let gap = (metric_rank as f64 - *official_rank).abs();
            row.prediction = Some(round2(
                (opr * W_OPR + row.avg_auto * W_AUTO + row.avg_stage * W_STAGE + gap * W_RANK_GAP)
                    / 4.0,
            ));
        }
    }

    // Final ordering: prediction descending, nulls last, dense 0-based.
    let mut analyzed: Vec<AnalyzedRow> = order.into_iter().map(|i| rows[i].1.clone()).collect();
    analyzed.sort_by(|a, b| match (a.prediction, b.prediction) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    Ok(analyzed)
}

/// The analyzed rows as a renderable table, columns matching the original
/// rankings minus [`DROPPED_COLUMNS`] plus the derived ones.
pub fn analyzed_table(rows: &[AnalyzedRow]) -> Table {
    let header = vec![
        "Team".to_string(),
        "Avg Auto".to_string(),
        "Avg Stage".to_string(),
        "Win %".to_string(),
        "OPR".to_string(),
        "Notes".to_string(),
        "Prediction".to_string(),
    ];
    let body = rows
        .iter()
        .map(|r| {
            vec![
                r.team.clone(),
                format_float(r.avg_auto),
                format_float(r.avg_stage),
                r.win_pct.map(format_float).unwrap_or_default(),
                r.opr.map(format_float).unwrap_or_default(),
                r.notes.clone().unwrap_or_default(),
                r.prediction.map(format_float).unwrap_or_default(),
            ]
        })
        .collect();
    Table { header, rows: body }
}

fn required_cell<'a>(table: &Table, row: &'a [String], name: &str) -> Result<&'a str> {
    table
        .cell(row, name)
        .ok_or_else(|| ScoutError::MalformedPage(format!("missing '{}' column", name)))
}

fn parse_float(table: &Table, row: &[String], name: &str) -> Result<f64> {
    let raw = required_cell(table, row, name)?;
    raw.trim().parse().map_err(|_| {
        ScoutError::MalformedPage(format!("column '{}' value '{}' is not numeric", name, raw))
    })
}

fn format_float(v: f64) -> String {
    format!("{:.2}", v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rankings(rows: &[[&str; 11]]) -> Table {
        let header = [
            "Rank",
            "Team",
            "Ranking Score",
            "Avg Coop",
            "Avg Match",
            "Avg Auto",
            "Avg Stage",
            "Record (W-L-T)",
            "DQ",
            "Played",
            "Total Ranking Points*",
        ];
        Table {
            header: header.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn two_teams() -> Table {
        rankings(&[
            ["1", "254", "3.1", "0.4", "90.0", "25.5", "11.2", "10-2-0", "0", "12", "37"],
            ["2", "1114", "2.9", "0.5", "85.0", "22.0", "10.1", "9-3-0", "0", "12", "35"],
        ])
    }

    #[test]
    fn test_win_percentage() {
        assert_relative_eq!(win_percentage("10-2-0").unwrap().unwrap(), 83.33, epsilon = 1e-9);
        assert_relative_eq!(win_percentage("9-3-0").unwrap().unwrap(), 75.0, epsilon = 1e-9);
        assert_relative_eq!(win_percentage("1-1-1").unwrap().unwrap(), 33.33, epsilon = 1e-9);
    }

    #[test]
    fn test_win_percentage_idempotent() {
        let a = win_percentage("7-4-1").unwrap().unwrap();
        let b = win_percentage("7-4-1").unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_win_percentage_zero_record_is_null() {
        assert_eq!(win_percentage("0-0-0").unwrap(), None);
    }

    #[test]
    fn test_win_percentage_malformed_record() {
        assert!(win_percentage("10-2").is_err());
        assert!(win_percentage("x-2-0").is_err());
    }

    #[test]
    fn test_reconcile_completeness() {
        // Metric matches one team, notes match the other: every ranked team
        // still appears exactly once, nulls where unmatched.
        let opr = HashMap::from([("254".to_string(), 19.0)]);
        let notes = HashMap::from([("1114".to_string(), "strong auto".to_string())]);
        let rows = reconcile(&two_teams(), &opr, Some(&notes)).unwrap();
        assert_eq!(rows.len(), 2);
        let t254 = rows.iter().find(|r| r.team == "254").unwrap();
        let t1114 = rows.iter().find(|r| r.team == "1114").unwrap();
        assert_eq!(t254.opr, Some(19.0));
        assert_eq!(t254.notes, None);
        assert_eq!(t1114.opr, None);
        assert_eq!(t1114.notes.as_deref(), Some("strong auto"));
        assert_eq!(t1114.prediction, None);
    }

    #[test]
    fn test_prediction_formula() {
        let opr = HashMap::from([
            ("254".to_string(), 30.0),
            ("1114".to_string(), 21.0),
        ]);
        let rows = reconcile(&two_teams(), &opr, None).unwrap();
        // 254: metric rank 0, official rank 1 -> gap 1
        // (30*0.35 + 25.5*0.3 + 11.2*0.1 + 1*0.25) / 4 = 19.52 / 4 = 4.88
        let t254 = rows.iter().find(|r| r.team == "254").unwrap();
        assert_relative_eq!(t254.prediction.unwrap(), 4.88, epsilon = 1e-9);
        // 1114: metric rank 1, official rank 2 -> gap 1
        // (21*0.35 + 22*0.3 + 10.1*0.1 + 1*0.25) / 4 = 15.21 / 4 = 3.80
        let t1114 = rows.iter().find(|r| r.team == "1114").unwrap();
        assert_relative_eq!(t1114.prediction.unwrap(), 3.8, epsilon = 1e-9);
    }

    #[test]
    fn test_prediction_ordering() {
        let opr = HashMap::from([
            ("254".to_string(), 30.0),
            ("1114".to_string(), 20.0),
        ]);
        let rows = reconcile(&two_teams(), &opr, None).unwrap();
        for pair in rows.windows(2) {
            match (pair[0].prediction, pair[1].prediction) {
                (Some(a), Some(b)) => assert!(a >= b),
                (None, Some(_)) => panic!("null prediction sorted above non-null"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_zero_record_nulls_prediction_but_keeps_row() {
        let table = rankings(&[
            ["1", "254", "3.1", "0.4", "90.0", "25.5", "11.2", "10-2-0", "0", "12", "37"],
            ["2", "971", "0.0", "0.0", "0.0", "5.0", "2.0", "0-0-0", "0", "0", "0"],
        ]);
        let opr = HashMap::from([
            ("254".to_string(), 30.0),
            ("971".to_string(), 10.0),
        ]);
        let rows = reconcile(&table, &opr, None).unwrap();
        assert_eq!(rows.len(), 2);
        let t971 = rows.iter().find(|r| r.team == "971").unwrap();
        assert_eq!(t971.win_pct, None);
        assert_eq!(t971.prediction, None);
        // The other team still gets a full row
        let t254 = rows.iter().find(|r| r.team == "254").unwrap();
        assert!(t254.prediction.is_some());
        // Nulls sort last
        assert_eq!(rows[1].team, "971");
    }

    #[test]
    fn test_metric_rank_uses_descending_opr_order() {
        // 1114 has the higher OPR, so it takes metric rank 0 despite being
        // officially ranked 2nd: gap |0 - 2| = 2.
        let opr = HashMap::from([
            ("254".to_string(), 10.0),
            ("1114".to_string(), 40.0),
        ]);
        let rows = reconcile(&two_teams(), &opr, None).unwrap();
        let t1114 = rows.iter().find(|r| r.team == "1114").unwrap();
        // (40*0.35 + 22*0.3 + 10.1*0.1 + 2*0.25) / 4 = 22.11 / 4 = 5.53
        assert_relative_eq!(t1114.prediction.unwrap(), 5.53, epsilon = 1e-9);
    }

    #[test]
    fn test_analyzed_table_shape() {
        let opr = HashMap::from([("254".to_string(), 19.0)]);
        let rows = reconcile(&two_teams(), &opr, None).unwrap();
        let table = analyzed_table(&rows);
        assert_eq!(
            table.header,
            vec!["Team", "Avg Auto", "Avg Stage", "Win %", "OPR", "Notes", "Prediction"]
        );
        assert_eq!(table.rows.len(), 2);
        // Unmatched metric renders as an empty cell, not a crash
        let t1114 = table.rows.iter().find(|r| r[0] == "1114").unwrap();
        assert_eq!(t1114[4], "");
        assert_eq!(t1114[5], "");
    }
}
