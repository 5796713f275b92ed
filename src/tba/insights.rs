use std::collections::HashMap;

use crate::error::{Result, ScoutError};

/// Locator for the OPR array inside the insights page.
///
/// The metric is not exposed as a table: it sits in a literal array inside a
/// rendered script blob, so extraction splits the page text on `marker` and
/// takes a fixed split segment. That ordinal is a positional contract with
/// the page's current structure — it shifts whenever the page layout does,
/// which is why it is a parameter and not a constant.
#[derive(Debug, Clone)]
pub struct MetricLocator {
    pub marker: String,
    /// 0-indexed segment of the marker-split text to read (index 5 = the
    /// text following the 5th occurrence of the marker).
    pub segment: usize,
}

impl Default for MetricLocator {
    fn default() -> Self {
        MetricLocator {
            marker: "OPR".to_string(),
            segment: 5,
        }
    }
}

/// Extract the per-team metric map from an insights page body.
///
/// Algorithm: split on the marker, take the configured segment, truncate at
/// the first `]]` to isolate the array literal, split on commas, strip
/// bracket/quote/colon characters from each token, then pair the remaining
/// alternating tokens into team -> value, rounding values to 2 decimals.
///
/// The body is split as fetched, with no re-indented re-serialization pass
/// first: the marker count, the `]]` truncation, and the character stripping
/// depend only on the text content, so line-breaking and indentation cannot
/// change the result. That keeps the positional contract on the wire bytes
/// rather than on any serializer's formatting.
///
/// Every way this can go wrong is a distinct `MalformedMetricBlob` — an
/// empty or partial map is never returned silently, so "no data" and "parse
/// broke" stay distinguishable.
pub fn extract_metric(body: &str, locator: &MetricLocator) -> Result<HashMap<String, f64>> {
    let segments: Vec<&str> = body.split(locator.marker.as_str()).collect();
    // split() yields occurrences + 1 segments
    if segments.len() <= locator.segment {
        return Err(ScoutError::MalformedMetricBlob(format!(
            "marker '{}' occurs {} time(s), need segment {}",
            locator.marker,
            segments.len() - 1,
            locator.segment
        )));
    }
    let segment = segments[locator.segment];

    let (array, _) = segment.split_once("]]").ok_or_else(|| {
        ScoutError::MalformedMetricBlob("no closing ']]' after marker".into())
    })?;

    let tokens: Vec<String> = array
        .split(',')
        .map(|t| {
            t.chars()
                .filter(|c| !matches!(c, '[' | ']' | '"' | '\'' | ':'))
                .collect::<String>()
                .trim()
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return Err(ScoutError::MalformedMetricBlob(
            "no tokens in extracted array".into(),
        ));
    }
    if tokens.len() % 2 != 0 {
        return Err(ScoutError::MalformedMetricBlob(format!(
            "odd token count {} after stripping",
            tokens.len()
        )));
    }

    let mut metrics = HashMap::with_capacity(tokens.len() / 2);
    for pair in tokens.chunks(2) {
        let team = pair[0].clone();
        let value: f64 = pair[1].parse().map_err(|_| {
            ScoutError::MalformedMetricBlob(format!(
                "value '{}' for team '{}' is not a number",
                pair[1], team
            ))
        })?;
        metrics.insert(team, round2(value));
    }
    Ok(metrics)
}

/// Round to 2 decimal places.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
