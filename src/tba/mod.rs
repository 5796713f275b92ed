pub mod insights;
pub mod rankings;

pub use insights::MetricLocator;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use tracing::debug;

use crate::error::{Result, ScoutError};
use crate::table::Table;

/// Number of columns in the published rankings table.
pub const RANKING_COLUMNS: usize = 11;

/// Client for The Blue Alliance public event pages.
///
/// No API key: both the rankings table and the OPR insights are scraped out
/// of the rendered pages, which is why everything downstream is string
/// surgery rather than a typed API response.
#[derive(Clone)]
pub struct TbaClient {
    http: Client,
    base_url: String,
    season: String,
}

impl TbaClient {
    pub fn new(base_url: &str, season: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(TbaClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            season: season.to_string(),
        })
    }

    fn event_url(&self, event_code: &str, anchor: &str) -> String {
        format!("{}/event/{}{}#{}", self.base_url, self.season, event_code, anchor)
    }

    /// Fetch the rankings page for an event and parse out the event name and
    /// the 11-column rankings table. Both come from the same document and are
    /// produced together or not at all.
    pub async fn fetch_rankings(&self, event_code: &str) -> Result<(String, Table)> {
        let url = self.event_url(event_code, "rankings");
        debug!("Fetching rankings page: {}", url);
        let body = self.get_page(&url).await?;
        rankings::parse_rankings_page(&body)
    }

    /// Fetch the event-insights page and extract the per-team OPR map from
    /// the embedded data blob.
    pub async fn fetch_opr(
        &self,
        event_code: &str,
        locator: &MetricLocator,
    ) -> Result<HashMap<String, f64>> {
        let url = self.event_url(event_code, "event-insights");
        debug!("Fetching insights page: {}", url);
        let body = self.get_page(&url).await?;
        insights::extract_metric(&body, locator)
    }

    /// GET a page and return its body. A 404 means the event code does not
    /// exist upstream, which is a distinct user-facing outcome from a fetch
    /// failure.
    async fn get_page(&self, url: &str) -> Result<String> {
        let resp = self.http.get(url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ScoutError::InvalidEventCode);
        }
        if !resp.status().is_success() {
            return Err(ScoutError::MalformedPage(format!(
                "unexpected status {} for {}",
                resp.status(),
                url
            )));
        }
        Ok(resp.text().await?)
    }
}
