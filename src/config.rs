use clap::Parser;

/// FRC event analyzer with a web front end
#[derive(Parser, Debug, Clone)]
#[command(name = "event-scout", version, about)]
pub struct Config {
    /// Listen address for the web front end
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Base URL of The Blue Alliance
    #[arg(
        long,
        env = "TBA_BASE_URL",
        default_value = "https://www.thebluealliance.com"
    )]
    pub tba_base_url: String,

    /// Season prefix for event pages (event URL is <season><code>)
    #[arg(long, env = "TBA_SEASON", default_value = "2024")]
    pub season: String,

    /// Published scouting spreadsheet URL (one shared sheet for all events)
    #[arg(
        long,
        env = "SHEET_URL",
        default_value = "https://docs.google.com/spreadsheets/u/1/d/e/2PACX-1vQdEySR4HFSmPRIkghkzGFKMjrSRVu-K0P9uFterllQZFikHt1bnO-m7h-mV3B2pwamRy9jIIu5-fOa/pubhtml"
    )]
    pub sheet_url: String,

    /// Marker token locating the OPR array in the insights page
    #[arg(long, env = "OPR_MARKER", default_value = "OPR")]
    pub opr_marker: String,

    /// Which marker-split segment holds the OPR array (0-indexed). This is a
    /// positional contract with the insights page and shifts when the page
    /// layout does.
    #[arg(long, env = "OPR_SEGMENT", default_value = "5")]
    pub opr_segment: usize,

    /// Timeout for every outbound fetch, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "10")]
    pub fetch_timeout_secs: u64,

    /// Maximum number of concurrently cached sessions
    #[arg(long, env = "MAX_SESSIONS", default_value = "256")]
    pub max_sessions: usize,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.opr_marker.is_empty() {
            anyhow::bail!("opr_marker must not be empty");
        }
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("fetch_timeout_secs must be positive");
        }
        if self.max_sessions == 0 {
            anyhow::bail!("max_sessions must be positive");
        }
        if !self.tba_base_url.starts_with("http") {
            anyhow::bail!("tba_base_url must be an http(s) URL");
        }
        Ok(())
    }
}
