use thiserror::Error;

/// Pipeline-wide errors.
///
/// The first four variants are fatal to a request and short-circuit before
/// any partial table is rendered. `SheetUnavailable` is recoverable: the
/// caller proceeds with null notes and logs a warning.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("no event found for that code (upstream returned 404)")]
    InvalidEventCode,

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed page: {0}")]
    MalformedPage(String),

    #[error("malformed metric blob: {0}")]
    MalformedMetricBlob(String),

    #[error("scouting sheet unavailable: {0}")]
    SheetUnavailable(String),
}

pub type Result<T> = std::result::Result<T, ScoutError>;
