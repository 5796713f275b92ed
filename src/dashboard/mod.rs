pub mod session;

pub use session::SessionStore;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::analysis::{analyzed_table, AnalysisResult};
use crate::error::ScoutError;
use crate::pipeline;
use crate::sheet::SheetClient;
use crate::tba::{MetricLocator, TbaClient};

const SESSION_COOKIE: &str = "scout_session";

#[derive(Clone)]
pub struct AppState {
    pub tba: TbaClient,
    pub sheet: SheetClient,
    pub locator: MetricLocator,
    pub sessions: SessionStore,
}

/// Build the Axum router for the front end.
///
/// The routes mirror the page flow: the home form posts to the raw-data
/// page, which runs the pipeline and caches the result; the analyzed and
/// raw-display pages re-render the cached result without recomputation.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/rawData.html", post(raw_data_handler))
        .route("/rawDataDisplay.html", get(raw_display_handler))
        .route("/analyzedData.html", get(analyzed_handler))
        .route("/reset", get(reset_handler))
        .route("/api/result", get(api_result_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Deserialize)]
struct EventCodeForm {
    #[serde(rename = "eventCode", default)]
    event_code: String,
}

async fn index_handler() -> impl IntoResponse {
    Html(page(
        "Event Scout",
        r#"<h1>Event Scout</h1>
<p>Enter an event code to pull its rankings and build a predicted ranking.</p>
<form action="/rawData.html" method="post">
  <input type="text" name="eventCode" placeholder="e.g. caut" autofocus>
  <button type="submit">Analyze</button>
</form>"#,
    ))
}

/// POST /rawData.html — run the full pipeline for the submitted event code,
/// cache the result in this browser's session, and render the raw table.
async fn raw_data_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(input): Form<EventCodeForm>,
) -> Response {
    let event_code = pipeline::normalize_event_code(&input.event_code);
    if event_code.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Html(page(
                "Empty event code",
                r#"<h1>No event code entered</h1>
<p>An event code is required.</p>
<p><a href="/">Back</a></p>"#,
            )),
        )
            .into_response();
    }

    let result =
        match pipeline::run_analysis(&state.tba, &state.sheet, &state.locator, &event_code).await {
            Ok(r) => Arc::new(r),
            Err(e) => return error_response(&event_code, &e),
        };

    let token = session_token(&headers).unwrap_or_else(SessionStore::new_token);
    state.sessions.insert(&token, Arc::clone(&result));

    let body = raw_page(&result);
    (
        [(
            header::SET_COOKIE,
            format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, token),
        )],
        Html(body),
    )
        .into_response()
}

/// GET /rawDataDisplay.html — re-render the cached raw table.
async fn raw_display_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    match cached_result(&state, &headers) {
        Some(result) => Html(raw_page(&result)).into_response(),
        None => Redirect::to("/").into_response(),
    }
}

/// GET /analyzedData.html — re-render the cached analyzed table.
async fn analyzed_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let result = match cached_result(&state, &headers) {
        Some(r) => r,
        None => return Redirect::to("/").into_response(),
    };
    let note = if result.notes_available {
        ""
    } else {
        r#"<p><em>Scouting notes were unavailable for this run.</em></p>"#
    };
    let body = format!(
        r#"<h1>{}</h1>
<h2>Analyzed Data</h2>
{}
{}
<p><a href="/rawDataDisplay.html">Raw data</a> | <a href="/reset">New event</a></p>"#,
        escape(&result.event_name),
        note,
        analyzed_table(&result.analyzed).to_html(),
    );
    Html(page("Analyzed Data", &body)).into_response()
}

/// GET /reset — drop this session's cached analysis and return home.
async fn reset_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Redirect {
    if let Some(token) = session_token(&headers) {
        state.sessions.remove(&token);
    }
    Redirect::to("/")
}

/// GET /api/result — the cached analysis as JSON.
async fn api_result_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    match cached_result(&state, &headers) {
        Some(result) => Json(result.as_ref().clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "no analysis cached for this session").into_response(),
    }
}

fn raw_page(result: &AnalysisResult) -> String {
    let body = format!(
        r#"<h1>{}</h1>
<h2>Raw Data</h2>
{}
<p><a href="/analyzedData.html">Analyzed data</a> | <a href="/reset">New event</a></p>"#,
        escape(&result.event_name),
        result.raw.to_html(),
    );
    page("Raw Data", &body)
}

fn cached_result(state: &AppState, headers: &HeaderMap) -> Option<Arc<AnalysisResult>> {
    let token = session_token(headers)?;
    state.sessions.get(&token)
}

/// The session token from the request's Cookie header, if present.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Map a pipeline failure onto its distinct user-facing page.
fn error_response(event_code: &str, err: &ScoutError) -> Response {
    let (status, title, message) = match err {
        ScoutError::InvalidEventCode => (
            StatusCode::NOT_FOUND,
            "Invalid event code",
            format!("No event was found for code '{}'.", escape(event_code)),
        ),
        ScoutError::Network(e) => (
            StatusCode::BAD_GATEWAY,
            "Fetch failed",
            format!("A page could not be fetched: {}", escape(&e.to_string())),
        ),
        ScoutError::MalformedPage(msg) => (
            StatusCode::BAD_GATEWAY,
            "Unexpected page structure",
            format!("The rankings page did not parse: {}", escape(msg)),
        ),
        ScoutError::MalformedMetricBlob(msg) => (
            StatusCode::BAD_GATEWAY,
            "Unexpected metric data",
            format!("The OPR data did not parse: {}", escape(msg)),
        ),
        // Sheet failures are recovered inside the pipeline; reaching here
        // would be a bug, but render it rather than panic.
        ScoutError::SheetUnavailable(msg) => (
            StatusCode::BAD_GATEWAY,
            "Scouting sheet unavailable",
            escape(msg),
        ),
    };
    error!("Analysis failed for '{}': {}", event_code, err);
    let body = format!(
        r#"<h1>{}</h1>
<p>{}</p>
<p><a href="/">Back</a></p>"#,
        title, message
    );
    (status, Html(page(title, &body))).into_response()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn page(title: &str, body: &str) -> String {
    PAGE_SHELL
        .replace("{{TITLE}}", title)
        .replace("{{BODY}}", body)
}

/// Embedded single-file page shell (HTML + CSS).
const PAGE_SHELL: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{TITLE}}</title>
<style>
  body { font-family: 'Segoe UI', system-ui, sans-serif; margin: 2rem auto; max-width: 72rem; color: #222; }
  h1 { font-size: 1.6rem; }
  h2 { font-size: 1.2rem; color: #555; }
  form { margin: 1rem 0; }
  input[type=text] { padding: 0.4rem; font-size: 1rem; }
  button { padding: 0.4rem 1rem; font-size: 1rem; }
  table { border-collapse: collapse; margin: 1rem 0; }
  th, td { padding: 0.3rem 0.6rem; border: 1px solid #ccc; }
  .table-striped tbody tr:nth-child(odd) { background: #f6f6f6; }
  .table-hover tbody tr:hover { background: #eef; }
</style>
</head>
<body>
{{BODY}}
</body>
</html>"#;
