//! Browser dashboard: a ticker form that fetches, analyzes and renders both charts.

use crate::analysis::{fetch_and_analyze, Analysis};
use crate::api::RestClient;
use crate::config::Config;
use crate::error::{Result, SkewError};
use crate::models::{Aggregation, Clock, SkewPoint, SystemClock};
use crate::utils::{surface_plot, time_skew_plot, SKEW_TITLE, SURFACE_TITLE};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub const DEFAULT_SYMBOL: &str = "SPY";
const PAGE_TITLE: &str = "Volatility Surface and Time Skew Analysis";
const SUCCESS_MESSAGE: &str = "Data fetched successfully!";
const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

#[derive(Clone)]
pub struct AppState {
    client: Arc<RestClient>,
    clock: Arc<dyn Clock>,
    aggregation: Aggregation,
}

impl AppState {
    pub fn new(client: RestClient, clock: Arc<dyn Clock>, aggregation: Aggregation) -> Self {
        Self {
            client: Arc::new(client),
            clock,
            aggregation,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub symbol: Option<String>,
    pub aggregation: Option<String>,
}

impl DashboardQuery {
    fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn aggregation(&self, default: Aggregation) -> Result<Aggregation> {
        match self.aggregation.as_deref().map(str::trim) {
            None | Some("") => Ok(default),
            Some(raw) => raw.parse(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SurfaceResponse {
    pub moneyness: Vec<f64>,
    pub days_to_expiration: Vec<i64>,
    pub implied_volatility: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub record_count: usize,
    pub expired_count: usize,
    pub aggregation: Aggregation,
    pub surface: SurfaceResponse,
    pub skew: Vec<SkewPoint>,
}

impl From<&Analysis> for AnalysisResponse {
    fn from(analysis: &Analysis) -> Self {
        Self {
            symbol: analysis.symbol.clone(),
            as_of: analysis.as_of,
            record_count: analysis.record_count,
            expired_count: analysis.expired_count,
            aggregation: analysis.surface.aggregation,
            surface: SurfaceResponse {
                moneyness: analysis.surface.moneyness.clone(),
                days_to_expiration: analysis.surface.days_to_expiration.clone(),
                implied_volatility: analysis.surface.rows(),
            },
            skew: analysis.skew.points.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/analysis", get(analysis_handler))
        .with_state(state)
}

/// Run the dashboard until the process is stopped.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::new(
        RestClient::new(config.alpha_vantage.clone()),
        Arc::new(SystemClock),
        config.aggregation,
    );

    let listener = TcpListener::bind(config.dashboard_addr).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

enum Outcome {
    Idle,
    Loaded(Analysis),
    Failed(String),
}

async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Html<String> {
    let aggregation = match query.aggregation(state.aggregation) {
        Ok(aggregation) => aggregation,
        Err(e) => {
            let symbol = query.symbol().unwrap_or(DEFAULT_SYMBOL);
            return Html(render_page(symbol, state.aggregation, &Outcome::Failed(e.to_string())));
        }
    };

    let Some(symbol) = query.symbol() else {
        return Html(render_page(DEFAULT_SYMBOL, aggregation, &Outcome::Idle));
    };

    let outcome = match fetch_and_analyze(&state.client, symbol, state.clock.as_ref(), aggregation).await {
        Ok(analysis) => Outcome::Loaded(analysis),
        Err(e) => {
            warn!("Dashboard request for {} failed: {}", symbol, e);
            Outcome::Failed(e.user_message())
        }
    };

    Html(render_page(symbol, aggregation, &outcome))
}

fn error_response(status: StatusCode, err: &SkewError) -> Response {
    let body = json!({
        "error": err.user_message(),
        "detail": err.to_string(),
    });
    (status, Json(body)).into_response()
}

async fn analysis_handler(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let aggregation = match query.aggregation(state.aggregation) {
        Ok(aggregation) => aggregation,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };
    let Some(symbol) = query.symbol() else {
        let err = SkewError::InvalidSymbol(query.symbol.clone().unwrap_or_default());
        return error_response(StatusCode::BAD_REQUEST, &err);
    };

    match fetch_and_analyze(&state.client, symbol, state.clock.as_ref(), aggregation).await {
        Ok(analysis) => Json(AnalysisResponse::from(&analysis)).into_response(),
        Err(e) => {
            warn!("Analysis request for {} failed: {}", symbol, e);
            let status = if e.is_fetch_failure() {
                StatusCode::BAD_GATEWAY
            } else if matches!(e, SkewError::InvalidSymbol(_)) {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            error_response(status, &e)
        }
    }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_form(symbol: &str, aggregation: Aggregation) -> String {
    let mut options = String::new();
    for candidate in Aggregation::ALL {
        let selected = if candidate == aggregation { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{name}"{selected}>{name}</option>"#,
            name = candidate.name()
        );
    }

    format!(
        r#"<form method="get" action="/" onsubmit="document.getElementById('spinner').hidden = false">
  <label for="symbol">Enter the ticker symbol:</label>
  <input id="symbol" name="symbol" type="text" value="{symbol}" />
  <label for="aggregation">Duplicate cells:</label>
  <select id="aggregation" name="aggregation">{options}</select>
  <button type="submit">Fetch Data</button>
  <span id="spinner" hidden>Fetching data...</span>
</form>"#,
        symbol = escape_html(symbol),
        options = options
    )
}

fn render_analysis(analysis: &Analysis) -> String {
    let surface = surface_plot(&analysis.surface).to_inline_html(Some("volatility-surface"));
    let skew = time_skew_plot(&analysis.skew).to_inline_html(Some("time-skew"));

    format!(
        r#"<div class="success">{success}</div>
<p class="summary">{symbol}: {records} contracts as of {as_of} ({expired} expired)</p>
<h2>{surface_title}</h2>
{surface}
<h2>{skew_title}</h2>
{skew}"#,
        success = SUCCESS_MESSAGE,
        symbol = escape_html(&analysis.symbol),
        records = analysis.record_count,
        as_of = analysis.as_of,
        expired = analysis.expired_count,
        surface_title = SURFACE_TITLE,
        surface = surface,
        skew_title = SKEW_TITLE,
        skew = skew,
    )
}

fn render_page(symbol: &str, aggregation: Aggregation, outcome: &Outcome) -> String {
    let body = match outcome {
        Outcome::Idle => String::new(),
        Outcome::Loaded(analysis) => render_analysis(analysis),
        Outcome::Failed(message) => format!(r#"<div class="error">{}</div>"#, escape_html(message)),
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>{title}</title>
  <script src="{plotly}"></script>
  <style>
    body {{ font-family: sans-serif; max-width: 1100px; margin: 2rem auto; }}
    .success {{ background: #e6f4ea; color: #1e4620; padding: 0.6rem 1rem; border-radius: 4px; }}
    .error {{ background: #fdecea; color: #611a15; padding: 0.6rem 1rem; border-radius: 4px; }}
    form {{ margin-bottom: 1rem; }}
  </style>
</head>
<body>
<h1>{title}</h1>
{form}
{body}
</body>
</html>"#,
        title = PAGE_TITLE,
        plotly = PLOTLY_JS,
        form = render_form(symbol, aggregation),
        body = body,
    )
}
