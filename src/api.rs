//! Thin HTTP surface over the monitor, report synthesizer and store.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::monitor::Monitor;
use crate::report::{ReportError, ReportSynthesizer, DEFAULT_RECENT_REPORTS};
use crate::store::{Store, StoreError};

const DEFAULT_ALERT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub reports: Arc<ReportSynthesizer>,
    pub store: Arc<dyn Store>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/status", get(status))
        .route("/api/trigger-monitoring", post(trigger_monitoring))
        .route("/api/trigger-report", post(trigger_report))
        .route("/api/reports", get(list_reports))
        .route("/api/reports/{date}", get(get_report))
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/{id}/read", post(mark_alert_read))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error body `{"error": "..."}` with a status.
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::warn!(target: "api", error = %e, "store error");
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::NotFound(_) => ApiError(StatusCode::NOT_FOUND, e.to_string()),
            ReportError::Store(inner) => inner.into(),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        ApiError(
            StatusCode::BAD_REQUEST,
            format!("invalid date '{s}', want YYYY-MM-DD"),
        )
    })
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<String>,
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "cycle": state.monitor.state() }))
}

/// Starts a cycle in the background and answers immediately. Overlap is
/// decided by the monitor itself: a trigger that lands during a running
/// cycle is skipped there and logged, never queued.
async fn trigger_monitoring(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let monitor = state.monitor.clone();
    tokio::spawn(async move {
        monitor.start().await;
    });
    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
}

/// Generates (or regenerates) the report for `?date=` or today (UTC).
/// `report` is null when the window had no items.
async fn trigger_report(
    State(state): State<AppState>,
    Query(q): Query<DateQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let date = match q.date.as_deref() {
        Some(s) => parse_date(s)?,
        None => Utc::now().date_naive(),
    };
    let report = state.reports.generate(date).await?;
    Ok(Json(json!({ "date": date, "report": report })))
}

async fn list_reports(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = q.limit.unwrap_or(DEFAULT_RECENT_REPORTS).min(MAX_LIMIT);
    Ok(Json(state.reports.recent_reports(limit).await?))
}

async fn get_report(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let date = parse_date(&date)?;
    Ok(Json(state.reports.get_report(date).await?))
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = q.limit.unwrap_or(DEFAULT_ALERT_LIMIT).min(MAX_LIMIT);
    Ok(Json(state.store.recent_alerts(limit).await?))
}

async fn mark_alert_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.mark_alert_read(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError(StatusCode::NOT_FOUND, format!("no alert {id}")))
    }
}
