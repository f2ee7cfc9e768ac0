//! Axum handlers for `/api/*` routes.
//!
//! Each handler receives [`AppState`] via [`axum::extract::State`], runs the
//! matching render pipeline and returns `{"video_url": "/videos/<name>"}` or
//! a JSON error body with a status code mapped from the [`AppError`]
//! variant.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::error::AppError;
use crate::geo::BoundingBox;
use crate::neural::NeuralInterpolator;
use crate::pipeline::{self, TimelapseParams};

use super::AppState;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct TimelapseRequest {
    bbox: BoundingBox,
    time_start: String,
    time_end: String,
    interval_minutes: Option<u32>,
    fps: Option<u32>,
}

#[derive(Deserialize)]
pub(super) struct DailyRequest {
    bbox: BoundingBox,
    date: String,
    fps: Option<u32>,
}

#[derive(Deserialize)]
pub(super) struct RangeRequest {
    bbox: BoundingBox,
    start_date: String,
    end_date: String,
    fps: Option<u32>,
}

#[derive(Deserialize)]
pub(super) struct NeuralRequest {
    bbox: BoundingBox,
    start_date: String,
    end_date: String,
    fps: Option<u32>,
    size: Option<[u32; 2]>,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

/// Map a pipeline error onto an HTTP status + error code.
fn error_response(e: &AppError) -> Response {
    let (status, code) = match e {
        AppError::Geo(_) | AppError::Interp(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        AppError::Wms(_) | AppError::Video(_) => (StatusCode::BAD_GATEWAY, "upstream"),
        AppError::Neural(msg) if msg.contains("neural` feature") => {
            (StatusCode::NOT_IMPLEMENTED, "not_implemented")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    (status, json_error(code, e)).into_response()
}

fn video_url_response(path: &std::path::Path) -> Response {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    (StatusCode::OK, Json(json!({ "video_url": format!("/videos/{filename}") }))).into_response()
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, Response> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc()).map_err(|e| {
        (StatusCode::BAD_REQUEST, json_error("bad_request", format!("invalid datetime '{s}': {e}")))
            .into_response()
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, Response> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        (StatusCode::BAD_REQUEST, json_error("bad_request", format!("invalid date '{s}': {e}")))
            .into_response()
    })
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// POST /api/timelapse — explicit time window, linear interpolation.
pub(super) async fn timelapse(
    State(state): State<AppState>,
    Json(req): Json<TimelapseRequest>,
) -> Response {
    let time_start = match parse_datetime(&req.time_start) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let time_end = match parse_datetime(&req.time_end) {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    let cfg = &state.config;
    let params = TimelapseParams {
        bbox: req.bbox,
        size: (cfg.imagery.width, cfg.imagery.height),
        time_start,
        time_end,
        interval_minutes: req.interval_minutes.unwrap_or(cfg.imagery.interval_minutes),
        frames_between: pipeline::DEFAULT_FRAMES_BETWEEN,
        fps: req.fps.unwrap_or(cfg.video.fps),
    };

    match pipeline::render_timelapse(&state.client, &cfg.video.dir, &params).await {
        Ok(path) => video_url_response(&path),
        Err(e) => {
            warn!("timelapse render failed: {e}");
            error_response(&e)
        }
    }
}

/// POST /api/timelapse/daily — one whole day, hourly imagery.
pub(super) async fn daily(
    State(state): State<AppState>,
    Json(req): Json<DailyRequest>,
) -> Response {
    let date = match parse_date(&req.date) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let cfg = &state.config;
    let result = pipeline::render_daily(
        &state.client,
        &cfg.video.dir,
        req.bbox,
        (cfg.imagery.width, cfg.imagery.height),
        date,
        cfg.imagery.interval_minutes,
        req.fps.unwrap_or(cfg.video.fps),
    )
    .await;

    match result {
        Ok(path) => video_url_response(&path),
        Err(e) => {
            warn!(%date, "daily render failed: {e}");
            error_response(&e)
        }
    }
}

/// POST /api/timelapse/range — multiple whole days.
pub(super) async fn range(
    State(state): State<AppState>,
    Json(req): Json<RangeRequest>,
) -> Response {
    let start_date = match parse_date(&req.start_date) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let end_date = match parse_date(&req.end_date) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let cfg = &state.config;
    let result = pipeline::render_range(
        &state.client,
        &cfg.video.dir,
        req.bbox,
        (cfg.imagery.width, cfg.imagery.height),
        start_date,
        end_date,
        cfg.imagery.interval_minutes,
        req.fps.unwrap_or(cfg.video.fps),
    )
    .await;

    match result {
        Ok(path) => video_url_response(&path),
        Err(e) => {
            warn!(%start_date, %end_date, "range render failed: {e}");
            error_response(&e)
        }
    }
}

/// POST /api/timelapse/neural — daily imagery through the two-frame model.
pub(super) async fn neural(
    State(state): State<AppState>,
    Json(req): Json<NeuralRequest>,
) -> Response {
    let start_date = match parse_date(&req.start_date) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let end_date = match parse_date(&req.end_date) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let cfg = &state.config;
    let Some(model_path) = cfg.neural.model_path.as_deref() else {
        return (
            StatusCode::NOT_IMPLEMENTED,
            json_error("not_implemented", "no neural model configured"),
        )
            .into_response();
    };

    let interpolator = match NeuralInterpolator::load(model_path) {
        Ok(i) => i,
        Err(e) => {
            warn!("neural model load failed: {e}");
            return error_response(&e);
        }
    };

    let size = req
        .size
        .map(|[w, h]| (w, h))
        .unwrap_or((cfg.imagery.width, cfg.imagery.height));

    let result = pipeline::render_neural(
        &state.neural_client,
        interpolator,
        &cfg.video.dir,
        req.bbox,
        size,
        start_date,
        end_date,
        cfg.neural.frames_between,
        req.fps.unwrap_or(cfg.video.neural_fps),
    )
    .await;

    match result {
        Ok(path) => video_url_response(&path),
        Err(e) => {
            warn!(%start_date, %end_date, "neural render failed: {e}");
            error_response(&e)
        }
    }
}
