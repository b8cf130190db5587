//! Operator work endpoints: start and finish a session

use axum::{extract::State, Json};
use pointage_common::db::models::HistoryRecord;
use pointage_common::time::{now_second_utc, parse_ts};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::sessions::{self, NewSession};
use crate::AppState;

/// POST /api/work/start request
#[derive(Debug, Deserialize)]
pub struct StartWorkRequest {
    pub operator_id: Option<String>,
    pub launch_code: Option<String>,
    pub phase: Option<String>,
    pub rubric_code: Option<String>,
    /// Canonical `YYYY-MM-DD HH:MM:SS`; defaults to now
    pub started_at: Option<String>,
}

/// POST /api/work/start response
#[derive(Debug, Serialize)]
pub struct StartWorkResponse {
    pub session_id: String,
    pub started_at: String,
}

/// POST /api/work/start
pub async fn start_work(
    State(state): State<AppState>,
    Json(req): Json<StartWorkRequest>,
) -> Result<Json<StartWorkResponse>, ApiError> {
    let operator_id = required(req.operator_id.as_deref(), "operator_id")?;
    let launch_code = required(req.launch_code.as_deref(), "launch_code")?;
    let phase = optional(req.phase.as_deref());
    let rubric_code = optional(req.rubric_code.as_deref());
    let started_at = parse_optional_ts(req.started_at.as_deref(), "started_at")?;

    // One active session per operator/launch/phase at a time
    let already_open =
        sessions::find_active_by_fields(&state.db, &operator_id, &launch_code, phase.as_deref())
            .await?;
    if already_open.is_some() {
        return Err(ApiError::Conflict(format!(
            "operator {} already has an active session on {}",
            operator_id, launch_code
        )));
    }

    let session = sessions::open_session(
        &state.db,
        &NewSession {
            operator_id,
            launch_code,
            phase,
            rubric_code,
            started_at,
        },
    )
    .await?;

    Ok(Json(StartWorkResponse {
        session_id: session.id,
        started_at: session.started_at,
    }))
}

/// POST /api/work/finish request
#[derive(Debug, Deserialize)]
pub struct FinishWorkRequest {
    pub operator_id: Option<String>,
    pub launch_code: Option<String>,
    pub phase: Option<String>,
    pub minutes: Option<i64>,
    pub seconds: Option<i64>,
    /// Canonical `YYYY-MM-DD HH:MM:SS`; defaults to now
    pub ended_at: Option<String>,
}

/// POST /api/work/finish response
#[derive(Debug, Serialize)]
pub struct FinishWorkResponse {
    pub record: HistoryRecord,
}

/// POST /api/work/finish
///
/// Closes the operator's matching active session into history.
pub async fn finish_work(
    State(state): State<AppState>,
    Json(req): Json<FinishWorkRequest>,
) -> Result<Json<FinishWorkResponse>, ApiError> {
    let operator_id = required(req.operator_id.as_deref(), "operator_id")?;
    let launch_code = required(req.launch_code.as_deref(), "launch_code")?;
    let phase = optional(req.phase.as_deref());
    let ended_at = parse_optional_ts(req.ended_at.as_deref(), "ended_at")?;

    let session =
        sessions::find_active_by_fields(&state.db, &operator_id, &launch_code, phase.as_deref())
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "no active session for operator {} on {}",
                    operator_id, launch_code
                ))
            })?;

    let record =
        sessions::close_session(&state.db, &session, ended_at, req.minutes, req.seconds).await?;

    Ok(Json(FinishWorkResponse { record }))
}

/// Trimmed required field or a 400
fn required(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::InvalidInput(format!(
            "missing required field: {}",
            field
        ))),
    }
}

/// Trimmed optional field; empty collapses to absent
fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

/// Parse an optional timestamp field; absent defaults to now
fn parse_optional_ts(
    value: Option<&str>,
    field: &str,
) -> Result<chrono::NaiveDateTime, ApiError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => parse_ts(raw).ok_or_else(|| {
            ApiError::InvalidInput(format!(
                "invalid {} (expected YYYY-MM-DD HH:MM:SS): {:?}",
                field, raw
            ))
        }),
        None => Ok(now_second_utc()),
    }
}
