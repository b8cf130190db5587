//! Admin session endpoints: review and correct today's sessions
//!
//! Sessions are created and finished by operators through the work
//! endpoints; admins force-close stuck sessions and fix recorded times on
//! completed ones. The unified ledger is never touched from here.

use axum::{extract::State, Json};
use pointage_common::db::models::SessionState;
use pointage_common::time::{now_second_utc, parse_ts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::ApiError;
use crate::sessions;
use crate::AppState;

/// One session row in the admin view
#[derive(Debug, Serialize)]
pub struct AdminSession {
    pub id: String,
    pub launch_code: String,
    pub phase: Option<String>,
    pub rubric_code: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub state: SessionState,
    /// Only completed sessions may have their times edited
    pub editable: bool,
}

/// Sessions grouped per operator
#[derive(Debug, Serialize)]
pub struct AdminOperatorSessions {
    pub operator: String,
    pub name: String,
    pub sessions: Vec<AdminSession>,
}

/// GET /api/admin/sessions response
#[derive(Debug, Serialize)]
pub struct AdminSessionsResponse {
    pub operator_count: usize,
    pub operators: Vec<AdminOperatorSessions>,
}

/// GET /api/admin/sessions
///
/// Today's sessions, in progress and completed, grouped per operator.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<AdminSessionsResponse>, ApiError> {
    let rows: Vec<(
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        String,
    )> = sqlx::query_as(
        r#"
        SELECT id, operator_id, launch_code, phase, rubric_code,
               started_at, NULL AS ended_at, state
        FROM active_sessions
        WHERE date(started_at) = date('now')
        UNION ALL
        SELECT id, operator_id, launch_code, phase, rubric_code,
               started_at, ended_at, state
        FROM session_history
        WHERE date(ended_at) = date('now')
        ORDER BY operator_id, launch_code, phase
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let names: BTreeMap<String, String> = state
        .directory
        .list()
        .await?
        .into_iter()
        .map(|op| (op.code, op.name))
        .collect();

    let mut grouped: BTreeMap<String, Vec<AdminSession>> = BTreeMap::new();
    for (id, operator_id, launch_code, phase, rubric_code, started_at, ended_at, state_str) in rows
    {
        let session_state = SessionState::from_str(&state_str)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        grouped.entry(operator_id).or_default().push(AdminSession {
            id,
            launch_code,
            phase,
            rubric_code,
            started_at,
            ended_at,
            editable: session_state == SessionState::Completed,
            state: session_state,
        });
    }

    let operators: Vec<AdminOperatorSessions> = grouped
        .into_iter()
        .map(|(operator, sessions)| AdminOperatorSessions {
            name: names
                .get(operator.trim())
                .cloned()
                .unwrap_or_else(|| format!("Operator {}", operator.trim())),
            operator,
            sessions,
        })
        .collect();

    Ok(Json(AdminSessionsResponse {
        operator_count: operators.len(),
        operators,
    }))
}

/// POST /api/admin/sessions/finish request
#[derive(Debug, Deserialize)]
pub struct FinishSessionRequest {
    pub session_id: Option<String>,
}

/// POST /api/admin/sessions/finish response
#[derive(Debug, Serialize)]
pub struct FinishSessionResponse {
    pub session_id: String,
    pub ended_at: String,
}

/// POST /api/admin/sessions/finish
///
/// Force-close an in-progress session at the current time.
pub async fn finish_session(
    State(state): State<AppState>,
    Json(req): Json<FinishSessionRequest>,
) -> Result<Json<FinishSessionResponse>, ApiError> {
    let session_id = match req.session_id.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            return Err(ApiError::InvalidInput(
                "missing required field: session_id".to_string(),
            ))
        }
    };

    let session = sessions::find_active_by_id(&state.db, &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no active session {}", session_id)))?;

    let record = sessions::close_session(&state.db, &session, now_second_utc(), None, None).await?;

    Ok(Json(FinishSessionResponse {
        session_id: record.id,
        ended_at: record.ended_at,
    }))
}

/// POST /api/admin/sessions/update request
#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub session_id: Option<String>,
    /// Canonical `YYYY-MM-DD HH:MM:SS`
    pub started_at: Option<String>,
    /// Canonical `YYYY-MM-DD HH:MM:SS`
    pub ended_at: Option<String>,
}

/// POST /api/admin/sessions/update response
#[derive(Debug, Serialize)]
pub struct UpdateSessionResponse {
    pub session_id: String,
    pub started_at: Option<String>,
    pub ended_at: String,
    pub minutes: i64,
    pub seconds: i64,
}

/// POST /api/admin/sessions/update
///
/// Edit the recorded times of a completed session. At least one of
/// `started_at`/`ended_at` must be supplied; the stored duration is
/// recomputed when both times are known.
pub async fn update_session(
    State(state): State<AppState>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<UpdateSessionResponse>, ApiError> {
    let session_id = match req.session_id.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            return Err(ApiError::InvalidInput(
                "missing required field: session_id".to_string(),
            ))
        }
    };

    let new_start = parse_edit_ts(req.started_at.as_deref(), "started_at")?;
    let new_end = parse_edit_ts(req.ended_at.as_deref(), "ended_at")?;
    if new_start.is_none() && new_end.is_none() {
        return Err(ApiError::InvalidInput(
            "nothing to update: supply started_at and/or ended_at".to_string(),
        ));
    }

    let existing: Option<(Option<String>, String, i64, i64)> = sqlx::query_as(
        "SELECT started_at, ended_at, minutes, seconds FROM session_history WHERE id = ?",
    )
    .bind(&session_id)
    .fetch_optional(&state.db)
    .await?;
    let (current_start, current_end, current_minutes, current_seconds) = existing
        .ok_or_else(|| ApiError::NotFound(format!("no completed session {}", session_id)))?;

    let started_at = new_start.or(current_start);
    let ended_at = new_end.unwrap_or(current_end);

    // Recompute the stored duration when both ends are known
    let elapsed = match (started_at.as_deref().and_then(parse_ts), parse_ts(&ended_at)) {
        (Some(start), Some(end)) => {
            let secs = (end - start).num_seconds();
            if secs < 0 {
                return Err(ApiError::InvalidInput(
                    "ended_at precedes started_at".to_string(),
                ));
            }
            Some(secs)
        }
        _ => None,
    };
    let (minutes, seconds) = match elapsed {
        Some(secs) => (secs / 60, secs % 60),
        None => (current_minutes, current_seconds),
    };

    sqlx::query(
        "UPDATE session_history SET started_at = ?, ended_at = ?, minutes = ?, seconds = ? \
         WHERE id = ?",
    )
    .bind(&started_at)
    .bind(&ended_at)
    .bind(minutes)
    .bind(seconds)
    .bind(&session_id)
    .execute(&state.db)
    .await?;

    Ok(Json(UpdateSessionResponse {
        session_id,
        started_at,
        ended_at,
        minutes,
        seconds,
    }))
}

/// Parse an optional edit timestamp into canonical form; `None` when absent
fn parse_edit_ts(value: Option<&str>, field: &str) -> Result<Option<String>, ApiError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => {
            let parsed = parse_ts(raw).ok_or_else(|| {
                ApiError::InvalidInput(format!(
                    "invalid {} (expected YYYY-MM-DD HH:MM:SS): {:?}",
                    field, raw
                ))
            })?;
            Ok(Some(pointage_common::time::fmt_ts(parsed)))
        }
        None => Ok(None),
    }
}
