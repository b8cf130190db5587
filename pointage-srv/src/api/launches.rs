//! Launch code endpoints: per-launch aggregation and code lookup

use axum::{
    extract::{Path, State},
    Json,
};
use pointage_common::db::models::SessionState;
use serde::Serialize;

use super::ApiError;
use crate::AppState;

/// Aggregated view of one launch code / phase worked today
#[derive(Debug, Serialize)]
pub struct LaunchStatus {
    pub launch_code: String,
    pub phase: Option<String>,
    pub state: SessionState,
    pub in_progress: i64,
    pub completed: i64,
    pub total_operations: i64,
    pub percent_complete: f64,
    pub lead_operator: String,
    pub last_activity: Option<String>,
}

/// Aggregation totals across all launches
#[derive(Debug, Serialize)]
pub struct LaunchStatistics {
    pub in_progress_count: usize,
    pub completed_count: usize,
    pub total_operations: i64,
}

/// GET /api/launches/status response
#[derive(Debug, Serialize)]
pub struct LaunchStatusResponse {
    pub in_progress: Vec<LaunchStatus>,
    pub completed: Vec<LaunchStatus>,
    pub total: usize,
    pub statistics: LaunchStatistics,
}

/// GET /api/launches/status
///
/// Today's sessions grouped by launch code and phase; launches with work
/// still in progress sort first.
pub async fn launch_status(
    State(state): State<AppState>,
) -> Result<Json<LaunchStatusResponse>, ApiError> {
    let rows: Vec<(String, Option<String>, i64, i64, i64, String, Option<String>)> =
        sqlx::query_as(
            r#"
            SELECT launch_code, phase,
                   SUM(CASE WHEN state = 'IN_PROGRESS' THEN 1 ELSE 0 END) AS in_progress,
                   SUM(CASE WHEN state = 'COMPLETED' THEN 1 ELSE 0 END) AS completed,
                   COUNT(*) AS total_operations,
                   MIN(operator_id) AS lead_operator,
                   MAX(ts) AS last_activity
            FROM (
                SELECT operator_id, launch_code, phase, started_at AS ts, state
                FROM active_sessions
                WHERE date(started_at) = date('now')
                UNION ALL
                SELECT operator_id, launch_code, phase, ended_at AS ts, state
                FROM session_history
                WHERE date(ended_at) = date('now')
            )
            GROUP BY launch_code, phase
            ORDER BY CASE WHEN SUM(CASE WHEN state = 'IN_PROGRESS' THEN 1 ELSE 0 END) > 0
                          THEN 0 ELSE 1 END,
                     launch_code
            "#,
        )
        .fetch_all(&state.db)
        .await?;

    let launches: Vec<LaunchStatus> = rows
        .into_iter()
        .map(
            |(launch_code, phase, in_progress, completed, total, lead_operator, last_activity)| {
                let percent = if total > 0 {
                    (completed as f64 * 100.0 / total as f64 * 100.0).round() / 100.0
                } else {
                    0.0
                };
                LaunchStatus {
                    launch_code,
                    phase,
                    state: if in_progress > 0 {
                        SessionState::InProgress
                    } else {
                        SessionState::Completed
                    },
                    in_progress,
                    completed,
                    total_operations: total,
                    percent_complete: percent,
                    lead_operator,
                    last_activity,
                }
            },
        )
        .collect();

    let (in_progress, completed): (Vec<LaunchStatus>, Vec<LaunchStatus>) = launches
        .into_iter()
        .partition(|l| l.state == SessionState::InProgress);

    let statistics = LaunchStatistics {
        in_progress_count: in_progress.len(),
        completed_count: completed.len(),
        total_operations: in_progress
            .iter()
            .chain(completed.iter())
            .map(|l| l.total_operations)
            .sum(),
    };

    Ok(Json(LaunchStatusResponse {
        total: in_progress.len() + completed.len(),
        in_progress,
        completed,
        statistics,
    }))
}

/// GET /api/launches/:code response
#[derive(Debug, Serialize)]
pub struct LaunchLookupResponse {
    pub launch_code: String,
    pub phase: Option<String>,
    pub rubric_code: Option<String>,
}

/// GET /api/launches/:code
///
/// Most recent phase/rubric recorded for a launch code; used by the
/// operator UI to prefill the start-work form. 404 when the code has never
/// been seen.
pub async fn launch_lookup(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LaunchLookupResponse>, ApiError> {
    let code = code.trim().to_string();
    if code.is_empty() {
        return Err(ApiError::InvalidInput("missing launch code".to_string()));
    }

    let row: Option<(Option<String>, Option<String>)> = sqlx::query_as(
        r#"
        SELECT phase, rubric_code FROM (
            SELECT phase, rubric_code, started_at AS ts
            FROM clock_starts
            WHERE TRIM(COALESCE(launch_code, '')) = ?
            UNION ALL
            SELECT phase, rubric_code, ended_at AS ts
            FROM session_history
            WHERE TRIM(launch_code) = ?
        )
        ORDER BY ts DESC LIMIT 1
        "#,
    )
    .bind(&code)
    .bind(&code)
    .fetch_optional(&state.db)
    .await?;

    match row {
        Some((phase, rubric_code)) => Ok(Json(LaunchLookupResponse {
            launch_code: code,
            phase,
            rubric_code,
        })),
        None => Err(ApiError::NotFound(format!(
            "launch code {} not found",
            code
        ))),
    }
}
