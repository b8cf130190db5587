//! Operator endpoints: directory listing, badge activity, session history

use axum::{
    extract::{Path, State},
    Json,
};
use pointage_common::db::models::{HistoryRecord, Operator};
use serde::Serialize;
use std::collections::HashMap;

use super::ApiError;
use crate::AppState;

/// Directory listing response
#[derive(Debug, Serialize)]
pub struct OperatorsResponse {
    pub operators: Vec<Operator>,
}

/// GET /api/operators
pub async fn list_operators(
    State(state): State<AppState>,
) -> Result<Json<OperatorsResponse>, ApiError> {
    let operators = state.directory.list().await?;
    Ok(Json(OperatorsResponse { operators }))
}

/// One operator with badge activity today
#[derive(Debug, Serialize)]
pub struct BadgedOperator {
    pub operator: String,
    pub name: String,
    pub session_count: i64,
    pub last_activity: Option<String>,
    pub launch_codes: Vec<String>,
    pub has_active: bool,
}

/// Badge activity response
#[derive(Debug, Serialize)]
pub struct BadgedOperatorsResponse {
    pub operators: Vec<BadgedOperator>,
}

/// GET /api/operators/badged
///
/// Operators with session activity today, busiest first.
pub async fn badged_operators(
    State(state): State<AppState>,
) -> Result<Json<BadgedOperatorsResponse>, ApiError> {
    let rows: Vec<(String, i64, Option<String>, Option<String>, i64)> = sqlx::query_as(
        r#"
        SELECT operator_id,
               COUNT(*) AS session_count,
               MAX(ts) AS last_activity,
               GROUP_CONCAT(DISTINCT launch_code) AS launch_codes,
               SUM(CASE WHEN state = 'IN_PROGRESS' THEN 1 ELSE 0 END) AS active_count
        FROM (
            SELECT operator_id, launch_code, started_at AS ts, state
            FROM active_sessions
            WHERE date(started_at) = date('now')
            UNION ALL
            SELECT operator_id, launch_code, ended_at AS ts, state
            FROM session_history
            WHERE date(ended_at) = date('now')
        )
        GROUP BY operator_id
        ORDER BY session_count DESC, operator_id
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let names: HashMap<String, String> = state
        .directory
        .list()
        .await?
        .into_iter()
        .map(|op| (op.code, op.name))
        .collect();

    let operators = rows
        .into_iter()
        .map(|(operator, session_count, last_activity, launch_codes, active_count)| {
            let name = names
                .get(operator.trim())
                .cloned()
                .unwrap_or_else(|| format!("Operator {}", operator.trim()));
            BadgedOperator {
                name,
                operator,
                session_count,
                last_activity,
                launch_codes: split_group_concat(launch_codes),
                has_active: active_count > 0,
            }
        })
        .collect();

    Ok(Json(BadgedOperatorsResponse { operators }))
}

/// Session history response
#[derive(Debug, Serialize)]
pub struct OperatorHistoryResponse {
    pub operator: String,
    pub records: Vec<HistoryRecord>,
}

/// GET /api/operators/:id/history
///
/// Completed sessions for one operator, newest first.
pub async fn operator_history(
    State(state): State<AppState>,
    Path(operator_id): Path<String>,
) -> Result<Json<OperatorHistoryResponse>, ApiError> {
    let operator_id = operator_id.trim().to_string();
    if operator_id.is_empty() {
        return Err(ApiError::InvalidInput("missing operator id".to_string()));
    }

    let rows: Vec<(
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        String,
        i64,
        i64,
    )> = sqlx::query_as(
        "SELECT id, operator_id, launch_code, phase, rubric_code, started_at, ended_at, minutes, seconds \
         FROM session_history WHERE operator_id = ? ORDER BY ended_at DESC LIMIT 1000",
    )
    .bind(&operator_id)
    .fetch_all(&state.db)
    .await?;

    let records = rows
        .into_iter()
        .map(
            |(id, operator_id, launch_code, phase, rubric_code, started_at, ended_at, minutes, seconds)| {
                HistoryRecord {
                    id,
                    operator_id,
                    launch_code,
                    phase,
                    rubric_code,
                    started_at,
                    ended_at,
                    minutes,
                    seconds,
                }
            },
        )
        .collect();

    Ok(Json(OperatorHistoryResponse {
        operator: operator_id,
        records,
    }))
}

/// Split a GROUP_CONCAT value into its distinct entries
fn split_group_concat(value: Option<String>) -> Vec<String> {
    value
        .map(|joined| {
            joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
