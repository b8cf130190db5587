//! Export endpoints: ledger provisioning, reconciliation runs, and ledger
//! listing

use axum::{
    extract::{Query, State},
    Json,
};
use pointage_common::db::models::{OpStatus, UnifiedOperation};
use pointage_common::time::parse_day;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::ApiError;
use crate::reconcile::{provision_ledger, ReconcileSummary, Reconciler};
use crate::AppState;

/// POST /api/export/provision response
#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    pub provisioned: bool,
}

/// POST /api/export/provision
///
/// Idempotent: repeat invocations are no-ops with respect to existing rows.
pub async fn provision(
    State(state): State<AppState>,
) -> Result<Json<ProvisionResponse>, ApiError> {
    provision_ledger(&state.db).await?;
    Ok(Json(ProvisionResponse { provisioned: true }))
}

/// POST /api/export/run request
#[derive(Debug, Default, Deserialize)]
pub struct RunExportRequest {
    /// Inclusive `YYYY-MM-DD` cutoff; absent scans all source rows
    pub since_date: Option<String>,
}

/// POST /api/export/run
///
/// Runs one reconciliation batch. Responds 409 with code `schema_missing`
/// when the ledger has not been provisioned.
pub async fn run(
    State(state): State<AppState>,
    body: Option<Json<RunExportRequest>>,
) -> Result<Json<ReconcileSummary>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let since = match req.since_date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_day(raw).ok_or_else(|| {
            ApiError::InvalidInput(format!(
                "invalid since_date (expected YYYY-MM-DD): {:?}",
                raw
            ))
        })?),
        None => None,
    };

    let summary = Reconciler::new(state.db.clone()).run(since).await?;
    Ok(Json(summary))
}

/// Query parameters for the ledger listing
#[derive(Debug, Deserialize)]
pub struct OperationsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /api/operations response
#[derive(Debug, Serialize)]
pub struct OperationsResponse {
    pub operations: Vec<UnifiedOperation>,
}

/// GET /api/operations?limit=N
///
/// Newest ledger rows first.
pub async fn list_operations(
    State(state): State<AppState>,
    Query(query): Query<OperationsQuery>,
) -> Result<Json<OperationsResponse>, ApiError> {
    if !crate::reconcile::ledger_exists(&state.db).await? {
        return Err(ApiError::SchemaMissing("unified_operations".to_string()));
    }

    let limit = query.limit.clamp(1, 500);

    let rows: Vec<(
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        String,
        Option<String>,
        Option<String>,
        Option<i64>,
        Option<String>,
        String,
        String,
        String,
        String,
    )> = sqlx::query_as(
        "SELECT id, identity, launch_code, phase, rubric_code, status, \
                start_time, end_time, duration_seconds, day, source_table, \
                import_batch_id, dedupe_key, created_at \
         FROM unified_operations ORDER BY created_at DESC, id LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    let mut operations = Vec::with_capacity(rows.len());
    for (
        id,
        identity,
        launch_code,
        phase,
        rubric_code,
        status,
        start_time,
        end_time,
        duration_seconds,
        day,
        source_table,
        import_batch_id,
        dedupe_key,
        created_at,
    ) in rows
    {
        let status =
            OpStatus::from_str(&status).map_err(|e| ApiError::Internal(e.to_string()))?;
        operations.push(UnifiedOperation {
            id,
            identity,
            launch_code,
            phase,
            rubric_code,
            status,
            start_time,
            end_time,
            duration_seconds,
            day,
            source_table,
            import_batch_id,
            dedupe_key,
            created_at,
        });
    }

    Ok(Json(OperationsResponse { operations }))
}
