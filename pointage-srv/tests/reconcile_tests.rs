//! Integration tests for the reconciliation engine
//!
//! Covers idempotent re-runs, coalesce-not-overwrite merge semantics, the
//! since-date filter, START/END row separation, and provisioning behavior.

use chrono::{NaiveDate, NaiveDateTime};
use pointage_common::db::create_app_tables;
use pointage_common::db::models::OpStatus;
use pointage_common::Error;
use pointage_srv::reconcile::{
    dedupe_key, engine::upsert_operation, ledger_exists, provision_ledger, NormalizedEvent,
    RawEvent, Reconciler,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

async fn setup_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("in-memory pool");
    create_app_tables(&pool).await.unwrap();
    pool
}

fn ts(day: &str, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

async fn insert_start(pool: &SqlitePool, identity: &str, launch: &str, phase: &str, at: &str) {
    sqlx::query(
        "INSERT INTO clock_starts (id, identity, launch_code, phase, rubric_code, started_at) \
         VALUES (?, ?, ?, ?, 'R1', ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(identity)
    .bind(launch)
    .bind(phase)
    .bind(at)
    .execute(pool)
    .await
    .unwrap();
}

async fn insert_end(pool: &SqlitePool, identity: &str, launch: &str, phase: &str, at: &str) {
    sqlx::query(
        "INSERT INTO clock_ends (id, identity, launch_code, phase, rubric_code, ended_at) \
         VALUES (?, ?, ?, ?, 'R1', ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(identity)
    .bind(launch)
    .bind(phase)
    .bind(at)
    .execute(pool)
    .await
    .unwrap();
}

async fn ledger_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM unified_operations")
        .fetch_one(pool)
        .await
        .unwrap()
}

// =============================================================================
// Provisioning
// =============================================================================

#[tokio::test]
async fn run_without_ledger_reports_schema_missing() {
    let pool = setup_pool().await;
    insert_start(&pool, "001", "LT001", "P1", "2025-09-16 08:00:00").await;

    let err = Reconciler::new(pool.clone()).run(None).await.unwrap_err();
    assert!(matches!(err, Error::SchemaMissing(_)));
    assert!(!ledger_exists(&pool).await.unwrap());
}

#[tokio::test]
async fn provisioning_is_idempotent() {
    let pool = setup_pool().await;

    provision_ledger(&pool).await.unwrap();
    assert!(ledger_exists(&pool).await.unwrap());

    insert_start(&pool, "001", "LT001", "P1", "2025-09-16 08:00:00").await;
    Reconciler::new(pool.clone()).run(None).await.unwrap();
    assert_eq!(ledger_count(&pool).await, 1);

    // Re-provisioning never touches existing rows
    provision_ledger(&pool).await.unwrap();
    provision_ledger(&pool).await.unwrap();
    assert_eq!(ledger_count(&pool).await, 1);
}

// =============================================================================
// Idempotent re-run
// =============================================================================

#[tokio::test]
async fn rerun_does_not_duplicate_rows() {
    let pool = setup_pool().await;
    provision_ledger(&pool).await.unwrap();

    insert_start(&pool, "001", "LT001", "P1", "2025-09-16 08:00:00").await;
    insert_start(&pool, "002", "LT002", "P2", "2025-09-16 09:00:00").await;
    insert_end(&pool, "001", "LT001", "P1", "2025-09-16 08:30:00").await;

    let reconciler = Reconciler::new(pool.clone());

    let first = reconciler.run(None).await.unwrap();
    assert_eq!(first.scanned, 3);
    assert_eq!(first.inserted, 3);
    assert_eq!(ledger_count(&pool).await, 3);

    let second = reconciler.run(None).await.unwrap();
    assert_eq!(second.scanned, 3);
    assert_eq!(second.inserted, 0);
    assert_eq!(ledger_count(&pool).await, 3);

    // Batch id of first insertion is preserved on re-run
    let batches: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT import_batch_id FROM unified_operations")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, first.batch_id);
}

#[tokio::test]
async fn whitespace_variants_collapse_to_one_row() {
    let pool = setup_pool().await;
    provision_ledger(&pool).await.unwrap();

    insert_start(&pool, "001", "LT001", "P1", "2025-09-16 08:00:00").await;
    insert_start(&pool, "  001  ", " LT001 ", " P1 ", "2025-09-16 08:00:00").await;

    let summary = Reconciler::new(pool.clone()).run(None).await.unwrap();
    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.inserted, 1);
    assert_eq!(ledger_count(&pool).await, 1);
}

// =============================================================================
// Coalesce-not-overwrite
// =============================================================================

#[tokio::test]
async fn merge_fills_null_fields_but_never_overwrites() {
    let pool = setup_pool().await;
    provision_ledger(&pool).await.unwrap();

    let base = NormalizedEvent {
        identity: "001".to_string(),
        launch_code: Some("LT001".to_string()),
        phase: Some("P1".to_string()),
        rubric_code: Some("R1".to_string()),
        status: OpStatus::Start,
        start_time: Some(ts("2025-09-16", 8, 0)),
        end_time: None,
    };
    let key = dedupe_key(&base);
    let raw = RawEvent {
        identity: "001".to_string(),
        launch_code: Some("LT001".to_string()),
        phase: Some("P1".to_string()),
        rubric_code: Some("R1".to_string()),
        kind: OpStatus::Start,
        timestamp: base.start_time,
        source_table: "clock_starts".to_string(),
        source_row_id: None,
    };

    let mut conn = pool.acquire().await.unwrap();

    // First application inserts the row with start set, end NULL
    upsert_operation(&mut conn, &base, &key, "batch-1", &raw)
        .await
        .unwrap();

    // Same key, incoming end time: fills the NULL field only
    let with_end = NormalizedEvent {
        start_time: None,
        end_time: Some(ts("2025-09-16", 8, 30)),
        ..base.clone()
    };
    upsert_operation(&mut conn, &with_end, &key, "batch-2", &raw)
        .await
        .unwrap();

    let (start, end): (Option<String>, Option<String>) = sqlx::query_as(
        "SELECT start_time, end_time FROM unified_operations WHERE dedupe_key = ?",
    )
    .bind(&key)
    .fetch_one(&mut *conn)
    .await
    .unwrap();
    assert_eq!(start.as_deref(), Some("2025-09-16 08:00:00"));
    assert_eq!(end.as_deref(), Some("2025-09-16 08:30:00"));

    // A second, different end time must NOT replace the populated value
    let conflicting_end = NormalizedEvent {
        start_time: None,
        end_time: Some(ts("2025-09-16", 9, 45)),
        ..base.clone()
    };
    upsert_operation(&mut conn, &conflicting_end, &key, "batch-3", &raw)
        .await
        .unwrap();

    let (start, end, duration, batch): (Option<String>, Option<String>, Option<i64>, String) =
        sqlx::query_as(
            "SELECT start_time, end_time, duration_seconds, import_batch_id \
             FROM unified_operations WHERE dedupe_key = ?",
        )
        .bind(&key)
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(start.as_deref(), Some("2025-09-16 08:00:00"));
    assert_eq!(end.as_deref(), Some("2025-09-16 08:30:00"));
    // Derived duration reflects the coalesced pair
    assert_eq!(duration, Some(1800));
    // First-insert provenance is preserved
    assert_eq!(batch, "batch-1");

    drop(conn);
    assert_eq!(ledger_count(&pool).await, 1);
}

// =============================================================================
// Since-date filter
// =============================================================================

#[tokio::test]
async fn since_date_filter_is_inclusive() {
    let pool = setup_pool().await;
    provision_ledger(&pool).await.unwrap();

    insert_start(&pool, "001", "LT001", "P1", "2025-01-01 08:00:00").await;
    insert_start(&pool, "001", "LT001", "P1", "2025-02-01 08:00:00").await;

    let since = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let summary = Reconciler::new(pool.clone()).run(Some(since)).await.unwrap();
    assert_eq!(summary.scanned, 1);
    assert_eq!(ledger_count(&pool).await, 1);

    let day: Option<String> = sqlx::query_scalar("SELECT day FROM unified_operations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(day.as_deref(), Some("2025-02-01"));

    // The cutoff day itself is ingested
    insert_end(&pool, "002", "LT002", "P1", "2025-01-15 12:00:00").await;
    let summary = Reconciler::new(pool.clone()).run(Some(since)).await.unwrap();
    assert_eq!(summary.inserted, 1);
}

// =============================================================================
// START/END separation
// =============================================================================

#[tokio::test]
async fn start_and_end_of_one_session_stay_distinct_rows() {
    let pool = setup_pool().await;
    provision_ledger(&pool).await.unwrap();

    insert_start(&pool, "001", "LT001", "P1", "2025-09-16 08:00:00").await;
    insert_end(&pool, "001", "LT001", "P1", "2025-09-16 08:30:00").await;

    let summary = Reconciler::new(pool.clone()).run(None).await.unwrap();
    assert_eq!(summary.inserted, 2);

    let rows: Vec<(String, Option<String>, Option<String>, Option<i64>)> = sqlx::query_as(
        "SELECT status, start_time, end_time, duration_seconds \
         FROM unified_operations ORDER BY status",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(rows.len(), 2);

    let (end_status, end_start, end_end, end_duration) = &rows[0];
    assert_eq!(end_status, "END");
    assert_eq!(end_start.as_deref(), None);
    assert_eq!(end_end.as_deref(), Some("2025-09-16 08:30:00"));
    assert_eq!(*end_duration, None);

    let (start_status, start_start, start_end, start_duration) = &rows[1];
    assert_eq!(start_status, "START");
    assert_eq!(start_start.as_deref(), Some("2025-09-16 08:00:00"));
    assert_eq!(start_end.as_deref(), None);
    assert_eq!(*start_duration, None);
}

#[tokio::test]
async fn empty_classification_fields_hash_as_absent() {
    let pool = setup_pool().await;
    provision_ledger(&pool).await.unwrap();

    // Empty-after-trim launch code and an absent one are the same fact
    sqlx::query(
        "INSERT INTO clock_starts (id, identity, launch_code, phase, rubric_code, started_at) \
         VALUES (?, '001', '   ', NULL, NULL, '2025-09-16 08:00:00')",
    )
    .bind(Uuid::new_v4().to_string())
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO clock_starts (id, identity, launch_code, phase, rubric_code, started_at) \
         VALUES (?, '001', NULL, NULL, NULL, '2025-09-16 08:00:00')",
    )
    .bind(Uuid::new_v4().to_string())
    .execute(&pool)
    .await
    .unwrap();

    let summary = Reconciler::new(pool.clone()).run(None).await.unwrap();
    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.inserted, 1);

    let launch: Option<String> =
        sqlx::query_scalar("SELECT launch_code FROM unified_operations")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(launch, None);
}
