//! Reconciliation engine
//!
//! Applies a batch of raw clock events against the unified operations
//! ledger. The whole batch runs in one transaction: either every event is
//! applied or none are. Per-key at-most-once insertion is enforced by the
//! ledger's uniqueness constraint together with a single conditional
//! insert-or-update statement, so concurrent runs over overlapping data
//! cannot duplicate rows and need no application-level locking.

use chrono::NaiveDate;
use pointage_common::db::models::OpStatus;
use pointage_common::time::{fmt_day, fmt_ts, parse_ts};
use pointage_common::{Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::key::dedupe_key;
use super::normalize::{normalize, NormalizedEvent, RawEvent};
use super::provision::ledger_exists;

/// Outcome of one reconciliation run
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReconcileSummary {
    pub batch_id: String,
    pub scanned: usize,
    pub inserted: u64,
}

/// Reconciler over the raw clock streams
pub struct Reconciler {
    db: SqlitePool,
}

impl Reconciler {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Run one reconciliation batch.
    ///
    /// `since` restricts the scan to source rows whose calendar day is at or
    /// after the given date (inclusive); `None` scans everything.
    ///
    /// Fails with [`Error::SchemaMissing`] when the ledger has not been
    /// provisioned; the caller decides whether to provision and retry.
    pub async fn run(&self, since: Option<NaiveDate>) -> Result<ReconcileSummary> {
        if !ledger_exists(&self.db).await? {
            return Err(Error::SchemaMissing("unified_operations".to_string()));
        }

        let events = self.fetch_source_events(since).await?;
        let batch_id = Uuid::new_v4().to_string();

        let mut tx = self.db.begin().await?;

        let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM unified_operations")
            .fetch_one(&mut *tx)
            .await?;

        for raw in &events {
            let ev = normalize(raw);
            let key = dedupe_key(&ev);
            upsert_operation(&mut *tx, &ev, &key, &batch_id, raw).await?;
        }

        let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM unified_operations")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        let summary = ReconcileSummary {
            batch_id,
            scanned: events.len(),
            inserted: (after - before).max(0) as u64,
        };
        info!(
            batch_id = %summary.batch_id,
            scanned = summary.scanned,
            inserted = summary.inserted,
            "Reconciliation batch committed"
        );
        Ok(summary)
    }

    /// Select raw rows from both source streams, oldest first
    async fn fetch_source_events(&self, since: Option<NaiveDate>) -> Result<Vec<RawEvent>> {
        let since_day = since.map(fmt_day);
        let mut events = Vec::new();

        let start_rows: Vec<SourceRow> = match &since_day {
            Some(day) => {
                sqlx::query_as(
                    "SELECT id, identity, launch_code, phase, rubric_code, started_at \
                     FROM clock_starts WHERE date(started_at) >= date(?) ORDER BY started_at",
                )
                .bind(day)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, identity, launch_code, phase, rubric_code, started_at \
                     FROM clock_starts ORDER BY started_at",
                )
                .fetch_all(&self.db)
                .await?
            }
        };
        events.extend(start_rows.into_iter().map(|r| raw_event(r, OpStatus::Start, "clock_starts")));

        let end_rows: Vec<SourceRow> = match &since_day {
            Some(day) => {
                sqlx::query_as(
                    "SELECT id, identity, launch_code, phase, rubric_code, ended_at \
                     FROM clock_ends WHERE date(ended_at) >= date(?) ORDER BY ended_at",
                )
                .bind(day)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, identity, launch_code, phase, rubric_code, ended_at \
                     FROM clock_ends ORDER BY ended_at",
                )
                .fetch_all(&self.db)
                .await?
            }
        };
        events.extend(end_rows.into_iter().map(|r| raw_event(r, OpStatus::End, "clock_ends")));

        Ok(events)
    }
}

type SourceRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn raw_event(row: SourceRow, kind: OpStatus, source_table: &str) -> RawEvent {
    let (id, identity, launch_code, phase, rubric_code, ts) = row;
    RawEvent {
        identity,
        launch_code,
        phase,
        rubric_code,
        kind,
        // An unparseable timestamp degrades to absent rather than failing
        timestamp: parse_ts(&ts),
        source_table: source_table.to_string(),
        source_row_id: Some(id),
    }
}

/// Apply one normalized event against the ledger.
///
/// Single conditional insert-or-update keyed on `dedupe_key`: a new key
/// inserts a fresh row; an existing key may only fill a previously-NULL
/// `start_time`/`end_time`; populated values are never replaced, and
/// `created_at`/`import_batch_id` keep their first-insert values.
pub async fn upsert_operation(
    conn: &mut SqliteConnection,
    ev: &NormalizedEvent,
    dedupe_key: &str,
    batch_id: &str,
    raw: &RawEvent,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO unified_operations (
            id, identity, launch_code, phase, rubric_code, status,
            start_time, end_time, source_table, source_row_id,
            import_batch_id, dedupe_key
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(dedupe_key) DO UPDATE SET
            start_time = COALESCE(unified_operations.start_time, excluded.start_time),
            end_time   = COALESCE(unified_operations.end_time, excluded.end_time)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&ev.identity)
    .bind(&ev.launch_code)
    .bind(&ev.phase)
    .bind(&ev.rubric_code)
    .bind(ev.status.as_str())
    .bind(ev.start_time.map(fmt_ts))
    .bind(ev.end_time.map(fmt_ts))
    .bind(&raw.source_table)
    .bind(&raw.source_row_id)
    .bind(batch_id)
    .bind(dedupe_key)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
