//! Ledger provisioning
//!
//! Creates the unified operations ledger, its uniqueness constraint, and its
//! reporting indexes. Safe to invoke repeatedly: existing objects are left
//! untouched and no data is ever dropped or altered.
//!
//! Kept out of [`super::engine`]'s hot path: a missing ledger there is a
//! distinct error, not an implicit CREATE, so configuration drift stays
//! visible.

use pointage_common::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Create the unified operations ledger table and indexes (idempotent)
pub async fn provision_ledger(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS unified_operations (
            id TEXT PRIMARY KEY,
            identity TEXT NOT NULL,
            launch_code TEXT,
            phase TEXT,
            rubric_code TEXT,
            status TEXT NOT NULL CHECK (status IN ('START', 'END')),
            start_time TEXT,
            end_time TEXT,
            duration_seconds INTEGER GENERATED ALWAYS AS (
                CASE
                    WHEN start_time IS NOT NULL AND end_time IS NOT NULL
                    THEN CAST(strftime('%s', end_time) AS INTEGER)
                         - CAST(strftime('%s', start_time) AS INTEGER)
                    ELSE NULL
                END
            ) STORED,
            day TEXT GENERATED ALWAYS AS (date(COALESCE(start_time, end_time))) STORED,
            source_system TEXT NOT NULL DEFAULT 'pointage',
            source_table TEXT NOT NULL DEFAULT '',
            source_row_id TEXT,
            import_batch_id TEXT NOT NULL,
            dedupe_key TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CONSTRAINT uq_unified_operations_dedupe_key UNIQUE (dedupe_key),
            CHECK (length(dedupe_key) = 64)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_unified_operations_day_identity ON unified_operations(day, identity)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_unified_operations_launch_code ON unified_operations(launch_code)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_unified_operations_status_day ON unified_operations(status, day)",
    )
    .execute(pool)
    .await?;

    info!("Unified operations ledger provisioned");
    Ok(())
}

/// Report whether the ledger table exists
pub async fn ledger_exists(pool: &SqlitePool) -> Result<bool> {
    let present: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'unified_operations'",
    )
    .fetch_optional(pool)
    .await?;

    Ok(present.is_some())
}
