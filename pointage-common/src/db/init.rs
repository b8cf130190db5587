//! Database initialization
//!
//! Creates the application tables on first run and is safe to call on every
//! startup: all DDL is `CREATE TABLE IF NOT EXISTS` / `CREATE INDEX IF NOT
//! EXISTS`, and settings are only inserted when absent.
//!
//! The unified operations ledger is NOT created here; it has its own
//! provisioning step invoked explicitly (or via the export API) so that a
//! missing ledger surfaces as a distinct error instead of being silently
//! recreated in the hot path.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create application tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Bounded waits on a locked database; a timed-out statement fails the
    // whole batch it belongs to
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_app_tables(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all application tables (idempotent)
///
/// Exposed separately from [`init_database`] so tests can build the schema
/// on an in-memory pool.
pub async fn create_app_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_operators_table(pool).await?;
    create_clock_starts_table(pool).await?;
    create_clock_ends_table(pool).await?;
    create_active_sessions_table(pool).await?;
    create_session_history_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the operator directory table
pub async fn create_operators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operators (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the raw session-start stream
///
/// One row per recorded session start. Read (never mutated) by the
/// reconciler.
pub async fn create_clock_starts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clock_starts (
            id TEXT PRIMARY KEY,
            identity TEXT NOT NULL,
            launch_code TEXT,
            phase TEXT,
            rubric_code TEXT,
            started_at TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_clock_starts_started_at ON clock_starts(started_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the raw session-end stream
pub async fn create_clock_ends_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clock_ends (
            id TEXT PRIMARY KEY,
            identity TEXT NOT NULL,
            launch_code TEXT,
            phase TEXT,
            rubric_code TEXT,
            ended_at TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_clock_ends_ended_at ON clock_ends(ended_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the in-progress sessions table
pub async fn create_active_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS active_sessions (
            id TEXT PRIMARY KEY,
            operator_id TEXT NOT NULL,
            launch_code TEXT NOT NULL,
            phase TEXT,
            rubric_code TEXT,
            started_at TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'IN_PROGRESS' CHECK (state = 'IN_PROGRESS'),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_active_sessions_operator ON active_sessions(operator_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the completed sessions table
pub async fn create_session_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_history (
            id TEXT PRIMARY KEY,
            operator_id TEXT NOT NULL,
            launch_code TEXT NOT NULL,
            phase TEXT,
            rubric_code TEXT,
            started_at TEXT,
            ended_at TEXT NOT NULL,
            minutes INTEGER NOT NULL DEFAULT 0,
            seconds INTEGER NOT NULL DEFAULT 0,
            state TEXT NOT NULL DEFAULT 'COMPLETED' CHECK (state = 'COMPLETED'),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_session_history_operator ON session_history(operator_id, ended_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values; NULL values are
/// reset to their defaults.
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // Operator directory source: "database" or "fixture"
    ensure_setting(pool, "directory_source", "database").await?;

    // Export behavior at startup
    ensure_setting(pool, "export_auto_provision", "false").await?;
    ensure_setting(pool, "export_run_on_start", "false").await?;

    ensure_admin_token(pool).await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races: multiple
        // starts may pass the exists check simultaneously
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!(
            "Initialized setting '{}' with default value: {}",
            key, default_value
        );
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Initialize the admin token on first run
///
/// Generates a random token when none exists. An operator may deliberately
/// set the value to the empty string to disable the admin auth check.
async fn ensure_admin_token(pool: &SqlitePool) -> Result<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = 'admin_token')")
            .fetch_one(pool)
            .await?;

    if !exists {
        let token = format!("{:032x}", rand::random::<u128>());
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES ('admin_token', ?)")
            .bind(&token)
            .execute(pool)
            .await?;

        info!("Generated admin token (stored in settings table)");
    }

    Ok(())
}

/// Load a setting value; `None` when the key is absent
pub async fn load_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Load a boolean setting; absent or non-"true" values read as false
pub async fn load_setting_bool(pool: &SqlitePool, key: &str) -> Result<bool> {
    Ok(load_setting(pool, key).await?.as_deref() == Some("true"))
}
