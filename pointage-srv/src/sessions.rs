//! Session store operations
//!
//! Opening a session writes the in-progress row and its raw clock-start
//! event together; closing one moves the row into history and writes the
//! raw clock-end event. Each of the two moves is a single transaction, so
//! the session tables and the raw streams can never disagree.

use chrono::NaiveDateTime;
use pointage_common::db::models::HistoryRecord;
use pointage_common::time::{fmt_ts, parse_ts};
use pointage_common::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Fields for a new work session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub operator_id: String,
    pub launch_code: String,
    pub phase: Option<String>,
    pub rubric_code: Option<String>,
    pub started_at: NaiveDateTime,
}

/// One in-progress session row
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub id: String,
    pub operator_id: String,
    pub launch_code: String,
    pub phase: Option<String>,
    pub rubric_code: Option<String>,
    pub started_at: String,
}

/// Open a session: insert the in-progress row and its raw start event
pub async fn open_session(db: &SqlitePool, new: &NewSession) -> Result<ActiveSession> {
    let id = Uuid::new_v4().to_string();
    let started_at = fmt_ts(new.started_at);

    let mut tx = db.begin().await?;

    sqlx::query(
        "INSERT INTO active_sessions (id, operator_id, launch_code, phase, rubric_code, started_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&new.operator_id)
    .bind(&new.launch_code)
    .bind(&new.phase)
    .bind(&new.rubric_code)
    .bind(&started_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO clock_starts (id, identity, launch_code, phase, rubric_code, started_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&new.operator_id)
    .bind(&new.launch_code)
    .bind(&new.phase)
    .bind(&new.rubric_code)
    .bind(&started_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ActiveSession {
        id,
        operator_id: new.operator_id.clone(),
        launch_code: new.launch_code.clone(),
        phase: new.phase.clone(),
        rubric_code: new.rubric_code.clone(),
        started_at,
    })
}

/// Find an in-progress session by id
pub async fn find_active_by_id(db: &SqlitePool, id: &str) -> Result<Option<ActiveSession>> {
    let row: Option<(String, String, String, Option<String>, Option<String>, String)> =
        sqlx::query_as(
            "SELECT id, operator_id, launch_code, phase, rubric_code, started_at \
             FROM active_sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(row.map(active_session))
}

/// Find the most recent in-progress session matching operator and launch
/// code, narrowed by phase when one is given
pub async fn find_active_by_fields(
    db: &SqlitePool,
    operator_id: &str,
    launch_code: &str,
    phase: Option<&str>,
) -> Result<Option<ActiveSession>> {
    let row: Option<(String, String, String, Option<String>, Option<String>, String)> = match phase
    {
        Some(phase) => {
            sqlx::query_as(
                "SELECT id, operator_id, launch_code, phase, rubric_code, started_at \
                 FROM active_sessions \
                 WHERE operator_id = ? AND launch_code = ? AND COALESCE(phase, '') = ? \
                 ORDER BY started_at DESC LIMIT 1",
            )
            .bind(operator_id)
            .bind(launch_code)
            .bind(phase)
            .fetch_optional(db)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT id, operator_id, launch_code, phase, rubric_code, started_at \
                 FROM active_sessions \
                 WHERE operator_id = ? AND launch_code = ? \
                 ORDER BY started_at DESC LIMIT 1",
            )
            .bind(operator_id)
            .bind(launch_code)
            .fetch_optional(db)
            .await?
        }
    };

    Ok(row.map(active_session))
}

/// Close an in-progress session: move it to history and record the raw end
/// event. The session keeps its id across the move.
///
/// `minutes`/`seconds` default to the elapsed time between start and end
/// when not supplied by the caller.
pub async fn close_session(
    db: &SqlitePool,
    session: &ActiveSession,
    ended_at: NaiveDateTime,
    minutes: Option<i64>,
    seconds: Option<i64>,
) -> Result<HistoryRecord> {
    let (minutes, seconds) = match (minutes, seconds) {
        (Some(m), Some(s)) => (m, s),
        (m, s) => {
            let elapsed = parse_ts(&session.started_at)
                .map(|start| (ended_at - start).num_seconds().max(0))
                .unwrap_or(0);
            (m.unwrap_or(elapsed / 60), s.unwrap_or(elapsed % 60))
        }
    };

    let ended = fmt_ts(ended_at);
    let mut tx = db.begin().await?;

    let deleted = sqlx::query("DELETE FROM active_sessions WHERE id = ?")
        .bind(&session.id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "active session {} no longer exists",
            session.id
        )));
    }

    sqlx::query(
        "INSERT INTO session_history \
         (id, operator_id, launch_code, phase, rubric_code, started_at, ended_at, minutes, seconds) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(&session.operator_id)
    .bind(&session.launch_code)
    .bind(&session.phase)
    .bind(&session.rubric_code)
    .bind(&session.started_at)
    .bind(&ended)
    .bind(minutes)
    .bind(seconds)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO clock_ends (id, identity, launch_code, phase, rubric_code, ended_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&session.operator_id)
    .bind(&session.launch_code)
    .bind(&session.phase)
    .bind(&session.rubric_code)
    .bind(&ended)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(HistoryRecord {
        id: session.id.clone(),
        operator_id: session.operator_id.clone(),
        launch_code: session.launch_code.clone(),
        phase: session.phase.clone(),
        rubric_code: session.rubric_code.clone(),
        started_at: Some(session.started_at.clone()),
        ended_at: ended,
        minutes,
        seconds,
    })
}

fn active_session(
    row: (String, String, String, Option<String>, Option<String>, String),
) -> ActiveSession {
    let (id, operator_id, launch_code, phase, rubric_code, started_at) = row;
    ActiveSession {
        id,
        operator_id,
        launch_code,
        phase,
        rubric_code,
        started_at,
    }
}
