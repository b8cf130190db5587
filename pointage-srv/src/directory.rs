//! Operator directory
//!
//! The directory source is chosen once, at construction, from the
//! `directory_source` setting: either the live `operators` table or a fixed
//! fallback roster for floors running without a seeded directory. Handlers
//! only ever see the [`OperatorDirectory`] value injected into application
//! state; there is no call-time switching.

use pointage_common::db::models::Operator;
use pointage_common::{Error, Result};
use sqlx::SqlitePool;

/// Injected operator directory source
#[derive(Clone)]
pub enum OperatorDirectory {
    /// Live `operators` table
    Database(SqlitePool),
    /// Fixed fallback roster
    Fixture,
}

impl OperatorDirectory {
    /// Build a directory from the `directory_source` setting value.
    ///
    /// Unrecognized values are rejected rather than silently defaulted.
    pub fn from_setting(value: &str, db: &SqlitePool) -> Result<Self> {
        match value {
            "database" => Ok(OperatorDirectory::Database(db.clone())),
            "fixture" => Ok(OperatorDirectory::Fixture),
            other => Err(Error::Config(format!(
                "unrecognized directory_source: {:?} (expected \"database\" or \"fixture\")",
                other
            ))),
        }
    }

    /// List all operators, ordered by code
    pub async fn list(&self) -> Result<Vec<Operator>> {
        match self {
            OperatorDirectory::Database(pool) => {
                let rows: Vec<(String, String, Option<String>)> =
                    sqlx::query_as("SELECT code, name, kind FROM operators ORDER BY code")
                        .fetch_all(pool)
                        .await?;

                Ok(rows
                    .into_iter()
                    .map(|(code, name, kind)| Operator {
                        code: code.trim().to_string(),
                        name: name.trim().to_string(),
                        kind,
                    })
                    .collect())
            }
            OperatorDirectory::Fixture => Ok(fixture_roster()),
        }
    }

    /// Display name for an operator code; a generic label when unknown
    pub async fn display_name(&self, code: &str) -> Result<String> {
        let roster = self.list().await?;
        Ok(roster
            .into_iter()
            .find(|op| op.code == code.trim())
            .map(|op| op.name)
            .unwrap_or_else(|| format!("Operator {}", code.trim())))
    }
}

/// Fallback roster used when no directory table is available
fn fixture_roster() -> Vec<Operator> {
    let entries = [
        ("001", "Temp Worker 1"),
        ("002", "Temp Worker 2"),
        ("003", "Temp Worker 3"),
        ("004", "Temp Worker 4"),
        ("140972", "Lead Operator"),
    ];

    entries
        .iter()
        .map(|(code, name)| Operator {
            code: (*code).to_string(),
            name: (*name).to_string(),
            kind: Some("O".to_string()),
        })
        .collect()
}
