//! Database models

use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Status of a unified ledger operation.
///
/// `Start` rows carry a start timestamp, `End` rows an end timestamp; the
/// two are distinct ledger entries, never merged. Unrecognized database
/// values are rejected rather than defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpStatus {
    Start,
    End,
}

impl OpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpStatus::Start => "START",
            OpStatus::End => "END",
        }
    }
}

impl FromStr for OpStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "START" => Ok(OpStatus::Start),
            "END" => Ok(OpStatus::End),
            other => Err(Error::InvalidInput(format!(
                "unrecognized operation status: {:?}",
                other
            ))),
        }
    }
}

/// State of a work session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    InProgress,
    Completed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::InProgress => "IN_PROGRESS",
            SessionState::Completed => "COMPLETED",
        }
    }
}

impl FromStr for SessionState {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "IN_PROGRESS" => Ok(SessionState::InProgress),
            "COMPLETED" => Ok(SessionState::Completed),
            other => Err(Error::InvalidInput(format!(
                "unrecognized session state: {:?}",
                other
            ))),
        }
    }
}

/// One entry in the operator directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub code: String,
    pub name: String,
    pub kind: Option<String>,
}

/// A completed work session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub operator_id: String,
    pub launch_code: String,
    pub phase: Option<String>,
    pub rubric_code: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: String,
    pub minutes: i64,
    pub seconds: i64,
}

/// One row of the deduplicated operations ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedOperation {
    pub id: String,
    pub identity: String,
    pub launch_code: Option<String>,
    pub phase: Option<String>,
    pub rubric_code: Option<String>,
    pub status: OpStatus,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_seconds: Option<i64>,
    pub day: Option<String>,
    pub source_table: String,
    pub import_batch_id: String,
    pub dedupe_key: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_status_round_trips() {
        assert_eq!("START".parse::<OpStatus>().unwrap(), OpStatus::Start);
        assert_eq!("END".parse::<OpStatus>().unwrap(), OpStatus::End);
        assert_eq!(OpStatus::Start.as_str(), "START");
    }

    #[test]
    fn op_status_rejects_unknown_values() {
        assert!("DEBUT".parse::<OpStatus>().is_err());
        assert!("start".parse::<OpStatus>().is_err());
        assert!("".parse::<OpStatus>().is_err());
    }

    #[test]
    fn session_state_rejects_unknown_values() {
        assert!("EN_COURS".parse::<SessionState>().is_err());
        assert_eq!(
            "IN_PROGRESS".parse::<SessionState>().unwrap(),
            SessionState::InProgress
        );
    }
}
