//! Event normalization
//!
//! Converts a raw source row into the canonical fields used for key
//! computation and storage. Total: malformed or missing fields degrade to
//! "absent", never to an error.

use chrono::NaiveDateTime;
use pointage_common::db::models::OpStatus;

/// One recorded fact from a source stream, as read from the store.
///
/// A `Start` row carries the start timestamp, an `End` row the end
/// timestamp; `timestamp` holds whichever one the row's kind defines.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub identity: String,
    pub launch_code: Option<String>,
    pub phase: Option<String>,
    pub rubric_code: Option<String>,
    pub kind: OpStatus,
    pub timestamp: Option<NaiveDateTime>,
    pub source_table: String,
    pub source_row_id: Option<String>,
}

/// Normalized event, ready for key computation and upsert
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub identity: String,
    pub launch_code: Option<String>,
    pub phase: Option<String>,
    pub rubric_code: Option<String>,
    pub status: OpStatus,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

/// Normalize a raw event: trim every string field, collapse empty-after-trim
/// values to absent, and route the timestamp to the slot its kind defines.
pub fn normalize(raw: &RawEvent) -> NormalizedEvent {
    let (start_time, end_time) = match raw.kind {
        OpStatus::Start => (raw.timestamp, None),
        OpStatus::End => (None, raw.timestamp),
    };

    NormalizedEvent {
        identity: raw.identity.trim().to_string(),
        launch_code: clean(raw.launch_code.as_deref()),
        phase: clean(raw.phase.as_deref()),
        rubric_code: clean(raw.rubric_code.as_deref()),
        status: raw.kind,
        start_time,
        end_time,
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 16)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn raw_start() -> RawEvent {
        RawEvent {
            identity: "  001  ".to_string(),
            launch_code: Some(" LT001 ".to_string()),
            phase: Some("   ".to_string()),
            rubric_code: None,
            kind: OpStatus::Start,
            timestamp: Some(ts()),
            source_table: "clock_starts".to_string(),
            source_row_id: None,
        }
    }

    #[test]
    fn trims_and_collapses_empty_to_absent() {
        let ev = normalize(&raw_start());
        assert_eq!(ev.identity, "001");
        assert_eq!(ev.launch_code.as_deref(), Some("LT001"));
        assert_eq!(ev.phase, None);
        assert_eq!(ev.rubric_code, None);
    }

    #[test]
    fn routes_timestamp_by_kind() {
        let ev = normalize(&raw_start());
        assert_eq!(ev.start_time, Some(ts()));
        assert_eq!(ev.end_time, None);

        let mut raw = raw_start();
        raw.kind = OpStatus::End;
        let ev = normalize(&raw);
        assert_eq!(ev.start_time, None);
        assert_eq!(ev.end_time, Some(ts()));
    }

    #[test]
    fn total_on_missing_everything() {
        let raw = RawEvent {
            identity: String::new(),
            launch_code: Some(String::new()),
            phase: None,
            rubric_code: Some("\t\n".to_string()),
            kind: OpStatus::End,
            timestamp: None,
            source_table: String::new(),
            source_row_id: None,
        };
        let ev = normalize(&raw);
        assert_eq!(ev.identity, "");
        assert_eq!(ev.launch_code, None);
        assert_eq!(ev.rubric_code, None);
        assert_eq!(ev.start_time, None);
        assert_eq!(ev.end_time, None);
    }
}
