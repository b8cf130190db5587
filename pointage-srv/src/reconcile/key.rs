//! Dedupe key computation
//!
//! The stable identity of a logical event: SHA-256 over the event's fields
//! joined in a fixed order with a fixed delimiter. Absent fields render as a
//! placeholder token that cannot be confused with a real value, so two
//! different "absent" encodings never collide with actual data. Timestamps
//! render at second precision via the canonical store format.
//!
//! `status` participates in the key: a session's START and END are two
//! distinct ledger rows, not one merged interval.

use pointage_common::time::fmt_ts;
use sha2::{Digest, Sha256};

use super::normalize::NormalizedEvent;

/// Placeholder for absent fields; not expected in real data
const ABSENT: &str = "~";

/// Field delimiter; not expected in real data
const DELIM: &str = "|";

/// Compute the hex-encoded SHA-256 dedupe key of a normalized event
pub fn dedupe_key(ev: &NormalizedEvent) -> String {
    let joined = [
        ev.identity.clone(),
        ev.launch_code.clone().unwrap_or_else(|| ABSENT.to_string()),
        ev.phase.clone().unwrap_or_else(|| ABSENT.to_string()),
        ev.rubric_code.clone().unwrap_or_else(|| ABSENT.to_string()),
        ev.status.as_str().to_string(),
        ev.start_time.map(fmt_ts).unwrap_or_else(|| ABSENT.to_string()),
        ev.end_time.map(fmt_ts).unwrap_or_else(|| ABSENT.to_string()),
    ]
    .join(DELIM);

    format!("{:x}", Sha256::digest(joined.as_bytes()))
}
