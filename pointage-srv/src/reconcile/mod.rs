//! Reconciliation of raw clock events into the unified operations ledger
//!
//! The raw streams (`clock_starts`, `clock_ends`) record one fact per row: a
//! session started, or a session ended. Reconciliation normalizes each fact,
//! derives a content-addressed dedupe key, and applies the batch against the
//! ledger with at-most-once insertion per key. Re-running over overlapping
//! windows is safe by construction.

pub mod engine;
pub mod key;
pub mod normalize;
pub mod provision;

pub use engine::{ReconcileSummary, Reconciler};
pub use key::dedupe_key;
pub use normalize::{normalize, NormalizedEvent, RawEvent};
pub use provision::{ledger_exists, provision_ledger};
