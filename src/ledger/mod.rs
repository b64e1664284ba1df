pub mod activity;
pub mod types;

pub use activity::{ActivityKind, ActivityLog, ActivityLogEntry};
pub use types::{EvaluatedSet, LockEntry, LockLedger};
