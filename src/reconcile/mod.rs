mod batch;
mod relock;

pub use batch::{AuditReport, BatchSummary, Drift, InvalidLeaf};
pub use relock::{lock_modified_criteria, RelockReport};
