use crate::club::ClubRecord;
use crate::config::EventConfig;
use crate::error::Result;
use crate::scoring::{CriterionAddress, ScoreRecord};
use crate::workflow::{lock_in_record, LockMode};

/// What a relock pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelockReport {
    /// Criteria locked again with their new value
    pub locked: Vec<CriterionAddress>,
    /// Criteria changed to zero; left unevaluated
    pub skipped_zero: Vec<CriterionAddress>,
    /// Untouched criteria whose original lock was restored
    pub restored: usize,
}

/// Lock every criterion whose value differs between `original` and `revised`.
///
/// Locks are taken in supervisor-override mode with the revised value. A
/// criterion changed to zero cannot be locked: any lock it still holds is
/// released and it is reported in `skipped_zero`. Demerits are never compared.
pub fn lock_modified_criteria(
    config: &EventConfig,
    rec: &mut ClubRecord,
    original: &ScoreRecord,
    revised: &ScoreRecord,
    actor_id: &str,
) -> Result<RelockReport> {
    let mut report = RelockReport::default();

    for (address, _old, new) in original.changed_leaves(revised) {
        if new == 0.0 {
            rec.locks.unlock(&address);
            report.skipped_zero.push(address);
            continue;
        }
        lock_in_record(config, rec, &address, new, actor_id, LockMode::SupervisorOverride)?;
        report.locked.push(address);
    }

    Ok(report)
}
