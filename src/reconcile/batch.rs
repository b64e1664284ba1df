use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ScoreError};
use crate::identity::Actor;
use crate::scoring::{self, CriterionAddress};
use crate::store::Store;
use crate::workflow::{refresh_totals, Evaluation};

/// Outcome of a batch job across all clubs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub corrected: usize,
    pub failed: usize,
    /// (club id, error message)
    pub failures: Vec<(String, String)>,
    pub invalid_leaves: Vec<InvalidLeaf>,
}

impl BatchSummary {
    pub(crate) fn record_failure(&mut self, club_id: &str, err: &ScoreError) {
        self.failed += 1;
        self.failures.push((club_id.to_string(), err.to_string()));
    }
}

/// A stored leaf outside its criterion's allowed set (or absent from the catalog).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidLeaf {
    pub club: String,
    pub address: CriterionAddress,
    pub value: f64,
}

/// Cached total or classification that disagrees with a fresh derivation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drift {
    pub club: String,
    pub cached_total: f64,
    pub derived_total: f64,
    pub cached_tier: String,
    pub derived_tier: String,
}

/// Result of a report-only audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditReport {
    pub drifts: Vec<Drift>,
    /// (club id, error message) for clubs that could not be checked
    pub failures: Vec<(String, String)>,
}

impl<S: Store> Evaluation<S> {
    /// Recompute one club's total and classification from its persisted
    /// record and ledger. Returns whether the cached fields were patched.
    pub fn fix_club_classification(&self, club_id: &str, supervisor: &Actor) -> Result<bool> {
        supervisor.require_supervisor("reconcile classifications")?;
        Ok(self.reconcile_club(club_id, &supervisor.id, false)?.0)
    }

    /// Recompute inside the club's transaction, optionally collecting stored
    /// leaves the catalog would reject (left untouched).
    fn reconcile_club(
        &self,
        club_id: &str,
        actor_id: &str,
        check_leaves: bool,
    ) -> Result<(bool, Vec<InvalidLeaf>)> {
        let config = self.config();
        let (changed, invalid) = self.store().transact(club_id, |rec| {
            let mut invalid = Vec::new();
            if check_leaves {
                for (address, value) in rec.club.record.criterion_leaves() {
                    let valid = config
                        .catalog
                        .criterion(&address)
                        .is_some_and(|def| def.allows(value));
                    if !valid {
                        warn!(club = %club_id, %address, value, "Stored value not allowed by catalog");
                        invalid.push(InvalidLeaf {
                            club: club_id.to_string(),
                            address,
                            value,
                        });
                    }
                }
            }
            let changed = refresh_totals(config, rec, actor_id, "reconcile")?;
            Ok((changed, invalid))
        })?;
        if changed {
            info!(club = %club_id, "Corrected cached total/classification");
        } else {
            debug!(club = %club_id, "Cached total/classification already consistent");
        }
        Ok((changed, invalid))
    }

    fn reconcile_all(&self, supervisor: &Actor, check_leaves: bool) -> Result<BatchSummary> {
        supervisor.require_supervisor("reconcile classifications")?;
        let mut summary = BatchSummary::default();

        for id in self.store().club_ids()? {
            summary.processed += 1;
            match self.reconcile_club(&id, &supervisor.id, check_leaves) {
                Ok((changed, mut invalid)) => {
                    if changed {
                        summary.corrected += 1;
                    }
                    summary.invalid_leaves.append(&mut invalid);
                }
                Err(e) => {
                    warn!(club = %id, "Reconciliation failed: {}", e);
                    summary.record_failure(&id, &e);
                }
            }
        }

        info!(
            processed = summary.processed,
            corrected = summary.corrected,
            failed = summary.failed,
            "Reclassified clubs"
        );
        Ok(summary)
    }

    /// Reconcile every club. Per-club errors are collected, not raised.
    pub fn reclassify_all_clubs(&self, supervisor: &Actor) -> Result<BatchSummary> {
        self.reconcile_all(supervisor, false)
    }

    /// Like [`reclassify_all_clubs`](Self::reclassify_all_clubs), and also
    /// report stored leaves that the catalog would reject. Those leaves are
    /// left untouched.
    pub fn validate_all_classifications(&self, supervisor: &Actor) -> Result<BatchSummary> {
        self.reconcile_all(supervisor, true)
    }

    /// Report-only pass: list clubs whose cached fields disagree with a fresh
    /// derivation, and clubs that could not be read or derived.
    pub fn audit_all_classifications(&self) -> Result<AuditReport> {
        let mut report = AuditReport::default();

        for id in self.store().club_ids()? {
            let rec = match self.store().get(&id) {
                Ok(Some(rec)) => rec,
                Ok(None) => continue,
                Err(e) => {
                    warn!(club = %id, "Cannot read club: {}", e);
                    report.failures.push((id, e.to_string()));
                    continue;
                }
            };
            let derived =
                match scoring::evaluate(self.config(), &rec.club.record, &rec.evaluated_set()) {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(club = %id, "Cannot derive total: {}", e);
                        report.failures.push((id, e.to_string()));
                        continue;
                    }
                };
            if derived.total != rec.club.total_score
                || derived.classification != rec.club.classification
            {
                report.drifts.push(Drift {
                    club: id,
                    cached_total: rec.club.total_score,
                    derived_total: derived.total,
                    cached_tier: rec.club.classification,
                    derived_tier: derived.classification,
                });
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::club::NewClub;
    use crate::config::EventConfig;
    use crate::identity::Role;
    use crate::ledger::ActivityKind;
    use crate::store::MemoryStore;

    fn admin() -> Actor {
        Actor::new("admin-1", Role::Admin)
    }

    fn setup() -> Evaluation<MemoryStore> {
        let eval = Evaluation::new(EventConfig::default(), MemoryStore::new());
        for id in ["orion", "vega"] {
            eval.register_club(
                NewClub {
                    id: id.to_string(),
                    name: id.to_uppercase(),
                    region: String::new(),
                    members: 8,
                },
                &admin(),
            )
            .unwrap();
        }
        eval
    }

    fn corrupt_total(eval: &Evaluation<MemoryStore>, id: &str, total: f64) {
        eval.store()
            .transact(id, |rec| {
                rec.club.total_score = total;
                rec.club.classification = "APRENDIZ".to_string();
                Ok(())
            })
            .unwrap();
    }

    /// Lock a leaf the catalog does not know, so deriving the total fails.
    fn lock_unknown_criterion(eval: &Evaluation<MemoryStore>, id: &str) {
        let stray: CriterionAddress = "kitchen.stove".parse().unwrap();
        eval.store()
            .transact(id, |rec| {
                rec.club.record.set(&stray, 10.0)?;
                rec.locks.upsert(crate::ledger::LockEntry {
                    club: id.to_string(),
                    address: stray.clone(),
                    evaluator: "s1".to_string(),
                    evaluated_at: chrono::Utc::now(),
                    score: 10.0,
                    is_locked: true,
                });
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_consistent_clubs_need_no_correction() {
        let eval = setup();
        let summary = eval.reclassify_all_clubs(&admin()).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.corrected, 0);
        assert_eq!(eval.audit_all_classifications().unwrap(), AuditReport::default());
    }

    #[test]
    fn test_audit_reports_without_patching() {
        let eval = setup();
        corrupt_total(&eval, "vega", 12.0);

        let report = eval.audit_all_classifications().unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(
            report.drifts,
            vec![Drift {
                club: "vega".to_string(),
                cached_total: 12.0,
                derived_total: 1910.0,
                cached_tier: "APRENDIZ".to_string(),
                derived_tier: "MISSIONÁRIO".to_string(),
            }]
        );
        assert_eq!(eval.get_total_score("vega").unwrap(), 12.0);
    }

    #[test]
    fn test_validate_repairs_drift_and_is_idempotent() {
        let eval = setup();
        corrupt_total(&eval, "vega", 12.0);

        let first = eval.validate_all_classifications(&admin()).unwrap();
        assert_eq!(first.corrected, 1);
        assert_eq!(eval.get_total_score("vega").unwrap(), 1910.0);
        assert_eq!(eval.get_classification("vega").unwrap(), "MISSIONÁRIO");
        let history = eval.history("vega").unwrap();
        assert!(history.iter().any(|e| matches!(
            &e.kind,
            ActivityKind::TotalChanged { reason, .. } if reason == "reconcile"
        )));

        let second = eval.validate_all_classifications(&admin()).unwrap();
        assert_eq!(second.corrected, 0);
        assert_eq!(second.failed, 0);
    }

    #[test]
    fn test_fix_single_club() {
        let eval = setup();
        corrupt_total(&eval, "orion", 900.0);
        assert!(eval.fix_club_classification("orion", &admin()).unwrap());
        assert!(!eval.fix_club_classification("orion", &admin()).unwrap());
        assert!(eval
            .fix_club_classification("orion", &Actor::new("s1", Role::Staff))
            .is_err());
    }

    #[test]
    fn test_validate_reports_invalid_leaves() {
        let eval = setup();
        let uniform: CriterionAddress = "general.uniform".parse().unwrap();
        eval.store()
            .transact("orion", |rec| {
                rec.club.record.set(&uniform, 33.0)?;
                Ok(())
            })
            .unwrap();

        let summary = eval.validate_all_classifications(&admin()).unwrap();
        assert_eq!(summary.invalid_leaves.len(), 1);
        assert_eq!(summary.invalid_leaves[0].address, uniform);
        // Reported, not modified
        let club = eval.get_club("orion").unwrap();
        assert_eq!(club.record.get(&uniform), Some(33.0));
    }

    #[test]
    fn test_failing_club_does_not_stop_batch() {
        let eval = setup();
        lock_unknown_criterion(&eval, "orion");
        corrupt_total(&eval, "vega", 12.0);

        let summary = eval.reclassify_all_clubs(&admin()).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].0, "orion");
        assert_eq!(summary.corrected, 1);
    }

    #[test]
    fn test_validate_isolates_failing_club() {
        let eval = setup();
        lock_unknown_criterion(&eval, "orion");
        let uniform: CriterionAddress = "general.uniform".parse().unwrap();
        eval.store()
            .transact("vega", |rec| {
                rec.club.record.set(&uniform, 33.0)?;
                Ok(())
            })
            .unwrap();

        let summary = eval.validate_all_classifications(&admin()).unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].0, "orion");
        assert_eq!(summary.invalid_leaves.len(), 1);
        assert_eq!(summary.invalid_leaves[0].club, "vega");
    }

    #[test]
    fn test_audit_reports_unscorable_club() {
        let eval = setup();
        lock_unknown_criterion(&eval, "orion");
        corrupt_total(&eval, "vega", 12.0);

        let report = eval.audit_all_classifications().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "orion");
        assert!(report.failures[0].1.contains("kitchen.stove"));
        assert_eq!(report.drifts.len(), 1);
        assert_eq!(report.drifts[0].club, "vega");
    }
}
