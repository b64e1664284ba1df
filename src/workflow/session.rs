use chrono::Utc;
use tracing::info;

use super::{refresh_totals, Evaluation};
use crate::club::EditSession;
use crate::error::{Result, ScoreError};
use crate::identity::Actor;
use crate::ledger::ActivityKind;
use crate::reconcile::{lock_modified_criteria, RelockReport};
use crate::scoring::ScoreRecord;
use crate::store::Store;

impl<S: Store> Evaluation<S> {
    /// Release every active lock for the club. Returns how many were released.
    ///
    /// Released criteria stop counting toward the total until re-locked.
    pub fn unlock_all(&self, club_id: &str, supervisor: &Actor) -> Result<usize> {
        supervisor.require_supervisor("unlock criteria")?;
        let config = &self.config;

        self.store.transact(club_id, |rec| {
            let count = rec.locks.unlock_all().len();
            rec.activity
                .append(club_id, &supervisor.id, ActivityKind::Unlocked { count });
            refresh_totals(config, rec, &supervisor.id, "unlock")?;
            info!(club = %club_id, count, supervisor = %supervisor.id, "Unlocked all criteria");
            Ok(count)
        })
    }

    /// Open a supervisor edit window.
    ///
    /// Locks are released in the ledger but keep protecting their criteria
    /// (and keep counting toward the total) until the window is committed or
    /// cancelled.
    pub fn enter_supervisor_edit_mode(&self, club_id: &str, supervisor: &Actor) -> Result<EditSession> {
        supervisor.require_supervisor("edit locked scores")?;
        let config = &self.config;

        self.store.transact(club_id, |rec| {
            if let Some(ref open) = rec.edit_session {
                return Err(ScoreError::invalid(format!(
                    "club '{}' already has an edit session opened by {} at {}",
                    club_id, open.supervisor, open.opened_at
                )));
            }

            let released = rec.locks.unlock_all();
            let session = EditSession {
                supervisor: supervisor.id.clone(),
                opened_at: Utc::now(),
                original: rec.club.record.clone(),
                previously_locked: released,
            };
            rec.activity.append(
                club_id,
                &supervisor.id,
                ActivityKind::Unlocked {
                    count: session.previously_locked.len(),
                },
            );
            rec.activity
                .append(club_id, &supervisor.id, ActivityKind::EditSessionOpened);
            rec.edit_session = Some(session.clone());
            refresh_totals(config, rec, &supervisor.id, "edit session")?;

            info!(
                club = %club_id,
                released = session.previously_locked.len(),
                "Opened supervisor edit session"
            );
            Ok(session)
        })
    }

    /// Apply a revised score record and close the edit window.
    ///
    /// Only criteria whose value differs from the session snapshot are
    /// applied and re-locked (by the supervisor, with a new timestamp);
    /// untouched criteria get their original lock back, and criteria
    /// evaluated during the session are left as they are. Demerits in
    /// `revised` are ignored; the stored demerits are kept.
    pub fn commit_supervisor_edits(
        &self,
        club_id: &str,
        revised: &ScoreRecord,
        supervisor: &Actor,
    ) -> Result<RelockReport> {
        supervisor.require_supervisor("edit locked scores")?;
        let config = &self.config;

        self.store.transact(club_id, |rec| {
            let session = rec.edit_session.take().ok_or_else(|| {
                ScoreError::not_found(format!("open edit session for club '{}'", club_id))
            })?;

            // Only the supervisor's edits against the snapshot are applied, so
            // criteria evaluated while the session was open keep their score.
            for (address, _, new) in session.original.changed_leaves(revised) {
                let def = config.catalog.require_criterion(&address)?;
                if !def.allows(new) {
                    return Err(ScoreError::Validation {
                        description: config.catalog.describe(&address),
                        address: address.to_string(),
                        value: new,
                        allowed: def.allowed_values(),
                    });
                }
                let old = rec.club.record.set(&address, new)?.unwrap_or(0.0);
                if old != new {
                    rec.activity.append(
                        club_id,
                        &supervisor.id,
                        ActivityKind::ScoreChanged { address, old, new },
                    );
                }
            }

            let mut report =
                lock_modified_criteria(config, rec, &session.original, revised, &supervisor.id)?;

            let untouched: Vec<_> = session
                .previously_locked
                .iter()
                .filter(|a| !report.locked.contains(a) && !report.skipped_zero.contains(a))
                .cloned()
                .collect();
            report.restored = rec.locks.relock(&untouched);
            rec.activity.append(
                club_id,
                &supervisor.id,
                ActivityKind::Relocked {
                    count: report.restored,
                },
            );

            refresh_totals(config, rec, &supervisor.id, "supervisor edit")?;
            info!(
                club = %club_id,
                locked = report.locked.len(),
                restored = report.restored,
                skipped_zero = report.skipped_zero.len(),
                "Committed supervisor edits"
            );
            Ok(report)
        })
    }

    /// Close the edit window without changes, restoring every released lock.
    pub fn cancel_supervisor_edits(&self, club_id: &str, supervisor: &Actor) -> Result<usize> {
        supervisor.require_supervisor("edit locked scores")?;
        let config = &self.config;

        self.store.transact(club_id, |rec| {
            let session = rec.edit_session.take().ok_or_else(|| {
                ScoreError::not_found(format!("open edit session for club '{}'", club_id))
            })?;
            let restored = rec.locks.relock(&session.previously_locked);
            rec.activity
                .append(club_id, &supervisor.id, ActivityKind::EditSessionCancelled);
            rec.activity
                .append(club_id, &supervisor.id, ActivityKind::Relocked { count: restored });
            refresh_totals(config, rec, &supervisor.id, "edit session")?;
            Ok(restored)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::club::NewClub;
    use crate::config::EventConfig;
    use crate::error::ScoreError;
    use crate::identity::{Actor, Role};
    use crate::scoring::CriterionAddress;
    use crate::store::MemoryStore;
    use crate::workflow::{Evaluation, SubmitOutcome};

    fn admin() -> Actor {
        Actor::new("admin-1", Role::Admin)
    }

    fn staff() -> Actor {
        Actor::new("staff-1", Role::Staff)
    }

    fn addr(s: &str) -> CriterionAddress {
        s.parse().unwrap()
    }

    fn setup() -> Evaluation<MemoryStore> {
        let eval = Evaluation::new(EventConfig::default(), MemoryStore::new());
        eval.register_club(
            NewClub {
                id: "orion".to_string(),
                name: "Orion".to_string(),
                region: "north".to_string(),
                members: 14,
            },
            &admin(),
        )
        .unwrap();
        eval.submit_criterion_score("orion", &addr("general.uniform"), 40.0, &staff())
            .unwrap();
        eval.submit_criterion_score("orion", &addr("events.carousel.abel"), 20.0, &staff())
            .unwrap();
        eval
    }

    #[test]
    fn test_unlock_all_then_relock_succeeds() {
        let eval = setup();
        assert_eq!(eval.unlock_all("orion", &admin()).unwrap(), 2);
        assert!(!eval
            .is_criterion_locked("orion", &addr("general.uniform"))
            .unwrap());
        // Penalties of unlocked criteria no longer count
        assert_eq!(eval.get_total_score("orion").unwrap(), 1910.0);

        let outcome = eval
            .submit_criterion_score("orion", &addr("general.uniform"), 80.0, &staff())
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Locked(_)));
    }

    #[test]
    fn test_unlock_all_requires_supervisor() {
        let eval = setup();
        let err = eval.unlock_all("orion", &staff()).unwrap_err();
        assert!(matches!(err, ScoreError::Permission { .. }));
    }

    #[test]
    fn test_edit_session_keeps_total_and_protection() {
        let eval = setup();
        let before = eval.get_total_score("orion").unwrap();
        let session = eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();
        assert_eq!(session.previously_locked.len(), 2);
        assert_eq!(eval.get_total_score("orion").unwrap(), before);

        let err = eval
            .submit_criterion_score("orion", &addr("general.uniform"), 80.0, &staff())
            .unwrap_err();
        assert!(matches!(err, ScoreError::AlreadyLocked { .. }));
    }

    #[test]
    fn test_second_session_rejected() {
        let eval = setup();
        eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();
        assert!(eval.enter_supervisor_edit_mode("orion", &admin()).is_err());
    }

    #[test]
    fn test_commit_relocks_only_changes() {
        let eval = setup();
        let original_abel = eval
            .lock_entry("orion", &addr("events.carousel.abel"))
            .unwrap()
            .unwrap();
        let session = eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();

        let mut revised = session.original.clone();
        revised.set(&addr("general.uniform"), 80.0).unwrap();
        let report = eval
            .commit_supervisor_edits("orion", &revised, &admin())
            .unwrap();

        assert_eq!(report.locked, vec![addr("general.uniform")]);
        assert_eq!(report.restored, 1);

        let uniform = eval
            .lock_entry("orion", &addr("general.uniform"))
            .unwrap()
            .unwrap();
        assert_eq!(uniform.evaluator, "admin-1");
        assert_eq!(uniform.score, 80.0);

        let abel = eval
            .lock_entry("orion", &addr("events.carousel.abel"))
            .unwrap()
            .unwrap();
        assert_eq!(abel, original_abel);

        // Only the carousel partial (40 - 20) still costs points
        assert_eq!(eval.get_total_score("orion").unwrap(), 1890.0);
    }

    #[test]
    fn test_commit_keeps_evaluation_made_during_session() {
        let eval = setup();
        let session = eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();
        eval.submit_criterion_score("orion", &addr("events.hike"), 150.0, &staff())
            .unwrap();

        let mut revised = session.original.clone();
        revised.set(&addr("general.uniform"), 80.0).unwrap();
        let report = eval
            .commit_supervisor_edits("orion", &revised, &admin())
            .unwrap();
        assert_eq!(report.locked, vec![addr("general.uniform")]);

        let club = eval.get_club("orion").unwrap();
        assert_eq!(club.record.get(&addr("events.hike")), Some(150.0));
        let hike = eval
            .lock_entry("orion", &addr("events.hike"))
            .unwrap()
            .unwrap();
        assert_eq!(hike.evaluator, "staff-1");
        assert!(hike.is_locked);
        // Hike earned in full, uniform raised to max: only abel's partial remains
        assert_eq!(club.total_score, 1890.0);
    }

    #[test]
    fn test_commit_zeroing_keeps_other_session_locks() {
        let eval = setup();
        let session = eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();
        eval.submit_criterion_score("orion", &addr("events.hike"), 75.0, &staff())
            .unwrap();

        // Zeroing a suspended lock leaves it unevaluated; the new hike lock stays
        let mut revised = session.original.clone();
        revised.set(&addr("general.uniform"), 0.0).unwrap();
        let report = eval
            .commit_supervisor_edits("orion", &revised, &admin())
            .unwrap();
        assert_eq!(report.skipped_zero, vec![addr("general.uniform")]);
        assert!(!eval
            .is_criterion_locked("orion", &addr("general.uniform"))
            .unwrap());
        assert!(eval
            .is_criterion_locked("orion", &addr("events.hike"))
            .unwrap());
        // abel partial 20 + hike partial 75
        assert_eq!(eval.get_total_score("orion").unwrap(), 1815.0);
    }

    #[test]
    fn test_commit_rejects_invalid_value_and_keeps_session() {
        let eval = setup();
        let session = eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();
        let mut revised = session.original.clone();
        revised.set(&addr("general.uniform"), 33.0).unwrap();
        let err = eval
            .commit_supervisor_edits("orion", &revised, &admin())
            .unwrap_err();
        assert!(matches!(err, ScoreError::Validation { .. }));

        // Transaction rolled back: the session is still open
        assert!(eval.cancel_supervisor_edits("orion", &admin()).is_ok());
    }

    #[test]
    fn test_commit_without_session() {
        let eval = setup();
        let revised = eval.get_club("orion").unwrap().record;
        let err = eval
            .commit_supervisor_edits("orion", &revised, &admin())
            .unwrap_err();
        assert!(matches!(err, ScoreError::NotFound(_)));
    }

    #[test]
    fn test_cancel_restores_locks() {
        let eval = setup();
        eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();
        assert_eq!(eval.cancel_supervisor_edits("orion", &admin()).unwrap(), 2);
        assert!(eval
            .is_criterion_locked("orion", &addr("general.uniform"))
            .unwrap());
        assert_eq!(eval.get_total_score("orion").unwrap(), 1850.0);
    }

    #[test]
    fn test_commit_keeps_demerits_recorded_during_session() {
        let eval = setup();
        let session = eval.enter_supervisor_edit_mode("orion", &admin()).unwrap();
        eval.record_demerit("orion", "late_arrival", 1, &staff())
            .unwrap();
        eval.commit_supervisor_edits("orion", &session.original, &admin())
            .unwrap();
        let club = eval.get_club("orion").unwrap();
        assert_eq!(club.record.demerit("late_arrival"), 100.0);
        assert_eq!(club.total_score, 1750.0);
    }
}
