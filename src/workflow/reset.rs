use tracing::{info, warn};

use super::Evaluation;
use crate::error::Result;
use crate::identity::Actor;
use crate::ledger::ActivityKind;
use crate::reconcile::BatchSummary;
use crate::store::Store;

impl<S: Store> Evaluation<S> {
    /// Return a club to its pre-event state.
    ///
    /// Restores the default score record, clears the lock ledger, purges the
    /// activity log and drops any open edit session, so history and locks
    /// agree with a fresh zero-evaluations record.
    pub fn reset_club(&self, club_id: &str, supervisor: &Actor) -> Result<()> {
        supervisor.require_supervisor("reset clubs")?;
        let config = &self.config;

        self.store.transact(club_id, |rec| {
            rec.club.record = config.catalog.default_record();
            rec.club.total_score = config.max_score;
            rec.club.classification = config.top_tier();
            rec.locks.clear();
            rec.activity.purge();
            rec.edit_session = None;
            rec.activity
                .append(club_id, &supervisor.id, ActivityKind::ClubReset);
            Ok(())
        })?;

        info!(club = %club_id, supervisor = %supervisor.id, "Reset club");
        Ok(())
    }

    /// Reset every club. A failure on one club does not stop the rest.
    pub fn reset_all_clubs(&self, supervisor: &Actor) -> Result<BatchSummary> {
        supervisor.require_supervisor("reset clubs")?;
        let mut summary = BatchSummary::default();

        for id in self.store.club_ids()? {
            summary.processed += 1;
            match self.reset_club(&id, supervisor) {
                Ok(()) => summary.corrected += 1,
                Err(e) => {
                    warn!(club = %id, "Reset failed: {}", e);
                    summary.record_failure(&id, &e);
                }
            }
        }
        Ok(summary)
    }
}
