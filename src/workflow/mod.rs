mod reset;
mod session;

use chrono::Utc;
use tracing::{debug, info};

use crate::club::{Club, ClubRecord, NewClub};
use crate::config::EventConfig;
use crate::error::{Result, ScoreError};
use crate::identity::Actor;
use crate::ledger::{ActivityKind, ActivityLogEntry, LockEntry};
use crate::scoring::{self, CriterionAddress, ScoreResult};
use crate::store::Store;

/// Whether a lock may replace an existing active lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Evaluator,
    SupervisorOverride,
}

/// What a single criterion submission did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Score applied and criterion locked
    Locked(LockEntry),
    /// Zero applied; the criterion stays unevaluated and unlocked
    RecordedUnevaluated,
    /// Demerit magnitude replaced; demerits are never locked
    DemeritUpdated { total: f64 },
}

/// Evaluation workflow over a club store.
///
/// Every mutation runs inside one store transaction scoped to the club:
/// check locks, update the score record, write the ledger, recompute and
/// persist the cached total and classification.
pub struct Evaluation<S: Store> {
    config: EventConfig,
    store: S,
}

impl<S: Store> Evaluation<S> {
    pub fn new(config: EventConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn load(&self, club_id: &str) -> Result<ClubRecord> {
        self.store
            .get(club_id)?
            .ok_or_else(|| ScoreError::not_found(format!("club '{}'", club_id)))
    }

    pub fn get_club(&self, club_id: &str) -> Result<Club> {
        Ok(self.load(club_id)?.club)
    }

    /// All clubs, best total first.
    pub fn list_clubs(&self) -> Result<Vec<Club>> {
        let mut clubs = Vec::new();
        for id in self.store.club_ids()? {
            if let Some(record) = self.store.get(&id)? {
                clubs.push(record.club);
            }
        }
        clubs.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(clubs)
    }

    pub fn get_total_score(&self, club_id: &str) -> Result<f64> {
        Ok(self.load(club_id)?.club.total_score)
    }

    pub fn get_classification(&self, club_id: &str) -> Result<String> {
        Ok(self.load(club_id)?.club.classification)
    }

    /// Whether the criterion has been evaluated (and is protected) for the club.
    /// Always false for demerits.
    pub fn is_criterion_locked(&self, club_id: &str, address: &CriterionAddress) -> Result<bool> {
        Ok(self.load(club_id)?.is_locked(address))
    }

    /// Whether the criterion's penalty counts toward the total.
    pub fn is_evaluated(&self, club_id: &str, address: &CriterionAddress) -> Result<bool> {
        if address.is_demerit() {
            return Ok(false);
        }
        Ok(self.load(club_id)?.evaluated_set().contains(address))
    }

    pub fn lock_entry(&self, club_id: &str, address: &CriterionAddress) -> Result<Option<LockEntry>> {
        Ok(self.load(club_id)?.locks.get(address).cloned())
    }

    /// Freshly derived total with per-criterion penalties.
    pub fn score_breakdown(&self, club_id: &str) -> Result<ScoreResult> {
        let record = self.load(club_id)?;
        scoring::evaluate(&self.config, &record.club.record, &record.evaluated_set())
    }

    pub fn history(&self, club_id: &str) -> Result<Vec<ActivityLogEntry>> {
        Ok(self.load(club_id)?.activity.entries().to_vec())
    }

    pub fn register_club(&self, new_club: NewClub, actor: &Actor) -> Result<Club> {
        actor.require_registrar("register clubs")?;
        if new_club.id.trim().is_empty() {
            return Err(ScoreError::invalid("club id must not be empty"));
        }

        let club = Club {
            id: new_club.id,
            name: new_club.name,
            region: new_club.region,
            members: new_club.members,
            total_score: self.config.max_score,
            classification: self.config.top_tier(),
            record: self.config.catalog.default_record(),
            registered_at: Utc::now(),
        };
        let mut record = ClubRecord::new(club.clone());
        record
            .activity
            .append(&club.id, &actor.id, ActivityKind::ClubRegistered);
        self.store.insert(record)?;

        info!(club = %club.id, "Registered club {}", club.name);
        Ok(club)
    }

    pub fn remove_club(&self, club_id: &str, actor: &Actor) -> Result<Club> {
        actor.require_supervisor("remove clubs")?;
        let removed = self
            .store
            .remove(club_id)?
            .ok_or_else(|| ScoreError::not_found(format!("club '{}'", club_id)))?;
        info!(club = %club_id, actor = %actor.id, "Removed club");
        Ok(removed.club)
    }

    /// Single entry point for a scoring form: validate, lock, recompute.
    pub fn submit_criterion_score(
        &self,
        club_id: &str,
        address: &CriterionAddress,
        value: f64,
        actor: &Actor,
    ) -> Result<SubmitOutcome> {
        actor.require_evaluator("submit scores")?;
        let config = &self.config;

        self.store.transact(club_id, |rec| {
            if address.is_demerit() {
                let total = set_demerit(config, rec, address, value, &actor.id)?;
                return Ok(SubmitOutcome::DemeritUpdated { total });
            }

            if rec.is_locked(address) {
                return Err(already_locked(config, rec, address));
            }

            let def = config.catalog.require_criterion(address)?;
            if !def.allows(value) {
                return Err(ScoreError::Validation {
                    address: address.to_string(),
                    description: config.catalog.describe(address),
                    value,
                    allowed: def.allowed_values(),
                });
            }

            let old = rec.club.record.set(address, value)?.unwrap_or(0.0);
            if old != value {
                rec.activity.append(
                    club_id,
                    &actor.id,
                    ActivityKind::ScoreChanged {
                        address: address.clone(),
                        old,
                        new: value,
                    },
                );
            }

            let outcome = if value > 0.0 {
                let entry = lock_in_record(config, rec, address, value, &actor.id, LockMode::Evaluator)?;
                SubmitOutcome::Locked(entry)
            } else {
                debug!(club = %club_id, %address, "Zero recorded, criterion left unevaluated");
                SubmitOutcome::RecordedUnevaluated
            };

            refresh_totals(config, rec, &actor.id, "evaluation")?;
            Ok(outcome)
        })
    }

    /// Commit a lock for a score the caller already applied to the record.
    pub fn lock_criterion(
        &self,
        club_id: &str,
        address: &CriterionAddress,
        score: f64,
        actor: &Actor,
        mode: LockMode,
    ) -> Result<LockEntry> {
        match mode {
            LockMode::Evaluator => actor.require_evaluator("lock criteria")?,
            LockMode::SupervisorOverride => actor.require_supervisor("override criterion locks")?,
        }
        let config = &self.config;

        self.store.transact(club_id, |rec| {
            let entry = lock_in_record(config, rec, address, score, &actor.id, mode)?;
            refresh_totals(config, rec, &actor.id, "evaluation")?;
            Ok(entry)
        })
    }

    /// Add `occurrences` of a demerit. Never blocked by locks.
    /// Returns the club's new total.
    pub fn record_demerit(
        &self,
        club_id: &str,
        key: &str,
        occurrences: u32,
        actor: &Actor,
    ) -> Result<f64> {
        actor.require_evaluator("record demerits")?;
        if occurrences == 0 {
            return Err(ScoreError::invalid("demerit occurrences must be at least 1"));
        }
        let config = &self.config;

        self.store.transact(club_id, |rec| {
            let def = config.catalog.require_demerit(key)?;
            let address = CriterionAddress::new(scoring::DEMERITS, key);
            let old = rec.club.record.demerit(key);
            let new = old + f64::from(occurrences) * def.penalty;
            rec.club.record.set(&address, new)?;
            rec.activity.append(
                club_id,
                &actor.id,
                ActivityKind::DemeritRecorded {
                    key: key.to_string(),
                    occurrences,
                    old,
                    new,
                },
            );
            info!(club = %club_id, demerit = key, occurrences, "Recorded demerit");
            refresh_totals(config, rec, &actor.id, "demerit")?;
            Ok(rec.club.total_score)
        })
    }
}

fn already_locked(config: &EventConfig, rec: &ClubRecord, address: &CriterionAddress) -> ScoreError {
    let (evaluator, locked_at, score) = match rec.locks.get(address) {
        Some(entry) => (entry.evaluator.clone(), entry.evaluated_at, entry.score),
        None => (String::new(), Utc::now(), 0.0),
    };
    ScoreError::AlreadyLocked {
        address: address.to_string(),
        description: config.catalog.describe(address),
        evaluator,
        locked_at,
        score,
    }
}

/// Replace a demerit magnitude directly (form edit rather than increment).
fn set_demerit(
    config: &EventConfig,
    rec: &mut ClubRecord,
    address: &CriterionAddress,
    value: f64,
    actor_id: &str,
) -> Result<f64> {
    let def = config.catalog.require_demerit(&address.key)?;
    if value < 0.0 || (value / def.penalty).fract() != 0.0 {
        return Err(ScoreError::invalid(format!(
            "{} ({}): {} must be a non-negative multiple of {}",
            address,
            config.catalog.describe(address),
            value,
            def.penalty
        )));
    }
    let old = rec.club.record.set(address, value)?.unwrap_or(0.0);
    if old != value {
        let club_id = rec.club.id.clone();
        rec.activity.append(
            &club_id,
            actor_id,
            ActivityKind::ScoreChanged {
                address: address.clone(),
                old,
                new: value,
            },
        );
    }
    refresh_totals(config, rec, actor_id, "demerit")?;
    Ok(rec.club.total_score)
}

/// Lock one criterion inside an open transaction.
///
/// Zero is never lockable: a zero leaf is indistinguishable from "not yet
/// evaluated", so only the partial or max value can be committed.
pub(crate) fn lock_in_record(
    config: &EventConfig,
    rec: &mut ClubRecord,
    address: &CriterionAddress,
    score: f64,
    actor_id: &str,
    mode: LockMode,
) -> Result<LockEntry> {
    if address.is_demerit() {
        return Err(ScoreError::InvalidScore {
            address: address.to_string(),
            score,
            reason: "demerits are never locked".to_string(),
        });
    }
    if score <= 0.0 {
        return Err(ScoreError::InvalidScore {
            address: address.to_string(),
            score,
            reason: "only a positive score can be locked".to_string(),
        });
    }
    let def = config.catalog.require_criterion(address)?;
    if !def.allows_lock(score) {
        let lockable: Vec<f64> = def.allowed_values().into_iter().filter(|v| *v > 0.0).collect();
        return Err(ScoreError::InvalidScore {
            address: address.to_string(),
            score,
            reason: format!(
                "{} (max {}) accepts {:?}",
                config.catalog.describe(address),
                def.max,
                lockable
            ),
        });
    }
    if mode == LockMode::Evaluator && rec.is_locked(address) {
        return Err(already_locked(config, rec, address));
    }

    let club_id = rec.club.id.clone();
    let entry = LockEntry {
        club: club_id.clone(),
        address: address.clone(),
        evaluator: actor_id.to_string(),
        evaluated_at: Utc::now(),
        score,
        is_locked: true,
    };
    rec.locks.upsert(entry.clone());
    rec.activity.append(
        &club_id,
        actor_id,
        ActivityKind::Locked {
            address: address.clone(),
            score,
            supervisor_override: mode == LockMode::SupervisorOverride,
        },
    );
    info!(club = %club_id, %address, score, evaluator = actor_id, "Locked criterion");
    Ok(entry)
}

/// Recompute total and classification; patch and audit any change.
/// Returns whether the cached fields were updated.
pub(crate) fn refresh_totals(
    config: &EventConfig,
    rec: &mut ClubRecord,
    actor_id: &str,
    reason: &str,
) -> Result<bool> {
    let result = scoring::evaluate(config, &rec.club.record, &rec.evaluated_set())?;
    let club_id = rec.club.id.clone();
    let mut changed = false;

    if result.total != rec.club.total_score {
        rec.activity.append(
            &club_id,
            actor_id,
            ActivityKind::TotalChanged {
                old: rec.club.total_score,
                new: result.total,
                reason: reason.to_string(),
            },
        );
        rec.club.total_score = result.total;
        changed = true;
    }
    if result.classification != rec.club.classification {
        rec.activity.append(
            &club_id,
            actor_id,
            ActivityKind::ClassificationChanged {
                old: rec.club.classification.clone(),
                new: result.classification.clone(),
                reason: reason.to_string(),
            },
        );
        rec.club.classification = result.classification;
        changed = true;
    }

    debug!(club = %club_id, total = rec.club.total_score, changed, "Recomputed totals");
    Ok(changed)
}
