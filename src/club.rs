use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::{ActivityLog, EvaluatedSet, LockLedger};
use crate::scoring::{CriterionAddress, ScoreRecord};

/// A participating club with its cached total and classification.
///
/// `total_score` and `classification` are a denormalization of `record`
/// restricted to locked criteria; reconciliation repairs any drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub members: u32,
    pub total_score: f64,
    pub classification: String,
    pub record: ScoreRecord,
    pub registered_at: DateTime<Utc>,
}

/// Registration/import payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClub {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub members: u32,
}

/// Open supervisor edit window.
///
/// Remembers the record as it was when the window opened and which
/// criteria were locked, so commit can re-lock only what changed and
/// restore the rest untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSession {
    pub supervisor: String,
    pub opened_at: DateTime<Utc>,
    pub original: ScoreRecord,
    pub previously_locked: Vec<CriterionAddress>,
}

/// Everything stored for one club; the unit of a store transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubRecord {
    pub club: Club,
    #[serde(default)]
    pub locks: LockLedger,
    #[serde(default)]
    pub activity: ActivityLog,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_session: Option<EditSession>,
}

impl ClubRecord {
    pub fn new(club: Club) -> Self {
        Self {
            club,
            locks: LockLedger::new(),
            activity: ActivityLog::new(),
            edit_session: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.club.id
    }

    /// Whether `address` is protected from re-scoring.
    ///
    /// Locks released by an open edit session stay in force for everyone
    /// except that session's commit.
    pub fn is_locked(&self, address: &CriterionAddress) -> bool {
        if address.is_demerit() {
            return false;
        }
        self.locks.is_locked(address)
            || self
                .edit_session
                .as_ref()
                .is_some_and(|session| session.previously_locked.contains(address))
    }

    /// Addresses whose penalty counts toward the total.
    pub fn evaluated_set(&self) -> EvaluatedSet {
        let mut evaluated = self.locks.evaluated_set();
        if let Some(ref session) = self.edit_session {
            evaluated.extend(session.previously_locked.iter().cloned());
        }
        evaluated
    }
}
