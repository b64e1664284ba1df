use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::record::CriterionAddress;

/// What happened, with old/new values where applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityKind {
    ClubRegistered,
    ScoreChanged {
        address: CriterionAddress,
        old: f64,
        new: f64,
    },
    DemeritRecorded {
        key: String,
        occurrences: u32,
        old: f64,
        new: f64,
    },
    Locked {
        address: CriterionAddress,
        score: f64,
        supervisor_override: bool,
    },
    Unlocked {
        count: usize,
    },
    Relocked {
        count: usize,
    },
    EditSessionOpened,
    EditSessionCancelled,
    TotalChanged {
        old: f64,
        new: f64,
        reason: String,
    },
    ClassificationChanged {
        old: String,
        new: String,
        reason: String,
    },
    ClubReset,
}

impl ActivityKind {
    pub fn summary(&self) -> String {
        match self {
            ActivityKind::ClubRegistered => "club registered".to_string(),
            ActivityKind::ScoreChanged { address, old, new } => {
                format!("{}: {} -> {}", address, old, new)
            }
            ActivityKind::DemeritRecorded {
                key,
                occurrences,
                old,
                new,
            } => format!("demerit {} x{}: {} -> {}", key, occurrences, old, new),
            ActivityKind::Locked {
                address,
                score,
                supervisor_override,
            } => {
                if *supervisor_override {
                    format!("locked {} at {} (supervisor)", address, score)
                } else {
                    format!("locked {} at {}", address, score)
                }
            }
            ActivityKind::Unlocked { count } => format!("unlocked {} criteria", count),
            ActivityKind::Relocked { count } => format!("re-locked {} untouched criteria", count),
            ActivityKind::EditSessionOpened => "supervisor edit session opened".to_string(),
            ActivityKind::EditSessionCancelled => "supervisor edit session cancelled".to_string(),
            ActivityKind::TotalChanged { old, new, reason } => {
                format!("total {} -> {} ({})", old, new, reason)
            }
            ActivityKind::ClassificationChanged { old, new, reason } => {
                format!("classification {} -> {} ({})", old, new, reason)
            }
            ActivityKind::ClubReset => "club reset".to_string(),
        }
    }
}

/// Immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub at: DateTime<Utc>,
    pub actor: String,
    pub club: String,
    #[serde(flatten)]
    pub kind: ActivityKind,
}

/// Append-only audit trail for one club.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLog {
    entries: Vec<ActivityLogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, club: &str, actor: &str, kind: ActivityKind) {
        self.entries.push(ActivityLogEntry {
            at: Utc::now(),
            actor: actor.to_string(),
            club: club.to_string(),
            kind,
        });
    }

    pub fn entries(&self) -> &[ActivityLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all history. Only reachable through a full club reset, which
    /// clears the lock ledger in the same transaction.
    pub(crate) fn purge(&mut self) {
        self.entries.clear();
    }
}
