use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::scoring::record::CriterionAddress;

/// Addresses the ledger marks as evaluated for one club.
pub type EvaluatedSet = HashSet<CriterionAddress>;

/// Record that a criterion was evaluated for a club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockEntry {
    pub club: String,
    pub address: CriterionAddress,
    pub evaluator: String,
    pub evaluated_at: DateTime<Utc>,
    pub score: f64,
    pub is_locked: bool,
}

/// Per-club lock table, keyed by the canonical address string.
///
/// Holds at most one entry per address. Unlocking flips `is_locked` in
/// place; demerit addresses never appear here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockLedger {
    entries: BTreeMap<String, LockEntry>,
}

impl LockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &CriterionAddress) -> Option<&LockEntry> {
        self.entries.get(&address.to_string())
    }

    /// The entry for `address` if it currently holds a lock.
    pub fn active(&self, address: &CriterionAddress) -> Option<&LockEntry> {
        self.get(address).filter(|entry| entry.is_locked)
    }

    pub fn is_locked(&self, address: &CriterionAddress) -> bool {
        !address.is_demerit() && self.active(address).is_some()
    }

    /// Insert or overwrite the single entry for the entry's address.
    pub fn upsert(&mut self, entry: LockEntry) {
        self.entries.insert(entry.address.to_string(), entry);
    }

    /// Release every active lock. Returns the addresses that were locked.
    pub fn unlock_all(&mut self) -> Vec<CriterionAddress> {
        let mut released = Vec::new();
        for entry in self.entries.values_mut().filter(|e| e.is_locked) {
            entry.is_locked = false;
            released.push(entry.address.clone());
        }
        released
    }

    /// Release a single lock. Returns whether it was active.
    pub fn unlock(&mut self, address: &CriterionAddress) -> bool {
        match self.entries.get_mut(&address.to_string()) {
            Some(entry) if entry.is_locked => {
                entry.is_locked = false;
                true
            }
            _ => false,
        }
    }

    /// Restore the lock flag on existing entries without touching their
    /// evaluator or timestamp. Returns how many were re-locked.
    pub fn relock(&mut self, addresses: &[CriterionAddress]) -> usize {
        let mut count = 0;
        for address in addresses {
            if let Some(entry) = self.entries.get_mut(&address.to_string()) {
                if !entry.is_locked {
                    entry.is_locked = true;
                    count += 1;
                }
            }
        }
        count
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.entries.values()
    }

    pub fn active_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_locked).count()
    }

    pub fn evaluated_set(&self) -> EvaluatedSet {
        self.entries
            .values()
            .filter(|e| e.is_locked && !e.address.is_demerit())
            .map(|e| e.address.clone())
            .collect()
    }
}
