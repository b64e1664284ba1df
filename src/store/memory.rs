use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::Store;
use crate::club::ClubRecord;
use crate::error::{Result, ScoreError};

/// In-process store. Transactions are serialized by a single mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    clubs: Mutex<BTreeMap<String, ClubRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, BTreeMap<String, ClubRecord>>> {
        self.clubs
            .lock()
            .map_err(|_| ScoreError::Storage(anyhow::anyhow!("memory store lock poisoned")))
    }
}

impl Store for MemoryStore {
    fn club_ids(&self) -> Result<Vec<String>> {
        Ok(self.guard()?.keys().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<ClubRecord>> {
        Ok(self.guard()?.get(id).cloned())
    }

    fn insert(&self, record: ClubRecord) -> Result<()> {
        let mut clubs = self.guard()?;
        if clubs.contains_key(record.id()) {
            return Err(ScoreError::invalid(format!(
                "club '{}' already exists",
                record.id()
            )));
        }
        clubs.insert(record.id().to_string(), record);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<Option<ClubRecord>> {
        Ok(self.guard()?.remove(id))
    }

    fn transact<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut ClubRecord) -> Result<T>,
    {
        let mut clubs = self.guard()?;
        let mut working = clubs
            .get(id)
            .cloned()
            .ok_or_else(|| ScoreError::not_found(format!("club '{}'", id)))?;
        let out = f(&mut working)?;
        clubs.insert(id.to_string(), working);
        Ok(out)
    }
}
