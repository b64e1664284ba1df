use anyhow::{Context, Result as AnyResult};
use atomic_write_file::AtomicWriteFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::Store;
use crate::club::ClubRecord;
use crate::error::{Result, ScoreError};

const DATABASE_VERSION: u32 = 1;

/// On-disk layout of the club database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub version: u32,
    #[serde(default)]
    pub clubs: BTreeMap<String, ClubRecord>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Self {
            version: DATABASE_VERSION,
            clubs: BTreeMap::new(),
        }
    }
}

/// Load the club database from a JSON file
///
/// If the file doesn't exist, returns a new empty database.
/// If the file exists but has an unsupported version, returns an error.
pub fn load_database(path: &Path) -> AnyResult<Database> {
    if !path.exists() {
        return Ok(Database::new());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open club database at {}", path.display()))?;

    let db: Database = serde_json::from_reader(file)
        .with_context(|| format!("Failed to load club database at {}", path.display()))?;

    if db.version != DATABASE_VERSION {
        anyhow::bail!("Unsupported club database version: {}", db.version);
    }

    Ok(db)
}

/// Save the club database to a JSON file atomically
///
/// Uses atomic-write-file so a crash mid-write never leaves a torn file.
pub fn save_database(path: &Path, db: &Database) -> AnyResult<()> {
    crate::config::ensure_parent_dir(path)?;

    let mut file = AtomicWriteFile::open(path)
        .with_context(|| format!("Failed to open atomic write file at {}", path.display()))?;

    serde_json::to_writer_pretty(&mut file, db).context("Failed to serialize club database")?;

    file.commit().context("Failed to save club database")?;

    Ok(())
}

/// Store backed by a single JSON file.
///
/// Each operation loads the file, applies the change and rewrites it
/// atomically while holding a process-wide mutex.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| ScoreError::Storage(anyhow::anyhow!("json store lock poisoned")))
    }

    fn load(&self) -> Result<Database> {
        Ok(load_database(&self.path)?)
    }

    fn save(&self, db: &Database) -> Result<()> {
        Ok(save_database(&self.path, db)?)
    }
}

impl Store for JsonStore {
    fn club_ids(&self) -> Result<Vec<String>> {
        let _guard = self.guard()?;
        Ok(self.load()?.clubs.keys().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Option<ClubRecord>> {
        let _guard = self.guard()?;
        Ok(self.load()?.clubs.remove(id))
    }

    fn insert(&self, record: ClubRecord) -> Result<()> {
        let _guard = self.guard()?;
        let mut db = self.load()?;
        if db.clubs.contains_key(record.id()) {
            return Err(ScoreError::invalid(format!(
                "club '{}' already exists",
                record.id()
            )));
        }
        db.clubs.insert(record.id().to_string(), record);
        self.save(&db)
    }

    fn remove(&self, id: &str) -> Result<Option<ClubRecord>> {
        let _guard = self.guard()?;
        let mut db = self.load()?;
        let removed = db.clubs.remove(id);
        if removed.is_some() {
            self.save(&db)?;
        }
        Ok(removed)
    }

    fn transact<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut ClubRecord) -> Result<T>,
    {
        let _guard = self.guard()?;
        let mut db = self.load()?;
        let mut working = db
            .clubs
            .get(id)
            .cloned()
            .ok_or_else(|| ScoreError::not_found(format!("club '{}'", id)))?;
        let out = f(&mut working)?;
        db.clubs.insert(id.to_string(), working);
        self.save(&db)?;
        Ok(out)
    }
}
