mod json;
mod memory;

pub use json::{load_database, save_database, Database, JsonStore};
pub use memory::MemoryStore;

use crate::club::ClubRecord;
use crate::error::Result;

/// Document store holding one `ClubRecord` per club.
///
/// `transact` is the only way to mutate an existing club. Implementations
/// must run transactions one at a time and commit the working copy only
/// when the closure returns `Ok`, so a failed operation leaves no trace and
/// a second writer always observes the first one's commit.
pub trait Store: Send + Sync {
    fn club_ids(&self) -> Result<Vec<String>>;

    fn get(&self, id: &str) -> Result<Option<ClubRecord>>;

    /// Insert a new club. Fails if the id is taken.
    fn insert(&self, record: ClubRecord) -> Result<()>;

    fn remove(&self, id: &str) -> Result<Option<ClubRecord>>;

    fn transact<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut ClubRecord) -> Result<T>;
}
