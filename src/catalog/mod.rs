pub mod tiers;
pub mod types;

pub use tiers::{TierTable, TierThreshold};
pub use types::{CatalogEntry, CriteriaCatalog, CriterionDefinition, DemeritDefinition};
