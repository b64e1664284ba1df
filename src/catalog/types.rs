use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, ScoreError};
use crate::scoring::record::{CriterionAddress, ScoreRecord, DEMERITS};

/// One judged item.
///
/// A club earns `max` when the criterion is fully met, `partial` (if
/// configured) when partly met, and 0 otherwise.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CriterionDefinition {
    pub max: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<f64>,

    #[serde(default)]
    pub description: String,
}

impl CriterionDefinition {
    pub fn new(max: f64, partial: Option<f64>, description: &str) -> Self {
        Self {
            max,
            partial,
            description: description.to_string(),
        }
    }

    /// Values a score record leaf may hold: 0, partial, max.
    pub fn allowed_values(&self) -> Vec<f64> {
        let mut values = vec![0.0];
        if let Some(partial) = self.partial {
            values.push(partial);
        }
        values.push(self.max);
        values
    }

    pub fn allows(&self, value: f64) -> bool {
        self.allowed_values().contains(&value)
    }

    /// Values that can be committed as a lock (everything allowed except 0).
    pub fn allows_lock(&self, value: f64) -> bool {
        value > 0.0 && self.allows(value)
    }

    pub fn penalty_for(&self, value: f64) -> f64 {
        (self.max - value).max(0.0)
    }
}

/// Penalty-only criterion. May be incurred any number of times.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DemeritDefinition {
    /// Points subtracted per occurrence
    pub penalty: f64,

    #[serde(default)]
    pub description: String,
}

/// Either a single criterion or a named group of criteria (e.g. `carousel`).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CatalogEntry {
    Criterion(CriterionDefinition),
    Group(BTreeMap<String, CatalogEntry>),
}

impl CatalogEntry {
    fn collect<'a>(
        &'a self,
        category: &str,
        path: &mut Vec<String>,
        out: &mut Vec<(CriterionAddress, &'a CriterionDefinition)>,
    ) {
        match self {
            CatalogEntry::Criterion(def) => {
                let sub_key = if path.len() > 1 {
                    Some(path[1..].join("."))
                } else {
                    None
                };
                out.push((
                    CriterionAddress {
                        category: category.to_string(),
                        key: path[0].clone(),
                        sub_key,
                    },
                    def,
                ));
            }
            CatalogEntry::Group(children) => {
                for (name, child) in children {
                    path.push(name.clone());
                    child.collect(category, path, out);
                    path.pop();
                }
            }
        }
    }
}

/// Category -> criterion key -> definition, plus the demerit table.
///
/// Injected into the scoring engine and the workflow; `version` identifies
/// which revision of the catalog produced a stored total.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CriteriaCatalog {
    #[serde(default)]
    pub version: u32,

    #[serde(default)]
    pub criteria: BTreeMap<String, BTreeMap<String, CatalogEntry>>,

    #[serde(default)]
    pub demerits: BTreeMap<String, DemeritDefinition>,
}

impl CriteriaCatalog {
    pub fn criterion(&self, address: &CriterionAddress) -> Option<&CriterionDefinition> {
        let mut entry = self.criteria.get(&address.category)?.get(&address.key)?;
        if let Some(ref sub) = address.sub_key {
            for segment in sub.split('.') {
                match entry {
                    CatalogEntry::Group(children) => entry = children.get(segment)?,
                    CatalogEntry::Criterion(_) => return None,
                }
            }
        }
        match entry {
            CatalogEntry::Criterion(def) => Some(def),
            CatalogEntry::Group(_) => None,
        }
    }

    pub fn require_criterion(&self, address: &CriterionAddress) -> Result<&CriterionDefinition> {
        self.criterion(address)
            .ok_or_else(|| ScoreError::not_found(format!("criterion {} in catalog", address)))
    }

    pub fn demerit(&self, key: &str) -> Option<&DemeritDefinition> {
        self.demerits.get(key)
    }

    pub fn require_demerit(&self, key: &str) -> Result<&DemeritDefinition> {
        self.demerit(key)
            .ok_or_else(|| ScoreError::not_found(format!("demerit '{}' in catalog", key)))
    }

    /// Every non-demerit criterion with its address, in sorted order.
    pub fn criteria(&self) -> Vec<(CriterionAddress, &CriterionDefinition)> {
        let mut out = Vec::new();
        for (category, entries) in &self.criteria {
            for (key, entry) in entries {
                let mut path = vec![key.clone()];
                entry.collect(category, &mut path, &mut out);
            }
        }
        out
    }

    /// Human-readable label for an address, falling back to the address itself.
    pub fn describe(&self, address: &CriterionAddress) -> String {
        let description = if address.is_demerit() {
            self.demerit(&address.key).map(|d| d.description.as_str())
        } else {
            self.criterion(address).map(|c| c.description.as_str())
        };
        match description {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => address.to_string(),
        }
    }

    /// Sum of all criterion maxima.
    pub fn total_available(&self) -> f64 {
        self.criteria().iter().map(|(_, def)| def.max).sum()
    }

    /// Fresh score record: every catalog leaf present and set to 0.
    pub fn default_record(&self) -> ScoreRecord {
        let mut record = ScoreRecord::new();
        for (address, _) in self.criteria() {
            // Catalog shape is a tree, so a leaf never collides with a group.
            let _ = record.set(&address, 0.0);
        }
        for key in self.demerits.keys() {
            let _ = record.set(&CriterionAddress::new(DEMERITS, key.clone()), 0.0);
        }
        record
    }
}
