use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ScoreError};

/// Category holding penalty-only criteria. Never locked, never gated.
pub const DEMERITS: &str = "demerits";

/// Address of one criterion in a score record: `category.key[.sub_key]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CriterionAddress {
    pub category: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_key: Option<String>,
}

impl CriterionAddress {
    pub fn new(category: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            key: key.into(),
            sub_key: None,
        }
    }

    pub fn with_sub_key(
        category: impl Into<String>,
        key: impl Into<String>,
        sub_key: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            key: key.into(),
            sub_key: Some(sub_key.into()),
        }
    }

    pub fn is_demerit(&self) -> bool {
        self.category == DEMERITS
    }

    /// Path segments below the category: `[key]` or `[key, sub...]`.
    fn tail(&self) -> Vec<&str> {
        let mut segments = vec![self.key.as_str()];
        if let Some(ref sub) = self.sub_key {
            segments.extend(sub.split('.'));
        }
        segments
    }
}

impl fmt::Display for CriterionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_key {
            Some(ref sub) => write!(f, "{}.{}.{}", self.category, self.key, sub),
            None => write!(f, "{}.{}", self.category, self.key),
        }
    }
}

impl FromStr for CriterionAddress {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(ScoreError::invalid(format!(
                "invalid criterion address '{}', expected category.key[.sub_key]",
                s
            )));
        }
        let sub_key = if parts.len() > 2 {
            Some(parts[2..].join("."))
        } else {
            None
        };
        Ok(Self {
            category: parts[0].to_string(),
            key: parts[1].to_string(),
            sub_key,
        })
    }
}

/// One node of a score record below the category level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreNode {
    Leaf(f64),
    Category(BTreeMap<String, ScoreNode>),
}

impl ScoreNode {
    fn collect_leaves(
        &self,
        category: &str,
        path: &mut Vec<String>,
        out: &mut Vec<(CriterionAddress, f64)>,
    ) {
        match self {
            ScoreNode::Leaf(value) => {
                let address = CriterionAddress {
                    category: category.to_string(),
                    key: path[0].clone(),
                    sub_key: if path.len() > 1 {
                        Some(path[1..].join("."))
                    } else {
                        None
                    },
                };
                out.push((address, *value));
            }
            ScoreNode::Category(children) => {
                for (name, child) in children {
                    path.push(name.clone());
                    child.collect_leaves(category, path, out);
                    path.pop();
                }
            }
        }
    }
}

/// Per-club tree of category -> criterion key -> value.
///
/// The first two levels are always maps, so every leaf has at least a
/// category and a key. Deeper levels (e.g. `events.carousel`) are generic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreRecord(BTreeMap<String, BTreeMap<String, ScoreNode>>);

impl ScoreRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn get(&self, address: &CriterionAddress) -> Option<f64> {
        let category = self.0.get(&address.category)?;
        let tail = address.tail();
        let mut node = category.get(tail[0])?;
        for segment in &tail[1..] {
            match node {
                ScoreNode::Category(children) => node = children.get(*segment)?,
                ScoreNode::Leaf(_) => return None,
            }
        }
        match node {
            ScoreNode::Leaf(value) => Some(*value),
            ScoreNode::Category(_) => None,
        }
    }

    /// Set a leaf, creating intermediate maps as needed. Returns the old value.
    pub fn set(&mut self, address: &CriterionAddress, value: f64) -> Result<Option<f64>> {
        let category = self.0.entry(address.category.clone()).or_default();
        let tail = address.tail();
        let Some((last, parents)) = tail.split_last() else {
            return Err(ScoreError::invalid(format!("empty criterion address {}", address)));
        };

        let mut children = category;
        for segment in parents {
            let node = children
                .entry(segment.to_string())
                .or_insert_with(|| ScoreNode::Category(BTreeMap::new()));
            children = match node {
                ScoreNode::Category(map) => map,
                ScoreNode::Leaf(_) => {
                    return Err(ScoreError::invalid(format!(
                        "{}: '{}' is a criterion, not a group",
                        address, segment
                    )))
                }
            };
        }

        match children.entry(last.to_string()) {
            Entry::Occupied(mut slot) => match slot.get_mut() {
                ScoreNode::Leaf(old) => {
                    let previous = *old;
                    *old = value;
                    Ok(Some(previous))
                }
                ScoreNode::Category(_) => Err(ScoreError::invalid(format!(
                    "{} is a group of criteria, not a single criterion",
                    address
                ))),
            },
            Entry::Vacant(slot) => {
                slot.insert(ScoreNode::Leaf(value));
                Ok(None)
            }
        }
    }

    /// All leaves in deterministic (sorted) order.
    pub fn leaves(&self) -> Vec<(CriterionAddress, f64)> {
        let mut out = Vec::new();
        for (category, criteria) in &self.0 {
            for (key, node) in criteria {
                let mut path = vec![key.clone()];
                node.collect_leaves(category, &mut path, &mut out);
            }
        }
        out
    }

    /// Leaves outside the demerits category.
    pub fn criterion_leaves(&self) -> Vec<(CriterionAddress, f64)> {
        self.leaves()
            .into_iter()
            .filter(|(address, _)| !address.is_demerit())
            .collect()
    }

    pub fn demerit(&self, key: &str) -> f64 {
        self.get(&CriterionAddress::new(DEMERITS, key)).unwrap_or(0.0)
    }

    /// Leaves of `revised` whose value differs from `self`, demerits excluded.
    ///
    /// A leaf missing from `self` counts as the 0 placeholder.
    pub fn changed_leaves(&self, revised: &ScoreRecord) -> Vec<(CriterionAddress, f64, f64)> {
        revised
            .criterion_leaves()
            .into_iter()
            .filter_map(|(address, new)| {
                let old = self.get(&address).unwrap_or(0.0);
                if old != new {
                    Some((address, old, new))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ScoreRecord {
        let json = r#"{
            "general": { "director_present": 30, "uniform": 0 },
            "events": { "carousel": { "abel": 0, "noah": 20 }, "hike": 40 },
            "demerits": { "late_arrival": 100 }
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_address_parse_and_display() {
        let addr: CriterionAddress = "events.carousel.abel".parse().unwrap();
        assert_eq!(addr.category, "events");
        assert_eq!(addr.key, "carousel");
        assert_eq!(addr.sub_key.as_deref(), Some("abel"));
        assert_eq!(addr.to_string(), "events.carousel.abel");

        let plain: CriterionAddress = "general.uniform".parse().unwrap();
        assert!(plain.sub_key.is_none());
    }

    #[test]
    fn test_address_parse_rejects_malformed() {
        assert!("general".parse::<CriterionAddress>().is_err());
        assert!("general..uniform".parse::<CriterionAddress>().is_err());
        assert!("".parse::<CriterionAddress>().is_err());
    }

    #[test]
    fn test_get_nested_leaf() {
        let record = sample_record();
        let addr = CriterionAddress::with_sub_key("events", "carousel", "noah");
        assert_eq!(record.get(&addr), Some(20.0));
        assert_eq!(record.get(&CriterionAddress::new("events", "carousel")), None);
        assert_eq!(record.get(&CriterionAddress::new("kitchen", "stove")), None);
    }

    #[test]
    fn test_set_creates_intermediate_groups() {
        let mut record = ScoreRecord::new();
        let addr = CriterionAddress::with_sub_key("events", "carousel", "abel");
        assert_eq!(record.set(&addr, 10.0).unwrap(), None);
        assert_eq!(record.set(&addr, 20.0).unwrap(), Some(10.0));
        assert_eq!(record.get(&addr), Some(20.0));
    }

    #[test]
    fn test_set_refuses_to_overwrite_group() {
        let mut record = sample_record();
        let err = record
            .set(&CriterionAddress::new("events", "carousel"), 5.0)
            .unwrap_err();
        assert!(matches!(err, ScoreError::InvalidRequest(_)));
    }

    #[test]
    fn test_leaves_walk_nested_groups() {
        let record = sample_record();
        let leaves = record.leaves();
        assert_eq!(leaves.len(), 6);
        assert!(leaves
            .iter()
            .any(|(a, v)| a.to_string() == "events.carousel.abel" && *v == 0.0));
        assert_eq!(record.criterion_leaves().len(), 5);
        assert_eq!(record.demerit("late_arrival"), 100.0);
        assert_eq!(record.demerit("missing"), 0.0);
    }

    #[test]
    fn test_changed_leaves_none_for_identical() {
        let record = sample_record();
        assert!(record.changed_leaves(&record.clone()).is_empty());
    }

    #[test]
    fn test_changed_leaves_ignores_demerits() {
        let record = sample_record();
        let mut revised = record.clone();
        revised
            .set(&CriterionAddress::new(DEMERITS, "late_arrival"), 300.0)
            .unwrap();
        revised
            .set(&CriterionAddress::with_sub_key("events", "carousel", "abel"), 20.0)
            .unwrap();
        let changed = record.changed_leaves(&revised);
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].0.to_string(), "events.carousel.abel");
        assert_eq!(changed[0].1, 0.0);
        assert_eq!(changed[0].2, 20.0);
    }

    #[test]
    fn test_record_json_shape_is_plain_nested_object() {
        let record = sample_record();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["events"]["carousel"]["noah"], 20.0);
    }
}
