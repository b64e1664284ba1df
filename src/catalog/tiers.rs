use serde::{Deserialize, Serialize};

/// A classification tier and the lowest total that reaches it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TierThreshold {
    pub name: String,
    pub min: f64,
}

impl TierThreshold {
    pub fn new(name: &str, min: f64) -> Self {
        Self {
            name: name.to_string(),
            min,
        }
    }
}

/// Ordered, non-overlapping threshold table, highest tier first.
///
/// Example YAML:
/// ```yaml
/// tiers:
///   - { name: MISSIONÁRIO, min: 1496 }
///   - { name: VOLUNTÁRIO, min: 1146 }
///   - { name: APRENDIZ, min: 0 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct TierTable(Vec<TierThreshold>);

impl TierTable {
    pub fn new(tiers: Vec<TierThreshold>) -> Self {
        Self(tiers)
    }

    pub fn tiers(&self) -> &[TierThreshold] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tier whose lower bound is the greatest one not above `total`.
    ///
    /// Walks highest-first; a total below every bound falls into the
    /// lowest tier. `None` only for an empty table.
    pub fn classify(&self, total: f64) -> Option<&TierThreshold> {
        let mut ordered: Vec<&TierThreshold> = self.0.iter().collect();
        ordered.sort_by(|a, b| b.min.partial_cmp(&a.min).unwrap_or(std::cmp::Ordering::Equal));
        ordered
            .iter()
            .find(|tier| tier.min <= total)
            .or_else(|| ordered.last())
            .copied()
    }

    /// Rank of a tier name, 0 = highest. Unknown names rank last.
    pub fn rank(&self, name: &str) -> usize {
        let mut ordered: Vec<&TierThreshold> = self.0.iter().collect();
        ordered.sort_by(|a, b| b.min.partial_cmp(&a.min).unwrap_or(std::cmp::Ordering::Equal));
        ordered
            .iter()
            .position(|tier| tier.name == name)
            .unwrap_or(ordered.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TierTable {
        TierTable::new(vec![
            TierThreshold::new("MISSIONÁRIO", 1496.0),
            TierThreshold::new("VOLUNTÁRIO", 1146.0),
            TierThreshold::new("APRENDIZ", 0.0),
        ])
    }

    #[test]
    fn test_classify_boundaries() {
        let t = table();
        assert_eq!(t.classify(1910.0).unwrap().name, "MISSIONÁRIO");
        assert_eq!(t.classify(1496.0).unwrap().name, "MISSIONÁRIO");
        assert_eq!(t.classify(1495.9).unwrap().name, "VOLUNTÁRIO");
        assert_eq!(t.classify(1146.0).unwrap().name, "VOLUNTÁRIO");
        assert_eq!(t.classify(0.0).unwrap().name, "APRENDIZ");
    }

    #[test]
    fn test_classify_below_all_bounds_is_lowest() {
        let t = TierTable::new(vec![
            TierThreshold::new("HIGH", 100.0),
            TierThreshold::new("LOW", 50.0),
        ]);
        assert_eq!(t.classify(10.0).unwrap().name, "LOW");
    }

    #[test]
    fn test_classify_ignores_declaration_order() {
        let t = TierTable::new(vec![
            TierThreshold::new("APRENDIZ", 0.0),
            TierThreshold::new("MISSIONÁRIO", 1496.0),
            TierThreshold::new("VOLUNTÁRIO", 1146.0),
        ]);
        assert_eq!(t.classify(1500.0).unwrap().name, "MISSIONÁRIO");
        assert_eq!(t.classify(1200.0).unwrap().name, "VOLUNTÁRIO");
    }

    #[test]
    fn test_classify_is_monotonic() {
        let t = table();
        let mut previous_rank = usize::MAX;
        let mut total = 0.0;
        while total <= 1910.0 {
            let rank = t.rank(&t.classify(total).unwrap().name);
            assert!(rank <= previous_rank, "tier dropped at total {}", total);
            previous_rank = rank;
            total += 7.0;
        }
    }

    #[test]
    fn test_empty_table() {
        assert!(TierTable::new(vec![]).classify(10.0).is_none());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
- { name: MISSIONÁRIO, min: 1496 }
- { name: APRENDIZ, min: 0 }
"#;
        let t: TierTable = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(t.tiers().len(), 2);
        assert_eq!(t.tiers()[0].min, 1496.0);
    }
}
