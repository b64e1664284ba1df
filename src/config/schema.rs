use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{
    CatalogEntry, CriteriaCatalog, CriterionDefinition, DemeritDefinition, TierTable,
    TierThreshold,
};

/// Event configuration: the fixed maximum, the tier table and the catalog.
///
/// Example YAML:
/// ```yaml
/// max_score: 1910
/// tiers:
///   - { name: MISSIONÁRIO, min: 1496 }
///   - { name: VOLUNTÁRIO, min: 1146 }
///   - { name: APRENDIZ, min: 0 }
/// catalog:
///   version: 1
///   criteria:
///     general:
///       uniform: { max: 80, partial: 40, description: "Full uniform" }
///   demerits:
///     late_arrival: { penalty: 100, description: "Late arrival" }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    /// Score every club starts with
    pub max_score: f64,

    /// Classification thresholds, highest tier first
    pub tiers: TierTable,

    pub catalog: CriteriaCatalog,

    /// Path to the club database (defaults to ~/.config/campori-score/clubs.json)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
}

impl EventConfig {
    /// Name of the tier a club with a full score lands in.
    pub fn top_tier(&self) -> String {
        self.tiers
            .classify(self.max_score)
            .map(|t| t.name.clone())
            .unwrap_or_default()
    }
}

fn criterion(max: f64, partial: Option<f64>, description: &str) -> CatalogEntry {
    CatalogEntry::Criterion(CriterionDefinition::new(max, partial, description))
}

fn group<const N: usize>(entries: [(&str, CatalogEntry); N]) -> BTreeMap<String, CatalogEntry> {
    entries
        .into_iter()
        .map(|(key, entry)| (key.to_string(), entry))
        .collect()
}

impl Default for EventConfig {
    fn default() -> Self {
        let mut criteria = BTreeMap::new();
        criteria.insert(
            "prerequisites".to_string(),
            group([
                ("director_present", criterion(30.0, None, "Club director present")),
                ("regional_registration", criterion(30.0, None, "Registered with the region")),
                ("medical_forms", criterion(40.0, Some(20.0), "Medical forms for every member")),
            ]),
        );
        criteria.insert(
            "participation".to_string(),
            group([
                ("opening_ceremony", criterion(50.0, Some(25.0), "Opening ceremony attendance")),
                ("closing_ceremony", criterion(50.0, Some(25.0), "Closing ceremony attendance")),
                ("devotionals", criterion(100.0, Some(50.0), "Morning and evening devotionals")),
                ("flag_ceremony", criterion(50.0, None, "Flag ceremony")),
            ]),
        );
        criteria.insert(
            "general".to_string(),
            group([
                ("uniform", criterion(80.0, Some(40.0), "Full uniform")),
                ("punctuality", criterion(60.0, Some(30.0), "Punctuality")),
                ("behavior", criterion(100.0, Some(50.0), "General behavior")),
            ]),
        );
        criteria.insert(
            "campground".to_string(),
            group([
                ("tent_layout", criterion(80.0, Some(40.0), "Tent layout")),
                ("portal", criterion(100.0, Some(50.0), "Camp portal")),
                ("cleanliness", criterion(100.0, Some(50.0), "Campground cleanliness")),
                ("security", criterion(70.0, Some(35.0), "Night watch and security")),
            ]),
        );
        criteria.insert(
            "kitchen".to_string(),
            group([
                ("hygiene", criterion(100.0, Some(50.0), "Kitchen hygiene")),
                ("menu", criterion(80.0, Some(40.0), "Menu plan")),
                ("storage", criterion(70.0, Some(35.0), "Food storage")),
            ]),
        );
        criteria.insert(
            "events".to_string(),
            group([
                (
                    "carousel",
                    CatalogEntry::Group(group([
                        ("abel", criterion(40.0, Some(20.0), "Carousel: Abel")),
                        ("noah", criterion(40.0, Some(20.0), "Carousel: Noah")),
                        ("moses", criterion(40.0, Some(20.0), "Carousel: Moses")),
                        ("david", criterion(40.0, Some(20.0), "Carousel: David")),
                        ("daniel", criterion(40.0, Some(20.0), "Carousel: Daniel")),
                    ])),
                ),
                ("hike", criterion(150.0, Some(75.0), "Hike")),
                ("night_game", criterion(120.0, Some(60.0), "Night game")),
                ("service_project", criterion(100.0, Some(50.0), "Service project")),
            ]),
        );
        criteria.insert(
            "bonus".to_string(),
            group([
                ("extra_members", criterion(50.0, Some(25.0), "Extra registered members")),
                ("newspaper", criterion(50.0, Some(25.0), "Club newspaper")),
                ("community_outreach", criterion(50.0, Some(25.0), "Community outreach")),
            ]),
        );

        let demerits = [
            ("late_arrival", 100.0, "Late arrival at an activity"),
            ("uniform_violation", 50.0, "Uniform violation"),
            ("noise_after_curfew", 100.0, "Noise after curfew"),
            ("unsportsmanlike_conduct", 200.0, "Unsportsmanlike conduct"),
        ]
        .into_iter()
        .map(|(key, penalty, description)| {
            (
                key.to_string(),
                DemeritDefinition {
                    penalty,
                    description: description.to_string(),
                },
            )
        })
        .collect();

        Self {
            max_score: 1910.0,
            tiers: TierTable::new(vec![
                TierThreshold::new("MISSIONÁRIO", 1496.0),
                TierThreshold::new("VOLUNTÁRIO", 1146.0),
                TierThreshold::new("APRENDIZ", 0.0),
            ]),
            catalog: CriteriaCatalog {
                version: 1,
                criteria,
                demerits,
            },
            store: None,
        }
    }
}
