use std::collections::HashSet;

use super::schema::EventConfig;
use crate::scoring::record::DEMERITS;

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Validate the event configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_config(config: &EventConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if !positive(config.max_score) {
        errors.push("max_score: must be a positive number".to_string());
    }

    // Tiers: non-empty, strictly descending, unique names, lowest at 0
    let tiers = config.tiers.tiers();
    if tiers.is_empty() {
        errors.push("tiers: at least one tier is required".to_string());
    }
    let mut names = HashSet::new();
    for (i, tier) in tiers.iter().enumerate() {
        if tier.name.trim().is_empty() {
            errors.push(format!("tiers[{}].name: must not be empty", i));
        } else if !names.insert(tier.name.as_str()) {
            errors.push(format!("tiers[{}].name: duplicate tier '{}'", i, tier.name));
        }
        if !tier.min.is_finite() {
            errors.push(format!("tiers[{}].min: must be a number", i));
        } else if i > 0 && tier.min >= tiers[i - 1].min {
            errors.push(format!(
                "tiers[{}].min: {} must be lower than the tier above ({})",
                i,
                tier.min,
                tiers[i - 1].min
            ));
        }
    }
    if let Some(first) = tiers.first() {
        if first.min > config.max_score {
            errors.push(format!(
                "tiers[0].min: {} is unreachable with max_score {}",
                first.min, config.max_score
            ));
        }
    }
    if let Some(last) = tiers.last() {
        if last.min != 0.0 {
            errors.push(format!(
                "tiers[{}].min: lowest tier must start at 0, found {}",
                tiers.len() - 1,
                last.min
            ));
        }
    }

    // Catalog
    if config.catalog.criteria.contains_key(DEMERITS) {
        errors.push(format!(
            "catalog.criteria.{}: reserved, declare demerits under catalog.demerits",
            DEMERITS
        ));
    }
    for (address, def) in config.catalog.criteria() {
        if !positive(def.max) {
            errors.push(format!("catalog.criteria.{}.max: must be a positive number", address));
        }
        if let Some(partial) = def.partial {
            if !positive(partial) || partial >= def.max {
                errors.push(format!(
                    "catalog.criteria.{}.partial: {} must be between 0 and max ({}) exclusive",
                    address, partial, def.max
                ));
            }
        }
    }
    for (key, def) in &config.catalog.demerits {
        if !positive(def.penalty) {
            errors.push(format!("catalog.demerits.{}.penalty: must be a positive number", key));
        }
    }
    let available = config.catalog.total_available();
    if available > config.max_score {
        errors.push(format!(
            "catalog: criteria maxima sum to {}, more than max_score {}",
            available, config.max_score
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
