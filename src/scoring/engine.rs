use crate::catalog::{CriteriaCatalog, TierTable};
use crate::config::EventConfig;
use crate::error::{Result, ScoreError};
use crate::ledger::EvaluatedSet;

use super::record::{CriterionAddress, ScoreRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltySource {
    Criterion,
    Demerit,
}

#[derive(Debug, Clone)]
pub struct PenaltyContribution {
    pub address: CriterionAddress,
    pub description: String,
    pub source: PenaltySource,
    pub value: f64,   // Stored leaf value
    pub penalty: f64, // Points deducted
}

#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub max_score: f64,
    pub criterion_penalty: f64,
    pub demerit_penalty: f64,
    pub evaluated: usize,
    pub penalties: Vec<PenaltyContribution>,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub total: f64,
    pub classification: String,
    pub breakdown: ScoreBreakdown,
}

/// Derive a club's total from its score record, gated by the lock ledger.
///
/// Only leaves in `evaluated` carry a criterion penalty (`max - value`).
/// Unevaluated leaves cost nothing whatever they hold, since the record
/// starts out as all-zero placeholders. Demerit leaves always count.
pub fn compute_total_score(
    max_score: f64,
    record: &ScoreRecord,
    evaluated: &EvaluatedSet,
    catalog: &CriteriaCatalog,
) -> Result<ScoreBreakdown> {
    let mut criterion_penalty = 0.0;
    let mut demerit_penalty = 0.0;
    let mut evaluated_count = 0;
    let mut penalties = Vec::new();

    for (address, value) in record.leaves() {
        if address.is_demerit() {
            let penalty = value.max(0.0);
            demerit_penalty += penalty;
            if penalty > 0.0 {
                penalties.push(PenaltyContribution {
                    description: catalog.describe(&address),
                    address,
                    source: PenaltySource::Demerit,
                    value,
                    penalty,
                });
            }
            continue;
        }

        if !evaluated.contains(&address) {
            continue;
        }

        let def = catalog.require_criterion(&address)?;
        let penalty = def.penalty_for(value);
        evaluated_count += 1;
        criterion_penalty += penalty;
        if penalty > 0.0 {
            penalties.push(PenaltyContribution {
                description: catalog.describe(&address),
                address,
                source: PenaltySource::Criterion,
                value,
                penalty,
            });
        }
    }

    let total = (max_score - criterion_penalty - demerit_penalty).clamp(0.0, max_score.max(0.0));

    Ok(ScoreBreakdown {
        max_score,
        criterion_penalty,
        demerit_penalty,
        evaluated: evaluated_count,
        penalties,
        total,
    })
}

pub fn total_score(
    max_score: f64,
    record: &ScoreRecord,
    evaluated: &EvaluatedSet,
    catalog: &CriteriaCatalog,
) -> Result<f64> {
    Ok(compute_total_score(max_score, record, evaluated, catalog)?.total)
}

/// Name of the tier `total` falls into.
pub fn classify(total: f64, tiers: &TierTable) -> Result<String> {
    tiers
        .classify(total)
        .map(|tier| tier.name.clone())
        .ok_or_else(|| ScoreError::not_found("classification tiers (table is empty)"))
}

/// Total and classification for a club's record under the given config.
pub fn evaluate(
    config: &EventConfig,
    record: &ScoreRecord,
    evaluated: &EvaluatedSet,
) -> Result<ScoreResult> {
    let breakdown = compute_total_score(config.max_score, record, evaluated, &config.catalog)?;
    let classification = classify(breakdown.total, &config.tiers)?;
    Ok(ScoreResult {
        total: breakdown.total,
        classification,
        breakdown,
    })
}
