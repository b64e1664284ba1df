pub mod engine;
pub mod record;

pub use engine::{
    classify, compute_total_score, evaluate, total_score, PenaltyContribution, PenaltySource,
    ScoreBreakdown, ScoreResult,
};
pub use record::{CriterionAddress, ScoreNode, ScoreRecord, DEMERITS};
