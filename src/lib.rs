//! Scoring for scout clubs at a camping event.
//!
//! Clubs start at the event maximum and lose points for each evaluated
//! criterion scored below its max and for every recorded demerit. A
//! criterion is locked the moment it is evaluated; only a supervisor can
//! reopen it. Totals map to a classification tier.

pub mod catalog;
pub mod club;
pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod output;
pub mod reconcile;
pub mod scoring;
pub mod store;
pub mod workflow;

pub use error::{Result, ScoreError};
