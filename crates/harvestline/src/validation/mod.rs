//! Aggregation of validation scenario results into per-job verdicts.

pub mod rollup;

pub use rollup::{RollupError, ScenarioVerdict, ValidationRollup, Verdict};
