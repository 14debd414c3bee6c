//! Per-job validation verdicts.
//!
//! Each job/scenario binding caches the number of the job's records that
//! failed that scenario. The cache is written only by
//! [`ValidationRollup::recompute`]; reading a verdict never writes.

use serde::Serialize;
use thiserror::Error;

use crate::db::validation_repo::{self, JobValidationRow};
use crate::db::{job_repo, Database, DatabaseError};

#[derive(Error, Debug)]
pub enum RollupError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Failure count for validation binding #{binding_id} of job #{job_id} has not been computed")]
    NotComputed { job_id: i64, binding_id: i64 },
}

/// One binding's contribution to a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioVerdict {
    pub binding_id: i64,
    pub scenario_id: i64,
    pub scenario_name: String,
    /// `None` until computed.
    pub failure_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub verdict: bool,
    pub failure_count: i64,
    pub scenarios: Vec<ScenarioVerdict>,
    /// Some binding has no computed count yet and contributed zero.
    pub pending: bool,
}

impl Verdict {
    fn from_bindings(bindings: Vec<JobValidationRow>) -> Self {
        let failure_count = bindings.iter().filter_map(|b| b.failure_count).sum();
        let pending = bindings.iter().any(|b| b.failure_count.is_none());
        let scenarios = bindings
            .into_iter()
            .map(|b| ScenarioVerdict {
                binding_id: b.id,
                scenario_id: b.validation_scenario_id,
                scenario_name: b.scenario_name,
                failure_count: b.failure_count,
            })
            .collect();
        Self {
            verdict: failure_count == 0,
            failure_count,
            scenarios,
            pending,
        }
    }
}

#[derive(Clone)]
pub struct ValidationRollup {
    db: Database,
}

impl ValidationRollup {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Verdict from cached counts. A job without bindings is valid.
    pub fn verdict(&self, job_id: i64) -> Result<Verdict, RollupError> {
        let bindings = validation_repo::bindings_for_job(&self.db, job_id)?;
        Ok(Verdict::from_bindings(bindings))
    }

    /// Cached failure count of one binding; an error if never computed.
    pub fn failure_count(&self, binding: &JobValidationRow) -> Result<i64, RollupError> {
        binding.failure_count.ok_or(RollupError::NotComputed {
            job_id: binding.job_id,
            binding_id: binding.id,
        })
    }

    /// Fills the cache. Without `force`, only uncomputed bindings of
    /// finished jobs are counted; with it, every binding is recounted.
    pub fn recompute(&self, job_id: i64, force: bool) -> Result<Verdict, RollupError> {
        let job = job_repo::get(&self.db, job_id)?;
        let mut bindings = validation_repo::bindings_for_job(&self.db, job_id)?;

        for binding in bindings.iter_mut() {
            let due = force || (binding.failure_count.is_none() && job.finished);
            if !due {
                continue;
            }
            let count = validation_repo::count_failed_records(
                &self.db,
                job_id,
                binding.validation_scenario_id,
            )?;
            validation_repo::set_failure_count(&self.db, binding.id, count)?;
            log::debug!(
                "Job #{} scenario '{}': {} failing records",
                job_id,
                binding.scenario_name,
                count
            );
            binding.failure_count = Some(count);
        }

        Ok(Verdict::from_bindings(bindings))
    }
}
