//! Keeps local job state in step with the remote backend and tears jobs
//! down when they are deleted.

pub mod cascade;
pub mod scheduler;
pub mod supervisor;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::validation::RollupError;

pub use cascade::{CascadeStep, DeletionCascade, DeletionReport, StepOutcome, StepStatus};
pub use scheduler::PollScheduler;
pub use supervisor::{LifecycleSupervisor, PollOutcome, SkipReason};

/// Local bookkeeping failures while polling. Remote trouble is reported
/// through [`PollOutcome`] instead.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation roll-up failed: {0}")]
    Rollup(#[from] RollupError),
}

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("Job #{job_id} not found")]
    NotFound { job_id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
