//! Job creation error types.

use thiserror::Error;

use crate::db::DatabaseError;

/// Failures creating or submitting a job. Variants carrying `job_id` mean
/// the row exists and stays `initializing` with no remote handle.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No active remote session; job #{job_id} was created but not submitted")]
    NoActiveSession { job_id: i64 },

    #[error("Submitting job #{job_id} failed: {reason}")]
    Submission { job_id: i64, reason: String },

    #[error("Configuration integrity error: {0}")]
    ConfigurationIntegrity(String),

    #[error("Invalid job request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl DispatchError {
    /// Id of the job row left behind, if one was created.
    pub fn job_id(&self) -> Option<i64> {
        match self {
            DispatchError::NoActiveSession { job_id }
            | DispatchError::Submission { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DispatchError {
    fn from(e: rusqlite::Error) -> Self {
        DispatchError::Database(DatabaseError::from(e))
    }
}
