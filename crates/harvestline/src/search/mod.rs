//! Search index collaborator: one index per job plus the aggregate
//! published index.

mod http;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpSearchIndex;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search index transport error: {0}")]
    Transport(String),

    #[error("Search index answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode search index response: {0}")]
    Decode(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// The operations the core needs from the search index. A missing index
/// is an answer, not an error.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Drops `index`. Returns false if it did not exist.
    async fn delete_index(&self, index: &str) -> Result<bool, SearchError>;

    /// Removes the documents of `index` that came from `job_id`. Returns
    /// the number removed.
    async fn delete_by_job(&self, index: &str, job_id: i64) -> Result<u64, SearchError>;

    /// Document count of `index`, or `None` if it does not exist.
    async fn count(&self, index: &str) -> Result<Option<u64>, SearchError>;
}

/// Name of the index holding one job's mapped records.
pub fn job_index_name(job_id: i64) -> String {
    format!("j{job_id}")
}
