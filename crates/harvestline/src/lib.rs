pub mod config;
pub mod db;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod lineage;
pub mod logging;
pub mod orchestrator;
pub mod remote;
pub mod search;
pub mod storage;
pub mod validation;

pub use config::{load_config, load_config_from_str, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, HarvestlineError, Result, StorageError};
pub use job::{DispatchError, Job, JobKind, JobSpec, JobStatus};
pub use lifecycle::{DeletionReport, PollOutcome, PollScheduler};
pub use lineage::{Directionality, LineageFilter, LineageGraph};
pub use orchestrator::{JobRecordCounts, Orchestrator};
pub use remote::{RemoteBackend, SessionHandle};
pub use search::SearchIndex;
pub use validation::Verdict;
