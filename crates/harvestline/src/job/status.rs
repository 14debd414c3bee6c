use std::fmt;

use serde::{Deserialize, Serialize};

/// Local job status. Mirrors the remote backend's statement vocabulary;
/// unknown remote states are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Initializing,
    Waiting,
    Pending,
    Starting,
    Running,
    Available,
    Gone,
    Error,
    Cancelling,
    Cancelled,
    Other(String),
}

impl JobStatus {
    /// Statuses the supervisor keeps polling.
    pub const POLLABLE: [&'static str; 6] = [
        "initializing",
        "waiting",
        "pending",
        "starting",
        "running",
        "available",
    ];

    pub fn parse(s: &str) -> Self {
        match s {
            "initializing" => JobStatus::Initializing,
            "waiting" => JobStatus::Waiting,
            "pending" => JobStatus::Pending,
            "starting" => JobStatus::Starting,
            "running" => JobStatus::Running,
            "available" => JobStatus::Available,
            "gone" => JobStatus::Gone,
            "error" => JobStatus::Error,
            "cancelling" => JobStatus::Cancelling,
            "cancelled" => JobStatus::Cancelled,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Initializing => "initializing",
            JobStatus::Waiting => "waiting",
            JobStatus::Pending => "pending",
            JobStatus::Starting => "starting",
            JobStatus::Running => "running",
            JobStatus::Available => "available",
            JobStatus::Gone => "gone",
            JobStatus::Error => "error",
            JobStatus::Cancelling => "cancelling",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Other(s) => s,
        }
    }

    pub fn is_pollable(&self) -> bool {
        Self::POLLABLE.contains(&self.as_str())
    }

    /// True while the job occupies the remote backend.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobStatus::Starting | JobStatus::Waiting | JobStatus::Running | JobStatus::Pending
        ) || matches!(self, JobStatus::Other(s) if s == "idle" || s == "busy")
    }

    /// The remote's terminal success state.
    pub fn is_available(&self) -> bool {
        matches!(self, JobStatus::Available)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        JobStatus::parse(&s)
    }
}

impl From<JobStatus> for String {
    fn from(s: JobStatus) -> Self {
        s.as_str().to_string()
    }
}
