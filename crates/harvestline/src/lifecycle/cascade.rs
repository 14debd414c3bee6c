//! Job deletion.
//!
//! The job is marked deleted before anything else, so the supervisor skips
//! it from then on. Every later step is best-effort: a failure is logged,
//! recorded in the [`DeletionReport`] and the next step still runs.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::Instrument;

use super::CascadeError;
use crate::db::{edge_repo, hierarchy_repo, job_repo, record_repo, Database};
use crate::job::{Job, JobKind, JobStatus};
use crate::remote::{bounded, RemoteBackend, RemoteReply};
use crate::search::{job_index_name, SearchIndex};
use crate::storage::ArtifactStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CascadeStep {
    CancelRemote,
    RemovePublishedLinks,
    RemovePublishedDocuments,
    ClearPublishSetId,
    RemoveOutput,
    DeleteIndex,
    RemoveRow,
    RecomputePublishedUniqueness,
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CascadeStep::CancelRemote => "cancel remote statement",
            CascadeStep::RemovePublishedLinks => "remove published links",
            CascadeStep::RemovePublishedDocuments => "remove published documents",
            CascadeStep::ClearPublishSetId => "clear publish set id",
            CascadeStep::RemoveOutput => "remove output",
            CascadeStep::DeleteIndex => "delete job index",
            CascadeStep::RemoveRow => "remove job row",
            CascadeStep::RecomputePublishedUniqueness => "recompute published uniqueness",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    Done,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: CascadeStep,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub job_id: i64,
    pub steps: Vec<StepOutcome>,
}

impl DeletionReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    pub fn status_of(&self, step: CascadeStep) -> Option<&StepStatus> {
        self.steps.iter().find(|s| s.step == step).map(|s| &s.status)
    }

    fn record(&mut self, step: CascadeStep, result: Result<StepStatus, String>) {
        let status = result.unwrap_or_else(StepStatus::Failed);
        if let StepStatus::Failed(reason) = &status {
            log::warn!("Deleting job #{}: {} failed: {}", self.job_id, step, reason);
        }
        self.steps.push(StepOutcome { step, status });
    }
}

pub struct DeletionCascade {
    db: Database,
    backend: Arc<dyn RemoteBackend>,
    search: Arc<dyn SearchIndex>,
    artifacts: ArtifactStore,
    published_index: String,
    call_timeout: Duration,
}

impl DeletionCascade {
    pub fn new(
        db: Database,
        backend: Arc<dyn RemoteBackend>,
        search: Arc<dyn SearchIndex>,
        artifacts: ArtifactStore,
        published_index: &str,
        call_timeout: Duration,
    ) -> Self {
        Self {
            db,
            backend,
            search,
            artifacts,
            published_index: published_index.to_string(),
            call_timeout,
        }
    }

    /// Deletes a job and everything derived from it. Only a missing job or
    /// a failure to mark it deleted is an error.
    pub async fn delete(&self, job_id: i64) -> Result<DeletionReport, CascadeError> {
        let span = tracing::info_span!("delete_job", job_id);
        self.delete_inner(job_id).instrument(span).await
    }

    async fn delete_inner(&self, job_id: i64) -> Result<DeletionReport, CascadeError> {
        let job = Job::find(&self.db, job_id)?.ok_or(CascadeError::NotFound { job_id })?;
        job_repo::mark_deleted(&self.db, job_id)?;
        log::info!("Deleting job #{} ({})", job_id, job.kind);

        let mut report = DeletionReport {
            job_id,
            steps: Vec::new(),
        };
        let is_publish = job.kind == JobKind::Publish;

        report.record(CascadeStep::CancelRemote, self.cancel_remote(&job).await);

        if is_publish {
            report.record(
                CascadeStep::RemovePublishedLinks,
                self.remove_published_links(&job),
            );
            report.record(
                CascadeStep::RemovePublishedDocuments,
                self.remove_published_documents(job_id).await,
            );
            report.record(CascadeStep::ClearPublishSetId, self.clear_publish_set_id(&job));
        }

        report.record(CascadeStep::RemoveOutput, self.remove_output(&job));
        report.record(CascadeStep::DeleteIndex, self.delete_index(job_id).await);
        report.record(
            CascadeStep::RemoveRow,
            job_repo::delete(&self.db, job_id)
                .map(|_| StepStatus::Done)
                .map_err(|e| e.to_string()),
        );

        if is_publish {
            report.record(
                CascadeStep::RecomputePublishedUniqueness,
                record_repo::update_published_uniqueness(&self.db)
                    .map(|_| StepStatus::Done)
                    .map_err(|e| e.to_string()),
            );
        }

        if report.all_succeeded() {
            log::info!("Deleted job #{}", job_id);
        }
        Ok(report)
    }

    /// Asks the backend for the statement's current state and cancels it
    /// if it is still running there.
    async fn cancel_remote(&self, job: &Job) -> Result<StepStatus, String> {
        let Some(handle) = job.remote_handle.as_deref() else {
            return Ok(StepStatus::Skipped("never submitted".to_string()));
        };

        let status = match bounded(self.call_timeout, self.backend.statement_status(handle))
            .await
            .map_err(|e| e.to_string())?
        {
            RemoteReply::Found(info) => JobStatus::parse(&info.state),
            RemoteReply::NotFound | RemoteReply::BadSession(_) => {
                return Ok(StepStatus::Skipped("statement is gone".to_string()))
            }
            RemoteReply::Unexpected { status, body } => {
                return Err(format!("unexpected status {status}: {body}"))
            }
        };
        if !status.is_active() {
            return Ok(StepStatus::Skipped(format!("statement is {status}")));
        }

        match bounded(self.call_timeout, self.backend.cancel_statement(handle))
            .await
            .map_err(|e| e.to_string())?
        {
            RemoteReply::Found(()) => {
                log::info!("Cancelled remote statement of job #{}", job.id);
                Ok(StepStatus::Done)
            }
            RemoteReply::NotFound => Ok(StepStatus::Skipped("statement is gone".to_string())),
            RemoteReply::BadSession(body) | RemoteReply::Unexpected { body, .. } => Err(body),
        }
    }

    fn remove_published_links(&self, job: &Job) -> Result<StepStatus, String> {
        let Some(output) = job.output_location.as_deref() else {
            return Ok(StepStatus::Skipped("no output location".to_string()));
        };
        let hash = self
            .artifacts
            .output_filename_hash(Path::new(output))
            .map_err(|e| e.to_string())?;
        let Some(hash) = hash else {
            return Ok(StepStatus::Skipped("no output files".to_string()));
        };
        let removed = self
            .artifacts
            .remove_published_links(&hash)
            .map_err(|e| e.to_string())?;
        log::debug!("Removed {} published links of job #{}", removed, job.id);
        Ok(StepStatus::Done)
    }

    async fn remove_published_documents(&self, job_id: i64) -> Result<StepStatus, String> {
        let removed = self
            .search
            .delete_by_job(&self.published_index, job_id)
            .await
            .map_err(|e| e.to_string())?;
        log::debug!(
            "Removed {} documents of job #{} from '{}'",
            removed,
            job_id,
            self.published_index
        );
        Ok(StepStatus::Done)
    }

    /// Clears the publish set id of the record group the job publishes,
    /// falling back to the job's own record group.
    fn clear_publish_set_id(&self, job: &Job) -> Result<StepStatus, String> {
        let record_group = edge_repo::publish_binding_of(&self.db, job.id)
            .map_err(|e| e.to_string())?
            .unwrap_or(job.record_group_id);
        hierarchy_repo::set_publish_set_id(&self.db, record_group, None)
            .map_err(|e| e.to_string())?;
        Ok(StepStatus::Done)
    }

    fn remove_output(&self, job: &Job) -> Result<StepStatus, String> {
        let Some(output) = job.output_location.as_deref() else {
            return Ok(StepStatus::Skipped("no output location".to_string()));
        };
        match self.artifacts.remove_job_output(Path::new(output)) {
            Ok(true) => Ok(StepStatus::Done),
            Ok(false) => Ok(StepStatus::Skipped("output does not exist".to_string())),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn delete_index(&self, job_id: i64) -> Result<StepStatus, String> {
        let index = job_index_name(job_id);
        match self.search.delete_index(&index).await {
            Ok(true) => Ok(StepStatus::Done),
            Ok(false) => Ok(StepStatus::Skipped(format!("index '{index}' does not exist"))),
            Err(e) => Err(e.to_string()),
        }
    }
}
