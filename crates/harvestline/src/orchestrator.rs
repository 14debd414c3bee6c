//! The operator-facing entry point that wires the components together.

use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::db::record_repo::{self, RecordRow};
use crate::db::session_repo::SessionState;
use crate::db::{edge_repo, Database};
use crate::error::{ConfigError, Result};
use crate::job::{Dispatcher, Job, JobSpec};
use crate::lifecycle::{DeletionCascade, DeletionReport, LifecycleSupervisor, PollOutcome, PollScheduler};
use crate::lineage::{Directionality, LineageBuilder, LineageFilter, LineageGraph, RecordTracer};
use crate::remote::{HttpRemoteClient, RemoteBackend, SessionCoordinator, SessionHandle};
use crate::search::{job_index_name, HttpSearchIndex, SearchIndex};
use crate::storage::ArtifactStore;
use crate::validation::{ValidationRollup, Verdict};

/// Record counts of one job, alongside the records its inputs produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecordCounts {
    pub total: i64,
    pub successes: i64,
    pub errors: i64,
    pub input_total: i64,
}

pub struct Orchestrator {
    db: Database,
    session: Arc<SessionCoordinator>,
    dispatcher: Dispatcher,
    supervisor: Arc<LifecycleSupervisor>,
    cascade: DeletionCascade,
    lineage: LineageBuilder,
    tracer: RecordTracer,
    rollup: ValidationRollup,
    search: Arc<dyn SearchIndex>,
    poll_interval: std::time::Duration,
}

impl Orchestrator {
    /// Opens the configured database and connects the HTTP clients.
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = config
            .database
            .resolved_path()
            .ok_or_else(|| ConfigError::Validation {
                message: "No database path configured and no home directory found".to_string(),
            })?;
        let db = Database::open(&path)?;
        let backend = Arc::new(HttpRemoteClient::new(
            &config.remote.base_url,
            config.remote.request_timeout(),
        )?);
        let search = Arc::new(HttpSearchIndex::new(
            &config.search.base_url,
            config.remote.request_timeout(),
        )?);
        Ok(Self::with_backends(db, backend, search, config))
    }

    /// Builds an orchestrator over an open database and the given
    /// collaborators.
    pub fn with_backends(
        db: Database,
        backend: Arc<dyn RemoteBackend>,
        search: Arc<dyn SearchIndex>,
        config: &Config,
    ) -> Self {
        let artifacts = ArtifactStore::new(&config.storage.root);
        let request_timeout = config.remote.request_timeout();

        Self {
            session: Arc::new(SessionCoordinator::new(
                db.clone(),
                Arc::clone(&backend),
                &config.remote.session_name,
                config.remote.session.clone(),
                request_timeout,
            )),
            dispatcher: Dispatcher::new(
                db.clone(),
                Arc::clone(&backend),
                artifacts.clone(),
                config.analysis.clone(),
                request_timeout,
            ),
            supervisor: Arc::new(LifecycleSupervisor::new(
                db.clone(),
                Arc::clone(&backend),
                config.remote.poll_timeout(),
                config.supervisor.max_concurrent_polls,
            )),
            cascade: DeletionCascade::new(
                db.clone(),
                backend,
                Arc::clone(&search),
                artifacts,
                &config.search.published_index,
                request_timeout,
            ),
            lineage: LineageBuilder::new(db.clone()),
            tracer: RecordTracer::new(db.clone()),
            rollup: ValidationRollup::new(db.clone()),
            search,
            poll_interval: config.supervisor.poll_interval(),
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Creates a job and submits it through the current session. The job
    /// row exists even when submission fails; the error carries its id.
    pub async fn create_job(&self, spec: &JobSpec) -> Result<i64> {
        let session = self.session.active().await;
        Ok(self.dispatcher.create_job(spec, session.as_ref()).await?)
    }

    pub fn job(&self, job_id: i64) -> Result<Job> {
        Ok(Job::load(&self.db, job_id)?)
    }

    pub fn lineage(&self, job_id: i64, directionality: Directionality) -> Result<LineageGraph> {
        Ok(self.lineage.build(job_id, directionality)?)
    }

    pub fn lineage_all(
        &self,
        filter: &LineageFilter,
        directionality: Directionality,
    ) -> Result<LineageGraph> {
        Ok(self.lineage.build_for_all(filter, directionality)?)
    }

    /// Pipeline stages of the record `record_id` as seen from `job_id`.
    pub fn trace_record(
        &self,
        job_id: i64,
        record_id: &str,
        input_only: bool,
    ) -> Result<Vec<RecordRow>> {
        Ok(self.tracer.trace_in_job(job_id, record_id, input_only)?)
    }

    pub fn update_published_uniqueness(&self) -> Result<usize> {
        Ok(self.tracer.update_published_uniqueness()?)
    }

    pub async fn delete_job(&self, job_id: i64) -> Result<DeletionReport> {
        Ok(self.cascade.delete(job_id).await?)
    }

    pub async fn poll_job(&self, job_id: i64, force: bool) -> Result<PollOutcome> {
        Ok(self.supervisor.poll(job_id, force).await?)
    }

    pub async fn poll_active(&self) -> Result<Vec<(i64, PollOutcome)>> {
        Ok(self.supervisor.poll_active().await?)
    }

    /// Acquires the single remote session, reusing a live one if any.
    pub async fn start_session(&self) -> Result<SessionHandle> {
        Ok(self.session.acquire().await?)
    }

    /// Re-reads the current session; a dead one is dropped.
    pub async fn refresh_session(&self) -> Result<Option<SessionState>> {
        Ok(self.session.refresh().await?)
    }

    /// Returns false if no session was held.
    pub async fn stop_session(&self) -> Result<bool> {
        Ok(self.session.release().await?)
    }

    pub fn job_verdict(&self, job_id: i64) -> Result<Verdict> {
        Ok(self.rollup.verdict(job_id)?)
    }

    /// Recounts validation failures of every binding of the job.
    pub fn recount_validations(&self, job_id: i64) -> Result<Verdict> {
        Ok(self.rollup.recompute(job_id, true)?)
    }

    pub fn record_counts(&self, job_id: i64) -> Result<JobRecordCounts> {
        let counts = record_repo::counts_for_job(&self.db, job_id)?;
        let mut input_total = 0;
        for input in edge_repo::inputs_of(&self.db, job_id)? {
            input_total += record_repo::count_for_job(&self.db, input)?;
        }
        Ok(JobRecordCounts {
            total: counts.total,
            successes: counts.successes,
            errors: counts.errors,
            input_total,
        })
    }

    /// Documents in the job's search index; `None` if it has none.
    pub async fn indexed_record_count(&self, job_id: i64) -> Result<Option<u64>> {
        Ok(self.search.count(&job_index_name(job_id)).await?)
    }

    /// A scheduler that refreshes the session and polls active jobs at the
    /// configured interval.
    pub fn scheduler(&self) -> PollScheduler {
        PollScheduler::new(
            Arc::clone(&self.supervisor),
            Arc::clone(&self.session),
            self.poll_interval,
        )
    }
}
