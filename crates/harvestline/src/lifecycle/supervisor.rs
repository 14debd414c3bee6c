//! Polls submitted jobs and applies what the backend reports.
//!
//! Polls of different jobs run concurrently and share nothing but the
//! database handle. The tracking row is stamped before the status write
//! that marks a job finished, so `finished = true` always comes with a
//! finish timestamp. The work done once a job finishes is flagged as
//! handled only after all of it succeeds; a finished job without that flag
//! gets it redone on its next poll.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::Instrument;

use super::SupervisorError;
use crate::db::{job_repo, now_timestamp, record_repo, Database};
use crate::job::{Job, JobKind, JobStatus};
use crate::remote::{bounded, RemoteBackend, RemoteReply};
use crate::validation::ValidationRollup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    Deleted,
    /// `gone` or finished; only a forced poll looks again.
    Terminal,
    /// No remote handle: submission never happened.
    NotSubmitted,
    /// A status outside the pollable set, such as `error`.
    NotPollable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PollOutcome {
    Skipped(SkipReason),
    Updated { status: JobStatus, finished: bool },
    /// The backend no longer knows the statement or its session.
    Gone,
    /// Timeout or transport failure; the next cycle retries.
    Transient(String),
    /// Ambiguous answer; local state left as it was.
    Unchanged,
}

pub struct LifecycleSupervisor {
    db: Database,
    backend: Arc<dyn RemoteBackend>,
    rollup: ValidationRollup,
    poll_timeout: Duration,
    max_concurrent: usize,
}

impl LifecycleSupervisor {
    pub fn new(
        db: Database,
        backend: Arc<dyn RemoteBackend>,
        poll_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            rollup: ValidationRollup::new(db.clone()),
            db,
            backend,
            poll_timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Polls one job. `force` re-polls terminal jobs, never deleted ones.
    pub async fn poll(&self, job_id: i64, force: bool) -> Result<PollOutcome, SupervisorError> {
        let span = tracing::info_span!("poll_job", job_id);
        self.poll_inner(job_id, force).instrument(span).await
    }

    async fn poll_inner(&self, job_id: i64, force: bool) -> Result<PollOutcome, SupervisorError> {
        let job = Job::load(&self.db, job_id)?;

        if job.deleted {
            return Ok(PollOutcome::Skipped(SkipReason::Deleted));
        }
        if job.finished && !job.finish_handled {
            log::info!("Completing finish handling of job #{}", job_id);
            self.handle_finish(&job)?;
            self.update_elapsed(job_id)?;
            return Ok(PollOutcome::Updated {
                status: job.status.clone(),
                finished: true,
            });
        }
        if !force && (job.finished || job.status == JobStatus::Gone) {
            return Ok(PollOutcome::Skipped(SkipReason::Terminal));
        }
        let Some(handle) = job.remote_handle.as_deref() else {
            return Ok(PollOutcome::Skipped(SkipReason::NotSubmitted));
        };
        if !force && !job.status.is_pollable() {
            return Ok(PollOutcome::Skipped(SkipReason::NotPollable));
        }

        let reply = bounded(self.poll_timeout, self.backend.statement_status(handle)).await;
        let outcome = match reply {
            Err(e) if e.is_transient() => {
                log::warn!("Polling job #{} failed, will retry: {}", job_id, e);
                PollOutcome::Transient(e.to_string())
            }
            Err(e) => {
                log::warn!("Unreadable status for job #{}: {}", job_id, e);
                PollOutcome::Unchanged
            }
            Ok(RemoteReply::NotFound) | Ok(RemoteReply::BadSession(_)) => {
                if job_repo::update_status(&self.db, job_id, JobStatus::Gone.as_str(), job.finished)? {
                    log::info!("Job #{} is gone from the remote backend", job_id);
                }
                PollOutcome::Gone
            }
            Ok(RemoteReply::Found(info)) => {
                let status = JobStatus::parse(&info.state);
                let finished = job.finished || status.is_available();
                let newly_finished = finished && !job.finished;

                if newly_finished {
                    job_repo::finish_track(&self.db, job_id, &now_timestamp())?;
                }
                if !job_repo::update_status(&self.db, job_id, status.as_str(), finished)? {
                    return Ok(PollOutcome::Skipped(SkipReason::Deleted));
                }
                if status != job.status {
                    log::debug!("Job #{}: {} -> {}", job_id, job.status, status);
                }
                if newly_finished {
                    self.handle_finish(&job)?;
                }
                PollOutcome::Updated { status, finished }
            }
            Ok(RemoteReply::Unexpected { status, body }) => {
                log::warn!(
                    "Unexpected status {} polling job #{}: {}",
                    status,
                    job_id,
                    body
                );
                PollOutcome::Unchanged
            }
        };

        self.update_elapsed(job_id)?;
        Ok(outcome)
    }

    /// Polls every submitted, unfinished job in a pollable status, at most
    /// `max_concurrent` at a time. Per-job errors are logged and skipped.
    pub async fn poll_active(&self) -> Result<Vec<(i64, PollOutcome)>, SupervisorError> {
        let ids = job_repo::pollable_ids(&self.db, &JobStatus::POLLABLE)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        log::debug!("Polling {} active jobs", ids.len());

        let results: Vec<(i64, Result<PollOutcome, SupervisorError>)> = stream::iter(ids)
            .map(|id| async move { (id, self.poll(id, false).await) })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut outcomes: Vec<(i64, PollOutcome)> = results
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(outcome) => Some((id, outcome)),
                Err(e) => {
                    log::error!("Failed to poll job #{}: {}", id, e);
                    None
                }
            })
            .collect();
        outcomes.sort_by_key(|(id, _)| *id);
        Ok(outcomes)
    }

    fn handle_finish(&self, job: &Job) -> Result<(), SupervisorError> {
        self.on_finished(job)?;
        job_repo::set_finish_handled(&self.db, job.id)?;
        Ok(())
    }

    /// Every step is safe to repeat.
    fn on_finished(&self, job: &Job) -> Result<(), SupervisorError> {
        if job.record_count == 0 {
            let count = record_repo::count_for_job(&self.db, job.id)?;
            job_repo::set_record_count(&self.db, job.id, count)?;
        }
        record_repo::update_job_uniqueness(&self.db, job.id)?;
        self.rollup.recompute(job.id, false)?;

        if job.kind == JobKind::Publish {
            let flagged = record_repo::set_published_for_job(&self.db, job.id)?;
            job_repo::set_published(&self.db, job.id, true)?;
            let dupes = record_repo::update_published_uniqueness(&self.db)?;
            log::info!(
                "Published {} records from job #{} ({} non-unique across published set)",
                flagged,
                job.id,
                dupes
            );
        }
        Ok(())
    }

    fn update_elapsed(&self, job_id: i64) -> Result<(), SupervisorError> {
        let Some(job) = job_repo::find_by_id(&self.db, job_id)? else {
            return Ok(());
        };
        let track = job_repo::latest_track(&self.db, job_id)?;
        let elapsed = match track {
            None => 0,
            Some(track) => {
                let end = if job.finished {
                    track.finish_timestamp.as_deref().and_then(parse_timestamp)
                } else {
                    None
                };
                match parse_timestamp(&track.start_timestamp) {
                    Some(start) => (end.unwrap_or_else(Utc::now) - start).num_seconds().max(0),
                    None => 0,
                }
            }
        };
        job_repo::set_elapsed(&self.db, job_id, elapsed)?;
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
