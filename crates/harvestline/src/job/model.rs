use serde::Serialize;

use super::kind::{JobFamily, JobKind};
use super::status::JobStatus;
use crate::db::job_repo::{self, JobRow};
use crate::db::{Database, DatabaseError};

/// One pipeline stage, as persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: i64,
    pub record_group_id: i64,
    pub organization_id: i64,
    pub kind: JobKind,
    pub name: String,
    pub note: Option<String>,
    pub status: JobStatus,
    pub finished: bool,
    pub remote_statement_id: Option<i64>,
    pub remote_handle: Option<String>,
    pub output_location: Option<String>,
    pub record_count: i64,
    /// Wall time in seconds.
    pub elapsed: i64,
    pub published: bool,
    pub details: Option<serde_json::Value>,
    pub deleted: bool,
    pub created_at: String,
    /// Record counting, uniqueness, validation caching and publishing ran
    /// to completion after the job finished.
    pub finish_handled: bool,
}

impl TryFrom<JobRow> for Job {
    type Error = DatabaseError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let kind = JobKind::from_label(&row.kind).ok_or(DatabaseError::InvalidValue {
            column: "jobs.kind",
            value: row.kind.clone(),
        })?;
        let details = row
            .details
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .map_err(|e| DatabaseError::Json {
                column: "jobs.details",
                source: e,
            })?;

        Ok(Self {
            id: row.id,
            record_group_id: row.record_group_id,
            organization_id: row.organization_id,
            kind,
            name: row.name,
            note: row.note,
            status: JobStatus::parse(&row.status),
            finished: row.finished,
            remote_statement_id: row.remote_statement_id,
            remote_handle: row.remote_handle,
            output_location: row.output_location,
            record_count: row.record_count,
            elapsed: row.elapsed,
            published: row.published,
            details,
            deleted: row.deleted,
            created_at: row.created_at,
            finish_handled: row.finish_handled,
        })
    }
}

impl Job {
    pub fn find(db: &Database, id: i64) -> Result<Option<Job>, DatabaseError> {
        job_repo::find_by_id(db, id)?.map(Job::try_from).transpose()
    }

    pub fn load(db: &Database, id: i64) -> Result<Job, DatabaseError> {
        Job::try_from(job_repo::get(db, id)?)
    }

    pub fn family(&self) -> JobFamily {
        self.kind.family()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Submitted to the backend at least once.
    pub fn is_submitted(&self) -> bool {
        self.remote_handle.is_some()
    }

    /// Still `initializing` with nothing submitted: creation failed.
    pub fn submission_failed(&self) -> bool {
        self.status == JobStatus::Initializing && self.remote_handle.is_none()
    }

    /// Elapsed time as `H:MM:SS`.
    pub fn elapsed_as_string(&self) -> String {
        let secs = self.elapsed.max(0);
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }

    /// Throughput rounded to one decimal; `None` without records or time.
    pub fn records_per_second(&self) -> Option<f64> {
        if self.record_count <= 0 || self.elapsed <= 0 {
            return None;
        }
        let rate = self.record_count as f64 / self.elapsed as f64;
        Some((rate * 10.0).round() / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::hierarchy_repo;

    fn sample_row() -> JobRow {
        JobRow {
            id: 1,
            record_group_id: 2,
            organization_id: 3,
            kind: "TransformJob".to_string(),
            name: "t".to_string(),
            note: None,
            status: "running".to_string(),
            finished: false,
            remote_statement_id: Some(4),
            remote_handle: Some("/sessions/0/statements/4".to_string()),
            payload: None,
            output_location: None,
            record_count: 0,
            elapsed: 0,
            published: false,
            details: Some(r#"{"transformation":{"id":9}}"#.to_string()),
            deleted: false,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            finish_handled: false,
        }
    }

    #[test]
    fn test_from_row() {
        let job = Job::try_from(sample_row()).unwrap();
        assert_eq!(job.kind, JobKind::Transform);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.details.unwrap()["transformation"]["id"], 9);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut row = sample_row();
        row.kind = "CopyJob".to_string();
        assert!(matches!(
            Job::try_from(row),
            Err(DatabaseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_elapsed_as_string() {
        let mut job = Job::try_from(sample_row()).unwrap();
        job.elapsed = 3723;
        assert_eq!(job.elapsed_as_string(), "1:02:03");
        job.elapsed = 59;
        assert_eq!(job.elapsed_as_string(), "0:00:59");
    }

    #[test]
    fn test_records_per_second() {
        let mut job = Job::try_from(sample_row()).unwrap();
        assert_eq!(job.records_per_second(), None);
        job.record_count = 1000;
        job.elapsed = 3;
        assert_eq!(job.records_per_second(), Some(333.3));
    }

    #[test]
    fn test_submission_failed() {
        let mut row = sample_row();
        row.status = "initializing".to_string();
        row.remote_handle = None;
        assert!(Job::try_from(row).unwrap().submission_failed());
    }

    #[test]
    fn test_load_from_database() {
        let db = Database::open_in_memory().unwrap();
        let org = hierarchy_repo::insert_organization(&db, "o", "").unwrap();
        let rg = hierarchy_repo::insert_record_group(&db, org, "r", None).unwrap();
        let id = job_repo::insert(
            &db,
            &job_repo::NewJob {
                record_group_id: rg,
                kind: "PublishJob",
                name: "p",
                note: Some("note"),
            },
        )
        .unwrap();

        let job = Job::load(&db, id).unwrap();
        assert_eq!(job.kind, JobKind::Publish);
        assert_eq!(job.organization_id, org);
        assert!(Job::find(&db, id + 1).unwrap().is_none());
    }
}
