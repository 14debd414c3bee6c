//! Job repository: the `jobs` table and its `job_tracks` timing rows.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{now_timestamp, Database, DatabaseError};

const SELECT_JOBS: &str = "SELECT jobs.*, record_groups.organization_id AS organization_id
     FROM jobs JOIN record_groups ON record_groups.id = jobs.record_group_id";

/// A raw job row, joined with its record group's organization id.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub record_group_id: i64,
    pub organization_id: i64,
    pub kind: String,
    pub name: String,
    pub note: Option<String>,
    pub status: String,
    pub finished: bool,
    pub remote_statement_id: Option<i64>,
    pub remote_handle: Option<String>,
    pub payload: Option<String>,
    pub output_location: Option<String>,
    pub record_count: i64,
    pub elapsed: i64,
    pub published: bool,
    pub details: Option<String>,
    pub deleted: bool,
    pub created_at: String,
    pub finish_handled: bool,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            record_group_id: row.get("record_group_id")?,
            organization_id: row.get("organization_id")?,
            kind: row.get("kind")?,
            name: row.get("name")?,
            note: row.get("note")?,
            status: row.get("status")?,
            finished: row.get("finished")?,
            remote_statement_id: row.get("remote_statement_id")?,
            remote_handle: row.get("remote_handle")?,
            payload: row.get("payload")?,
            output_location: row.get("output_location")?,
            record_count: row.get("record_count")?,
            elapsed: row.get("elapsed")?,
            published: row.get("published")?,
            details: row.get("details")?,
            deleted: row.get("deleted")?,
            created_at: row.get("created_at")?,
            finish_handled: row.get("finish_handled")?,
        })
    }
}

/// Columns supplied when a job row is first created. Status starts as
/// `initializing` and every counter at zero.
#[derive(Debug, Clone)]
pub struct NewJob<'a> {
    pub record_group_id: i64,
    pub kind: &'a str,
    pub name: &'a str,
    pub note: Option<&'a str>,
}

/// Query filter for job listing. Filters combine with AND.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub organization_id: Option<i64>,
    pub record_group_id: Option<i64>,
    pub ids: Option<Vec<i64>>,
    pub exclude_kind: Option<String>,
    pub include_deleted: bool,
}

/// A job's start/finish tracking row.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTrackRow {
    pub id: i64,
    pub job_id: i64,
    pub start_timestamp: String,
    pub finish_timestamp: Option<String>,
}

impl JobTrackRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            start_timestamp: row.get("start_timestamp")?,
            finish_timestamp: row.get("finish_timestamp")?,
        })
    }
}

pub(crate) fn insert_in(conn: &Connection, job: &NewJob<'_>) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (record_group_id, kind, name, note, status, finished, created_at)
         VALUES (?1, ?2, ?3, ?4, 'initializing', 0, ?5)",
        params![job.record_group_id, job.kind, job.name, job.note, now_timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a new job row and returns its id.
pub fn insert(db: &Database, job: &NewJob<'_>) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| insert_in(conn, job))
}

pub(crate) fn find_in(conn: &Connection, id: i64) -> Result<Option<JobRow>, DatabaseError> {
    Ok(conn
        .query_row(
            &format!("{SELECT_JOBS} WHERE jobs.id = ?1"),
            params![id],
            JobRow::from_row,
        )
        .optional()?)
}

/// Finds a job by its id, deleted or not.
pub fn find_by_id(db: &Database, id: i64) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| find_in(conn, id))
}

/// Like [`find_by_id`] but a missing row is an error.
pub fn get(db: &Database, id: i64) -> Result<JobRow, DatabaseError> {
    find_by_id(db, id)?.ok_or(DatabaseError::NotFound { entity: "job", id })
}

/// Queries jobs with filters, ordered by ascending id.
pub fn query(db: &Database, filter: &JobFilter) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(org) = filter.organization_id {
            conditions.push(format!(
                "record_groups.organization_id = ?{}",
                param_values.len() + 1
            ));
            param_values.push(Box::new(org));
        }
        if let Some(rg) = filter.record_group_id {
            conditions.push(format!("jobs.record_group_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(rg));
        }
        if let Some(ref kind) = filter.exclude_kind {
            conditions.push(format!("jobs.kind != ?{}", param_values.len() + 1));
            param_values.push(Box::new(kind.clone()));
        }
        if let Some(ref ids) = filter.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders: Vec<String> = ids
                .iter()
                .enumerate()
                .map(|(i, _)| format!("?{}", param_values.len() + i + 1))
                .collect();
            conditions.push(format!("jobs.id IN ({})", placeholders.join(", ")));
            for id in ids {
                param_values.push(Box::new(*id));
            }
        }
        if !filter.include_deleted {
            conditions.push("jobs.deleted = 0".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!("{SELECT_JOBS} {where_clause} ORDER BY jobs.id");
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_ref.as_slice(), JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Ids of jobs the poller should look at: not deleted, submitted, and
/// either unfinished in one of `statuses` or finished with finish handling
/// still outstanding.
pub fn pollable_ids(db: &Database, statuses: &[&str]) -> Result<Vec<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let placeholders: Vec<String> = (1..=statuses.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT id FROM jobs WHERE deleted = 0 AND remote_handle IS NOT NULL
             AND ((finished = 0 AND status IN ({})) OR (finished = 1 AND finish_handled = 0))
             ORDER BY id",
            placeholders.join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(rusqlite::params_from_iter(statuses.iter()), |r| r.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    })
}

/// Stores the remote statement a job was submitted as.
pub fn record_submission(
    db: &Database,
    id: i64,
    statement_id: i64,
    handle: &str,
    status: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET remote_statement_id = ?2, remote_handle = ?3, status = ?4
             WHERE id = ?1",
            params![id, statement_id, handle, status],
        )?;
        Ok(())
    })
}

/// Updates status and finished flag together. Deleted jobs are left
/// alone; returns false in that case.
pub fn update_status(
    db: &Database,
    id: i64,
    status: &str,
    finished: bool,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = ?2, finished = ?3 WHERE id = ?1 AND deleted = 0",
            params![id, status, finished],
        )?;
        Ok(changed > 0)
    })
}

pub fn set_record_count(db: &Database, id: i64, count: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET record_count = ?2 WHERE id = ?1",
            params![id, count],
        )?;
        Ok(())
    })
}

pub fn set_elapsed(db: &Database, id: i64, seconds: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET elapsed = ?2 WHERE id = ?1",
            params![id, seconds],
        )?;
        Ok(())
    })
}

/// Records that the steps run when a job finishes have all completed.
pub fn set_finish_handled(db: &Database, id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET finish_handled = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    })
}

pub fn set_published(db: &Database, id: i64, published: bool) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET published = ?2 WHERE id = ?1",
            params![id, published],
        )?;
        Ok(())
    })
}

/// Writes the payload, output location and details captured at creation.
/// Details are write-once: a row that already carries them keeps them.
pub(crate) fn set_creation_metadata_in(
    conn: &Connection,
    id: i64,
    payload: &str,
    output_location: &str,
    details: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE jobs SET payload = ?2, output_location = ?3,
         details = COALESCE(details, ?4) WHERE id = ?1",
        params![id, payload, output_location, details],
    )?;
    Ok(())
}

/// Soft-deletes a job. Returns false if it was already deleted or missing.
pub fn mark_deleted(db: &Database, id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET deleted = 1 WHERE id = ?1 AND deleted = 0",
            params![id],
        )?;
        Ok(changed > 0)
    })
}

/// Removes the row; edges, bindings, tracks and records go with it.
pub fn delete(db: &Database, id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        Ok(())
    })
}

/// Opens a tracking row for a job that has just been submitted.
pub fn start_track(db: &Database, job_id: i64, start: &str) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO job_tracks (job_id, start_timestamp) VALUES (?1, ?2)",
            params![job_id, start],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Stamps the finish time on the latest open track of a job.
pub fn finish_track(db: &Database, job_id: i64, finish: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE job_tracks SET finish_timestamp = ?2
             WHERE id = (SELECT id FROM job_tracks WHERE job_id = ?1
                         AND finish_timestamp IS NULL ORDER BY id DESC LIMIT 1)",
            params![job_id, finish],
        )?;
        Ok(())
    })
}

/// The most recent tracking row of a job.
pub fn latest_track(db: &Database, job_id: i64) -> Result<Option<JobTrackRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM job_tracks WHERE job_id = ?1 ORDER BY id DESC LIMIT 1",
                params![job_id],
                JobTrackRow::from_row,
            )
            .optional()?)
    })
}
