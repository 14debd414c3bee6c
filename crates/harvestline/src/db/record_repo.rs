//! Record repository: job output records and published-set uniqueness.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw record row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub id: i64,
    pub job_id: i64,
    pub record_id: String,
    pub oai_set: Option<String>,
    pub document: Option<String>,
    pub error: Option<String>,
    pub success: bool,
    pub published: bool,
    pub is_unique: bool,
    pub unique_published: Option<bool>,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            record_id: row.get("record_id")?,
            oai_set: row.get("oai_set")?,
            document: row.get("document")?,
            error: row.get("error")?,
            success: row.get("success")?,
            published: row.get("published")?,
            is_unique: row.get("is_unique")?,
            unique_published: row.get("unique_published")?,
        })
    }
}

/// Columns for a new record. Records are normally written by the remote
/// backend; this exists for imports and tests.
#[derive(Debug, Clone, Default)]
pub struct NewRecord<'a> {
    pub record_id: &'a str,
    pub oai_set: Option<&'a str>,
    pub document: Option<&'a str>,
    pub error: Option<&'a str>,
    pub success: bool,
}

/// Success/error breakdown of a job's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub total: i64,
    pub successes: i64,
    pub errors: i64,
}

pub fn insert(db: &Database, job_id: i64, record: &NewRecord<'_>) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO records (job_id, record_id, oai_set, document, error, success)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                job_id,
                record.record_id,
                record.oai_set,
                record.document,
                record.error,
                record.success,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM records WHERE id = ?1",
                params![id],
                RecordRow::from_row,
            )
            .optional()?)
    })
}

/// First record (lowest id) in `job_id` carrying `record_id`.
pub fn find_in_job(
    db: &Database,
    job_id: i64,
    record_id: &str,
) -> Result<Option<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM records WHERE job_id = ?1 AND record_id = ?2
                 ORDER BY id LIMIT 1",
                params![job_id, record_id],
                RecordRow::from_row,
            )
            .optional()?)
    })
}

/// All records of a job, ascending by id.
pub fn list_for_job(db: &Database, job_id: i64) -> Result<Vec<RecordRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM records WHERE job_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map(params![job_id], RecordRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn count_for_job(db: &Database, job_id: i64) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM records WHERE job_id = ?1",
            params![job_id],
            |r| r.get(0),
        )?)
    })
}

pub fn counts_for_job(db: &Database, job_id: i64) -> Result<RecordCounts, DatabaseError> {
    db.with_conn(|conn| {
        let (total, successes): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(success), 0) FROM records WHERE job_id = ?1",
            params![job_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok(RecordCounts {
            total,
            successes,
            errors: total - successes,
        })
    })
}

/// Flags every record of a job as published.
pub fn set_published_for_job(db: &Database, job_id: i64) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.execute(
            "UPDATE records SET published = 1 WHERE job_id = ?1",
            params![job_id],
        )?)
    })
}

/// Recomputes `unique_published` over the whole published set: records
/// whose `record_id` occurs more than once among published records are
/// marked not unique, the rest unique. Returns the number of colliding
/// records.
pub fn update_published_uniqueness(db: &Database) -> Result<usize, DatabaseError> {
    db.with_tx(|tx| -> Result<usize, DatabaseError> {
        tx.execute(
            "UPDATE records SET unique_published = NULL
             WHERE published = 0 AND unique_published IS NOT NULL",
            [],
        )?;
        tx.execute(
            "UPDATE records SET unique_published = 1 WHERE published = 1",
            [],
        )?;
        let dupes = tx.execute(
            "UPDATE records SET unique_published = 0
             WHERE published = 1 AND record_id IN (
                 SELECT record_id FROM records WHERE published = 1
                 GROUP BY record_id HAVING COUNT(*) > 1)",
            [],
        )?;
        Ok(dupes)
    })
}

/// Recomputes `is_unique` for the records of one job.
pub fn update_job_uniqueness(db: &Database, job_id: i64) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE records SET is_unique = 1 WHERE job_id = ?1",
            params![job_id],
        )?;
        Ok(conn.execute(
            "UPDATE records SET is_unique = 0
             WHERE job_id = ?1 AND record_id IN (
                 SELECT record_id FROM records WHERE job_id = ?1
                 GROUP BY record_id HAVING COUNT(*) > 1)",
            params![job_id],
        )?)
    })
}
