//! Job edges (`job_inputs`) and publish bindings (`job_publish`).

use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DatabaseError};

/// A directed `job -> input_job` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobEdgeRow {
    pub job_id: i64,
    pub input_job_id: i64,
}

pub(crate) fn insert_edge_in(
    conn: &Connection,
    job_id: i64,
    input_job_id: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO job_inputs (job_id, input_job_id) VALUES (?1, ?2)",
        params![job_id, input_job_id],
    )?;
    Ok(())
}

/// Records that `job_id` consumes the output of `input_job_id`.
pub fn insert_edge(db: &Database, job_id: i64, input_job_id: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_edge_in(conn, job_id, input_job_id))
}

/// Input job ids of `job_id`, ascending.
pub fn inputs_of(db: &Database, job_id: i64) -> Result<Vec<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT input_job_id FROM job_inputs WHERE job_id = ?1 ORDER BY input_job_id",
        )?;
        let ids = stmt
            .query_map(params![job_id], |r| r.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    })
}

/// Ids of jobs that declare `input_job_id` as an input, ascending.
pub fn consumers_of(db: &Database, input_job_id: i64) -> Result<Vec<i64>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare("SELECT job_id FROM job_inputs WHERE input_job_id = ?1 ORDER BY job_id")?;
        let ids = stmt
            .query_map(params![input_job_id], |r| r.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    })
}

pub(crate) fn insert_publish_binding_in(
    conn: &Connection,
    record_group_id: i64,
    job_id: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO job_publish (record_group_id, job_id) VALUES (?1, ?2)",
        params![record_group_id, job_id],
    )?;
    Ok(())
}

/// Record group a publish job publishes, if it is bound to one.
pub fn publish_binding_of(db: &Database, job_id: i64) -> Result<Option<i64>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT record_group_id FROM job_publish WHERE job_id = ?1 ORDER BY id LIMIT 1",
                params![job_id],
                |r| r.get(0),
            )
            .optional()?)
    })
}
