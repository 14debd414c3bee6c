//! Validation scenarios, transformations, job bindings and per-record
//! validation results.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A validation scenario definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRow {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub payload: String,
    pub filepath: Option<String>,
    pub default_run: bool,
}

impl ScenarioRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            kind: row.get("kind")?,
            payload: row.get("payload")?,
            filepath: row.get("filepath")?,
            default_run: row.get("default_run")?,
        })
    }
}

/// A transformation definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationRow {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub payload: String,
    pub filepath: Option<String>,
}

impl TransformationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            kind: row.get("kind")?,
            payload: row.get("payload")?,
            filepath: row.get("filepath")?,
        })
    }
}

/// A job/scenario binding with its cached failure count.
#[derive(Debug, Clone, PartialEq)]
pub struct JobValidationRow {
    pub id: i64,
    pub job_id: i64,
    pub validation_scenario_id: i64,
    pub scenario_name: String,
    pub failure_count: Option<i64>,
}

impl JobValidationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            validation_scenario_id: row.get("validation_scenario_id")?,
            scenario_name: row.get("scenario_name")?,
            failure_count: row.get("failure_count")?,
        })
    }
}

pub fn insert_scenario(
    db: &Database,
    name: &str,
    kind: &str,
    payload: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO validation_scenarios (name, kind, payload) VALUES (?1, ?2, ?3)",
            params![name, kind, payload],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub(crate) fn find_scenario_in(
    conn: &Connection,
    id: i64,
) -> Result<Option<ScenarioRow>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM validation_scenarios WHERE id = ?1",
            params![id],
            ScenarioRow::from_row,
        )
        .optional()?)
}

pub fn find_scenario(db: &Database, id: i64) -> Result<Option<ScenarioRow>, DatabaseError> {
    db.with_conn(|conn| find_scenario_in(conn, id))
}

pub fn insert_transformation(
    db: &Database,
    name: &str,
    kind: &str,
    payload: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO transformations (name, kind, payload) VALUES (?1, ?2, ?3)",
            params![name, kind, payload],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub(crate) fn find_transformation_in(
    conn: &Connection,
    id: i64,
) -> Result<Option<TransformationRow>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM transformations WHERE id = ?1",
            params![id],
            TransformationRow::from_row,
        )
        .optional()?)
}

pub fn find_transformation(
    db: &Database,
    id: i64,
) -> Result<Option<TransformationRow>, DatabaseError> {
    db.with_conn(|conn| find_transformation_in(conn, id))
}

pub(crate) fn insert_binding_in(
    conn: &Connection,
    job_id: i64,
    scenario_id: i64,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO job_validations (job_id, validation_scenario_id) VALUES (?1, ?2)",
        params![job_id, scenario_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Binds a scenario to a job. The failure count starts uncomputed.
pub fn insert_binding(db: &Database, job_id: i64, scenario_id: i64) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| insert_binding_in(conn, job_id, scenario_id))
}

/// Bindings of a job, ascending by binding id.
pub fn bindings_for_job(db: &Database, job_id: i64) -> Result<Vec<JobValidationRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT jv.id, jv.job_id, jv.validation_scenario_id, jv.failure_count,
                    vs.name AS scenario_name
             FROM job_validations jv
             JOIN validation_scenarios vs ON vs.id = jv.validation_scenario_id
             WHERE jv.job_id = ?1 ORDER BY jv.id",
        )?;
        let rows = stmt
            .query_map(params![job_id], JobValidationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn set_failure_count(db: &Database, binding_id: i64, count: i64) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE job_validations SET failure_count = ?2 WHERE id = ?1",
            params![binding_id, count],
        )?;
        Ok(())
    })
}

/// Records of `job_id` with at least one failed validation for `scenario_id`.
pub fn count_failed_records(
    db: &Database,
    job_id: i64,
    scenario_id: i64,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.query_row(
            "SELECT COUNT(DISTINCT r.id) FROM record_validations rv
             JOIN records r ON r.id = rv.record_pk
             WHERE r.job_id = ?1 AND rv.validation_scenario_id = ?2 AND rv.valid = 0",
            params![job_id, scenario_id],
            |r| r.get(0),
        )?)
    })
}

/// Stores one validation result for a record.
pub fn insert_record_validation(
    db: &Database,
    record_pk: i64,
    scenario_id: i64,
    valid: bool,
    fail_count: Option<i64>,
    results_payload: Option<&str>,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO record_validations
             (record_pk, validation_scenario_id, valid, fail_count, results_payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record_pk, scenario_id, valid, fail_count, results_payload],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{hierarchy_repo, job_repo, record_repo};

    fn test_db() -> (Database, i64) {
        let db = Database::open_in_memory().expect("Failed to create test database");
        let org = hierarchy_repo::insert_organization(&db, "Org", "").unwrap();
        let rg = hierarchy_repo::insert_record_group(&db, org, "RG", None).unwrap();
        let job = job_repo::insert(
            &db,
            &job_repo::NewJob {
                record_group_id: rg,
                kind: "TransformJob",
                name: "t",
                note: None,
            },
        )
        .unwrap();
        (db, job)
    }

    fn record(db: &Database, job: i64, record_id: &str) -> i64 {
        record_repo::insert(
            db,
            job,
            &record_repo::NewRecord {
                record_id,
                success: true,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_bindings_start_uncomputed() {
        let (db, job) = test_db();
        let s = insert_scenario(&db, "schema", "sch", "<schema/>").unwrap();
        insert_binding(&db, job, s).unwrap();

        let bindings = bindings_for_job(&db, job).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].scenario_name, "schema");
        assert_eq!(bindings[0].failure_count, None);

        set_failure_count(&db, bindings[0].id, 4).unwrap();
        assert_eq!(bindings_for_job(&db, job).unwrap()[0].failure_count, Some(4));
    }

    #[test]
    fn test_count_failed_records_counts_records_not_results() {
        let (db, job) = test_db();
        let s = insert_scenario(&db, "schema", "sch", "<schema/>").unwrap();
        let other = insert_scenario(&db, "python", "python", "def test(): pass").unwrap();

        let a = record(&db, job, "a");
        let b = record(&db, job, "b");
        let c = record(&db, job, "c");
        insert_record_validation(&db, a, s, false, Some(2), None).unwrap();
        insert_record_validation(&db, a, s, false, Some(1), None).unwrap();
        insert_record_validation(&db, b, s, true, None, None).unwrap();
        insert_record_validation(&db, c, other, false, Some(1), None).unwrap();

        assert_eq!(count_failed_records(&db, job, s).unwrap(), 1);
        assert_eq!(count_failed_records(&db, job, other).unwrap(), 1);
    }

    #[test]
    fn test_transformations() {
        let (db, _) = test_db();
        let t = insert_transformation(&db, "MODS to DC", "xslt", "<xsl/>").unwrap();
        let row = find_transformation(&db, t).unwrap().unwrap();
        assert_eq!(row.kind, "xslt");
        assert!(find_transformation(&db, t + 1).unwrap().is_none());
    }
}
