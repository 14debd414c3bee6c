//! Organization and record group repository.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{now_timestamp, Database, DatabaseError};

/// A raw organization row.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub for_analysis: bool,
    pub created_at: String,
}

impl OrganizationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            for_analysis: row.get("for_analysis")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A raw record group row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordGroupRow {
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub publish_set_id: Option<String>,
    pub for_analysis: bool,
    pub created_at: String,
}

impl RecordGroupRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            organization_id: row.get("organization_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            publish_set_id: row.get("publish_set_id")?,
            for_analysis: row.get("for_analysis")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub(crate) fn insert_organization_in(
    conn: &Connection,
    name: &str,
    description: &str,
    for_analysis: bool,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO organizations (name, description, for_analysis, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![name, description, for_analysis, now_timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_record_group_in(
    conn: &Connection,
    organization_id: i64,
    name: &str,
    description: Option<&str>,
    for_analysis: bool,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO record_groups (organization_id, name, description, for_analysis, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![organization_id, name, description, for_analysis, now_timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a new organization and returns its id.
pub fn insert_organization(
    db: &Database,
    name: &str,
    description: &str,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| insert_organization_in(conn, name, description, false))
}

/// Inserts a new record group under `organization_id` and returns its id.
pub fn insert_record_group(
    db: &Database,
    organization_id: i64,
    name: &str,
    description: Option<&str>,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| insert_record_group_in(conn, organization_id, name, description, false))
}

/// Finds an organization by id.
pub fn find_organization(db: &Database, id: i64) -> Result<Option<OrganizationRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM organizations WHERE id = ?1",
                params![id],
                OrganizationRow::from_row,
            )
            .optional()?)
    })
}

/// Finds a record group by id.
pub fn find_record_group(db: &Database, id: i64) -> Result<Option<RecordGroupRow>, DatabaseError> {
    db.with_conn(|conn| find_record_group_in(conn, id))
}

pub(crate) fn find_record_group_in(
    conn: &Connection,
    id: i64,
) -> Result<Option<RecordGroupRow>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM record_groups WHERE id = ?1",
            params![id],
            RecordGroupRow::from_row,
        )
        .optional()?)
}

/// Returns every organization carrying `name`. Callers decide what more
/// than one match means.
pub(crate) fn organizations_named_in(
    conn: &Connection,
    name: &str,
) -> Result<Vec<OrganizationRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM organizations WHERE name = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map(params![name], OrganizationRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns every record group carrying `name`.
pub(crate) fn record_groups_named_in(
    conn: &Connection,
    name: &str,
) -> Result<Vec<RecordGroupRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM record_groups WHERE name = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map(params![name], RecordGroupRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Sets (or clears, with `None`) the publish set id of a record group.
pub fn set_publish_set_id(
    db: &Database,
    record_group_id: i64,
    publish_set_id: Option<&str>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| set_publish_set_id_in(conn, record_group_id, publish_set_id))
}

pub(crate) fn set_publish_set_id_in(
    conn: &Connection,
    record_group_id: i64,
    publish_set_id: Option<&str>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE record_groups SET publish_set_id = ?2 WHERE id = ?1",
        params![record_group_id, publish_set_id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity: "record group",
            id: record_group_id,
        });
    }
    Ok(())
}

/// Distinct, non-null publish set ids across all record groups.
pub fn publish_set_ids(db: &Database) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT publish_set_id FROM record_groups
             WHERE publish_set_id IS NOT NULL ORDER BY publish_set_id",
        )?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    })
}

/// Whether any publish binding points at this record group.
pub fn is_published(db: &Database, record_group_id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM job_publish WHERE record_group_id = ?1",
            params![record_group_id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    })
}
