//! Remote session bookkeeping (`remote_sessions`).

use rusqlite::{params, OptionalExtension, Row};

use super::{now_timestamp, Database, DatabaseError};

/// A raw remote session row.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub id: i64,
    pub name: String,
    pub session_id: i64,
    pub session_url: String,
    pub status: Option<String>,
    pub app_id: Option<String>,
    pub driver_log_url: Option<String>,
    pub spark_ui_url: Option<String>,
    pub active: bool,
    pub session_timestamp: Option<String>,
    pub created_at: String,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            session_id: row.get("session_id")?,
            session_url: row.get("session_url")?,
            status: row.get("status")?,
            app_id: row.get("app_id")?,
            driver_log_url: row.get("driver_log_url")?,
            spark_ui_url: row.get("spark_ui_url")?,
            active: row.get("active")?,
            session_timestamp: row.get("session_timestamp")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Backend-reported facts about a session, applied on refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub status: String,
    pub active: bool,
    pub app_id: Option<String>,
    pub driver_log_url: Option<String>,
    pub spark_ui_url: Option<String>,
}

pub fn insert(
    db: &Database,
    name: &str,
    session_id: i64,
    session_url: &str,
    status: &str,
    active: bool,
) -> Result<i64, DatabaseError> {
    db.with_conn(|conn| {
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO remote_sessions
             (name, session_id, session_url, status, active, session_timestamp, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![name, session_id, session_url, status, active, now],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn find_by_id(db: &Database, id: i64) -> Result<Option<SessionRow>, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM remote_sessions WHERE id = ?1",
                params![id],
                SessionRow::from_row,
            )
            .optional()?)
    })
}

/// Sessions flagged active, newest first. More than one means a previous
/// process left stale rows behind.
pub fn active_sessions(db: &Database) -> Result<Vec<SessionRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM remote_sessions WHERE active = 1 ORDER BY id DESC")?;
        let rows = stmt
            .query_map([], SessionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn update_state(db: &Database, id: i64, state: &SessionState) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE remote_sessions SET status = ?2, active = ?3,
             app_id = COALESCE(?4, app_id),
             driver_log_url = COALESCE(?5, driver_log_url),
             spark_ui_url = COALESCE(?6, spark_ui_url)
             WHERE id = ?1",
            params![
                id,
                state.status,
                state.active,
                state.app_id,
                state.driver_log_url,
                state.spark_ui_url,
            ],
        )?;
        Ok(())
    })
}

pub fn deactivate(db: &Database, id: i64, status: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE remote_sessions SET active = 0, status = ?2 WHERE id = ?1",
            params![id, status],
        )?;
        Ok(())
    })
}
