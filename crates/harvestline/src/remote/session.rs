//! The single active remote session.
//!
//! [`SessionCoordinator`] owns the handle of the current session. Creating,
//! replacing and stopping it are serialized behind one async mutex, so two
//! callers can never start two sessions. Everything that needs the session
//! gets the handle passed in explicitly.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;

use super::client::RemoteBackend;
use super::error::RemoteError;
use super::types::{RemoteReply, SessionInfo};
use super::{bounded, is_live_session_state};
use crate::db::session_repo::{self, SessionRow, SessionState};
use crate::db::{Database, DatabaseError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Remote backend error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Remote backend refused the session request: {0}")]
    Rejected(String),

    /// Rows still flagged active could not be checked; starting another
    /// session could leave two running.
    #[error("Could not verify remote sessions {0:?}, not starting a new one")]
    Unverified(Vec<i64>),
}

/// Reference to a live session, as stored in `remote_sessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub row_id: i64,
    pub session_id: i64,
    pub session_url: String,
}

pub struct SessionCoordinator {
    db: Database,
    backend: Arc<dyn RemoteBackend>,
    session_name: String,
    session_config: serde_json::Value,
    call_timeout: Duration,
    current: Mutex<Option<SessionHandle>>,
}

impl SessionCoordinator {
    pub fn new(
        db: Database,
        backend: Arc<dyn RemoteBackend>,
        session_name: &str,
        session_config: serde_json::Value,
        call_timeout: Duration,
    ) -> Self {
        Self {
            db,
            backend,
            session_name: session_name.to_string(),
            session_config,
            call_timeout,
            current: Mutex::new(None),
        }
    }

    /// The current session, if one has been acquired. Never creates one.
    pub async fn active(&self) -> Option<SessionHandle> {
        self.current.lock().await.clone()
    }

    /// Returns the current session, adopting a live one left in the
    /// database or creating a new one as needed.
    pub async fn acquire(&self) -> Result<SessionHandle, SessionError> {
        let mut current = self.current.lock().await;
        if let Some(handle) = current.as_ref() {
            return Ok(handle.clone());
        }

        if let Some(handle) = self.reconcile().await? {
            log::info!("Adopted remote session {}", handle.session_id);
            *current = Some(handle.clone());
            return Ok(handle);
        }

        let created = bounded(
            self.call_timeout,
            self.backend.create_session(&self.session_config),
        )
        .await?;
        let info = match created {
            RemoteReply::Found(info) => info,
            RemoteReply::NotFound => {
                return Err(SessionError::Rejected("session endpoint not found".into()))
            }
            RemoteReply::BadSession(body) => return Err(SessionError::Rejected(body)),
            RemoteReply::Unexpected { status, body } => {
                return Err(SessionError::Rejected(format!("{status}: {body}")))
            }
        };

        let session_url = format!("/sessions/{}", info.id);
        let row_id = session_repo::insert(
            &self.db,
            &self.session_name,
            info.id,
            &session_url,
            &info.state,
            true,
        )?;
        session_repo::update_state(&self.db, row_id, &state_of(&info))?;

        log::info!("Started remote session {} ({})", info.id, info.state);
        let handle = SessionHandle {
            row_id,
            session_id: info.id,
            session_url,
        };
        *current = Some(handle.clone());
        Ok(handle)
    }

    /// Checks every row flagged active against the backend. The newest live
    /// one is kept; the rest are deactivated and, if still running, stopped.
    /// A row that cannot be checked counts as possibly live: it is retired
    /// when another live session is adopted, and otherwise blocks creating
    /// a new one.
    async fn reconcile(&self) -> Result<Option<SessionHandle>, SessionError> {
        let mut chosen = None;
        let mut unverified = Vec::new();
        for row in session_repo::active_sessions(&self.db)? {
            let reply = match bounded(self.call_timeout, self.backend.session_status(row.session_id))
                .await
            {
                Ok(reply) => reply,
                Err(e) if e.is_transient() => {
                    log::warn!("Could not verify session {}: {}", row.session_id, e);
                    unverified.push(row);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match reply {
                RemoteReply::Found(info) if is_live_session_state(&info.state) => {
                    if chosen.is_none() {
                        session_repo::update_state(&self.db, row.id, &state_of(&info))?;
                        chosen = Some(SessionHandle {
                            row_id: row.id,
                            session_id: row.session_id,
                            session_url: row.session_url.clone(),
                        });
                    } else {
                        self.retire(&row).await?;
                    }
                }
                RemoteReply::Found(info) => {
                    session_repo::deactivate(&self.db, row.id, &info.state)?;
                }
                RemoteReply::NotFound | RemoteReply::BadSession(_) => {
                    session_repo::deactivate(&self.db, row.id, "gone")?;
                }
                RemoteReply::Unexpected { status, .. } => {
                    log::warn!(
                        "Unexpected status {} verifying session {}",
                        status,
                        row.session_id
                    );
                    unverified.push(row);
                }
            }
        }

        match chosen {
            Some(handle) => {
                for row in &unverified {
                    self.retire(row).await?;
                }
                Ok(Some(handle))
            }
            None if !unverified.is_empty() => Err(SessionError::Unverified(
                unverified.iter().map(|row| row.session_id).collect(),
            )),
            None => Ok(None),
        }
    }

    /// Stops a session other than the adopted one and deactivates its row.
    /// A failed stop is logged; the row is deactivated regardless.
    async fn retire(&self, row: &SessionRow) -> Result<(), SessionError> {
        log::warn!("Stopping surplus remote session {}", row.session_id);
        if let Err(e) = bounded(self.call_timeout, self.backend.stop_session(row.session_id)).await
        {
            log::warn!("Failed to stop session {}: {}", row.session_id, e);
        }
        session_repo::deactivate(&self.db, row.id, "stopped")?;
        Ok(())
    }

    /// Re-reads the current session from the backend. A session that is
    /// gone or no longer live is dropped, so the next `acquire` replaces it.
    pub async fn refresh(&self) -> Result<Option<SessionState>, SessionError> {
        let mut current = self.current.lock().await;
        let Some(handle) = current.clone() else {
            return Ok(None);
        };

        match bounded(self.call_timeout, self.backend.session_status(handle.session_id)).await? {
            RemoteReply::Found(info) => {
                let state = state_of(&info);
                session_repo::update_state(&self.db, handle.row_id, &state)?;
                if !state.active {
                    log::info!("Remote session {} is {}", handle.session_id, info.state);
                    *current = None;
                }
                Ok(Some(state))
            }
            RemoteReply::NotFound => {
                log::info!("Remote session {} is gone", handle.session_id);
                session_repo::deactivate(&self.db, handle.row_id, "gone")?;
                *current = None;
                Ok(Some(SessionState {
                    status: "gone".to_string(),
                    active: false,
                    ..Default::default()
                }))
            }
            RemoteReply::BadSession(body) | RemoteReply::Unexpected { body, .. } => {
                log::warn!(
                    "Ambiguous response refreshing session {}: {}",
                    handle.session_id,
                    body
                );
                Ok(None)
            }
        }
    }

    /// Stops the current session. Returns false if there was none.
    pub async fn release(&self) -> Result<bool, SessionError> {
        let mut current = self.current.lock().await;
        let Some(handle) = current.take() else {
            return Ok(false);
        };

        match bounded(self.call_timeout, self.backend.stop_session(handle.session_id)).await {
            Ok(RemoteReply::Found(())) | Ok(RemoteReply::NotFound) => {}
            Ok(other) => log::warn!(
                "Unexpected reply stopping session {}: {:?}",
                handle.session_id,
                other
            ),
            Err(e) => log::warn!("Failed to stop session {}: {}", handle.session_id, e),
        }
        session_repo::deactivate(&self.db, handle.row_id, "stopped")?;
        log::info!("Released remote session {}", handle.session_id);
        Ok(true)
    }
}

fn state_of(info: &SessionInfo) -> SessionState {
    SessionState {
        status: info.state.clone(),
        active: is_live_session_state(&info.state),
        app_id: info.app_id.clone(),
        driver_log_url: info.app_info.driver_log_url.clone(),
        spark_ui_url: info.app_info.spark_ui_url.clone(),
    }
}
