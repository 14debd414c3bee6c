//! Scripted in-process backend for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::client::RemoteBackend;
use super::error::RemoteError;
use super::types::{RemoteReply, SessionInfo, StatementInfo, StatementPayload, SubmittedStatement};

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub session_replies: Mutex<HashMap<i64, RemoteReply<SessionInfo>>>,
    pub statement_replies: Mutex<HashMap<String, RemoteReply<StatementInfo>>>,
    pub submissions: Mutex<Vec<(i64, StatementPayload)>>,
    pub calls: Mutex<Vec<String>>,
    pub delay: Mutex<Option<Duration>>,
    /// Sessions whose status and stop calls fail with a transport error.
    pub unreachable_sessions: Mutex<HashSet<i64>>,
    next_session: AtomicI64,
    next_statement: AtomicI64,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_session(&self, id: i64, state: &str) {
        self.session_replies.lock().unwrap().insert(
            id,
            RemoteReply::Found(SessionInfo {
                id,
                state: state.to_string(),
                ..Default::default()
            }),
        );
    }

    pub fn set_statement(&self, handle: &str, reply: RemoteReply<StatementInfo>) {
        self.statement_replies
            .lock()
            .unwrap()
            .insert(handle.to_string(), reply);
    }

    pub fn set_statement_state(&self, handle: &str, state: &str) {
        self.set_statement(
            handle,
            RemoteReply::Found(StatementInfo {
                id: 0,
                state: state.to_string(),
                output: None,
            }),
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_reachable(&self, session_id: i64) -> Result<(), RemoteError> {
        if self.unreachable_sessions.lock().unwrap().contains(&session_id) {
            return Err(RemoteError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    async fn maybe_wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl RemoteBackend for FakeBackend {
    async fn create_session(
        &self,
        _config: &serde_json::Value,
    ) -> Result<RemoteReply<SessionInfo>, RemoteError> {
        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        self.log(format!("create_session -> {id}"));
        self.set_session(id, "idle");
        Ok(RemoteReply::Found(SessionInfo {
            id,
            state: "starting".to_string(),
            ..Default::default()
        }))
    }

    async fn session_status(
        &self,
        session_id: i64,
    ) -> Result<RemoteReply<SessionInfo>, RemoteError> {
        self.log(format!("session_status {session_id}"));
        self.check_reachable(session_id)?;
        Ok(self
            .session_replies
            .lock()
            .unwrap()
            .get(&session_id)
            .cloned()
            .unwrap_or(RemoteReply::NotFound))
    }

    async fn stop_session(&self, session_id: i64) -> Result<RemoteReply<()>, RemoteError> {
        self.log(format!("stop_session {session_id}"));
        self.check_reachable(session_id)?;
        self.session_replies.lock().unwrap().remove(&session_id);
        Ok(RemoteReply::Found(()))
    }

    async fn submit_statement(
        &self,
        session_id: i64,
        payload: &StatementPayload,
    ) -> Result<RemoteReply<SubmittedStatement>, RemoteError> {
        self.maybe_wait().await;
        let id = self.next_statement.fetch_add(1, Ordering::SeqCst);
        let handle = format!("/sessions/{session_id}/statements/{id}");
        self.log(format!("submit_statement {session_id}"));
        self.submissions
            .lock()
            .unwrap()
            .push((session_id, payload.clone()));
        self.set_statement_state(&handle, "waiting");
        Ok(RemoteReply::Found(SubmittedStatement {
            id,
            state: "waiting".to_string(),
            handle,
        }))
    }

    async fn statement_status(
        &self,
        handle: &str,
    ) -> Result<RemoteReply<StatementInfo>, RemoteError> {
        self.maybe_wait().await;
        self.log(format!("statement_status {handle}"));
        Ok(self
            .statement_replies
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .unwrap_or(RemoteReply::NotFound))
    }

    async fn cancel_statement(&self, handle: &str) -> Result<RemoteReply<()>, RemoteError> {
        self.log(format!("cancel_statement {handle}"));
        self.set_statement_state(handle, "cancelled");
        Ok(RemoteReply::Found(()))
    }
}
