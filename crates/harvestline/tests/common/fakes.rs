//! Scripted collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use harvestline::remote::{
    RemoteBackend, RemoteError, RemoteReply, SessionInfo, StatementInfo, StatementPayload,
    SubmittedStatement,
};
use harvestline::search::{SearchError, SearchIndex};

/// Remote backend whose answers are scripted per statement handle. Every
/// call is appended to a log.
#[derive(Default)]
pub struct FakeBackend {
    sessions: Mutex<HashMap<i64, String>>,
    statements: Mutex<HashMap<String, RemoteReply<StatementInfo>>>,
    calls: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    next_session: AtomicI64,
    next_statement: AtomicI64,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, handle: &str, state: &str) {
        self.set_reply(
            handle,
            RemoteReply::Found(StatementInfo {
                id: 0,
                state: state.to_string(),
                output: None,
            }),
        );
    }

    pub fn set_reply(&self, handle: &str, reply: RemoteReply<StatementInfo>) {
        self.statements
            .lock()
            .unwrap()
            .insert(handle.to_string(), reply);
    }

    /// Delays every statement call by `delay`.
    pub fn stall(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn kill_session(&self, id: i64) {
        self.sessions.lock().unwrap().insert(id, "dead".to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
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
        self.log(format!("create_session {id}"));
        self.sessions.lock().unwrap().insert(id, "idle".to_string());
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
        Ok(match self.sessions.lock().unwrap().get(&session_id) {
            Some(state) => RemoteReply::Found(SessionInfo {
                id: session_id,
                state: state.clone(),
                ..Default::default()
            }),
            None => RemoteReply::NotFound,
        })
    }

    async fn stop_session(&self, session_id: i64) -> Result<RemoteReply<()>, RemoteError> {
        self.log(format!("stop_session {session_id}"));
        self.sessions.lock().unwrap().remove(&session_id);
        Ok(RemoteReply::Found(()))
    }

    async fn submit_statement(
        &self,
        session_id: i64,
        payload: &StatementPayload,
    ) -> Result<RemoteReply<SubmittedStatement>, RemoteError> {
        self.maybe_wait().await;
        if !self.sessions.lock().unwrap().contains_key(&session_id) {
            return Ok(RemoteReply::NotFound);
        }
        let id = self.next_statement.fetch_add(1, Ordering::SeqCst);
        let handle = format!("/sessions/{session_id}/statements/{id}");
        self.log(format!("submit_statement {session_id} {}", payload.code.len()));
        self.set_state(&handle, "waiting");
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
            .statements
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .unwrap_or(RemoteReply::NotFound))
    }

    async fn cancel_statement(&self, handle: &str) -> Result<RemoteReply<()>, RemoteError> {
        self.log(format!("cancel_statement {handle}"));
        self.set_state(handle, "cancelled");
        Ok(RemoteReply::Found(()))
    }
}

/// Search index holding, per index name, the source job id of each
/// document.
#[derive(Default)]
pub struct FakeSearchIndex {
    indices: Mutex<HashMap<String, Vec<i64>>>,
}

impl FakeSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_documents(&self, index: &str, job_id: i64, count: usize) {
        self.indices
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default()
            .extend(std::iter::repeat(job_id).take(count));
    }

    pub fn documents(&self, index: &str) -> Option<Vec<i64>> {
        self.indices.lock().unwrap().get(index).cloned()
    }
}

#[async_trait]
impl SearchIndex for FakeSearchIndex {
    async fn delete_index(&self, index: &str) -> Result<bool, SearchError> {
        Ok(self.indices.lock().unwrap().remove(index).is_some())
    }

    async fn delete_by_job(&self, index: &str, job_id: i64) -> Result<u64, SearchError> {
        let mut indices = self.indices.lock().unwrap();
        let Some(docs) = indices.get_mut(index) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|j| *j != job_id);
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, index: &str) -> Result<Option<u64>, SearchError> {
        Ok(self
            .indices
            .lock()
            .unwrap()
            .get(index)
            .map(|d| d.len() as u64))
    }
}
