//! HTTP adapter for the remote compute backend (Livy-style REST API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::error::RemoteError;
use super::types::{RemoteReply, SessionInfo, StatementInfo, StatementPayload, SubmittedStatement};

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest response body kept in `RemoteReply::Unexpected`.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Operations the core needs from the remote compute backend. Stateless:
/// callers pass session ids and statement handles explicitly.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn create_session(
        &self,
        config: &serde_json::Value,
    ) -> Result<RemoteReply<SessionInfo>, RemoteError>;

    async fn session_status(&self, session_id: i64)
        -> Result<RemoteReply<SessionInfo>, RemoteError>;

    async fn stop_session(&self, session_id: i64) -> Result<RemoteReply<()>, RemoteError>;

    async fn submit_statement(
        &self,
        session_id: i64,
        payload: &StatementPayload,
    ) -> Result<RemoteReply<SubmittedStatement>, RemoteError>;

    async fn statement_status(&self, handle: &str)
        -> Result<RemoteReply<StatementInfo>, RemoteError>;

    async fn cancel_statement(&self, handle: &str) -> Result<RemoteReply<()>, RemoteError>;
}

/// reqwest-backed [`RemoteBackend`].
pub struct HttpRemoteClient {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpRemoteClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    /// Statement handles are usually the relative `Location` the backend
    /// returned; absolute URLs are used as they are.
    fn resolve(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}/{}", self.base_url, path_or_url.trim_start_matches('/'))
        }
    }

    fn classify(&self, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout(self.request_timeout)
        } else if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }

    async fn reply<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<RemoteReply<T>, RemoteError> {
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let body = response.json::<T>().await.map_err(|e| self.classify(e))?;
                Ok(RemoteReply::Found(body))
            }
            status => Ok(failure_reply(status, response).await),
        }
    }

    async fn empty_reply(&self, response: Response) -> Result<RemoteReply<()>, RemoteError> {
        match response.status() {
            status if status.is_success() => Ok(RemoteReply::Found(())),
            status => Ok(failure_reply(status, response).await),
        }
    }
}

async fn failure_reply<T>(status: StatusCode, response: Response) -> RemoteReply<T> {
    let mut body = response.text().await.unwrap_or_default();
    body.truncate(MAX_ERROR_BODY_LENGTH);
    match status {
        StatusCode::NOT_FOUND => RemoteReply::NotFound,
        StatusCode::BAD_REQUEST => RemoteReply::BadSession(body),
        other => RemoteReply::Unexpected {
            status: other.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl RemoteBackend for HttpRemoteClient {
    async fn create_session(
        &self,
        config: &serde_json::Value,
    ) -> Result<RemoteReply<SessionInfo>, RemoteError> {
        log::debug!("Creating remote session at {}", self.base_url);
        let response = self
            .client
            .post(self.resolve("sessions"))
            .json(config)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        self.reply(response).await
    }

    async fn session_status(
        &self,
        session_id: i64,
    ) -> Result<RemoteReply<SessionInfo>, RemoteError> {
        let response = self
            .client
            .get(self.resolve(&format!("sessions/{session_id}")))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        self.reply(response).await
    }

    async fn stop_session(&self, session_id: i64) -> Result<RemoteReply<()>, RemoteError> {
        log::debug!("Stopping remote session {}", session_id);
        let response = self
            .client
            .delete(self.resolve(&format!("sessions/{session_id}")))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        self.empty_reply(response).await
    }

    async fn submit_statement(
        &self,
        session_id: i64,
        payload: &StatementPayload,
    ) -> Result<RemoteReply<SubmittedStatement>, RemoteError> {
        let response = self
            .client
            .post(self.resolve(&format!("sessions/{session_id}/statements")))
            .json(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let reply: RemoteReply<StatementInfo> = self.reply(response).await?;
        Ok(reply.map(|info| SubmittedStatement {
            handle: location
                .unwrap_or_else(|| format!("/sessions/{session_id}/statements/{}", info.id)),
            id: info.id,
            state: info.state,
        }))
    }

    async fn statement_status(
        &self,
        handle: &str,
    ) -> Result<RemoteReply<StatementInfo>, RemoteError> {
        let response = self
            .client
            .get(self.resolve(handle))
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        self.reply(response).await
    }

    async fn cancel_statement(&self, handle: &str) -> Result<RemoteReply<()>, RemoteError> {
        log::debug!("Cancelling remote statement {}", handle);
        let url = format!("{}/cancel", self.resolve(handle));
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        self.empty_reply(response).await
    }
}
