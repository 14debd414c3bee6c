use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::{SearchError, SearchIndex};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct DeleteByQueryResponse {
    #[serde(default)]
    deleted: u64,
}

/// Elasticsearch-compatible REST client.
pub struct HttpSearchIndex {
    client: Client,
    base_url: String,
}

impl HttpSearchIndex {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, SearchError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| SearchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, SearchError> {
        request
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))
    }
}

async fn status_error(response: Response) -> SearchError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    body.truncate(MAX_ERROR_BODY_LENGTH);
    SearchError::Status { status, body }
}

/// Every indexed document carries the id of the job that produced it in
/// `source_job_id`.
fn delete_by_job_query(job_id: i64) -> serde_json::Value {
    serde_json::json!({
        "query": { "match": { "source_job_id": job_id } }
    })
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn delete_index(&self, index: &str) -> Result<bool, SearchError> {
        let response = self.send(self.client.delete(self.url(index))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => {
                log::debug!("Deleted search index {}", index);
                Ok(true)
            }
            _ => Err(status_error(response).await),
        }
    }

    async fn delete_by_job(&self, index: &str, job_id: i64) -> Result<u64, SearchError> {
        let response = self
            .send(
                self.client
                    .post(self.url(&format!("{index}/_delete_by_query")))
                    .json(&delete_by_job_query(job_id)),
            )
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(0),
            s if s.is_success() => {
                let body = response
                    .json::<DeleteByQueryResponse>()
                    .await
                    .map_err(|e| SearchError::Decode(e.to_string()))?;
                Ok(body.deleted)
            }
            _ => Err(status_error(response).await),
        }
    }

    async fn count(&self, index: &str) -> Result<Option<u64>, SearchError> {
        let response = self
            .send(self.client.get(self.url(&format!("{index}/_count"))))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let body = response
                    .json::<CountResponse>()
                    .await
                    .map_err(|e| SearchError::Decode(e.to_string()))?;
                Ok(Some(body.count))
            }
            _ => Err(status_error(response).await),
        }
    }
}
