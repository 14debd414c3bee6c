//! Data exchanged with the remote compute backend.

use serde::{Deserialize, Serialize};

/// Outcome of a remote call that reached the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteReply<T> {
    Found(T),
    /// 404: the session or statement no longer exists.
    NotFound,
    /// 400: the backend rejected the session the call referred to.
    BadSession(String),
    /// Any other status code.
    Unexpected { status: u16, body: String },
}

impl<T> RemoteReply<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteReply<U> {
        match self {
            RemoteReply::Found(v) => RemoteReply::Found(f(v)),
            RemoteReply::NotFound => RemoteReply::NotFound,
            RemoteReply::BadSession(body) => RemoteReply::BadSession(body),
            RemoteReply::Unexpected { status, body } => RemoteReply::Unexpected { status, body },
        }
    }
}

/// Session as reported by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: i64,
    pub state: String,
    #[serde(default, rename = "appId")]
    pub app_id: Option<String>,
    #[serde(default, rename = "appInfo")]
    pub app_info: AppInfo,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde(default, rename = "driverLogUrl")]
    pub driver_log_url: Option<String>,
    #[serde(default, rename = "sparkUiUrl")]
    pub spark_ui_url: Option<String>,
}

/// A freshly submitted statement. `handle` is where its status lives.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedStatement {
    pub id: i64,
    pub state: String,
    pub handle: String,
}

/// Statement state as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementInfo {
    pub id: i64,
    pub state: String,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
}

/// Code submitted as one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPayload {
    pub code: String,
}
