use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Falls back to `~/.harvestline/data/harvestline.db` when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        match &self.path {
            Some(p) => Some(PathBuf::from(p)),
            None => crate::db::default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_session_name")]
    pub session_name: String,
    /// Passed verbatim as the body of the session creation request.
    #[serde(default = "default_session_config")]
    pub session: serde_json::Value,
}

fn default_remote_url() -> String {
    "http://localhost:8998".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_poll_timeout() -> u64 {
    10
}

fn default_session_name() -> String {
    "harvestline".to_string()
}

fn default_session_config() -> serde_json::Value {
    serde_json::json!({ "kind": "pyspark" })
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_url(),
            request_timeout_secs: default_request_timeout(),
            poll_timeout_secs: default_poll_timeout(),
            session_name: default_session_name(),
            session: default_session_config(),
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub base_url: String,
    #[serde(default = "default_published_index")]
    pub published_index: String,
}

fn default_search_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_published_index() -> String {
    "published".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
            published_index: default_published_index(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: String,
}

fn default_storage_root() -> String {
    dirs::home_dir()
        .map(|h| h.join(".harvestline").join("storage"))
        .unwrap_or_else(|| PathBuf::from(".harvestline-storage"))
        .to_string_lossy()
        .into_owned()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// Names of the hidden organization and record group that hold analysis
/// jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_org")]
    pub organization: String,
    #[serde(default = "default_analysis_record_group")]
    pub record_group: String,
}

fn default_analysis_org() -> String {
    "AnalysisOrganization".to_string()
}

fn default_analysis_record_group() -> String {
    "AnalysisRecordGroup".to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            organization: default_analysis_org(),
            record_group: default_analysis_record_group(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_concurrent_polls")]
    pub max_concurrent_polls: usize,
}

fn default_poll_interval() -> u64 {
    15
}

fn default_max_concurrent_polls() -> usize {
    num_cpus::get() * 4
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_concurrent_polls: default_max_concurrent_polls(),
        }
    }
}

impl SupervisorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
