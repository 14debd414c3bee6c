use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestlineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Remote backend error: {0}")]
    Remote(#[from] crate::remote::RemoteError),

    #[error("Remote session error: {0}")]
    Session(#[from] crate::remote::SessionError),

    #[error("Job creation failed: {0}")]
    Dispatch(#[from] crate::job::DispatchError),

    #[error("Job supervision failed: {0}")]
    Supervisor(#[from] crate::lifecycle::SupervisorError),

    #[error("Job deletion failed: {0}")]
    Cascade(#[from] crate::lifecycle::CascadeError),

    #[error("Lineage query failed: {0}")]
    Lineage(#[from] crate::lineage::LineageError),

    #[error("Search index error: {0}")]
    Search(#[from] crate::search::SearchError),

    #[error("Validation roll-up failed: {0}")]
    Rollup(#[from] crate::validation::RollupError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Failed to set signal handler: {0}")]
    Signal(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to remove '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job output location is outside the storage root: {0}")]
    OutsideRoot(PathBuf),
}

pub type Result<T> = std::result::Result<T, HarvestlineError>;
