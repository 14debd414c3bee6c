//! Isolated orchestrator for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use harvestline::db::record_repo::{self, NewRecord};
use harvestline::db::hierarchy_repo;
use harvestline::{load_config_from_str, Database, Orchestrator};

use super::fakes::{FakeBackend, FakeSearchIndex};

pub struct TestEnv {
    /// Storage root; removed on drop.
    pub temp_dir: TempDir,
    pub db: Database,
    pub backend: Arc<FakeBackend>,
    pub search: Arc<FakeSearchIndex>,
    pub orchestrator: Orchestrator,
    pub organization: i64,
    pub record_group: i64,
}

impl TestEnv {
    /// An orchestrator with one organization and record group.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = load_config_from_str(
            &serde_json::json!({
                "version": "1.0",
                "storage": { "root": temp_dir.path().join("storage").to_string_lossy() },
                "remote": { "poll_timeout_secs": 1, "request_timeout_secs": 2 },
                "supervisor": { "max_concurrent_polls": 4 }
            })
            .to_string(),
        )
        .expect("Failed to load test config");

        let db = Database::open_in_memory().expect("Failed to create test database");
        let backend = Arc::new(FakeBackend::new());
        let search = Arc::new(FakeSearchIndex::new());
        let orchestrator =
            Orchestrator::with_backends(db.clone(), backend.clone(), search.clone(), &config);

        let organization = hierarchy_repo::insert_organization(&db, "Library", "Test library")
            .expect("Failed to insert organization");
        let record_group = hierarchy_repo::insert_record_group(&db, organization, "Maps", None)
            .expect("Failed to insert record group");

        Self {
            temp_dir,
            db,
            backend,
            search,
            orchestrator,
            organization,
            record_group,
        }
    }

    /// Same as `new`, with a session already acquired.
    pub async fn with_session() -> Self {
        let env = Self::new();
        env.orchestrator
            .start_session()
            .await
            .expect("Failed to start session");
        env
    }

    /// Remote handle the dispatcher stored for `job_id`.
    pub fn handle_of(&self, job_id: i64) -> String {
        self.orchestrator
            .job(job_id)
            .expect("job")
            .remote_handle
            .expect("job was not submitted")
    }

    /// Inserts one successful record per id into `job_id`.
    pub fn add_records(&self, job_id: i64, record_ids: &[&str]) -> Vec<i64> {
        record_ids
            .iter()
            .map(|rid| {
                record_repo::insert(
                    &self.db,
                    job_id,
                    &NewRecord {
                        record_id: rid,
                        success: true,
                        ..Default::default()
                    },
                )
                .expect("Failed to insert record")
            })
            .collect()
    }
}
