//! In-memory search index for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{SearchError, SearchIndex};

/// Index name -> source job id of each document.
#[derive(Default)]
pub(crate) struct FakeSearchIndex {
    pub indices: Mutex<HashMap<String, Vec<i64>>>,
    pub fail: Mutex<bool>,
}

impl FakeSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_documents(&self, index: &str, job_id: i64, count: usize) {
        self.indices
            .lock()
            .unwrap()
            .entry(index.to_string())
            .or_default()
            .extend(std::iter::repeat(job_id).take(count));
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.indices.lock().unwrap().contains_key(index)
    }

    fn check(&self) -> Result<(), SearchError> {
        if *self.fail.lock().unwrap() {
            return Err(SearchError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for FakeSearchIndex {
    async fn delete_index(&self, index: &str) -> Result<bool, SearchError> {
        self.check()?;
        Ok(self.indices.lock().unwrap().remove(index).is_some())
    }

    async fn delete_by_job(&self, index: &str, job_id: i64) -> Result<u64, SearchError> {
        self.check()?;
        let mut indices = self.indices.lock().unwrap();
        let Some(docs) = indices.get_mut(index) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|j| *j != job_id);
        Ok((before - docs.len()) as u64)
    }

    async fn count(&self, index: &str) -> Result<Option<u64>, SearchError> {
        self.check()?;
        Ok(self
            .indices
            .lock()
            .unwrap()
            .get(index)
            .map(|docs| docs.len() as u64))
    }
}
