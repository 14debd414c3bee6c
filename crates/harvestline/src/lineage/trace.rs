//! Follows one record through the pipeline stages by its `record_id`.

use std::collections::HashSet;

use super::LineageError;
use crate::db::record_repo::{self, RecordRow};
use crate::db::{edge_repo, Database};

#[derive(Clone)]
pub struct RecordTracer {
    db: Database,
}

impl RecordTracer {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stages of the record stored under primary key `record_pk`, earliest
    /// first, the record itself included. Empty if there is no such record.
    ///
    /// With `input_only`, only the immediate upstream counterparts and the
    /// record are returned.
    pub fn trace(&self, record_pk: i64, input_only: bool) -> Result<Vec<RecordRow>, LineageError> {
        match record_repo::find_by_id(&self.db, record_pk)? {
            Some(record) => self.trace_from(record, input_only),
            None => Ok(Vec::new()),
        }
    }

    /// Like [`RecordTracer::trace`], starting from the first record of
    /// `job_id` carrying `record_id`.
    pub fn trace_in_job(
        &self,
        job_id: i64,
        record_id: &str,
        input_only: bool,
    ) -> Result<Vec<RecordRow>, LineageError> {
        match record_repo::find_in_job(&self.db, job_id, record_id)? {
            Some(record) => self.trace_from(record, input_only),
            None => Ok(Vec::new()),
        }
    }

    /// Recomputes `unique_published` over all published records. Returns
    /// the number of records that collide with another published record.
    pub fn update_published_uniqueness(&self) -> Result<usize, LineageError> {
        Ok(record_repo::update_published_uniqueness(&self.db)?)
    }

    fn trace_from(&self, record: RecordRow, input_only: bool) -> Result<Vec<RecordRow>, LineageError> {
        let mut seen = HashSet::from([record.id]);
        let mut stages = Vec::new();

        self.upstream(&record, !input_only, &mut seen, &mut stages)?;
        let record_job = record.job_id;
        let record_id = record.record_id.clone();
        stages.push(record);
        if !input_only {
            self.downstream(record_job, &record_id, &mut seen, &mut stages)?;
        }
        Ok(stages)
    }

    /// Pushes upstream counterparts of `record`, ancestors before
    /// descendants. A stage with no matching record ends that branch.
    fn upstream(
        &self,
        record: &RecordRow,
        recurse: bool,
        seen: &mut HashSet<i64>,
        stages: &mut Vec<RecordRow>,
    ) -> Result<(), LineageError> {
        for input in edge_repo::inputs_of(&self.db, record.job_id)? {
            let Some(found) = record_repo::find_in_job(&self.db, input, &record.record_id)? else {
                continue;
            };
            if !seen.insert(found.id) {
                continue;
            }
            if recurse {
                self.upstream(&found, true, seen, stages)?;
            }
            stages.push(found);
        }
        Ok(())
    }

    fn downstream(
        &self,
        job_id: i64,
        record_id: &str,
        seen: &mut HashSet<i64>,
        stages: &mut Vec<RecordRow>,
    ) -> Result<(), LineageError> {
        for consumer in edge_repo::consumers_of(&self.db, job_id)? {
            let Some(found) = record_repo::find_in_job(&self.db, consumer, record_id)? else {
                continue;
            };
            if !seen.insert(found.id) {
                continue;
            }
            let found_job = found.job_id;
            stages.push(found);
            self.downstream(found_job, record_id, seen, stages)?;
        }
        Ok(())
    }
}
