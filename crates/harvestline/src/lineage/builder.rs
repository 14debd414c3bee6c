//! Lineage graph construction.
//!
//! Starting from a seed job, the builder walks input edges until it runs
//! out of inputs. Nodes are keyed by job id and edges by their ordered
//! endpoint pair, so a job or edge reached along several paths appears
//! once. Missing jobs are left out; they never fail the build.

use std::collections::{BTreeMap, HashSet};

use super::graph::{Directionality, LineageEdge, LineageGraph, LineageNode};
use super::LineageError;
use crate::db::job_repo::{self, JobFilter, JobRow};
use crate::db::{edge_repo, Database};
use crate::job::{Job, JobKind};
use crate::validation::ValidationRollup;

/// Which jobs seed [`LineageBuilder::build_for_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineageFilter {
    All,
    Organization(i64),
    RecordGroup(i64),
    Jobs(Vec<i64>),
}

impl LineageFilter {
    fn job_filter(&self) -> JobFilter {
        let mut filter = JobFilter {
            exclude_kind: Some(JobKind::Analysis.label().to_string()),
            ..Default::default()
        };
        match self {
            LineageFilter::All => {}
            LineageFilter::Organization(id) => filter.organization_id = Some(*id),
            LineageFilter::RecordGroup(id) => filter.record_group_id = Some(*id),
            LineageFilter::Jobs(ids) => filter.ids = Some(ids.clone()),
        }
        filter
    }
}

/// Accumulates nodes and edges across one or more walks.
#[derive(Default)]
struct Walk {
    visited: HashSet<i64>,
    nodes: BTreeMap<i64, LineageNode>,
    edges: BTreeMap<(i64, i64), LineageEdge>,
}

impl Walk {
    fn into_graph(self) -> LineageGraph {
        let nodes = self.nodes;
        let edges = self
            .edges
            .into_values()
            .filter(|e| nodes.contains_key(&e.from) && nodes.contains_key(&e.to))
            .collect();
        LineageGraph {
            nodes: nodes.into_values().collect(),
            edges,
        }
    }
}

#[derive(Clone)]
pub struct LineageBuilder {
    db: Database,
    rollup: ValidationRollup,
}

impl LineageBuilder {
    pub fn new(db: Database) -> Self {
        Self {
            rollup: ValidationRollup::new(db.clone()),
            db,
        }
    }

    /// Lineage of one job: the job and every job it transitively reads
    /// from. Empty if the job does not exist.
    pub fn build(
        &self,
        job_id: i64,
        directionality: Directionality,
    ) -> Result<LineageGraph, LineageError> {
        let mut walk = Walk::default();
        self.walk_from(job_id, directionality, &mut walk)?;
        Ok(walk.into_graph())
    }

    /// Union of the lineages of every job matching `filter`. Analysis
    /// jobs are not used as seeds.
    pub fn build_for_all(
        &self,
        filter: &LineageFilter,
        directionality: Directionality,
    ) -> Result<LineageGraph, LineageError> {
        let seeds = job_repo::query(&self.db, &filter.job_filter())?;
        log::debug!("Building lineage for {} seed jobs", seeds.len());

        let mut walk = Walk::default();
        for seed in seeds {
            self.walk_from(seed.id, directionality, &mut walk)?;
        }
        Ok(walk.into_graph())
    }

    fn walk_from(
        &self,
        seed: i64,
        directionality: Directionality,
        walk: &mut Walk,
    ) -> Result<(), LineageError> {
        if !walk.visited.insert(seed) {
            return Ok(());
        }
        let mut stack = vec![seed];

        while let Some(job_id) = stack.pop() {
            let Some(row) = job_repo::find_by_id(&self.db, job_id)? else {
                continue;
            };
            walk.nodes.insert(job_id, self.node(row)?);

            for input in edge_repo::inputs_of(&self.db, job_id)? {
                let (from, to) = directionality.orient(job_id, input);
                walk.edges
                    .entry((from, to))
                    .or_insert_with(|| LineageEdge::new(from, to));
                if walk.visited.insert(input) {
                    stack.push(input);
                }
            }
        }
        Ok(())
    }

    fn node(&self, row: JobRow) -> Result<LineageNode, LineageError> {
        let job = Job::try_from(row)?;
        let is_analysis = job.kind == JobKind::Analysis;
        let is_valid = self.rollup.verdict(job.id)?.verdict;

        Ok(LineageNode {
            id: job.id,
            name: job.name,
            record_group_id: (!is_analysis).then_some(job.record_group_id),
            org_id: (!is_analysis).then_some(job.organization_id),
            kind: job.kind,
            status: job.status.to_string(),
            is_valid,
            deleted: job.deleted,
        })
    }
}
