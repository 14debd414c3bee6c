use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::job::JobKind;

/// Orientation of edges in a lineage graph. Traversal always walks from
/// the seed job toward its inputs; only the edge direction differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Directionality {
    /// Edges point from an input job to the job that consumed it.
    #[default]
    Downstream,
    /// Edges point from a job to its input.
    Upstream,
}

impl Directionality {
    /// Orients the `job <- input` relation.
    pub(crate) fn orient(&self, job_id: i64, input_job_id: i64) -> (i64, i64) {
        match self {
            Directionality::Downstream => (input_job_id, job_id),
            Directionality::Upstream => (job_id, input_job_id),
        }
    }
}

impl fmt::Display for Directionality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directionality::Downstream => f.write_str("downstream"),
            Directionality::Upstream => f.write_str("upstream"),
        }
    }
}

impl FromStr for Directionality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "downstream" => Ok(Directionality::Downstream),
            "upstream" => Ok(Directionality::Upstream),
            other => Err(format!("unknown directionality '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageNode {
    pub id: i64,
    pub name: String,
    /// `None` for analysis jobs.
    pub record_group_id: Option<i64>,
    /// `None` for analysis jobs.
    pub org_id: Option<i64>,
    pub kind: JobKind,
    pub status: String,
    pub is_valid: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageEdge {
    /// `"<from>_to_<to>"`
    pub id: String,
    pub from: i64,
    pub to: i64,
}

impl LineageEdge {
    pub fn new(from: i64, to: i64) -> Self {
        Self {
            id: format!("{from}_to_{to}"),
            from,
            to,
        }
    }
}

/// Nodes ascending by id, edges ascending by `(from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct LineageGraph {
    pub nodes: Vec<LineageNode>,
    pub edges: Vec<LineageEdge>,
}

impl LineageGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: i64) -> Option<&LineageNode> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|i| &self.nodes[i])
    }

    pub fn has_edge(&self, from: i64, to: i64) -> bool {
        self.edges
            .binary_search_by_key(&(from, to), |e| (e.from, e.to))
            .is_ok()
    }
}
