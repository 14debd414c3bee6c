//! Job lineage graphs and record stage tracing.

pub mod builder;
pub mod graph;
pub mod trace;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::validation::RollupError;

pub use builder::{LineageBuilder, LineageFilter};
pub use graph::{Directionality, LineageEdge, LineageGraph, LineageNode};
pub use trace::RecordTracer;

#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation roll-up failed: {0}")]
    Rollup(#[from] RollupError),
}
