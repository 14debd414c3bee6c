//! Shared test utilities for harvestline integration tests.
//!
//! This module provides:
//! - In-process fakes of the remote backend and the search index
//! - `TestEnv`, an orchestrator over an in-memory database and a temp
//!   storage root
//! - Builders for job requests

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use harness::TestEnv;
