//! Jobs: kinds, status vocabulary, persisted model, creation requests and
//! the dispatcher that turns a request into a submitted job.

pub mod dispatcher;
pub mod error;
pub mod kind;
pub mod model;
pub mod payload;
pub mod spec;
pub mod status;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use kind::{JobFamily, JobKind};
pub use model::Job;
pub use payload::build_payload;
pub use spec::{
    AnalysisParams, HarvestOaiParams, HarvestStaticXmlParams, JobSpec, JobTarget, MergeParams,
    PublishParams, StaticSource, TransformParams,
};
pub use status::JobStatus;
