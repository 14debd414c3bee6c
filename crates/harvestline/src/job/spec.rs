//! Requests for new jobs, one parameter struct per kind.

use serde::{Deserialize, Serialize};

use super::kind::JobKind;

/// Where a new job lives and what it is called. A missing name gets the
/// default `"<Label> @ <timestamp>"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobTarget {
    pub record_group_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestOaiParams {
    pub endpoint: String,
    pub verb: String,
    pub metadata_prefix: String,
    pub scope_type: String,
    pub scope_value: String,
    pub index_mapper: String,
    #[serde(default)]
    pub validation_scenarios: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticSource {
    Upload,
    Location,
}

impl StaticSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaticSource::Upload => "upload",
            StaticSource::Location => "location",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestStaticXmlParams {
    pub static_type: StaticSource,
    pub static_payload: String,
    pub xpath_document_root: String,
    pub xpath_record_id: String,
    pub index_mapper: String,
    #[serde(default)]
    pub validation_scenarios: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    pub input_job_id: i64,
    pub transformation_id: i64,
    pub index_mapper: String,
    #[serde(default)]
    pub validation_scenarios: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeParams {
    pub input_job_ids: Vec<i64>,
    pub index_mapper: String,
    #[serde(default)]
    pub validation_scenarios: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishParams {
    pub input_job_id: i64,
    /// Written to the target record group when set.
    #[serde(default)]
    pub publish_set_id: Option<String>,
}

/// Analysis jobs go to the hidden analysis record group, so they only
/// carry a name and note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub input_job_ids: Vec<i64>,
    pub index_mapper: String,
    #[serde(default)]
    pub validation_scenarios: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSpec {
    HarvestOai {
        target: JobTarget,
        params: HarvestOaiParams,
    },
    HarvestStaticXml {
        target: JobTarget,
        params: HarvestStaticXmlParams,
    },
    Transform {
        target: JobTarget,
        params: TransformParams,
    },
    Merge {
        target: JobTarget,
        params: MergeParams,
    },
    Publish {
        target: JobTarget,
        params: PublishParams,
    },
    Analysis {
        params: AnalysisParams,
    },
}

impl JobSpec {
    pub fn kind(&self) -> JobKind {
        match self {
            JobSpec::HarvestOai { .. } => JobKind::HarvestOai,
            JobSpec::HarvestStaticXml { .. } => JobKind::HarvestStaticXml,
            JobSpec::Transform { .. } => JobKind::Transform,
            JobSpec::Merge { .. } => JobKind::Merge,
            JobSpec::Publish { .. } => JobKind::Publish,
            JobSpec::Analysis { .. } => JobKind::Analysis,
        }
    }

    /// `None` for analysis jobs, whose record group is provisioned.
    pub fn target(&self) -> Option<&JobTarget> {
        match self {
            JobSpec::HarvestOai { target, .. }
            | JobSpec::HarvestStaticXml { target, .. }
            | JobSpec::Transform { target, .. }
            | JobSpec::Merge { target, .. }
            | JobSpec::Publish { target, .. } => Some(target),
            JobSpec::Analysis { .. } => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            JobSpec::Analysis { params } => params.name.as_deref(),
            _ => self.target().and_then(|t| t.name.as_deref()),
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            JobSpec::Analysis { params } => params.note.as_deref(),
            _ => self.target().and_then(|t| t.note.as_deref()),
        }
    }

    /// Input jobs in the order given, duplicates removed.
    pub fn input_job_ids(&self) -> Vec<i64> {
        let ids: Vec<i64> = match self {
            JobSpec::HarvestOai { .. } | JobSpec::HarvestStaticXml { .. } => Vec::new(),
            JobSpec::Transform { params, .. } => vec![params.input_job_id],
            JobSpec::Merge { params, .. } => params.input_job_ids.clone(),
            JobSpec::Publish { params, .. } => vec![params.input_job_id],
            JobSpec::Analysis { params } => params.input_job_ids.clone(),
        };
        let mut seen = std::collections::HashSet::new();
        ids.into_iter().filter(|id| seen.insert(*id)).collect()
    }

    pub fn validation_scenarios(&self) -> &[i64] {
        match self {
            JobSpec::HarvestOai { params, .. } => &params.validation_scenarios,
            JobSpec::HarvestStaticXml { params, .. } => &params.validation_scenarios,
            JobSpec::Transform { params, .. } => &params.validation_scenarios,
            JobSpec::Merge { params, .. } => &params.validation_scenarios,
            JobSpec::Analysis { params } => &params.validation_scenarios,
            JobSpec::Publish { .. } => &[],
        }
    }

    pub fn index_mapper(&self) -> Option<&str> {
        match self {
            JobSpec::HarvestOai { params, .. } => Some(&params.index_mapper),
            JobSpec::HarvestStaticXml { params, .. } => Some(&params.index_mapper),
            JobSpec::Transform { params, .. } => Some(&params.index_mapper),
            JobSpec::Merge { params, .. } => Some(&params.index_mapper),
            JobSpec::Analysis { params } => Some(&params.index_mapper),
            JobSpec::Publish { .. } => None,
        }
    }
}
