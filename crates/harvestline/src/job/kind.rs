use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    HarvestOai,
    HarvestStaticXml,
    Transform,
    Merge,
    Publish,
    Analysis,
}

/// Reporting category a kind rolls up to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobFamily {
    Harvest,
    Transform,
    Merge,
    Publish,
}

impl JobKind {
    pub const ALL: [JobKind; 6] = [
        JobKind::HarvestOai,
        JobKind::HarvestStaticXml,
        JobKind::Transform,
        JobKind::Merge,
        JobKind::Publish,
        JobKind::Analysis,
    ];

    /// Name stored in `jobs.kind` and used in default job names and
    /// output paths.
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::HarvestOai => "HarvestOAIJob",
            JobKind::HarvestStaticXml => "HarvestStaticXMLJob",
            JobKind::Transform => "TransformJob",
            JobKind::Merge => "MergeJob",
            JobKind::Publish => "PublishJob",
            JobKind::Analysis => "AnalysisJob",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.label() == label)
    }

    pub fn family(&self) -> JobFamily {
        match self {
            JobKind::HarvestOai | JobKind::HarvestStaticXml => JobFamily::Harvest,
            JobKind::Transform => JobFamily::Transform,
            JobKind::Merge | JobKind::Analysis => JobFamily::Merge,
            JobKind::Publish => JobFamily::Publish,
        }
    }

    /// Remote entry point the statement code imports.
    pub(crate) fn remote_entry_point(&self) -> &'static str {
        match self {
            JobKind::HarvestOai => "HarvestOAISpark",
            JobKind::HarvestStaticXml => "HarvestStaticXMLSpark",
            JobKind::Transform => "TransformSpark",
            JobKind::Merge | JobKind::Analysis => "MergeSpark",
            JobKind::Publish => "PublishSpark",
        }
    }

    /// Whether jobs of this kind can run without input jobs.
    pub fn is_harvest(&self) -> bool {
        self.family() == JobFamily::Harvest
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("unknown job kind '{s}'"))
    }
}
