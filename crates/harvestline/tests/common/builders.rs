//! Builders for job requests.

#![allow(dead_code)]

use harvestline::job::{
    AnalysisParams, HarvestOaiParams, JobSpec, JobTarget, MergeParams, PublishParams,
    TransformParams,
};

fn target(record_group_id: i64, name: &str) -> JobTarget {
    JobTarget {
        record_group_id,
        name: Some(name.to_string()),
        note: None,
    }
}

pub fn harvest(record_group_id: i64) -> JobSpec {
    harvest_validated(record_group_id, vec![])
}

pub fn harvest_validated(record_group_id: i64, validation_scenarios: Vec<i64>) -> JobSpec {
    JobSpec::HarvestOai {
        target: target(record_group_id, "harvest"),
        params: HarvestOaiParams {
            endpoint: "http://repository.example.org/oai".to_string(),
            verb: "ListRecords".to_string(),
            metadata_prefix: "mods".to_string(),
            scope_type: "harvestAllSets".to_string(),
            scope_value: "true".to_string(),
            index_mapper: "GenericMapper".to_string(),
            validation_scenarios,
        },
    }
}

pub fn transform(record_group_id: i64, input_job_id: i64, transformation_id: i64) -> JobSpec {
    JobSpec::Transform {
        target: target(record_group_id, "transform"),
        params: TransformParams {
            input_job_id,
            transformation_id,
            index_mapper: "GenericMapper".to_string(),
            validation_scenarios: vec![],
        },
    }
}

pub fn merge(record_group_id: i64, input_job_ids: Vec<i64>) -> JobSpec {
    JobSpec::Merge {
        target: target(record_group_id, "merge"),
        params: MergeParams {
            input_job_ids,
            index_mapper: "GenericMapper".to_string(),
            validation_scenarios: vec![],
        },
    }
}

pub fn publish(record_group_id: i64, input_job_id: i64, publish_set_id: Option<&str>) -> JobSpec {
    JobSpec::Publish {
        target: target(record_group_id, "publish"),
        params: PublishParams {
            input_job_id,
            publish_set_id: publish_set_id.map(str::to_string),
        },
    }
}

pub fn analysis(input_job_ids: Vec<i64>) -> JobSpec {
    JobSpec::Analysis {
        params: AnalysisParams {
            name: None,
            note: None,
            input_job_ids,
            index_mapper: "GenericMapper".to_string(),
            validation_scenarios: vec![],
        },
    }
}
