//! Statement code submitted to the remote backend for each job kind.

use super::kind::JobKind;
use super::spec::JobSpec;
use crate::remote::StatementPayload;

/// One `<Entry>.spark_function(...)` call with keyword arguments.
struct EntryCall {
    entry: &'static str,
    with_context: bool,
    args: Vec<(&'static str, String)>,
}

impl EntryCall {
    fn new(kind: JobKind) -> Self {
        Self {
            entry: kind.remote_entry_point(),
            with_context: matches!(kind, JobKind::Merge | JobKind::Analysis),
            args: Vec::new(),
        }
    }

    fn arg(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.args.push((name, value.into()));
        self
    }

    fn ids(self, name: &'static str, ids: &[i64]) -> Self {
        self.arg(name, id_list(ids))
    }

    fn render(&self) -> String {
        let mut call = format!(
            "from jobs import {entry}\n{entry}.spark_function(spark",
            entry = self.entry
        );
        if self.with_context {
            call.push_str(", sc");
        }
        for (name, value) in &self.args {
            call.push_str(&format!(", {}={}", name, quote(value)));
        }
        call.push(')');
        call
    }
}

fn id_list(ids: &[i64]) -> String {
    let items: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// A double-quoted literal with every control character escaped. JSON
/// string escapes are a subset of Python's.
fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Builds the statement for `spec` once its job row exists as `job_id`.
pub fn build_payload(spec: &JobSpec, job_id: i64) -> StatementPayload {
    let call = EntryCall::new(spec.kind());
    let call = match spec {
        JobSpec::HarvestOai { params, .. } => call
            .arg("endpoint", params.endpoint.as_str())
            .arg("verb", params.verb.as_str())
            .arg("metadataPrefix", params.metadata_prefix.as_str())
            .arg("scope_type", params.scope_type.as_str())
            .arg("scope_value", params.scope_value.as_str())
            .arg("job_id", job_id.to_string())
            .arg("index_mapper", params.index_mapper.as_str())
            .ids("validation_scenarios", &params.validation_scenarios),
        JobSpec::HarvestStaticXml { params, .. } => call
            .arg("static_type", params.static_type.as_str())
            .arg("static_payload", params.static_payload.as_str())
            .arg("xpath_document_root", params.xpath_document_root.as_str())
            .arg("xpath_record_id", params.xpath_record_id.as_str())
            .arg("job_id", job_id.to_string())
            .arg("index_mapper", params.index_mapper.as_str())
            .ids("validation_scenarios", &params.validation_scenarios),
        JobSpec::Transform { params, .. } => call
            .arg("transformation_id", params.transformation_id.to_string())
            .arg("input_job_id", params.input_job_id.to_string())
            .arg("job_id", job_id.to_string())
            .arg("index_mapper", params.index_mapper.as_str())
            .ids("validation_scenarios", &params.validation_scenarios),
        JobSpec::Merge { params, .. } => call
            .ids("input_jobs_ids", &spec.input_job_ids())
            .arg("job_id", job_id.to_string())
            .arg("index_mapper", params.index_mapper.as_str())
            .ids("validation_scenarios", &params.validation_scenarios),
        JobSpec::Analysis { params } => call
            .ids("input_jobs_ids", &spec.input_job_ids())
            .arg("job_id", job_id.to_string())
            .arg("index_mapper", params.index_mapper.as_str())
            .ids("validation_scenarios", &params.validation_scenarios),
        JobSpec::Publish { params, .. } => call
            .arg("input_job_id", params.input_job_id.to_string())
            .arg("job_id", job_id.to_string()),
    };

    StatementPayload {
        code: call.render(),
    }
}
