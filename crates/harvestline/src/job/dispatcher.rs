//! Turns a [`JobSpec`] into a job row, its edges and bindings, and a
//! submitted remote statement.

use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use serde_json::json;
use tracing::Instrument;

use super::error::DispatchError;
use super::kind::JobKind;
use super::payload::build_payload;
use super::spec::JobSpec;
use crate::config::AnalysisConfig;
use crate::db::hierarchy_repo::{self, RecordGroupRow};
use crate::db::validation_repo::{self, TransformationRow};
use crate::db::{edge_repo, job_repo, now_timestamp, Database};
use crate::remote::{bounded, RemoteBackend, RemoteReply, SessionHandle};
use crate::storage::ArtifactStore;

const ANALYSIS_DESCRIPTION: &str = "For the explicit use of aggregating Analysis jobs";

pub struct Dispatcher {
    db: Database,
    backend: Arc<dyn RemoteBackend>,
    artifacts: ArtifactStore,
    analysis: AnalysisConfig,
    submit_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        db: Database,
        backend: Arc<dyn RemoteBackend>,
        artifacts: ArtifactStore,
        analysis: AnalysisConfig,
        submit_timeout: Duration,
    ) -> Self {
        Self {
            db,
            backend,
            artifacts,
            analysis,
            submit_timeout,
        }
    }

    /// Creates the job and submits it through `session`.
    ///
    /// Request validation and the analysis hierarchy lookup happen before
    /// anything is written. Once the row exists, a missing session or a
    /// failed submission returns an error carrying its id; the row stays
    /// `initializing` without a remote handle.
    pub async fn create_job(
        &self,
        spec: &JobSpec,
        session: Option<&SessionHandle>,
    ) -> Result<i64, DispatchError> {
        let job_id = self.register(spec)?;
        let span = tracing::info_span!("submit_job", job_id, kind = %spec.kind());
        self.submit(job_id, spec, session).instrument(span).await?;
        Ok(job_id)
    }

    /// Writes the job row, input edges, validation bindings, publish
    /// binding and creation metadata in one transaction.
    fn register(&self, spec: &JobSpec) -> Result<i64, DispatchError> {
        let kind = spec.kind();
        let inputs = spec.input_job_ids();
        if !kind.is_harvest() && inputs.is_empty() {
            return Err(DispatchError::InvalidRequest(format!(
                "{} requires at least one input job",
                kind
            )));
        }

        let name = spec
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| default_job_name(kind));

        self.db.with_tx(|tx| -> Result<i64, DispatchError> {
            let record_group = match spec.target() {
                Some(target) => hierarchy_repo::find_record_group_in(tx, target.record_group_id)?
                    .ok_or_else(|| {
                        DispatchError::InvalidRequest(format!(
                            "record group #{} does not exist",
                            target.record_group_id
                        ))
                    })?,
                None => self.analysis_record_group(tx)?,
            };

            for input in &inputs {
                match job_repo::find_in(tx, *input)? {
                    Some(row) if !row.deleted => {}
                    _ => {
                        return Err(DispatchError::InvalidRequest(format!(
                            "input job #{input} does not exist"
                        )))
                    }
                }
            }

            for scenario in spec.validation_scenarios() {
                if validation_repo::find_scenario_in(tx, *scenario)?.is_none() {
                    return Err(DispatchError::InvalidRequest(format!(
                        "validation scenario #{scenario} does not exist"
                    )));
                }
            }

            let transformation = match spec {
                JobSpec::Transform { params, .. } => Some(
                    validation_repo::find_transformation_in(tx, params.transformation_id)?
                        .ok_or_else(|| {
                            DispatchError::InvalidRequest(format!(
                                "transformation #{} does not exist",
                                params.transformation_id
                            ))
                        })?,
                ),
                _ => None,
            };

            let job_id = job_repo::insert_in(
                tx,
                &job_repo::NewJob {
                    record_group_id: record_group.id,
                    kind: kind.label(),
                    name: &name,
                    note: spec.note(),
                },
            )?;

            for input in &inputs {
                edge_repo::insert_edge_in(tx, job_id, *input)?;
            }
            for scenario in spec.validation_scenarios() {
                validation_repo::insert_binding_in(tx, job_id, *scenario)?;
            }
            if let JobSpec::Publish { params, .. } = spec {
                edge_repo::insert_publish_binding_in(tx, record_group.id, job_id)?;
                if let Some(set_id) = params.publish_set_id.as_deref() {
                    hierarchy_repo::set_publish_set_id_in(tx, record_group.id, Some(set_id))?;
                }
            }

            let payload = build_payload(spec, job_id);
            let output = self.artifacts.job_output_dir(
                record_group.organization_id,
                record_group.id,
                kind.label(),
                job_id,
            );
            let details = job_details(spec, transformation.as_ref());
            job_repo::set_creation_metadata_in(
                tx,
                job_id,
                &payload.code,
                &output.to_string_lossy(),
                &details.to_string(),
            )?;

            log::debug!("Registered {} #{} in record group #{}", kind, job_id, record_group.id);
            Ok(job_id)
        })
    }

    async fn submit(
        &self,
        job_id: i64,
        spec: &JobSpec,
        session: Option<&SessionHandle>,
    ) -> Result<(), DispatchError> {
        let Some(session) = session else {
            log::warn!("Job #{} not submitted: no active remote session", job_id);
            return Err(DispatchError::NoActiveSession { job_id });
        };

        let payload = build_payload(spec, job_id);
        let reply = bounded(
            self.submit_timeout,
            self.backend.submit_statement(session.session_id, &payload),
        )
        .await
        .map_err(|e| DispatchError::Submission {
            job_id,
            reason: e.to_string(),
        })?;

        let statement = match reply {
            RemoteReply::Found(statement) => statement,
            RemoteReply::NotFound => {
                return Err(DispatchError::Submission {
                    job_id,
                    reason: format!("session {} not found", session.session_id),
                })
            }
            RemoteReply::BadSession(body) => {
                return Err(DispatchError::Submission {
                    job_id,
                    reason: format!("session {} rejected the statement: {}", session.session_id, body),
                })
            }
            RemoteReply::Unexpected { status, body } => {
                return Err(DispatchError::Submission {
                    job_id,
                    reason: format!("unexpected status {status}: {body}"),
                })
            }
        };

        job_repo::start_track(&self.db, job_id, &now_timestamp())?;
        job_repo::record_submission(
            &self.db,
            job_id,
            statement.id,
            &statement.handle,
            &statement.state,
        )?;

        log::info!(
            "Submitted job #{} as statement {} ({})",
            job_id,
            statement.id,
            statement.state
        );
        Ok(())
    }

    /// The hidden record group analysis jobs live in, created on first
    /// use. More than one organization or record group with the configured
    /// name is an integrity error.
    fn analysis_record_group(&self, conn: &Connection) -> Result<RecordGroupRow, DispatchError> {
        let org_name = &self.analysis.organization;
        let rg_name = &self.analysis.record_group;

        let orgs = hierarchy_repo::organizations_named_in(conn, org_name)?;
        let org_id = match orgs.as_slice() {
            [] => {
                log::debug!("Creating analysis organization '{}'", org_name);
                hierarchy_repo::insert_organization_in(conn, org_name, ANALYSIS_DESCRIPTION, true)?
            }
            [org] => org.id,
            _ => {
                return Err(DispatchError::ConfigurationIntegrity(format!(
                    "{} organizations named '{}' exist for analysis jobs",
                    orgs.len(),
                    org_name
                )))
            }
        };

        let groups = hierarchy_repo::record_groups_named_in(conn, rg_name)?;
        let rg_id = match groups.as_slice() {
            [] => {
                log::debug!("Creating analysis record group '{}'", rg_name);
                hierarchy_repo::insert_record_group_in(
                    conn,
                    org_id,
                    rg_name,
                    Some(ANALYSIS_DESCRIPTION),
                    true,
                )?
            }
            [group] => group.id,
            _ => {
                return Err(DispatchError::ConfigurationIntegrity(format!(
                    "{} record groups named '{}' exist for analysis jobs",
                    groups.len(),
                    rg_name
                )))
            }
        };

        hierarchy_repo::find_record_group_in(conn, rg_id)?.ok_or_else(|| {
            DispatchError::Database(crate::db::DatabaseError::NotFound {
                entity: "record group",
                id: rg_id,
            })
        })
    }
}

fn default_job_name(kind: JobKind) -> String {
    format!(
        "{} @ {}",
        kind.label(),
        chrono::Local::now().format("%b. %d, %Y, %-I:%M:%S %p")
    )
}

/// Write-once audit metadata describing how the job was configured.
fn job_details(spec: &JobSpec, transformation: Option<&TransformationRow>) -> serde_json::Value {
    let mut details = match spec {
        JobSpec::HarvestOai { params, .. } => json!({
            "oai": {
                "endpoint": params.endpoint,
                "verb": params.verb,
                "metadataPrefix": params.metadata_prefix,
                "scope_type": params.scope_type,
                "scope_value": params.scope_value,
            }
        }),
        JobSpec::HarvestStaticXml { params, .. } => json!({
            "static": {
                "type": params.static_type.as_str(),
                "payload": params.static_payload,
                "xpath_document_root": params.xpath_document_root,
                "xpath_record_id": params.xpath_record_id,
            }
        }),
        JobSpec::Transform { .. } => match transformation {
            Some(t) => json!({
                "transformation": { "name": t.name, "type": t.kind, "id": t.id }
            }),
            None => json!({}),
        },
        JobSpec::Merge { .. } => json!({ "merge": { "input_jobs": spec.input_job_ids() } }),
        JobSpec::Analysis { .. } => json!({ "analysis": { "input_jobs": spec.input_job_ids() } }),
        JobSpec::Publish { params, .. } => json!({
            "publish": {
                "publish_job_id": params.input_job_id,
                "publish_set_id": params.publish_set_id,
            }
        }),
    };

    if let Some(obj) = details.as_object_mut() {
        if let Some(mapper) = spec.index_mapper() {
            obj.insert("index_mapper".to_string(), json!(mapper));
        }
        if !spec.validation_scenarios().is_empty() {
            obj.insert(
                "validation_scenarios".to_string(),
                json!(spec.validation_scenarios()),
            );
        }
    }
    details
}
