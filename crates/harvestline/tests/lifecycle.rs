//! Job submission and status supervision against a scripted backend.

mod common;

use std::time::Duration;

use common::*;
use harvestline::db::{job_repo, validation_repo};
use harvestline::lifecycle::SkipReason;
use harvestline::remote::RemoteReply;
use harvestline::{DispatchError, HarvestlineError, JobStatus, PollOutcome};

#[tokio::test]
async fn test_create_without_session_fails_fast() {
    let env = TestEnv::new();
    let err = env
        .orchestrator
        .create_job(&harvest(env.record_group))
        .await
        .unwrap_err();

    let job_id = match err {
        HarvestlineError::Dispatch(DispatchError::NoActiveSession { job_id }) => job_id,
        other => panic!("unexpected error: {other}"),
    };
    let job = env.orchestrator.job(job_id).unwrap();
    assert_eq!(job.status, JobStatus::Initializing);
    assert!(job.submission_failed());
    assert_eq!(env.backend.count_calls("submit_statement"), 0);

    assert_eq!(
        env.orchestrator.poll_job(job_id, false).await.unwrap(),
        PollOutcome::Skipped(SkipReason::NotSubmitted)
    );
}

#[tokio::test]
async fn test_job_runs_to_completion() {
    let env = TestEnv::with_session().await;
    let id = env.orchestrator.create_job(&harvest(env.record_group)).await.unwrap();
    let handle = env.handle_of(id);
    env.add_records(id, &["r1", "r2"]);

    env.backend.set_state(&handle, "running");
    env.orchestrator.poll_active().await.unwrap();
    let job = env.orchestrator.job(id).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert!(!job.finished);

    env.backend.set_state(&handle, "available");
    let outcomes = env.orchestrator.poll_active().await.unwrap();
    assert_eq!(
        outcomes,
        vec![(
            id,
            PollOutcome::Updated {
                status: JobStatus::Available,
                finished: true
            }
        )]
    );

    let job = env.orchestrator.job(id).unwrap();
    assert!(job.finished);
    assert_eq!(job.record_count, 2);
    let track = job_repo::latest_track(&env.db, id).unwrap().unwrap();
    assert!(track.finish_timestamp.is_some());

    // Finished jobs drop out of the active set.
    assert!(env.orchestrator.poll_active().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_vanished_statement_becomes_gone() {
    let env = TestEnv::with_session().await;
    let id = env.orchestrator.create_job(&harvest(env.record_group)).await.unwrap();
    let handle = env.handle_of(id);
    env.backend.set_reply(&handle, RemoteReply::NotFound);

    assert_eq!(env.orchestrator.poll_job(id, false).await.unwrap(), PollOutcome::Gone);
    let job = env.orchestrator.job(id).unwrap();
    assert_eq!(job.status, JobStatus::Gone);
    assert!(!job.finished);

    let polls_before = env.backend.count_calls("statement_status");
    assert!(env.orchestrator.poll_active().await.unwrap().is_empty());
    assert_eq!(env.backend.count_calls("statement_status"), polls_before);
}

#[tokio::test]
async fn test_slow_backend_is_transient() {
    let env = TestEnv::with_session().await;
    let id = env.orchestrator.create_job(&harvest(env.record_group)).await.unwrap();
    env.backend.stall(Duration::from_secs(3));

    let outcome = env.orchestrator.poll_job(id, false).await.unwrap();
    assert!(matches!(outcome, PollOutcome::Transient(_)));
    assert_eq!(env.orchestrator.job(id).unwrap().status, JobStatus::Waiting);
}

#[tokio::test]
async fn test_validation_verdict_after_completion() {
    let env = TestEnv::with_session().await;
    let scenario =
        validation_repo::insert_scenario(&env.db, "has title", "sch", "<schema/>").unwrap();
    let id = env
        .orchestrator
        .create_job(&harvest_validated(env.record_group, vec![scenario]))
        .await
        .unwrap();
    let records = env.add_records(id, &["a", "b", "c"]);
    validation_repo::insert_record_validation(&env.db, records[1], scenario, false, Some(2), None)
        .unwrap();

    let pending = env.orchestrator.job_verdict(id).unwrap();
    assert!(pending.pending);

    env.backend.set_state(&env.handle_of(id), "available");
    env.orchestrator.poll_job(id, false).await.unwrap();

    let verdict = env.orchestrator.job_verdict(id).unwrap();
    assert!(!verdict.verdict);
    assert_eq!(verdict.failure_count, 1);
    assert!(!verdict.pending);
    assert_eq!(verdict.scenarios[0].scenario_name, "has title");
}

#[tokio::test]
async fn test_indexed_record_count() {
    let env = TestEnv::with_session().await;
    let id = env.orchestrator.create_job(&harvest(env.record_group)).await.unwrap();
    assert_eq!(env.orchestrator.indexed_record_count(id).await.unwrap(), None);

    env.search.index_documents(&format!("j{id}"), id, 5);
    assert_eq!(env.orchestrator.indexed_record_count(id).await.unwrap(), Some(5));
}

#[tokio::test]
async fn test_session_is_reused_and_released() {
    let env = TestEnv::new();
    let first = env.orchestrator.start_session().await.unwrap();
    let second = env.orchestrator.start_session().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(env.backend.count_calls("create_session"), 1);

    assert!(env.orchestrator.stop_session().await.unwrap());
    assert!(!env.orchestrator.stop_session().await.unwrap());
    assert_eq!(env.backend.count_calls("stop_session"), 1);
}

#[tokio::test]
async fn test_dead_session_blocks_submission() {
    let env = TestEnv::with_session().await;
    env.backend.kill_session(0);

    let state = env.orchestrator.refresh_session().await.unwrap().unwrap();
    assert!(!state.active);
    assert_eq!(state.status, "dead");

    let err = env
        .orchestrator
        .create_job(&harvest(env.record_group))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarvestlineError::Dispatch(DispatchError::NoActiveSession { .. })
    ));
}
