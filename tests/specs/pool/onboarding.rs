//! Onboarding and reconnection specs
//!
//! Onboarding gates admission before any unit is reserved; a failed flow
//! blocks the worker permanently via the failed qualification. Reconnection
//! replays the original registration reply without side effects.

use crate::prelude::*;

fn onboarding_shared() -> SharedState {
    SharedState {
        onboarding: Some(OnboardingConfig::for_task("spec")),
        ..SharedState::default()
    }
}

#[tokio::test]
async fn passing_onboarding_leads_to_a_real_unit() {
    let spec = spec_run(1, spec_config(), onboarding_shared()).await;

    let reply = register(&spec, "req-1", "alice").await;
    let onboarding_id = reply["agent_id"].as_str().unwrap().to_string();
    assert_eq!(reply["init_task_data"]["onboarding"], true);

    spec.remote.deliver(submit_onboarding_packet(
        &onboarding_id,
        "req-2",
        json!({"passed": true}),
    ));

    // The approval answers the submit request with a real assignment.
    let assigned = expect_reply(&spec.remote, "req-2").await.data;
    let real_id = assigned["agent_id"].as_str().unwrap();
    assert_ne!(real_id, onboarding_id);
    assert_eq!(assigned["init_task_data"]["unit_data"]["i"], 0);

    let worker = spec
        .store
        .find_worker_by_name("alice")
        .await
        .unwrap()
        .unwrap();
    let granted = spec.store.granted_qualifications(&worker.id).await.unwrap();
    assert!(granted.contains_key("spec-onboarding-passed"));

    spec.run.shutdown().await;
}

#[tokio::test]
async fn failing_onboarding_blocks_the_worker_permanently() {
    let spec = spec_run(1, spec_config(), onboarding_shared()).await;

    let reply = register(&spec, "req-1", "alice").await;
    let onboarding_id = reply["agent_id"].as_str().unwrap().to_string();

    spec.remote.deliver(submit_onboarding_packet(
        &onboarding_id,
        "req-2",
        json!({"passed": false}),
    ));

    let rejected = expect_reply(&spec.remote, "req-2").await.data;
    assert_eq!(rejected["failure_reason"], "not_qualified");

    // No unit was ever reserved for the rejected worker.
    let assigned = spec
        .store
        .units_with_status(UnitStatus::Assigned)
        .await
        .unwrap();
    assert!(assigned.is_empty());

    // The failed qualification short-circuits every later attempt.
    let again = register(&spec, "req-3", "alice").await;
    assert_eq!(again["failure_reason"], "not_qualified");

    spec.run.shutdown().await;
}

#[tokio::test]
async fn onboarded_workers_skip_the_flow_next_time() {
    let spec = spec_run(2, spec_config(), onboarding_shared()).await;

    let reply = register(&spec, "req-1", "alice").await;
    let onboarding_id = reply["agent_id"].as_str().unwrap().to_string();
    spec.remote.deliver(submit_onboarding_packet(
        &onboarding_id,
        "req-2",
        json!({"passed": true}),
    ));
    expect_reply(&spec.remote, "req-2").await;

    // Second registration goes straight to a unit, no onboarding payload.
    let again = register(&spec, "req-3", "alice").await;
    assert!(again["agent_id"].is_string());
    assert!(again["init_task_data"].get("onboarding").is_none());

    spec.run.shutdown().await;
}

#[tokio::test]
async fn reconnection_replays_identical_details() {
    let spec = spec_run(1, spec_config(), SharedState::default()).await;

    let first = register(&spec, "req-1", "alice").await;
    let agent_id = first["agent_id"].as_str().unwrap().to_string();

    for attempt in 0..3 {
        let request_id = format!("req-re-{attempt}");
        spec.remote.deliver(reconnect_packet(&request_id, &agent_id));
        let replay = expect_reply(&spec.remote, &request_id).await.data;
        assert_eq!(replay["agent_id"], first["agent_id"]);
        assert_eq!(replay["worker_id"], first["worker_id"]);
        assert_eq!(replay["init_task_data"], first["init_task_data"]);
    }

    // Reconnecting never reserves anything new.
    let assigned = spec
        .store
        .units_with_status(UnitStatus::Assigned)
        .await
        .unwrap();
    assert_eq!(assigned.len(), 1);

    spec.run.shutdown().await;
}

#[tokio::test]
async fn reconnection_for_an_unknown_agent_is_a_typed_failure() {
    let spec = spec_run(1, spec_config(), SharedState::default()).await;

    spec.remote.deliver(reconnect_packet("req-1", "no-such-agent"));
    let reply = expect_reply(&spec.remote, "req-1").await.data;
    assert_eq!(reply["failure_reason"], "reconnection");

    spec.run.shutdown().await;
}
