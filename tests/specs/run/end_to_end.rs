//! Whole-run specs
//!
//! Drive a live run from registration packet to completed store state and
//! verify the status traffic the client sees along the way.

use crate::prelude::*;

#[tokio::test]
async fn a_single_worker_carries_a_run_to_completion() {
    let spec = spec_run(1, spec_config(), SharedState::default()).await;

    let reply = register(&spec, "req-1", "alice").await;
    let agent_id = reply["agent_id"].as_str().unwrap().to_string();
    assert!(reply["worker_id"].is_string());
    assert_eq!(reply["init_task_data"]["shared"]["task"], "spec");

    spec.remote
        .deliver(submit_unit_packet(&agent_id, json!({"answer": 42})));

    spec.run.wait_until_complete().await.unwrap();

    // The submission hook fired exactly once.
    assert_eq!(spec.blueprint.submissions.load(Ordering::SeqCst), 1);

    let completed = spec
        .store
        .units_with_status(UnitStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(
        completed[0].agent_id.as_ref().map(|a| a.as_str()),
        Some(agent_id.as_str())
    );

    spec.run.shutdown().await;
}

#[tokio::test]
async fn status_pushes_track_the_agent_through_its_lifecycle() {
    let spec = spec_run(1, spec_config(), SharedState::default()).await;
    let mut log = Vec::new();

    spec.remote.deliver(register_packet("req-1", "alice"));
    let reply_at = drain_until(&spec.remote, &mut log, |p| {
        p.packet_type == PacketType::AgentDetails && p.data["request_id"] == "req-1"
    })
    .await;
    let agent_id = log[reply_at].data["agent_id"].as_str().unwrap().to_string();

    // Staffing alone takes the single-unit assignment straight into task.
    let status_of = |p: &Packet| {
        (p.packet_type == PacketType::UpdateStatus && p.subject_id == agent_id)
            .then(|| p.data["status"].as_str().unwrap_or("").to_string())
    };
    drain_until(&spec.remote, &mut log, |p| {
        status_of(p).as_deref() == Some("in_task")
    })
    .await;

    spec.remote
        .deliver(submit_unit_packet(&agent_id, json!({"answer": 42})));
    drain_until(&spec.remote, &mut log, |p| {
        status_of(p).as_deref() == Some("completed")
    })
    .await;

    // Pushes arrive in lifecycle order: waiting, in_task, completed.
    let statuses: Vec<String> = log.iter().filter_map(status_of).collect();
    let expected = ["waiting", "in_task", "completed"];
    assert!(
        statuses
            .iter()
            .filter(|s| expected.contains(&s.as_str()))
            .eq(expected.iter()),
        "unexpected status order: {statuses:?}"
    );

    spec.run.shutdown().await;
}

#[tokio::test]
async fn the_run_is_not_complete_while_units_are_outstanding() {
    let spec = spec_run(2, spec_config(), SharedState::default()).await;

    let reply = register(&spec, "req-1", "alice").await;
    let agent_id = reply["agent_id"].as_str().unwrap().to_string();
    spec.remote
        .deliver(submit_unit_packet(&agent_id, json!({"answer": 1})));

    // One of the two units stays unworked, so the run never completes.
    wait_until(|| {
        spec.blueprint.submissions.load(Ordering::SeqCst) == 1
    })
    .await;
    assert!(!spec.run.is_complete().await.unwrap());

    spec.run.shutdown().await;

    let expired = spec
        .store
        .units_with_status(UnitStatus::Expired)
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
}
