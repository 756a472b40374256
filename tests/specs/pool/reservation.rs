//! Unit reservation specs
//!
//! The atomic reservation is the only mutual-exclusion point in
//! registration: any number of concurrent registrants, exactly one holder
//! per unit, losers get a typed `no_available_units` reply.

use crate::prelude::*;

use hive_core::{FakeClock, RequestId};
use hive_runtime::{Outbound, TaskSupervisor, WorkerPool};
use hive_runtime::TaskLauncher;
use tokio::sync::mpsc;

/// A worker pool wired straight to in-memory parts, no channels.
async fn bare_pool(units: usize) -> (Arc<WorkerPool>, mpsc::UnboundedReceiver<Outbound>) {
    let config = RunConfig::default();
    let store: Arc<dyn Store> =
        Arc::new(LocalStore::with_id_gen(Arc::new(SequentialIdGen::new("e"))));
    let launcher = Arc::new(TaskLauncher::new(Arc::clone(&store), &config, 0.5));
    launcher
        .create_assignments(AssignmentSource::Eager(
            (0..units)
                .map(|i| InitializationData {
                    shared: Value::Null,
                    unit_data: vec![json!({"i": i})],
                })
                .collect(),
        ))
        .await
        .unwrap();
    launcher.launch_pass().await.unwrap();

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (ev_tx, _ev_rx) = mpsc::unbounded_channel();
    let supervisor = TaskSupervisor::new(Arc::new(SpecRunner), ev_tx, &config);
    let pool = Arc::new(WorkerPool::new(
        config,
        Arc::new(FakeClock::at(0.0)),
        store,
        Arc::new(SpecBlueprint::default()),
        SharedState::default(),
        launcher,
        supervisor,
        Arc::new(SequentialIdGen::new("a")),
        out_tx,
    ));
    (pool, out_rx)
}

#[tokio::test]
async fn one_unit_many_concurrent_registrants_exactly_one_wins() {
    let (pool, mut outbound) = bare_pool(1).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            pool.register_worker(
                RequestId::new(format!("req-{i}")),
                &json!({"worker_name": format!("worker-{i}")}),
            )
            .await
            .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut winners = 0;
    let mut losers = 0;
    while let Ok(out) = outbound.try_recv() {
        if let Outbound::AgentDetails { details, .. } = out {
            if details.agent_id.is_some() {
                winners += 1;
            } else {
                assert_eq!(
                    details.failure_reason,
                    Some(hive_core::RegistrationFailure::NoAvailableUnits)
                );
                losers += 1;
            }
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(losers, 7);
}

#[tokio::test]
async fn concurrency_cap_frees_a_slot_when_a_unit_completes() {
    let config = RunConfig {
        max_num_concurrent_units: 1,
        ..spec_config()
    };
    let spec = spec_run(2, config, SharedState::default()).await;

    // Only one of the two units is in circulation under the cap.
    let first = register(&spec, "req-1", "alice").await;
    let agent_id = first["agent_id"].as_str().unwrap().to_string();

    let second = register(&spec, "req-2", "bob").await;
    assert_eq!(second["failure_reason"], "no_available_units");

    // Completing the first unit lets the launch loop top the pool back up.
    spec.remote
        .deliver(submit_unit_packet(&agent_id, json!({"answer": 1})));
    let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let third = register(&spec, &format!("req-retry-{attempt}"), "bob").await;
        if third["agent_id"].is_string() {
            break;
        }
        assert!(Instant::now() < deadline, "second unit never became claimable");
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }

    spec.run.shutdown().await;
}

#[tokio::test]
async fn returned_units_become_claimable_again() {
    let spec = spec_run(1, spec_config(), SharedState::default()).await;

    let first = register(&spec, "req-1", "alice").await;
    let agent_id = first["agent_id"].as_str().unwrap().to_string();

    // The pool is empty while alice holds the only unit.
    let denied = register(&spec, "req-2", "bob").await;
    assert_eq!(denied["failure_reason"], "no_available_units");

    // A remote disconnect report releases the reservation.
    spec.remote.deliver(Packet::system(
        PacketType::ReturnStatuses,
        json!({ agent_id: "disconnect" }),
        0.0,
    ));

    let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let retry = register(&spec, &format!("req-retry-{attempt}"), "bob").await;
        if retry["agent_id"].is_string() {
            break;
        }
        assert!(Instant::now() < deadline, "released unit never became claimable");
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }

    spec.run.shutdown().await;
}
