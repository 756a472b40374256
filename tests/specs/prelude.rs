//! Shared harness for behavioral specifications.
//!
//! Builds a complete in-process live run over mock channels and offers
//! packet builders and polling helpers on top of it.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

pub use std::sync::atomic::{AtomicUsize, Ordering};
pub use std::sync::Arc;
pub use std::time::{Duration, Instant};

pub use serde_json::{json, Value};

pub use hive_core::{
    InitializationData, RunConfig, SequentialIdGen, Unit, UnitStatus, Worker,
};
pub use hive_runtime::{
    AssignmentSource, Blueprint, BlueprintError, LiveRun, LiveRunOptions, MockArchitect,
    OnboardingConfig, RunError, SharedState, TaskRunner,
};
pub use hive_store::{LocalStore, Store};
pub use hive_wire::{MockRemote, Packet, PacketType};

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

/// Task logic that finishes immediately; the unit completes as soon as the
/// worker submits.
pub struct SpecRunner;

impl TaskRunner for SpecRunner {
    fn run_unit(&self, _unit: &Unit, _agent: &hive_runtime::LiveAgent) -> Result<(), RunError> {
        Ok(())
    }
}

/// Blueprint that counts submission hooks and judges onboarding by the
/// submitted `passed` flag.
#[derive(Default)]
pub struct SpecBlueprint {
    pub submissions: AtomicUsize,
}

impl Blueprint for SpecBlueprint {
    fn onboarding_data(&self, _worker: &Worker) -> Value {
        json!({"onboarding": true})
    }

    fn validate_onboarding(&self, _worker: &Worker, submission: &Value) -> bool {
        submission["passed"] == true
    }

    fn on_unit_submitted(&self, _unit: &Unit, _submission: &Value) -> Result<(), BlueprintError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One assembled run plus handles into its moving parts.
pub struct Spec {
    pub run: LiveRun,
    pub remote: MockRemote,
    pub store: Arc<LocalStore>,
    pub blueprint: Arc<SpecBlueprint>,
}

pub fn spec_config() -> RunConfig {
    RunConfig {
        status_poll_interval_ms: 50,
        launch_pass_interval_ms: 20,
        generator_poll_interval_ms: 10,
        shutdown_phase_timeout_ms: 1000,
        ..RunConfig::default()
    }
}

/// Launch a run over `units` eager single-unit assignments.
pub async fn spec_run(units: usize, config: RunConfig, shared: SharedState) -> Spec {
    let store = Arc::new(LocalStore::with_id_gen(Arc::new(SequentialIdGen::new("e"))));
    let architect = MockArchitect::new(1);
    let blueprint = Arc::new(SpecBlueprint::default());

    let mut options = LiveRunOptions::new(
        config,
        Arc::clone(&blueprint) as Arc<dyn Blueprint>,
        Arc::new(SpecRunner),
        AssignmentSource::Eager(
            (0..units)
                .map(|i| InitializationData {
                    shared: json!({"task": "spec"}),
                    unit_data: vec![json!({"i": i})],
                })
                .collect(),
        ),
    );
    options.shared = shared;
    options.ids = Arc::new(SequentialIdGen::new("a"));
    options.pay_amount = 0.5;

    let run = LiveRun::launch(
        &architect,
        Arc::clone(&store) as Arc<dyn Store>,
        options,
    )
    .await
    .unwrap();
    let remote = architect.remotes().into_iter().next().unwrap();

    Spec {
        run,
        remote,
        store,
        blueprint,
    }
}

pub fn register_packet(request_id: &str, worker_name: &str) -> Packet {
    Packet::system(
        PacketType::RegisterAgent,
        json!({"request_id": request_id, "crowd_data": {"worker_name": worker_name}}),
        0.0,
    )
}

pub fn reconnect_packet(request_id: &str, agent_id: &str) -> Packet {
    Packet::system(
        PacketType::RegisterAgent,
        json!({"request_id": request_id, "agent_id": agent_id}),
        0.0,
    )
}

pub fn submit_unit_packet(agent_id: &str, data: Value) -> Packet {
    Packet::new(PacketType::SubmitUnit, agent_id, data, 0.0)
}

pub fn submit_onboarding_packet(agent_id: &str, request_id: &str, data: Value) -> Packet {
    Packet::new(
        PacketType::SubmitOnboarding,
        agent_id,
        json!({"request_id": request_id, "onboarding_data": data}),
        0.0,
    )
}

/// Poll the remote until a packet matching `pred` arrives, dropping
/// everything else seen along the way.
pub async fn expect_packet(remote: &MockRemote, pred: impl Fn(&Packet) -> bool) -> Packet {
    let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    loop {
        if let Some(packet) = remote.take_sent().into_iter().find(&pred) {
            return packet;
        }
        assert!(Instant::now() < deadline, "expected packet never arrived");
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}

/// Drain the remote into `log` until a packet matching `pred` has been
/// seen; returns its index in the log. Use this instead of
/// [`expect_packet`] when the test needs packets that arrive interleaved.
pub async fn drain_until(
    remote: &MockRemote,
    log: &mut Vec<Packet>,
    pred: impl Fn(&Packet) -> bool,
) -> usize {
    let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    loop {
        log.extend(remote.take_sent());
        if let Some(i) = log.iter().position(&pred) {
            return i;
        }
        assert!(Instant::now() < deadline, "expected packet never arrived");
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}

/// The registration reply correlated to `request_id`.
pub async fn expect_reply(remote: &MockRemote, request_id: &str) -> Packet {
    expect_packet(remote, |p| {
        p.packet_type == PacketType::AgentDetails && p.data["request_id"] == request_id
    })
    .await
}

/// Register a worker and return the reply payload.
pub async fn register(spec: &Spec, request_id: &str, worker_name: &str) -> Value {
    spec.remote.deliver(register_packet(request_id, worker_name));
    expect_reply(&spec.remote, request_id).await.data
}

/// Poll until `cond` holds or the wait window runs out.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while !cond() {
        assert!(Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}
