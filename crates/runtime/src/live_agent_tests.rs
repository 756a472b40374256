// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hive_core::AssignmentId;
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn agent() -> LiveAgent {
    let unit = Unit::new(UnitId::new("u-1"), AssignmentId::new("as-1"), 0, 0.5);
    let details = AgentDetails::for_agent(
        WorkerId::new("w-1"),
        AgentId::new("a-1"),
        json!({"task": "x"}),
    );
    LiveAgent::new(
        AgentId::new("a-1"),
        WorkerId::new("w-1"),
        unit,
        details,
        100.0,
    )
}

use hive_core::UnitId;

#[test]
fn live_updates_arrive_in_order() {
    let agent = agent();
    agent.push_live_update(json!({"n": 1}));
    agent.push_live_update(json!({"n": 2}));

    assert_eq!(
        agent.next_live_update(Duration::from_millis(10)).unwrap()["n"],
        1
    );
    assert_eq!(
        agent.next_live_update(Duration::from_millis(10)).unwrap()["n"],
        2
    );
}

#[test]
fn empty_queue_times_out() {
    let agent = agent();
    assert_eq!(
        agent.next_live_update(Duration::from_millis(10)),
        Err(Termination::Timeout)
    );
}

#[test]
fn termination_wakes_blocked_reader() {
    let agent = Arc::new(agent());
    let reader = Arc::clone(&agent);
    let handle = thread::spawn(move || reader.next_live_update(Duration::from_secs(5)));

    thread::sleep(Duration::from_millis(20));
    agent.terminate(Termination::Disconnected);

    assert_eq!(handle.join().unwrap(), Err(Termination::Disconnected));
}

#[test]
fn first_termination_wins() {
    let agent = agent();
    agent.terminate(Termination::Returned);
    agent.terminate(Termination::Shutdown);
    assert_eq!(agent.termination(), Some(Termination::Returned));
}

#[test]
fn submission_wakes_waiter() {
    let agent = Arc::new(agent());
    let waiter = Arc::clone(&agent);
    let handle = thread::spawn(move || waiter.await_submission(Duration::from_secs(5)));

    thread::sleep(Duration::from_millis(20));
    agent.submit(json!({"completed": true}));

    let submission = handle.join().unwrap().unwrap();
    assert_eq!(submission["completed"], true);
}

#[test]
fn submission_beats_termination_when_both_present() {
    // A submit that raced in just before disconnect still counts.
    let agent = agent();
    agent.submit(json!({"ok": true}));
    agent.terminate(Termination::Disconnected);
    assert!(agent.await_submission(Duration::from_millis(10)).is_ok());
}

#[test]
fn status_transitions_validated() {
    let agent = agent();
    assert_eq!(agent.status(), AgentStatus::None);
    assert!(agent.set_status(AgentStatus::Waiting));
    assert!(agent.set_status(AgentStatus::InTask));
    // Invalid: in_task cannot go back to waiting
    assert!(!agent.set_status(AgentStatus::Waiting));
    assert_eq!(agent.status(), AgentStatus::InTask);
}

#[test]
fn details_are_stable_across_calls() {
    let agent = agent();
    assert_eq!(agent.details(), agent.details());
}

#[test]
fn touch_updates_last_activity() {
    let agent = agent();
    assert_eq!(agent.last_activity(), 100.0);
    agent.touch(250.0);
    assert_eq!(agent.last_activity(), 250.0);
}

#[test]
fn onboarding_agent_resolves_submission() {
    let details = AgentDetails::for_agent(
        WorkerId::new("w-1"),
        AgentId::new("ob-1"),
        json!({"onboarding": true}),
    );
    let agent = OnboardingAgent::new(AgentId::new("ob-1"), WorkerId::new("w-1"), details);
    assert_eq!(agent.status(), AgentStatus::Onboarding);

    agent.set_request_id(hive_core::RequestId::new("r-2"));
    agent.submit(json!({"answers": [1, 2]}));

    assert!(agent.submission().is_some());
    assert!(agent.set_status(AgentStatus::Approved));
    // Approved is terminal
    assert!(!agent.set_status(AgentStatus::Rejected));
    assert_eq!(
        agent.take_request_id(),
        Some(hive_core::RequestId::new("r-2"))
    );
    assert_eq!(agent.take_request_id(), None);
}
