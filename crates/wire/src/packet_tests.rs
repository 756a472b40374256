// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn sample() -> Packet {
    let mut packet = Packet::new(
        PacketType::MephistoBoundLiveUpdate,
        "agent-7",
        json!({"update_id": "u-1", "act": {"text": "hello"}}),
        1700000000.5,
    );
    packet.client_timestamp = Some(1700000000.1);
    packet.router_incoming_timestamp = Some(1700000000.2);
    packet.router_outgoing_timestamp = Some(1700000000.3);
    packet
}

#[test]
fn round_trip() {
    let packet = sample();
    let json = packet.to_json().unwrap();
    let back = Packet::from_json(&json).unwrap();
    assert_eq!(back, packet);
}

#[yare::parameterized(
    alive = { PacketType::Alive, "alive" },
    submit_onboarding = { PacketType::SubmitOnboarding, "submit_onboarding" },
    submit_unit = { PacketType::SubmitUnit, "submit_unit" },
    submit_metadata = { PacketType::SubmitMetadata, "submit_metadata" },
    client_bound = { PacketType::ClientBoundLiveUpdate, "client_bound_live_update" },
    mephisto_bound = { PacketType::MephistoBoundLiveUpdate, "mephisto_bound_live_update" },
    register_agent = { PacketType::RegisterAgent, "register_agent" },
    agent_details = { PacketType::AgentDetails, "agent_details" },
    update_status = { PacketType::UpdateStatus, "update_status" },
    request_statuses = { PacketType::RequestStatuses, "request_statuses" },
    return_statuses = { PacketType::ReturnStatuses, "return_statuses" },
    log_error = { PacketType::LogError, "log_error" },
)]
fn stable_type_strings(packet_type: PacketType, wire: &str) {
    let json = serde_json::to_string(&packet_type).unwrap();
    assert_eq!(json, format!("\"{wire}\""));
    assert_eq!(packet_type.to_string(), wire);
}

#[yare::parameterized(
    missing_type = { r#"{"subject_id": "a", "data": {}}"#, "packet_type" },
    missing_subject = { r#"{"packet_type": "alive", "data": {}}"#, "subject_id" },
    missing_data = { r#"{"packet_type": "alive", "subject_id": "a"}"#, "data" },
)]
fn missing_fields_are_malformed(input: &str, field: &str) {
    match Packet::from_json(input) {
        Err(MalformedPacket::MissingField(f)) => assert_eq!(f, field),
        other => panic!("expected MissingField({field}), got {other:?}"),
    }
}

#[test]
fn invalid_json_is_malformed() {
    assert!(matches!(
        Packet::from_json("{not json"),
        Err(MalformedPacket::Json(_))
    ));
}

#[test]
fn inbound_packets_may_omit_timestamps() {
    let packet = Packet::from_json(
        r#"{"packet_type": "register_agent", "subject_id": "mephisto", "data": {"request_id": "r-1"}}"#,
    )
    .unwrap();
    assert!(packet.is_system());
    assert!(packet.client_timestamp.is_none());
    assert_eq!(packet.server_timestamp, 0.0);
}

#[test]
fn system_constructor_targets_control_channel() {
    let packet = Packet::system(PacketType::RequestStatuses, json!({}), 1.0);
    assert_eq!(packet.subject_id, SYSTEM_CHANNEL_ID);
    assert!(packet.is_system());
}
