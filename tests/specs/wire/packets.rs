//! Wire format specs
//!
//! The packet JSON shape is a compatibility surface with the browser
//! client and router: field names, type tags, and timestamp optionality
//! must stay stable.

use crate::prelude::*;

#[test]
fn packet_survives_the_wire_byte_for_byte() {
    let packet = Packet::new(
        PacketType::MephistoBoundLiveUpdate,
        "agent-7",
        json!({"update_id": "u-1", "act": {"move": "north"}}),
        1234.5,
    );

    let encoded = packet.to_json().unwrap();
    let decoded = Packet::from_json(&encoded).unwrap();
    assert_eq!(decoded, packet);

    // Type tags are stable snake_case strings.
    let raw: Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(raw["packet_type"], "mephisto_bound_live_update");
}

#[test]
fn inbound_packets_may_omit_every_timestamp() {
    let decoded = Packet::from_json(
        r#"{"packet_type": "alive", "subject_id": "agent-1", "data": {}}"#,
    )
    .unwrap();
    assert_eq!(decoded.packet_type, PacketType::Alive);
    assert_eq!(decoded.client_timestamp, None);
    assert_eq!(decoded.router_incoming_timestamp, None);
    assert_eq!(decoded.router_outgoing_timestamp, None);
}

#[test]
fn missing_required_fields_are_rejected() {
    for (input, field) in [
        (r#"{"subject_id": "a", "data": {}}"#, "packet_type"),
        (r#"{"packet_type": "alive", "data": {}}"#, "subject_id"),
        (r#"{"packet_type": "alive", "subject_id": "a"}"#, "data"),
    ] {
        let err = Packet::from_json(input).unwrap_err();
        assert!(
            err.to_string().contains(field),
            "expected `{field}` in error, got: {err}"
        );
    }
}

#[test]
fn unknown_packet_types_are_rejected() {
    let result = Packet::from_json(
        r#"{"packet_type": "telepathy", "subject_id": "a", "data": {}}"#,
    );
    assert!(result.is_err());
}

#[test]
fn system_subject_marks_control_plane_traffic() {
    let control = Packet::system(PacketType::RequestStatuses, Value::Null, 0.0);
    assert!(control.is_system());
    assert_eq!(control.subject_id, hive_wire::SYSTEM_CHANNEL_ID);

    let agent = Packet::new(PacketType::Alive, "agent-1", Value::Null, 0.0);
    assert!(!agent.is_system());
}
