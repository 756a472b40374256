// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wire message: type tag + subject id + payload + 4 timestamps.
//!
//! Wire format is plain JSON. The four timestamps record when the packet
//! passed each processing stage (client, router in/out, server) so the IO
//! handler can compute per-stage latency.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Subject id reserved for control-plane traffic (status polling,
/// registration requests). Any other subject id names an agent.
pub const SYSTEM_CHANNEL_ID: &str = "mephisto";

/// Decode-time contract violations.
///
/// A malformed packet is logged and dropped; it never tears down a channel.
#[derive(Debug, Error)]
pub enum MalformedPacket {
    #[error("packet missing required field `{0}`")]
    MissingField(&'static str),

    #[error("packet is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Message type tags, stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketType {
    Alive,
    SubmitOnboarding,
    SubmitUnit,
    SubmitMetadata,
    ClientBoundLiveUpdate,
    MephistoBoundLiveUpdate,
    RegisterAgent,
    AgentDetails,
    UpdateStatus,
    RequestStatuses,
    ReturnStatuses,
    LogError,
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the serde string so logs match the wire.
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => write!(f, "{s}"),
            _ => write!(f, "{self:?}"),
        }
    }
}

/// One wire message about one subject (an agent, or the control plane).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub packet_type: PacketType,
    /// The agent this packet is about, or [`SYSTEM_CHANNEL_ID`].
    pub subject_id: String,
    pub data: serde_json::Value,
    #[serde(default)]
    pub client_timestamp: Option<f64>,
    #[serde(default)]
    pub router_incoming_timestamp: Option<f64>,
    #[serde(default)]
    pub router_outgoing_timestamp: Option<f64>,
    pub server_timestamp: f64,
}

impl Packet {
    pub fn new(
        packet_type: PacketType,
        subject_id: impl Into<String>,
        data: serde_json::Value,
        server_timestamp: f64,
    ) -> Self {
        Self {
            packet_type,
            subject_id: subject_id.into(),
            data,
            client_timestamp: None,
            router_incoming_timestamp: None,
            router_outgoing_timestamp: None,
            server_timestamp,
        }
    }

    /// A control-plane packet addressed to the system channel.
    pub fn system(packet_type: PacketType, data: serde_json::Value, server_timestamp: f64) -> Self {
        Self::new(packet_type, SYSTEM_CHANNEL_ID, data, server_timestamp)
    }

    pub fn is_system(&self) -> bool {
        self.subject_id == SYSTEM_CHANNEL_ID
    }

    /// Encode for the wire.
    pub fn to_json(&self) -> Result<String, MalformedPacket> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the wire.
    ///
    /// Fails if `packet_type`, `subject_id`, or `data` is absent; timestamps
    /// are optional (the server fills its own on receipt).
    pub fn from_json(input: &str) -> Result<Self, MalformedPacket> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    /// Decode from an already-parsed JSON value.
    pub fn from_value(mut value: serde_json::Value) -> Result<Self, MalformedPacket> {
        for field in ["packet_type", "subject_id", "data"] {
            if value.get(field).is_none() {
                return Err(MalformedPacket::MissingField(field));
            }
        }
        // Inbound packets may omit server_timestamp; it is stamped on receipt.
        if value.get("server_timestamp").is_none() {
            if let Some(obj) = value.as_object_mut() {
                obj.insert("server_timestamp".into(), serde_json::json!(0.0));
            }
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
#[path = "packet_tests.rs"]
mod tests;
