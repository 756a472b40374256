// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Packet dispatch between channels and the worker pool.
//!
//! Inbound packets are stamped with the server timestamp, deduplicated
//! where redelivery is possible, and routed by type. Outbound traffic is
//! correlated back to its channel: registration replies by request id,
//! agent traffic by the channel the agent last spoke on, with a broadcast
//! fallback. A malformed or unexpected packet is logged and dropped; it
//! never tears anything down.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use hive_core::{AgentId, AgentStatus, Clock, RequestId};
use hive_wire::{Channel, ChannelCallbacks, ChannelError, Packet, PacketType};

use crate::worker_pool::{Outbound, WorkerPool};

/// Channel lifecycle and traffic, funneled from sync callbacks into the
/// async event loop.
#[derive(Debug)]
pub enum ChannelEvent {
    Open(String),
    Catastrophic(String),
    Message(String, Packet),
}

/// Callbacks that forward every channel signal into `tx`.
pub fn channel_callbacks(tx: mpsc::UnboundedSender<ChannelEvent>) -> ChannelCallbacks {
    let open_tx = tx.clone();
    let cat_tx = tx.clone();
    ChannelCallbacks::new(
        move |id| {
            let _ = open_tx.send(ChannelEvent::Open(id.to_string()));
        },
        move |id| {
            let _ = cat_tx.send(ChannelEvent::Catastrophic(id.to_string()));
        },
        move |id, packet| {
            let _ = tx.send(ChannelEvent::Message(id.to_string(), packet));
        },
    )
}

/// Routes packets between channels and the worker pool.
pub struct ClientIOHandler {
    clock: Arc<dyn Clock>,
    pool: Arc<WorkerPool>,
    channels: Mutex<HashMap<String, Arc<dyn Channel>>>,
    /// Open registration requests awaiting an agent-details reply.
    request_channels: Mutex<HashMap<RequestId, String>>,
    /// The channel each agent last spoke on.
    agent_channels: Mutex<HashMap<AgentId, String>>,
    /// Live-update ids already applied; redeliveries are dropped.
    seen_update_ids: Mutex<HashSet<String>>,
}

impl ClientIOHandler {
    pub fn new(clock: Arc<dyn Clock>, pool: Arc<WorkerPool>) -> Self {
        Self {
            clock,
            pool,
            channels: Mutex::new(HashMap::new()),
            request_channels: Mutex::new(HashMap::new()),
            agent_channels: Mutex::new(HashMap::new()),
            seen_update_ids: Mutex::new(HashSet::new()),
        }
    }

    /// Register and open one channel.
    pub fn add_channel(&self, channel: Arc<dyn Channel>) -> Result<(), ChannelError> {
        channel.open()?;
        self.channels
            .lock()
            .insert(channel.channel_id().to_string(), channel);
        Ok(())
    }

    pub fn handle_open(&self, channel_id: &str) {
        info!(channel = channel_id, "channel open");
    }

    /// A channel gave up for good: every agent routed through it is
    /// treated as disconnected.
    pub async fn handle_catastrophic(&self, channel_id: &str) {
        error!(channel = channel_id, "channel failed catastrophically");
        let orphaned: Vec<AgentId> = self
            .agent_channels
            .lock()
            .iter()
            .filter(|(_, ch)| ch.as_str() == channel_id)
            .map(|(agent, _)| agent.clone())
            .collect();
        for agent_id in orphaned {
            if let Err(e) = self.pool.disconnect_agent(&agent_id).await {
                warn!(agent = %agent_id, error = %e, "failed to settle orphaned agent");
            }
        }
    }

    /// Dispatch one inbound packet.
    pub async fn handle_message(&self, channel_id: &str, mut packet: Packet) {
        let now = self.clock.timestamp();
        packet.server_timestamp = now;
        self.log_latency(&packet, now);

        if !packet.is_system() {
            let agent_id = AgentId::new(packet.subject_id.clone());
            self.agent_channels
                .lock()
                .insert(agent_id.clone(), channel_id.to_string());
            self.pool.touch_agent(&agent_id);
        }

        match packet.packet_type {
            PacketType::Alive => {
                debug!(channel = channel_id, subject = %packet.subject_id, "keepalive");
            }
            PacketType::RegisterAgent => {
                self.handle_register(channel_id, &packet).await;
            }
            PacketType::SubmitOnboarding => {
                let agent_id = AgentId::new(packet.subject_id.clone());
                let Some(request_id) = request_id_from(&packet.data) else {
                    warn!(agent = %agent_id, "onboarding submission without a request id");
                    return;
                };
                self.request_channels
                    .lock()
                    .insert(request_id.clone(), channel_id.to_string());
                let data = packet
                    .data
                    .get("onboarding_data")
                    .cloned()
                    .unwrap_or(packet.data.clone());
                if let Err(e) = self.pool.submit_onboarding(&agent_id, request_id, data) {
                    warn!(agent = %agent_id, error = %e, "dropping onboarding submission");
                }
            }
            PacketType::SubmitUnit => {
                let agent_id = AgentId::new(packet.subject_id.clone());
                if let Err(e) = self.pool.submit_unit(&agent_id, packet.data) {
                    warn!(agent = %agent_id, error = %e, "dropping unit submission");
                }
            }
            PacketType::SubmitMetadata => {
                let agent_id = AgentId::new(packet.subject_id.clone());
                if let Err(e) = self.pool.submit_metadata(&agent_id, packet.data).await {
                    warn!(agent = %agent_id, error = %e, "dropping metadata submission");
                }
            }
            PacketType::MephistoBoundLiveUpdate => {
                let agent_id = AgentId::new(packet.subject_id.clone());
                if let Some(update_id) = packet.data.get("update_id").and_then(Value::as_str) {
                    // The router may redeliver; apply each update id once.
                    if !self.seen_update_ids.lock().insert(update_id.to_string()) {
                        debug!(agent = %agent_id, update_id, "duplicate live update dropped");
                        return;
                    }
                }
                if let Err(e) = self.pool.live_update(&agent_id, packet.data) {
                    warn!(agent = %agent_id, error = %e, "dropping live update");
                }
            }
            PacketType::ReturnStatuses => {
                self.handle_returned_statuses(&packet.data).await;
            }
            PacketType::LogError => {
                error!(channel = channel_id, subject = %packet.subject_id, data = %packet.data, "client-side error");
            }
            PacketType::ClientBoundLiveUpdate
            | PacketType::AgentDetails
            | PacketType::UpdateStatus
            | PacketType::RequestStatuses => {
                warn!(
                    channel = channel_id,
                    packet_type = %packet.packet_type,
                    "outbound-only packet type received, dropping"
                );
            }
        }
    }

    async fn handle_register(&self, channel_id: &str, packet: &Packet) {
        let Some(request_id) = request_id_from(&packet.data) else {
            warn!(channel = channel_id, "registration without a request id");
            return;
        };
        self.request_channels
            .lock()
            .insert(request_id.clone(), channel_id.to_string());

        if let Some(agent_id) = packet.data.get("agent_id").and_then(Value::as_str) {
            let agent_id = AgentId::new(agent_id);
            self.agent_channels
                .lock()
                .insert(agent_id.clone(), channel_id.to_string());
            self.pool.reconnect_agent(request_id, &agent_id);
            return;
        }

        let crowd_data = packet.data.get("crowd_data").unwrap_or(&packet.data);
        if let Err(e) = self.pool.register_worker(request_id, crowd_data).await {
            warn!(channel = channel_id, error = %e, "registration failed");
        }
    }

    async fn handle_returned_statuses(&self, data: &Value) {
        let Some(statuses) = data.as_object() else {
            warn!("malformed status report, dropping");
            return;
        };
        for (agent_id, status) in statuses {
            let Ok(reported) = serde_json::from_value::<AgentStatus>(status.clone()) else {
                warn!(agent = %agent_id, ?status, "unparseable reported status");
                continue;
            };
            let agent_id = AgentId::new(agent_id.as_str());
            if let Err(e) = self.pool.handle_remote_status(&agent_id, reported).await {
                warn!(agent = %agent_id, error = %e, "failed to reconcile status");
            }
        }
    }

    /// Per-stage latency, from the packet's four timestamps.
    fn log_latency(&self, packet: &Packet, now: f64) {
        let client_to_router = match (packet.client_timestamp, packet.router_incoming_timestamp) {
            (Some(c), Some(r)) => Some(r - c),
            _ => None,
        };
        let router_hold = match (
            packet.router_incoming_timestamp,
            packet.router_outgoing_timestamp,
        ) {
            (Some(i), Some(o)) => Some(o - i),
            _ => None,
        };
        let router_to_server = packet.router_outgoing_timestamp.map(|o| now - o);
        debug!(
            packet_type = %packet.packet_type,
            client_to_router,
            router_hold,
            router_to_server,
            "inbound packet"
        );
    }

    // --- outbound ---

    /// Put one pool-originated message on the wire.
    pub fn handle_outbound(&self, outbound: Outbound) {
        let now = self.clock.timestamp();
        match outbound {
            Outbound::AgentDetails {
                request_id,
                details,
            } => {
                let channel_id = self.request_channels.lock().remove(&request_id);
                let subject = details
                    .agent_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| hive_wire::SYSTEM_CHANNEL_ID.to_string());
                if let (Some(agent_id), Some(channel_id)) = (&details.agent_id, &channel_id) {
                    self.agent_channels
                        .lock()
                        .insert(agent_id.clone(), channel_id.clone());
                }
                let mut data = match serde_json::to_value(&details) {
                    Ok(data) => data,
                    Err(e) => {
                        error!(error = %e, "failed to encode agent details");
                        return;
                    }
                };
                if let Some(obj) = data.as_object_mut() {
                    obj.insert("request_id".into(), json!(request_id.to_string()));
                }
                let packet = Packet::new(PacketType::AgentDetails, subject, data, now);
                self.send_routed(channel_id.as_deref(), packet);
            }
            Outbound::StatusUpdate { agent_id, status } => {
                let channel_id = self.agent_channels.lock().get(&agent_id).cloned();
                let packet = Packet::new(
                    PacketType::UpdateStatus,
                    agent_id.to_string(),
                    json!({ "status": status }),
                    now,
                );
                self.send_routed(channel_id.as_deref(), packet);
            }
            Outbound::LiveUpdate { agent_id, data } => {
                let channel_id = self.agent_channels.lock().get(&agent_id).cloned();
                let packet = Packet::new(
                    PacketType::ClientBoundLiveUpdate,
                    agent_id.to_string(),
                    data,
                    now,
                );
                self.send_routed(channel_id.as_deref(), packet);
            }
        }
    }

    /// Send on the correlated channel, falling back to a broadcast across
    /// every live channel.
    fn send_routed(&self, channel_id: Option<&str>, packet: Packet) {
        let channels = self.channels.lock();
        if let Some(id) = channel_id {
            if let Some(channel) = channels.get(id) {
                if channel.enqueue_send(packet.clone()) {
                    return;
                }
            }
        }
        let mut delivered = false;
        for channel in channels.values() {
            if channel.is_alive() && channel.enqueue_send(packet.clone()) {
                delivered = true;
            }
        }
        if !delivered {
            warn!(packet_type = %packet.packet_type, subject = %packet.subject_id, "no live channel for packet");
        }
    }

    /// Ask every live channel for its current agent statuses.
    pub fn broadcast_status_request(&self) {
        let packet = Packet::system(
            PacketType::RequestStatuses,
            Value::Null,
            self.clock.timestamp(),
        );
        for channel in self.channels.lock().values() {
            if channel.is_alive() {
                channel.enqueue_send(packet.clone());
            }
        }
    }

    pub fn close_all(&self) {
        for channel in self.channels.lock().values() {
            channel.close();
        }
    }
}

fn request_id_from(data: &Value) -> Option<RequestId> {
    data.get("request_id").and_then(Value::as_str).map(RequestId::new)
}

#[cfg(test)]
#[path = "io_handler_tests.rs"]
mod tests;
