// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted record of one agent.
//!
//! The live, in-memory side of an agent (pending updates, submit signal)
//! belongs to the runtime; this is the durable shape the store keeps.

use serde::{Deserialize, Serialize};

use crate::status::AgentStatus;
use crate::unit::UnitId;
use crate::worker::WorkerId;
use crate::AgentId;

/// Durable record of one worker's attempt at one unit.
///
/// Onboarding agents carry no unit id; they are never tied to billable work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub worker_id: WorkerId,
    pub unit_id: Option<UnitId>,
    pub status: AgentStatus,
}

impl AgentRecord {
    pub fn new(id: AgentId, worker_id: WorkerId, unit_id: UnitId) -> Self {
        Self {
            id,
            worker_id,
            unit_id: Some(unit_id),
            status: AgentStatus::None,
        }
    }

    pub fn onboarding(id: AgentId, worker_id: WorkerId) -> Self {
        Self {
            id,
            worker_id,
            unit_id: None,
            status: AgentStatus::Onboarding,
        }
    }

    pub fn is_onboarding(&self) -> bool {
        self.unit_id.is_none()
    }
}
