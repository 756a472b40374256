// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registration reply payload.
//!
//! Every registration or reconnection request is answered with an
//! `AgentDetails`: either an assigned agent with its init data, or a typed
//! failure reason. Raw errors are never surfaced to the browser client.

use serde::{Deserialize, Serialize};

use crate::worker::WorkerId;
use crate::AgentId;

/// Typed reason a registration did not produce a working agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationFailure {
    /// The worker failed the qualification gate (or is blocked).
    NotQualified,
    /// No eligible unit could be reserved.
    NoAvailableUnits,
    /// The referenced agent/task no longer exists.
    TaskMissing,
    /// A reconnection request could not be matched to live state.
    Reconnection,
}

/// Reply payload for a registration or reconnection request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDetails {
    #[serde(default)]
    pub worker_id: Option<WorkerId>,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    /// Initial task data the client renders from.
    #[serde(default)]
    pub init_task_data: serde_json::Value,
    #[serde(default)]
    pub failure_reason: Option<RegistrationFailure>,
}

impl AgentDetails {
    /// A successful assignment (real or onboarding agent).
    pub fn for_agent(
        worker_id: WorkerId,
        agent_id: AgentId,
        init_task_data: serde_json::Value,
    ) -> Self {
        Self {
            worker_id: Some(worker_id),
            agent_id: Some(agent_id),
            init_task_data,
            failure_reason: None,
        }
    }

    /// A typed failure; `worker_id` is included when the worker resolved.
    pub fn failure(worker_id: Option<WorkerId>, reason: RegistrationFailure) -> Self {
        Self {
            worker_id,
            agent_id: None,
            init_task_data: serde_json::Value::Null,
            failure_reason: Some(reason),
        }
    }
}

#[cfg(test)]
#[path = "details_tests.rs"]
mod tests;
