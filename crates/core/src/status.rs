// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent status state machine.
//!
//! Shared vocabulary between the server and the browser client:
//! `none -> onboarding|waiting -> in_task -> completed`, with side exits to
//! `disconnect`, `partner_disconnect`, `expired`, `returned`, and the
//! onboarding-only `approved`/`rejected`. The server is the source of truth
//! for forward transitions; a remote report may only move an agent into
//! `disconnect`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one agent (one worker's attempt at one unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Registered but not yet routed.
    None,
    /// Working through the onboarding flow.
    Onboarding,
    /// Assigned, waiting for the assignment's rendezvous barrier.
    Waiting,
    /// Actively working on the unit.
    InTask,
    /// Submitted and accepted by the run.
    Completed,
    /// The worker's connection is gone.
    Disconnect,
    /// A partner in the same assignment disconnected first.
    PartnerDisconnect,
    /// The unit was expired out from under the agent.
    Expired,
    /// Onboarding passed.
    Approved,
    /// Onboarding failed; the worker is blocked from future attempts.
    Rejected,
    /// The worker explicitly backed out of the task.
    Returned,
}

impl AgentStatus {
    /// Terminal statuses accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentStatus::Completed
                | AgentStatus::Rejected
                | AgentStatus::Expired
                | AgentStatus::Approved
        )
    }

    /// Onboarding outcomes that end the onboarding flow.
    pub fn is_onboarding_outcome(&self) -> bool {
        matches!(self, AgentStatus::Approved | AgentStatus::Rejected)
    }

    /// Whether a transition from `self` to `to` is accepted locally.
    ///
    /// A transition to the current status is a valid no-op.
    pub fn valid_transition(&self, to: AgentStatus) -> bool {
        use AgentStatus::*;

        if *self == to {
            return true;
        }

        match self {
            None => matches!(to, Onboarding | Waiting),
            Onboarding => matches!(to, Approved | Rejected | Disconnect | Expired | Returned),
            Waiting => matches!(
                to,
                InTask | Disconnect | PartnerDisconnect | Expired | Returned
            ),
            InTask => matches!(
                to,
                Completed | Disconnect | PartnerDisconnect | Expired | Returned
            ),
            // Side exits may still be force-expired at shutdown.
            Disconnect | PartnerDisconnect | Returned => matches!(to, Expired),
            // Terminal.
            Completed | Approved | Rejected | Expired => false,
        }
    }

    /// Whether a remotely reported status may be applied locally.
    ///
    /// Only `disconnect` is trusted from the client side; every other remote
    /// report is stale and triggers a local status re-push instead.
    pub fn remote_report_applies(reported: AgentStatus) -> bool {
        reported == AgentStatus::Disconnect
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStatus::None => "none",
            AgentStatus::Onboarding => "onboarding",
            AgentStatus::Waiting => "waiting",
            AgentStatus::InTask => "in_task",
            AgentStatus::Completed => "completed",
            AgentStatus::Disconnect => "disconnect",
            AgentStatus::PartnerDisconnect => "partner_disconnect",
            AgentStatus::Expired => "expired",
            AgentStatus::Approved => "approved",
            AgentStatus::Rejected => "rejected",
            AgentStatus::Returned => "returned",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
