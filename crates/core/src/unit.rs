// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unit: the smallest schedulable piece of work.
//!
//! A unit is one (assignment, index) pair plus a payable reward. The
//! `unit_index` partitions ordinary units (>= 0) from quality-control units
//! injected ahead of real work: screening units and gold units carry
//! reserved negative indices and never compete with the concurrency cap.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::assignment::AssignmentId;
use crate::AgentId;

crate::define_id! {
    /// Unique identifier for a unit.
    pub struct UnitId;
}

/// Reserved index for screening units (first-time worker admission checks).
pub const SCREENING_UNIT_INDEX: i32 = -1;

/// Reserved index for gold units (ongoing worker accuracy audits).
pub const GOLD_UNIT_INDEX: i32 = -2;

/// Lifecycle status of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// Created but not yet visible to workers.
    Created,
    /// Visible to workers, claimable.
    Launched,
    /// Reserved by exactly one agent.
    Assigned,
    /// Work submitted and accepted by the run.
    Completed,
    /// Removed from circulation without being worked on.
    Expired,
    /// Completed but flagged by quality control; pay stands, no more work
    /// is routed to the worker.
    SoftRejected,
}

impl UnitStatus {
    /// Terminal statuses accept no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UnitStatus::Completed | UnitStatus::Expired | UnitStatus::SoftRejected
        )
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitStatus::Created => "created",
            UnitStatus::Launched => "launched",
            UnitStatus::Assigned => "assigned",
            UnitStatus::Completed => "completed",
            UnitStatus::Expired => "expired",
            UnitStatus::SoftRejected => "soft_rejected",
        };
        write!(f, "{s}")
    }
}

/// The smallest schedulable piece of work.
///
/// Invariant: at most one agent is actively assigned at any time; the
/// store's atomic reservation is the only way to set `agent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub assignment_id: AssignmentId,
    pub unit_index: i32,
    pub pay_amount: f64,
    pub status: UnitStatus,
    pub agent_id: Option<AgentId>,
}

impl Unit {
    pub fn new(id: UnitId, assignment_id: AssignmentId, unit_index: i32, pay_amount: f64) -> Self {
        Self {
            id,
            assignment_id,
            unit_index,
            pay_amount,
            status: UnitStatus::Created,
            agent_id: None,
        }
    }

    pub fn is_screening(&self) -> bool {
        self.unit_index == SCREENING_UNIT_INDEX
    }

    pub fn is_gold(&self) -> bool {
        self.unit_index == GOLD_UNIT_INDEX
    }

    /// Quality-control units live outside the normal pool and the
    /// concurrency cap.
    pub fn is_quality_control(&self) -> bool {
        self.unit_index < 0
    }
}

#[cfg(test)]
#[path = "unit_tests.rs"]
mod tests;
