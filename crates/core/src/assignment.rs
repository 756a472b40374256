// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assignment: a group of units that must be staffed together.
//!
//! Multi-party tasks create assignments with more than one unit; those units
//! rendezvous before work starts (see the runtime's worker pool) and the
//! assignment is complete only when every member unit is terminal.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an assignment.
    pub struct AssignmentId;
}

/// Initialization data for one assignment: shared task parameters plus one
/// payload per member unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializationData {
    /// Task parameters shared by every unit in the assignment.
    #[serde(default)]
    pub shared: serde_json::Value,
    /// Per-unit payloads; the length determines the unit count.
    pub unit_data: Vec<serde_json::Value>,
}

impl InitializationData {
    /// Single-unit assignment data with no shared parameters.
    pub fn single(unit_payload: serde_json::Value) -> Self {
        Self {
            shared: serde_json::Value::Null,
            unit_data: vec![unit_payload],
        }
    }

    pub fn unit_count(&self) -> usize {
        self.unit_data.len()
    }
}

/// A group of 1..N units staffed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub unit_count: usize,
}

impl Assignment {
    pub fn new(id: AssignmentId, unit_count: usize) -> Self {
        Self { id, unit_count }
    }

    /// Multi-party assignments require the rendezvous barrier.
    pub fn is_concurrent(&self) -> bool {
        self.unit_count > 1
    }
}
