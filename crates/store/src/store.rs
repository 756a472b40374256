// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store seam.
//!
//! `reserve_unit` is the only operation requiring true mutual exclusion
//! across concurrent registrations: it must be an atomic create-if-absent,
//! never read-then-write. Everything else may be advisory and stale.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use hive_core::{
    AgentId, AgentRecord, AgentStatus, Assignment, AssignmentId, InitializationData,
    Qualification, Unit, UnitId, UnitStatus, Worker, WorkerId,
};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Create/read/update access to run entities plus the atomic reservation
/// primitive.
#[async_trait]
pub trait Store: Send + Sync {
    // --- workers ---

    async fn create_worker(&self, name: &str) -> Result<Worker, StoreError>;
    async fn get_worker(&self, id: &WorkerId) -> Result<Worker, StoreError>;
    async fn find_worker_by_name(&self, name: &str) -> Result<Option<Worker>, StoreError>;
    async fn set_worker_blocked(&self, id: &WorkerId, blocked: bool) -> Result<(), StoreError>;

    // --- qualifications ---

    /// Create the named qualification if it does not exist.
    async fn ensure_qualification(&self, name: &str) -> Result<Qualification, StoreError>;

    /// Upsert: at most one grant per (worker, qualification) pair.
    async fn grant_qualification(
        &self,
        worker_id: &WorkerId,
        name: &str,
        value: f64,
    ) -> Result<(), StoreError>;

    async fn granted_qualifications(
        &self,
        worker_id: &WorkerId,
    ) -> Result<HashMap<String, f64>, StoreError>;

    // --- assignments and units ---

    async fn create_assignment(
        &self,
        data: &InitializationData,
    ) -> Result<Assignment, StoreError>;

    async fn assignment_data(&self, id: &AssignmentId)
        -> Result<InitializationData, StoreError>;

    async fn create_unit(
        &self,
        assignment_id: &AssignmentId,
        unit_index: i32,
        pay_amount: f64,
    ) -> Result<Unit, StoreError>;

    async fn get_unit(&self, id: &UnitId) -> Result<Unit, StoreError>;
    async fn units_for_assignment(&self, id: &AssignmentId) -> Result<Vec<Unit>, StoreError>;
    async fn units_with_status(&self, status: UnitStatus) -> Result<Vec<Unit>, StoreError>;
    async fn update_unit_status(&self, id: &UnitId, status: UnitStatus)
        -> Result<(), StoreError>;

    // --- agents ---

    /// Persist an agent record built by the caller (ids are generated by
    /// the pool so reservation can happen first).
    async fn create_agent(&self, record: &AgentRecord) -> Result<(), StoreError>;

    async fn get_agent(&self, id: &AgentId) -> Result<AgentRecord, StoreError>;
    async fn update_agent_status(
        &self,
        id: &AgentId,
        status: AgentStatus,
    ) -> Result<(), StoreError>;

    /// Append to the agent's metadata list (from `submit_metadata` packets).
    async fn append_agent_metadata(
        &self,
        id: &AgentId,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError>;

    // --- reservation ---

    /// Atomically reserve a unit for an agent.
    ///
    /// Returns `Ok(false)` when another agent already holds the unit; that
    /// outcome is expected, frequent, and silent.
    async fn reserve_unit(&self, unit_id: &UnitId, agent_id: &AgentId)
        -> Result<bool, StoreError>;

    /// Release a reservation and return the unit to the launched pool.
    async fn release_unit(&self, unit_id: &UnitId) -> Result<(), StoreError>;
}
