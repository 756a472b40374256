// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process reference store.
//!
//! All state lives under one mutex, so `reserve_unit` is a conditional map
//! insert inside a single lock acquisition: two concurrent registrants can
//! never both win the same unit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use hive_core::{
    AgentId, AgentRecord, AgentStatus, Assignment, AssignmentId, IdGen, InitializationData,
    Qualification, QualificationId, Unit, UnitId, UnitStatus, UuidIdGen, Worker, WorkerId,
};

use crate::store::{Store, StoreError};

#[derive(Default)]
struct State {
    workers: HashMap<WorkerId, Worker>,
    worker_names: HashMap<String, WorkerId>,
    qualifications: HashMap<String, Qualification>,
    grants: HashMap<(WorkerId, String), f64>,
    assignments: HashMap<AssignmentId, Assignment>,
    assignment_data: HashMap<AssignmentId, InitializationData>,
    units: HashMap<UnitId, Unit>,
    agents: HashMap<AgentId, AgentRecord>,
    agent_metadata: HashMap<AgentId, Vec<serde_json::Value>>,
    /// unit id -> holding agent. Insert-if-absent is the reservation.
    reservations: HashMap<UnitId, AgentId>,
}

/// In-memory [`Store`] implementation.
pub struct LocalStore {
    ids: Arc<dyn IdGen>,
    state: Mutex<State>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::with_id_gen(Arc::new(UuidIdGen))
    }

    /// Use a caller-supplied id generator (sequential ids in tests).
    pub fn with_id_gen(ids: Arc<dyn IdGen>) -> Self {
        Self {
            ids,
            state: Mutex::new(State::default()),
        }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn create_worker(&self, name: &str) -> Result<Worker, StoreError> {
        let mut state = self.state.lock();
        if let Some(id) = state.worker_names.get(name) {
            return Err(StoreError::Backend(format!(
                "worker already exists for name {id}"
            )));
        }
        let worker = Worker::new(WorkerId::new(self.ids.next()), name);
        state.worker_names.insert(name.to_string(), worker.id.clone());
        state.workers.insert(worker.id.clone(), worker.clone());
        Ok(worker)
    }

    async fn get_worker(&self, id: &WorkerId) -> Result<Worker, StoreError> {
        self.state
            .lock()
            .workers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("worker", id))
    }

    async fn find_worker_by_name(&self, name: &str) -> Result<Option<Worker>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .worker_names
            .get(name)
            .and_then(|id| state.workers.get(id))
            .cloned())
    }

    async fn set_worker_blocked(&self, id: &WorkerId, blocked: bool) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let worker = state
            .workers
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("worker", id))?;
        worker.is_blocked = blocked;
        Ok(())
    }

    async fn ensure_qualification(&self, name: &str) -> Result<Qualification, StoreError> {
        let mut state = self.state.lock();
        if let Some(existing) = state.qualifications.get(name) {
            return Ok(existing.clone());
        }
        let qualification = Qualification {
            id: QualificationId::new(self.ids.next()),
            name: name.to_string(),
            description: None,
        };
        state
            .qualifications
            .insert(name.to_string(), qualification.clone());
        Ok(qualification)
    }

    async fn grant_qualification(
        &self,
        worker_id: &WorkerId,
        name: &str,
        value: f64,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.workers.contains_key(worker_id) {
            return Err(StoreError::not_found("worker", worker_id));
        }
        // Upsert: re-granting overwrites.
        state
            .grants
            .insert((worker_id.clone(), name.to_string()), value);
        Ok(())
    }

    async fn granted_qualifications(
        &self,
        worker_id: &WorkerId,
    ) -> Result<HashMap<String, f64>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .grants
            .iter()
            .filter(|((wid, _), _)| wid == worker_id)
            .map(|((_, name), value)| (name.clone(), *value))
            .collect())
    }

    async fn create_assignment(
        &self,
        data: &InitializationData,
    ) -> Result<Assignment, StoreError> {
        let mut state = self.state.lock();
        let assignment = Assignment::new(AssignmentId::new(self.ids.next()), data.unit_count());
        state
            .assignments
            .insert(assignment.id.clone(), assignment.clone());
        state
            .assignment_data
            .insert(assignment.id.clone(), data.clone());
        Ok(assignment)
    }

    async fn assignment_data(
        &self,
        id: &AssignmentId,
    ) -> Result<InitializationData, StoreError> {
        self.state
            .lock()
            .assignment_data
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("assignment", id))
    }

    async fn create_unit(
        &self,
        assignment_id: &AssignmentId,
        unit_index: i32,
        pay_amount: f64,
    ) -> Result<Unit, StoreError> {
        let mut state = self.state.lock();
        if !state.assignments.contains_key(assignment_id) {
            return Err(StoreError::not_found("assignment", assignment_id));
        }
        let unit = Unit::new(
            UnitId::new(self.ids.next()),
            assignment_id.clone(),
            unit_index,
            pay_amount,
        );
        state.units.insert(unit.id.clone(), unit.clone());
        Ok(unit)
    }

    async fn get_unit(&self, id: &UnitId) -> Result<Unit, StoreError> {
        self.state
            .lock()
            .units
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("unit", id))
    }

    async fn units_for_assignment(&self, id: &AssignmentId) -> Result<Vec<Unit>, StoreError> {
        let state = self.state.lock();
        let mut units: Vec<Unit> = state
            .units
            .values()
            .filter(|u| &u.assignment_id == id)
            .cloned()
            .collect();
        units.sort_by_key(|u| u.unit_index);
        Ok(units)
    }

    async fn units_with_status(&self, status: UnitStatus) -> Result<Vec<Unit>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .units
            .values()
            .filter(|u| u.status == status)
            .cloned()
            .collect())
    }

    async fn update_unit_status(
        &self,
        id: &UnitId,
        status: UnitStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let unit = state
            .units
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("unit", id))?;
        unit.status = status;
        Ok(())
    }

    async fn create_agent(&self, record: &AgentRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if let Some(unit_id) = &record.unit_id {
            if !state.units.contains_key(unit_id) {
                return Err(StoreError::not_found("unit", unit_id));
            }
        }
        state.agents.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_agent(&self, id: &AgentId) -> Result<AgentRecord, StoreError> {
        self.state
            .lock()
            .agents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("agent", id))
    }

    async fn update_agent_status(
        &self,
        id: &AgentId,
        status: AgentStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let agent = state
            .agents
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("agent", id))?;
        agent.status = status;
        Ok(())
    }

    async fn append_agent_metadata(
        &self,
        id: &AgentId,
        metadata: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.agents.contains_key(id) {
            return Err(StoreError::not_found("agent", id));
        }
        state
            .agent_metadata
            .entry(id.clone())
            .or_default()
            .push(metadata);
        Ok(())
    }

    async fn reserve_unit(
        &self,
        unit_id: &UnitId,
        agent_id: &AgentId,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        if !state.units.contains_key(unit_id) {
            return Err(StoreError::not_found("unit", unit_id));
        }
        if let Some(holder) = state.reservations.get(unit_id) {
            debug!(unit = %unit_id, holder = %holder, loser = %agent_id, "reservation lost");
            return Ok(false);
        }
        state.reservations.insert(unit_id.clone(), agent_id.clone());
        debug!(unit = %unit_id, agent = %agent_id, "unit reserved");
        // Reservation and unit bookkeeping commit under the same lock.
        if let Some(unit) = state.units.get_mut(unit_id) {
            unit.agent_id = Some(agent_id.clone());
            unit.status = UnitStatus::Assigned;
        }
        Ok(true)
    }

    async fn release_unit(&self, unit_id: &UnitId) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.reservations.remove(unit_id);
        let unit = state
            .units
            .get_mut(unit_id)
            .ok_or_else(|| StoreError::not_found("unit", unit_id))?;
        unit.agent_id = None;
        if !unit.status.is_terminal() {
            unit.status = UnitStatus::Launched;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
