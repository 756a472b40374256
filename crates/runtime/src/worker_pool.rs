// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker admission and agent lifecycle.
//!
//! Registration resolves a worker, applies the qualification gate, routes
//! through onboarding/screening/gold when configured, then races for a unit
//! reservation. The reservation is the only mutual-exclusion point; every
//! eligibility check before it is advisory and may be stale. The pool is
//! also the single writer of agent status: remote reports other than
//! `disconnect` are answered with a re-push of local truth.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use hive_core::{
    worker_passes, AgentDetails, AgentId, AgentRecord, AgentStatus, Assignment, Clock, IdGen,
    RegistrationFailure, RequestId, RunConfig, Unit, UnitStatus, Worker, WorkerId,
};
use hive_store::{EntityCache, Store};

use crate::blueprint::{Blueprint, SharedState};
use crate::error::{ExecOutcome, RuntimeError, Termination};
use crate::launcher::TaskLauncher;
use crate::live_agent::{LiveAgent, OnboardingAgent};
use crate::runner::{RunnerEvent, TaskSupervisor};

/// Pool-originated traffic for the IO handler to put on the wire.
#[derive(Debug)]
pub enum Outbound {
    /// Reply to a registration or reconnection request.
    AgentDetails {
        request_id: RequestId,
        details: AgentDetails,
    },
    /// Authoritative status push for one agent.
    StatusUpdate {
        agent_id: AgentId,
        status: AgentStatus,
    },
    /// Server-side live update for one agent.
    LiveUpdate { agent_id: AgentId, data: Value },
}

#[derive(Default)]
struct GoldTally {
    passed: u32,
    failed: u32,
}

/// Admission, staffing, and agent lifecycle for one live run.
pub struct WorkerPool {
    config: RunConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    cache: EntityCache,
    blueprint: Arc<dyn Blueprint>,
    shared: SharedState,
    launcher: Arc<TaskLauncher>,
    supervisor: TaskSupervisor,
    ids: Arc<dyn IdGen>,
    outbound: mpsc::UnboundedSender<Outbound>,
    agents: Mutex<HashMap<AgentId, Arc<LiveAgent>>>,
    onboarding: Mutex<HashMap<AgentId, Arc<OnboardingAgent>>>,
    screening_launched: AtomicUsize,
    gold_tallies: Mutex<HashMap<WorkerId, GoldTally>>,
    shutting_down: AtomicBool,
}

impl WorkerPool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RunConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn Store>,
        blueprint: Arc<dyn Blueprint>,
        shared: SharedState,
        launcher: Arc<TaskLauncher>,
        supervisor: TaskSupervisor,
        ids: Arc<dyn IdGen>,
        outbound: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            config,
            clock,
            cache: EntityCache::new(Arc::clone(&store)),
            store,
            blueprint,
            shared,
            launcher,
            supervisor,
            ids,
            outbound,
            agents: Mutex::new(HashMap::new()),
            onboarding: Mutex::new(HashMap::new()),
            screening_launched: AtomicUsize::new(0),
            gold_tallies: Mutex::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
        }
    }

    fn reply(&self, request_id: RequestId, details: AgentDetails) {
        let _ = self.outbound.send(Outbound::AgentDetails {
            request_id,
            details,
        });
    }

    fn push_status(&self, agent_id: &AgentId, status: AgentStatus) {
        let _ = self.outbound.send(Outbound::StatusUpdate {
            agent_id: agent_id.clone(),
            status,
        });
    }

    /// Send a server-originated live update to one agent's client.
    pub fn send_live_update(&self, agent_id: &AgentId, data: Value) {
        let _ = self.outbound.send(Outbound::LiveUpdate {
            agent_id: agent_id.clone(),
            data,
        });
    }

    pub fn live_agent(&self, agent_id: &AgentId) -> Option<Arc<LiveAgent>> {
        self.agents.lock().get(agent_id).cloned()
    }

    fn onboarding_agent(&self, agent_id: &AgentId) -> Option<Arc<OnboardingAgent>> {
        self.onboarding.lock().get(agent_id).cloned()
    }

    async fn grant(&self, worker_id: &WorkerId, name: &str) -> Result<(), RuntimeError> {
        self.cache.get_or_create_qualification(name).await?;
        self.store.grant_qualification(worker_id, name, 1.0).await?;
        Ok(())
    }

    // --- registration ---

    /// Handle a fresh registration request.
    ///
    /// `crowd_data` must carry the provider's worker name; the reply is
    /// always a typed [`AgentDetails`], never a raw error.
    pub async fn register_worker(
        &self,
        request_id: RequestId,
        crowd_data: &Value,
    ) -> Result<(), RuntimeError> {
        let Some(name) = crowd_data.get("worker_name").and_then(Value::as_str) else {
            warn!("registration request without a worker name");
            self.reply(
                request_id,
                AgentDetails::failure(None, RegistrationFailure::TaskMissing),
            );
            return Ok(());
        };

        let worker = self.cache.get_or_create_worker(name).await?;
        if worker.is_blocked {
            self.reply(
                request_id,
                AgentDetails::failure(Some(worker.id), RegistrationFailure::NotQualified),
            );
            return Ok(());
        }

        let granted = self.store.granted_qualifications(&worker.id).await?;
        if self.admission_blocked(&granted) || !worker_passes(&self.shared.qualifications, &granted)
        {
            self.reply(
                request_id,
                AgentDetails::failure(Some(worker.id), RegistrationFailure::NotQualified),
            );
            return Ok(());
        }

        self.register_agent(request_id, worker, granted).await
    }

    /// Permanent denials recorded as qualifications.
    fn admission_blocked(&self, granted: &HashMap<String, f64>) -> bool {
        if let Some(ob) = &self.shared.onboarding {
            if granted.contains_key(&ob.failed_qualification) {
                return true;
            }
        }
        if let Some(sc) = &self.shared.screening {
            if granted.contains_key(&sc.blocked_qualification) {
                return true;
            }
        }
        if let Some(gold) = &self.shared.gold {
            if granted.contains_key(&gold.blocked_qualification) {
                return true;
            }
        }
        false
    }

    /// Route an admitted worker to onboarding, screening, gold, or an
    /// ordinary unit.
    async fn register_agent(
        &self,
        request_id: RequestId,
        worker: Worker,
        granted: HashMap<String, f64>,
    ) -> Result<(), RuntimeError> {
        if self.shutting_down.load(Ordering::SeqCst) {
            self.reply(
                request_id,
                AgentDetails::failure(Some(worker.id), RegistrationFailure::NoAvailableUnits),
            );
            return Ok(());
        }

        if let Some(ob) = &self.shared.onboarding {
            if !granted.contains_key(&ob.passed_qualification) {
                return self.start_onboarding(request_id, worker).await;
            }
        }

        if let Some(sc) = &self.shared.screening {
            if self.config.use_screening_units && !granted.contains_key(&sc.passed_qualification) {
                return self.start_screening(request_id, worker).await;
            }
        }

        if self.config.use_gold_units
            && self.shared.gold.is_some()
            && self.blueprint.worker_needs_gold(&worker, &granted)
        {
            if let Some(data) = self.blueprint.gold_data() {
                let unit = self.launcher.launch_gold_unit(data).await?;
                return self.claim_unit(request_id, worker, unit).await;
            }
        }

        self.assign_ordinary_unit(request_id, worker).await
    }

    async fn start_onboarding(
        &self,
        request_id: RequestId,
        worker: Worker,
    ) -> Result<(), RuntimeError> {
        let agent_id = AgentId::new(self.ids.next());
        let record = AgentRecord::onboarding(agent_id.clone(), worker.id.clone());
        self.store.create_agent(&record).await?;

        let details = AgentDetails::for_agent(
            worker.id.clone(),
            agent_id.clone(),
            self.blueprint.onboarding_data(&worker),
        );
        let agent = Arc::new(OnboardingAgent::new(
            agent_id.clone(),
            worker.id.clone(),
            details.clone(),
        ));
        self.onboarding
            .lock()
            .insert(agent_id.clone(), Arc::clone(&agent));
        self.supervisor.launch_onboarding(agent);

        info!(agent = %agent_id, worker = %worker.id, "onboarding agent started");
        self.reply(request_id, details);
        Ok(())
    }

    async fn start_screening(
        &self,
        request_id: RequestId,
        worker: Worker,
    ) -> Result<(), RuntimeError> {
        let cap = self.config.max_screening_units;
        if cap > 0 && self.screening_launched.load(Ordering::SeqCst) >= cap {
            self.reply(
                request_id,
                AgentDetails::failure(Some(worker.id), RegistrationFailure::NoAvailableUnits),
            );
            return Ok(());
        }
        let Some(data) = self.blueprint.screening_data() else {
            self.reply(
                request_id,
                AgentDetails::failure(Some(worker.id), RegistrationFailure::NoAvailableUnits),
            );
            return Ok(());
        };

        // The slot is taken up front so concurrent registrations cannot
        // overshoot the cap; a failed launch hands it back.
        self.screening_launched.fetch_add(1, Ordering::SeqCst);
        let unit = match self.launcher.launch_screening_unit(data).await {
            Ok(unit) => unit,
            Err(e) => {
                self.screening_launched.fetch_sub(1, Ordering::SeqCst);
                return Err(e.into());
            }
        };
        self.claim_unit(request_id, worker, unit).await
    }

    /// Reserve one freshly launched quality-control unit for this worker.
    async fn claim_unit(
        &self,
        request_id: RequestId,
        worker: Worker,
        unit: Unit,
    ) -> Result<(), RuntimeError> {
        let agent_id = AgentId::new(self.ids.next());
        if !self.store.reserve_unit(&unit.id, &agent_id).await? {
            self.reply(
                request_id,
                AgentDetails::failure(Some(worker.id), RegistrationFailure::NoAvailableUnits),
            );
            return Ok(());
        }
        self.staff_reserved_unit(request_id, worker, unit, agent_id)
            .await
    }

    /// Race for any eligible launched unit.
    async fn assign_ordinary_unit(
        &self,
        request_id: RequestId,
        worker: Worker,
    ) -> Result<(), RuntimeError> {
        let per_worker_cap = self.config.max_units_per_worker;
        if per_worker_cap > 0 {
            let active = self
                .agents
                .lock()
                .values()
                .filter(|a| a.worker_id == worker.id && !a.status().is_terminal())
                .count();
            if active >= per_worker_cap {
                self.reply(
                    request_id,
                    AgentDetails::failure(
                        Some(worker.id),
                        RegistrationFailure::NoAvailableUnits,
                    ),
                );
                return Ok(());
            }
        }

        let mut units = self.store.units_with_status(UnitStatus::Launched).await?;
        units.retain(|u| !u.is_quality_control() && self.blueprint.worker_can_do_unit(&worker, u));
        let units = self.blueprint.filter_units_for_worker(&worker, units);

        for unit in units {
            let agent_id = AgentId::new(self.ids.next());
            // Losing the race is routine; just try the next candidate.
            if self.store.reserve_unit(&unit.id, &agent_id).await? {
                return self
                    .staff_reserved_unit(request_id, worker.clone(), unit, agent_id)
                    .await;
            }
        }

        self.reply(
            request_id,
            AgentDetails::failure(Some(worker.id), RegistrationFailure::NoAvailableUnits),
        );
        Ok(())
    }

    async fn staff_reserved_unit(
        &self,
        request_id: RequestId,
        worker: Worker,
        unit: Unit,
        agent_id: AgentId,
    ) -> Result<(), RuntimeError> {
        let record = AgentRecord::new(agent_id.clone(), worker.id.clone(), unit.id.clone());
        self.store.create_agent(&record).await?;

        let data = self.store.assignment_data(&unit.assignment_id).await?;
        let payload_index = if unit.unit_index >= 0 {
            unit.unit_index as usize
        } else {
            0
        };
        let init_task_data = json!({
            "shared": data.shared,
            "unit_data": data.unit_data.get(payload_index).cloned().unwrap_or(Value::Null),
            "unit_index": unit.unit_index,
        });
        let details = AgentDetails::for_agent(worker.id.clone(), agent_id.clone(), init_task_data);

        // Re-read for the assigned status and holder set by the reservation.
        let unit = self.store.get_unit(&unit.id).await?;
        let agent = Arc::new(LiveAgent::new(
            agent_id.clone(),
            worker.id.clone(),
            unit.clone(),
            details.clone(),
            self.clock.timestamp(),
        ));
        agent.set_status(AgentStatus::Waiting);
        self.store
            .update_agent_status(&agent_id, AgentStatus::Waiting)
            .await?;
        self.agents.lock().insert(agent_id.clone(), Arc::clone(&agent));

        info!(agent = %agent_id, worker = %worker.id, unit = %unit.id, "unit reserved");
        self.reply(request_id, details);
        self.push_status(&agent_id, AgentStatus::Waiting);

        self.try_launch_assignment(&unit).await
    }

    /// Launch execution once every unit in the assignment is staffed.
    ///
    /// Single-unit assignments pass the barrier trivially. Multi-unit
    /// assignments wait until each member has a live waiting agent.
    async fn try_launch_assignment(&self, unit: &Unit) -> Result<(), RuntimeError> {
        let units = self.store.units_for_assignment(&unit.assignment_id).await?;

        let mut staffed: Vec<(Unit, Arc<LiveAgent>)> = Vec::with_capacity(units.len());
        {
            let agents = self.agents.lock();
            for member in &units {
                let Some(holder) = &member.agent_id else {
                    return Ok(());
                };
                let Some(agent) = agents.get(holder) else {
                    return Ok(());
                };
                if agent.status() != AgentStatus::Waiting {
                    return Ok(());
                }
                staffed.push((member.clone(), Arc::clone(agent)));
            }
        }

        for (_, agent) in &staffed {
            agent.set_status(AgentStatus::InTask);
            self.store
                .update_agent_status(&agent.agent_id, AgentStatus::InTask)
                .await?;
            self.push_status(&agent.agent_id, AgentStatus::InTask);
        }

        if staffed.len() > 1 && self.supervisor.assignment_level() {
            let assignment = Assignment::new(unit.assignment_id.clone(), staffed.len());
            let agents = staffed.into_iter().map(|(_, a)| a).collect();
            self.supervisor.launch_assignment(assignment, agents);
        } else {
            for (member, agent) in staffed {
                self.supervisor.launch_unit(member, agent);
            }
        }
        Ok(())
    }

    /// Answer a reconnection with the same details as the original
    /// registration. Unknown agents get a typed failure.
    pub fn reconnect_agent(&self, request_id: RequestId, agent_id: &AgentId) {
        if let Some(agent) = self.live_agent(agent_id) {
            agent.touch(self.clock.timestamp());
            self.reply(request_id, agent.details());
            return;
        }
        if let Some(agent) = self.onboarding_agent(agent_id) {
            self.reply(request_id, agent.details());
            return;
        }
        debug!(agent = %agent_id, "reconnection for unknown agent");
        self.reply(
            request_id,
            AgentDetails::failure(None, RegistrationFailure::Reconnection),
        );
    }

    // --- inbound agent traffic ---

    pub fn touch_agent(&self, agent_id: &AgentId) {
        if let Some(agent) = self.live_agent(agent_id) {
            agent.touch(self.clock.timestamp());
        }
    }

    /// Record a unit submission; wakes the execution thread.
    pub fn submit_unit(&self, agent_id: &AgentId, data: Value) -> Result<(), RuntimeError> {
        let agent = self
            .live_agent(agent_id)
            .ok_or_else(|| RuntimeError::UnknownAgent(agent_id.to_string()))?;
        agent.touch(self.clock.timestamp());
        agent.submit(data);
        Ok(())
    }

    /// Record an onboarding submission and the request to answer once the
    /// pool decides the outcome.
    pub fn submit_onboarding(
        &self,
        agent_id: &AgentId,
        request_id: RequestId,
        data: Value,
    ) -> Result<(), RuntimeError> {
        let agent = self
            .onboarding_agent(agent_id)
            .ok_or_else(|| RuntimeError::UnknownAgent(agent_id.to_string()))?;
        agent.set_request_id(request_id);
        agent.submit(data);
        Ok(())
    }

    pub async fn submit_metadata(
        &self,
        agent_id: &AgentId,
        data: Value,
    ) -> Result<(), RuntimeError> {
        self.touch_agent(agent_id);
        self.store.append_agent_metadata(agent_id, data).await?;
        Ok(())
    }

    /// Queue an inbound live update for the execution thread.
    pub fn live_update(&self, agent_id: &AgentId, data: Value) -> Result<(), RuntimeError> {
        let agent = self
            .live_agent(agent_id)
            .ok_or_else(|| RuntimeError::UnknownAgent(agent_id.to_string()))?;
        agent.touch(self.clock.timestamp());
        agent.push_live_update(data);
        Ok(())
    }

    /// Reconcile a remotely reported status against local truth.
    ///
    /// Equal reports are no-ops. Only a `disconnect` report may move the
    /// agent; any other divergence gets the local status re-pushed.
    pub async fn handle_remote_status(
        &self,
        agent_id: &AgentId,
        reported: AgentStatus,
    ) -> Result<(), RuntimeError> {
        let Some(agent) = self.live_agent(agent_id) else {
            debug!(agent = %agent_id, "status report for unknown agent");
            return Ok(());
        };
        let local = agent.status();
        if reported == local {
            return Ok(());
        }
        if AgentStatus::remote_report_applies(reported) && local.valid_transition(reported) {
            self.disconnect_agent(agent_id).await?;
        } else {
            debug!(agent = %agent_id, %local, %reported, "stale remote status, re-pushing");
            self.push_status(agent_id, local);
        }
        Ok(())
    }

    // --- disconnects ---

    /// Settle a confirmed disconnect.
    ///
    /// In-task agents are settled by their execution thread via the
    /// termination; waiting agents have no thread yet and settle here,
    /// releasing partner units behind the rendezvous barrier.
    pub async fn disconnect_agent(&self, agent_id: &AgentId) -> Result<(), RuntimeError> {
        if let Some(agent) = self.onboarding_agent(agent_id) {
            agent.terminate(Termination::Disconnected);
            return Ok(());
        }
        let Some(agent) = self.live_agent(agent_id) else {
            return Ok(());
        };

        info!(agent = %agent_id, "agent disconnected");
        match agent.status() {
            AgentStatus::Waiting => {
                agent.terminate(Termination::Disconnected);
                agent.set_status(AgentStatus::Disconnect);
                self.store
                    .update_agent_status(agent_id, AgentStatus::Disconnect)
                    .await?;
                self.push_status(agent_id, AgentStatus::Disconnect);
                self.store
                    .update_unit_status(&agent.unit.id, UnitStatus::Expired)
                    .await?;
                self.release_waiting_partners(&agent).await?;
            }
            _ => {
                // The execution thread observes the termination and reports
                // the abnormal outcome.
                agent.terminate(Termination::Disconnected);
            }
        }
        Ok(())
    }

    async fn release_waiting_partners(&self, agent: &LiveAgent) -> Result<(), RuntimeError> {
        let units = self
            .store
            .units_for_assignment(&agent.unit.assignment_id)
            .await?;
        for member in units {
            if member.id == agent.unit.id {
                continue;
            }
            let Some(holder) = &member.agent_id else {
                continue;
            };
            let Some(partner) = self.live_agent(holder) else {
                continue;
            };
            if partner.set_status(AgentStatus::PartnerDisconnect) {
                self.store
                    .update_agent_status(holder, AgentStatus::PartnerDisconnect)
                    .await?;
                self.push_status(holder, AgentStatus::PartnerDisconnect);
            }
            self.store.release_unit(&member.id).await?;
        }
        Ok(())
    }

    // --- execution outcomes ---

    /// Apply one runner event; failures are logged, never propagated, so
    /// the event loop can keep draining.
    pub async fn handle_runner_event(&self, event: RunnerEvent) {
        if let Err(e) = self.apply_runner_event(event).await {
            warn!(error = %e, "failed to apply runner event");
        }
    }

    async fn apply_runner_event(&self, event: RunnerEvent) -> Result<(), RuntimeError> {
        match event {
            RunnerEvent::UnitFinished { agent_id, outcome } => {
                let Some(agent) = self.live_agent(&agent_id) else {
                    return Ok(());
                };
                match outcome {
                    ExecOutcome::Submitted(submission) => {
                        self.unit_submitted(&agent, submission).await?;
                    }
                    ExecOutcome::Abnormal(t) => self.unit_ended_abnormally(&agent, t).await?,
                    ExecOutcome::Failed(_) => {
                        self.unit_ended_abnormally(&agent, Termination::Disconnected)
                            .await?;
                    }
                }
            }
            RunnerEvent::AssignmentFinished { agent_ids, outcome } => {
                self.assignment_finished(agent_ids, outcome).await?;
            }
            RunnerEvent::OnboardingFinished { agent_id, outcome } => {
                self.onboarding_finished(agent_id, outcome).await?;
            }
        }
        Ok(())
    }

    async fn unit_submitted(
        &self,
        agent: &Arc<LiveAgent>,
        submission: Value,
    ) -> Result<(), RuntimeError> {
        agent.set_status(AgentStatus::Completed);
        self.store
            .update_agent_status(&agent.agent_id, AgentStatus::Completed)
            .await?;

        let unit = &agent.unit;
        if unit.is_screening() {
            self.resolve_screening(agent, &submission).await?;
        } else if unit.is_gold() {
            self.resolve_gold(agent, &submission).await?;
        } else {
            self.store
                .update_unit_status(&unit.id, UnitStatus::Completed)
                .await?;
            if let Err(e) = self.blueprint.on_unit_submitted(unit, &submission) {
                warn!(unit = %unit.id, error = %e, "submission hook failed");
            }
        }

        info!(agent = %agent.agent_id, unit = %unit.id, "unit submitted");
        self.push_status(&agent.agent_id, AgentStatus::Completed);
        Ok(())
    }

    async fn resolve_screening(
        &self,
        agent: &Arc<LiveAgent>,
        submission: &Value,
    ) -> Result<(), RuntimeError> {
        let Some(sc) = self.shared.screening.clone() else {
            return Ok(());
        };
        if self.blueprint.validate_screening(submission) {
            self.store
                .update_unit_status(&agent.unit.id, UnitStatus::Completed)
                .await?;
            self.grant(&agent.worker_id, &sc.passed_qualification).await?;
            info!(worker = %agent.worker_id, "screening passed");
        } else {
            // Soft rejection: the work is discarded but the worker is paid.
            self.store
                .update_unit_status(&agent.unit.id, UnitStatus::SoftRejected)
                .await?;
            self.grant(&agent.worker_id, &sc.blocked_qualification).await?;
            info!(worker = %agent.worker_id, "screening failed");
        }
        Ok(())
    }

    async fn resolve_gold(
        &self,
        agent: &Arc<LiveAgent>,
        submission: &Value,
    ) -> Result<(), RuntimeError> {
        self.store
            .update_unit_status(&agent.unit.id, UnitStatus::Completed)
            .await?;
        let Some(gold) = self.shared.gold.clone() else {
            return Ok(());
        };

        let correct = self.blueprint.validate_gold(submission);
        let failed = {
            let mut tallies = self.gold_tallies.lock();
            let tally = tallies.entry(agent.worker_id.clone()).or_default();
            if correct {
                tally.passed += 1;
            } else {
                tally.failed += 1;
            }
            tally.failed
        };
        if !correct && failed > gold.max_incorrect_golds {
            self.grant(&agent.worker_id, &gold.blocked_qualification)
                .await?;
            info!(worker = %agent.worker_id, failed, "worker blocked on gold failures");
        }
        Ok(())
    }

    async fn unit_ended_abnormally(
        &self,
        agent: &Arc<LiveAgent>,
        termination: Termination,
    ) -> Result<(), RuntimeError> {
        let (status, expire) = match termination {
            Termination::Returned => (AgentStatus::Returned, false),
            Termination::Timeout => (AgentStatus::Expired, true),
            Termination::Disconnected | Termination::Shutdown => (AgentStatus::Disconnect, false),
        };
        agent.set_status(status);
        self.store
            .update_agent_status(&agent.agent_id, status)
            .await?;
        self.push_status(&agent.agent_id, status);

        if expire {
            self.store
                .update_unit_status(&agent.unit.id, UnitStatus::Expired)
                .await?;
        } else {
            self.store.release_unit(&agent.unit.id).await?;
        }
        info!(agent = %agent.agent_id, unit = %agent.unit.id, %termination, "unit ended abnormally");
        Ok(())
    }

    async fn assignment_finished(
        &self,
        agent_ids: Vec<AgentId>,
        outcome: ExecOutcome,
    ) -> Result<(), RuntimeError> {
        match outcome {
            ExecOutcome::Submitted(submission) => {
                for agent_id in &agent_ids {
                    let Some(agent) = self.live_agent(agent_id) else {
                        continue;
                    };
                    self.unit_submitted(&agent, submission.clone()).await?;
                }
            }
            ExecOutcome::Abnormal(Termination::Timeout) => {
                for agent_id in &agent_ids {
                    let Some(agent) = self.live_agent(agent_id) else {
                        continue;
                    };
                    self.unit_ended_abnormally(&agent, Termination::Timeout).await?;
                }
            }
            ExecOutcome::Abnormal(t) => {
                // The member carrying the termination caused the abort;
                // everyone else is a partner.
                for agent_id in &agent_ids {
                    let Some(agent) = self.live_agent(agent_id) else {
                        continue;
                    };
                    if agent.termination().is_some() {
                        self.unit_ended_abnormally(&agent, t).await?;
                    } else {
                        agent.set_status(AgentStatus::PartnerDisconnect);
                        self.store
                            .update_agent_status(agent_id, AgentStatus::PartnerDisconnect)
                            .await?;
                        self.push_status(agent_id, AgentStatus::PartnerDisconnect);
                        self.store.release_unit(&agent.unit.id).await?;
                    }
                }
            }
            ExecOutcome::Failed(_) => {
                for agent_id in &agent_ids {
                    let Some(agent) = self.live_agent(agent_id) else {
                        continue;
                    };
                    self.unit_ended_abnormally(&agent, Termination::Disconnected)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn onboarding_finished(
        &self,
        agent_id: AgentId,
        outcome: ExecOutcome,
    ) -> Result<(), RuntimeError> {
        let Some(agent) = self.onboarding.lock().remove(&agent_id) else {
            return Ok(());
        };
        let request_id = agent.take_request_id();

        match outcome {
            ExecOutcome::Submitted(submission) => {
                let worker = self.store.get_worker(&agent.worker_id).await?;
                if self.blueprint.validate_onboarding(&worker, &submission) {
                    agent.set_status(AgentStatus::Approved);
                    self.store
                        .update_agent_status(&agent_id, AgentStatus::Approved)
                        .await?;
                    if let Some(ob) = &self.shared.onboarding {
                        self.grant(&worker.id, &ob.passed_qualification).await?;
                    }
                    info!(agent = %agent_id, worker = %worker.id, "onboarding approved");
                    match request_id {
                        Some(request_id) => {
                            let granted =
                                self.store.granted_qualifications(&worker.id).await?;
                            self.register_agent(request_id, worker, granted).await?;
                        }
                        None => warn!(agent = %agent_id, "onboarding finished without a request to answer"),
                    }
                } else {
                    agent.set_status(AgentStatus::Rejected);
                    self.store
                        .update_agent_status(&agent_id, AgentStatus::Rejected)
                        .await?;
                    if let Some(ob) = &self.shared.onboarding {
                        self.grant(&worker.id, &ob.failed_qualification).await?;
                    }
                    info!(agent = %agent_id, worker = %worker.id, "onboarding rejected");
                    if let Some(request_id) = request_id {
                        self.reply(
                            request_id,
                            AgentDetails::failure(
                                Some(worker.id),
                                RegistrationFailure::NotQualified,
                            ),
                        );
                    }
                }
            }
            ExecOutcome::Abnormal(t) => {
                let status = match t {
                    Termination::Returned => AgentStatus::Returned,
                    Termination::Timeout => AgentStatus::Expired,
                    Termination::Disconnected | Termination::Shutdown => AgentStatus::Disconnect,
                };
                agent.set_status(status);
                self.store.update_agent_status(&agent_id, status).await?;
            }
            ExecOutcome::Failed(msg) => {
                warn!(agent = %agent_id, error = %msg, "onboarding logic failed");
                agent.set_status(AgentStatus::Disconnect);
                self.store
                    .update_agent_status(&agent_id, AgentStatus::Disconnect)
                    .await?;
            }
        }
        Ok(())
    }

    // --- maintenance ---

    /// Force out agents with no inbound activity inside the patience
    /// window. In-task agents settle via their execution thread; waiting
    /// agents settle directly.
    pub async fn sweep_stale_agents(&self) {
        let now = self.clock.timestamp();
        let patience = self.config.no_submission_patience().as_secs_f64();
        let stale: Vec<Arc<LiveAgent>> = self
            .agents
            .lock()
            .values()
            .filter(|a| !a.status().is_terminal() && now - a.last_activity() > patience)
            .cloned()
            .collect();

        for agent in stale {
            warn!(agent = %agent.agent_id, "agent exceeded submission patience");
            match agent.status() {
                AgentStatus::InTask => agent.terminate(Termination::Timeout),
                _ => {
                    agent.terminate(Termination::Timeout);
                    if agent.set_status(AgentStatus::Expired) {
                        if let Err(e) = self
                            .store
                            .update_agent_status(&agent.agent_id, AgentStatus::Expired)
                            .await
                        {
                            warn!(agent = %agent.agent_id, error = %e, "failed to expire agent");
                        }
                        self.push_status(&agent.agent_id, AgentStatus::Expired);
                    }
                    if let Err(e) = self
                        .store
                        .update_unit_status(&agent.unit.id, UnitStatus::Expired)
                        .await
                    {
                        warn!(unit = %agent.unit.id, error = %e, "failed to expire unit");
                    }
                }
            }
        }
    }

    /// Snapshot of live agent statuses, for status reconciliation.
    pub fn agent_statuses(&self) -> HashMap<AgentId, AgentStatus> {
        self.agents
            .lock()
            .iter()
            .map(|(id, agent)| (id.clone(), agent.status()))
            .collect()
    }

    // --- shutdown ---

    /// Begin shutdown: refuse new registrations and deliver a shutdown
    /// termination to every live execution.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        for agent in self.agents.lock().values() {
            agent.terminate(Termination::Shutdown);
        }
        for agent in self.onboarding.lock().values() {
            agent.terminate(Termination::Shutdown);
        }
    }

    /// Join execution threads, bounded. Returns how many were abandoned.
    pub fn join_executions(&self, timeout: Duration) -> usize {
        self.supervisor.join_all(timeout)
    }
}

#[cfg(test)]
#[path = "worker_pool_tests.rs"]
mod tests;
