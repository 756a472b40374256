// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory live state for one agent.
//!
//! The coordination domain pushes live updates and submissions in; the
//! execution domain (one OS thread per in-flight unit) blocks on them.
//! Termination is delivered through the same condvar so a blocked thread
//! wakes immediately when its agent disconnects or the run shuts down.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;

use hive_core::{AgentDetails, AgentId, AgentStatus, RequestId, Unit, WorkerId};

use crate::error::Termination;

struct LiveState {
    status: AgentStatus,
    pending_updates: VecDeque<Value>,
    submission: Option<Value>,
    termination: Option<Termination>,
}

/// One worker's live attempt at one unit.
pub struct LiveAgent {
    pub agent_id: AgentId,
    pub worker_id: WorkerId,
    pub unit: Unit,
    details: AgentDetails,
    last_activity: Mutex<f64>,
    state: Mutex<LiveState>,
    cond: Condvar,
}

impl LiveAgent {
    pub fn new(
        agent_id: AgentId,
        worker_id: WorkerId,
        unit: Unit,
        details: AgentDetails,
        now: f64,
    ) -> Self {
        Self {
            agent_id,
            worker_id,
            unit,
            details,
            last_activity: Mutex::new(now),
            state: Mutex::new(LiveState {
                status: AgentStatus::None,
                pending_updates: VecDeque::new(),
                submission: None,
                termination: None,
            }),
            cond: Condvar::new(),
        }
    }

    /// The reply payload for this agent's registration. Stable, so repeated
    /// reconnections resend identical details.
    pub fn details(&self) -> AgentDetails {
        self.details.clone()
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    /// Apply a status transition if the state machine accepts it.
    ///
    /// Returns false (leaving the status untouched) on an invalid or no-op
    /// transition.
    pub fn set_status(&self, to: AgentStatus) -> bool {
        let mut state = self.state.lock();
        if state.status == to || !state.status.valid_transition(to) {
            return false;
        }
        state.status = to;
        self.cond.notify_all();
        true
    }

    /// Seconds-since-epoch of the last inbound activity for this agent.
    pub fn last_activity(&self) -> f64 {
        *self.last_activity.lock()
    }

    pub fn touch(&self, now: f64) {
        *self.last_activity.lock() = now;
    }

    /// Queue an inbound live update for the execution thread.
    pub fn push_live_update(&self, update: Value) {
        let mut state = self.state.lock();
        state.pending_updates.push_back(update);
        self.cond.notify_all();
    }

    /// Block until a live update arrives.
    ///
    /// Returns the pending termination instead once one is set; a quiet
    /// window longer than `timeout` is a [`Termination::Timeout`].
    pub fn next_live_update(&self, timeout: Duration) -> Result<Value, Termination> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(t) = state.termination {
                return Err(t);
            }
            if let Some(update) = state.pending_updates.pop_front() {
                return Ok(update);
            }
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                return Err(Termination::Timeout);
            }
        }
    }

    /// Record the worker's explicit submit action.
    pub fn submit(&self, submission: Value) {
        let mut state = self.state.lock();
        state.submission = Some(submission);
        self.cond.notify_all();
    }

    /// Whether a submission has arrived and not yet been consumed.
    pub fn has_submission(&self) -> bool {
        self.state.lock().submission.is_some()
    }

    /// Block until the worker submits.
    pub fn await_submission(&self, timeout: Duration) -> Result<Value, Termination> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(submission) = state.submission.take() {
                return Ok(submission);
            }
            if let Some(t) = state.termination {
                return Err(t);
            }
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                return Err(Termination::Timeout);
            }
        }
    }

    /// Deliver a termination to the execution thread. First one wins.
    pub fn terminate(&self, termination: Termination) {
        let mut state = self.state.lock();
        if state.termination.is_none() {
            state.termination = Some(termination);
        }
        self.cond.notify_all();
    }

    pub fn termination(&self) -> Option<Termination> {
        self.state.lock().termination
    }
}

struct OnboardingState {
    status: AgentStatus,
    submission: Option<Value>,
    termination: Option<Termination>,
}

/// Transient agent used only during onboarding; never tied to a billable
/// unit. Promoted into (or discarded instead of) a real agent.
pub struct OnboardingAgent {
    pub agent_id: AgentId,
    pub worker_id: WorkerId,
    details: AgentDetails,
    /// The request to answer once onboarding resolves; the submit packet
    /// carries a fresh request id.
    request_id: Mutex<Option<RequestId>>,
    state: Mutex<OnboardingState>,
    cond: Condvar,
}

impl OnboardingAgent {
    pub fn new(agent_id: AgentId, worker_id: WorkerId, details: AgentDetails) -> Self {
        Self {
            agent_id,
            worker_id,
            details,
            request_id: Mutex::new(None),
            state: Mutex::new(OnboardingState {
                status: AgentStatus::Onboarding,
                submission: None,
                termination: None,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn details(&self) -> AgentDetails {
        self.details.clone()
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    pub fn set_status(&self, to: AgentStatus) -> bool {
        let mut state = self.state.lock();
        if state.status == to || !state.status.valid_transition(to) {
            return false;
        }
        state.status = to;
        true
    }

    pub fn set_request_id(&self, request_id: RequestId) {
        *self.request_id.lock() = Some(request_id);
    }

    pub fn take_request_id(&self) -> Option<RequestId> {
        self.request_id.lock().take()
    }

    pub fn submit(&self, submission: Value) {
        let mut state = self.state.lock();
        state.submission = Some(submission);
        self.cond.notify_all();
    }

    /// The submission recorded by [`submit`], if any.
    pub fn submission(&self) -> Option<Value> {
        self.state.lock().submission.clone()
    }

    pub fn await_submission(&self, timeout: Duration) -> Result<Value, Termination> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(submission) = state.submission.clone() {
                return Ok(submission);
            }
            if let Some(t) = state.termination {
                return Err(t);
            }
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                return Err(Termination::Timeout);
            }
        }
    }

    pub fn terminate(&self, termination: Termination) {
        let mut state = self.state.lock();
        if state.termination.is_none() {
            state.termination = Some(termination);
        }
        self.cond.notify_all();
    }
}

#[cfg(test)]
#[path = "live_agent_tests.rs"]
mod tests;
