// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task execution supervision.
//!
//! Task logic may block indefinitely on human input, so every in-flight
//! unit, assignment, or onboarding gets its own OS thread. The supervisor
//! turns how each thread ended into a [`RunnerEvent`] for the worker pool;
//! abnormal ends are tagged values and cleanup dispatch is a plain match.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{error, warn};

use hive_core::{AgentId, Assignment, RunConfig, Unit};

use crate::error::{ExecOutcome, RunError};
use crate::live_agent::{LiveAgent, OnboardingAgent};

/// How one execution thread ended.
#[derive(Debug)]
pub enum RunnerEvent {
    UnitFinished {
        agent_id: AgentId,
        outcome: ExecOutcome,
    },
    AssignmentFinished {
        agent_ids: Vec<AgentId>,
        outcome: ExecOutcome,
    },
    OnboardingFinished {
        agent_id: AgentId,
        outcome: ExecOutcome,
    },
}

/// Task-type execution contract.
///
/// Implementations choose exactly one mode: unit-level (`run_unit`) for
/// single-party work, or assignment-level (`run_assignment`) for
/// multi-party work behind the rendezvous barrier. `run_*` is free to block
/// on [`LiveAgent`] waits; a pending termination surfaces there as an
/// `Err(Terminated)` the implementation should propagate with `?`.
pub trait TaskRunner: Send + Sync + 'static {
    /// True when this task type staffs whole assignments at once.
    fn assignment_level(&self) -> bool {
        false
    }

    fn run_unit(&self, unit: &Unit, agent: &LiveAgent) -> Result<(), RunError>;

    fn cleanup_unit(&self, _unit: &Unit) {}

    fn run_assignment(
        &self,
        _assignment: &Assignment,
        _agents: &[Arc<LiveAgent>],
    ) -> Result<(), RunError> {
        Err(RunError::Task(
            "assignment-level execution not supported by this task type".into(),
        ))
    }

    fn cleanup_assignment(&self, _assignment: &Assignment) {}

    /// Runs while the worker completes onboarding; the default returns
    /// immediately and lets the supervisor wait for the submission.
    fn run_onboarding(&self, _agent: &OnboardingAgent) -> Result<(), RunError> {
        Ok(())
    }

    fn cleanup_onboarding(&self, _agent: &OnboardingAgent) {}
}

/// Owns every execution thread for one run.
pub struct TaskSupervisor {
    runner: Arc<dyn TaskRunner>,
    events: mpsc::UnboundedSender<RunnerEvent>,
    threads: Mutex<Vec<thread::JoinHandle<()>>>,
    submission_timeout: Duration,
    onboarding_timeout: Duration,
}

impl TaskSupervisor {
    pub fn new(
        runner: Arc<dyn TaskRunner>,
        events: mpsc::UnboundedSender<RunnerEvent>,
        config: &RunConfig,
    ) -> Self {
        Self {
            runner,
            events,
            threads: Mutex::new(Vec::new()),
            submission_timeout: config.submission_timeout(),
            onboarding_timeout: config.onboarding_timeout(),
        }
    }

    pub fn assignment_level(&self) -> bool {
        self.runner.assignment_level()
    }

    fn spawn(&self, name: String, body: impl FnOnce() + Send + 'static) {
        match thread::Builder::new().name(name.clone()).spawn(body) {
            Ok(handle) => self.threads.lock().push(handle),
            Err(e) => error!(thread = %name, error = %e, "failed to spawn execution thread"),
        }
    }

    /// Run one unit on its own thread.
    pub fn launch_unit(&self, unit: Unit, agent: Arc<LiveAgent>) {
        let runner = Arc::clone(&self.runner);
        let events = self.events.clone();
        let submission_timeout = self.submission_timeout;
        let agent_id = agent.agent_id.clone();

        self.spawn(format!("unit-{}", unit.id), move || {
            let outcome = match runner.run_unit(&unit, &agent) {
                Ok(()) => match agent.await_submission(submission_timeout) {
                    Ok(submission) => ExecOutcome::Submitted(submission),
                    Err(t) => {
                        runner.cleanup_unit(&unit);
                        ExecOutcome::Abnormal(t)
                    }
                },
                Err(RunError::Terminated(t)) => {
                    runner.cleanup_unit(&unit);
                    ExecOutcome::Abnormal(t)
                }
                Err(RunError::Task(msg)) => {
                    error!(unit = %unit.id, agent = %agent.agent_id, error = %msg, "task logic failed");
                    runner.cleanup_unit(&unit);
                    ExecOutcome::Failed(msg)
                }
            };
            let _ = events.send(RunnerEvent::UnitFinished { agent_id, outcome });
        });
    }

    /// Run a whole assignment on one thread, all agents already in task.
    pub fn launch_assignment(&self, assignment: Assignment, agents: Vec<Arc<LiveAgent>>) {
        let runner = Arc::clone(&self.runner);
        let events = self.events.clone();
        let submission_timeout = self.submission_timeout;
        let agent_ids: Vec<AgentId> = agents.iter().map(|a| a.agent_id.clone()).collect();

        self.spawn(format!("assignment-{}", assignment.id), move || {
            let outcome = match runner.run_assignment(&assignment, &agents) {
                Ok(()) => {
                    // Every party must submit before the assignment counts.
                    let mut last = None;
                    let mut failure = None;
                    for agent in &agents {
                        match agent.await_submission(submission_timeout) {
                            Ok(submission) => last = Some(submission),
                            Err(t) => {
                                failure = Some(t);
                                break;
                            }
                        }
                    }
                    match (failure, last) {
                        (Some(t), _) => {
                            runner.cleanup_assignment(&assignment);
                            ExecOutcome::Abnormal(t)
                        }
                        (None, Some(submission)) => ExecOutcome::Submitted(submission),
                        (None, None) => ExecOutcome::Submitted(serde_json::Value::Null),
                    }
                }
                Err(RunError::Terminated(t)) => {
                    runner.cleanup_assignment(&assignment);
                    ExecOutcome::Abnormal(t)
                }
                Err(RunError::Task(msg)) => {
                    error!(assignment = %assignment.id, error = %msg, "task logic failed");
                    runner.cleanup_assignment(&assignment);
                    ExecOutcome::Failed(msg)
                }
            };
            let _ = events.send(RunnerEvent::AssignmentFinished { agent_ids, outcome });
        });
    }

    /// Supervise one onboarding flow.
    pub fn launch_onboarding(&self, agent: Arc<OnboardingAgent>) {
        let runner = Arc::clone(&self.runner);
        let events = self.events.clone();
        let onboarding_timeout = self.onboarding_timeout;
        let agent_id = agent.agent_id.clone();

        self.spawn(format!("onboarding-{agent_id}"), move || {
            let outcome = match runner.run_onboarding(&agent) {
                Ok(()) => match agent.await_submission(onboarding_timeout) {
                    Ok(submission) => ExecOutcome::Submitted(submission),
                    Err(t) => {
                        runner.cleanup_onboarding(&agent);
                        ExecOutcome::Abnormal(t)
                    }
                },
                Err(RunError::Terminated(t)) => {
                    runner.cleanup_onboarding(&agent);
                    ExecOutcome::Abnormal(t)
                }
                Err(RunError::Task(msg)) => {
                    error!(agent = %agent.agent_id, error = %msg, "onboarding logic failed");
                    runner.cleanup_onboarding(&agent);
                    ExecOutcome::Failed(msg)
                }
            };
            let _ = events.send(RunnerEvent::OnboardingFinished { agent_id, outcome });
        });
    }

    /// Join every execution thread, bounded by `timeout` overall.
    ///
    /// Threads still running at the deadline are abandoned, not blocked on.
    /// Returns how many were abandoned.
    pub fn join_all(&self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let handles = std::mem::take(&mut *self.threads.lock());
        let mut abandoned = 0;

        for handle in handles {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!(
                    thread = handle.thread().name().unwrap_or("unnamed"),
                    "abandoning execution thread at shutdown"
                );
                abandoned += 1;
            }
        }
        abandoned
    }

    /// Number of threads launched and not yet joined.
    pub fn in_flight(&self) -> usize {
        self.threads.lock().len()
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
