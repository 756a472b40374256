// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-type hooks and per-run shared state.
//!
//! Each capability (onboarding, screening, gold units) exposes a config
//! struct; the run assembles one [`SharedState`] by explicit field union at
//! startup. Behavioral hooks live on the [`Blueprint`] trait; the runtime
//! consumes both and never knows the task type's content.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use hive_core::{QualificationReq, Unit, Worker};

/// Hook failures are logged and never abort cleanup.
#[derive(Debug, Error)]
#[error("blueprint hook failed: {0}")]
pub struct BlueprintError(pub String);

/// Onboarding capability config.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Granted when a worker passes onboarding.
    pub passed_qualification: String,
    /// Granted when a worker fails; permanently blocks future admission.
    pub failed_qualification: String,
}

impl OnboardingConfig {
    /// Conventional pair of qualification names for a task.
    pub fn for_task(task_name: &str) -> Self {
        Self {
            passed_qualification: format!("{task_name}-onboarding-passed"),
            failed_qualification: format!("{task_name}-onboarding-failed"),
        }
    }
}

/// Screening capability config.
#[derive(Debug, Clone)]
pub struct ScreeningConfig {
    /// Granted after a passed screening unit; skips future screening.
    pub passed_qualification: String,
    /// Granted after a failed screening unit; blocks admission.
    pub blocked_qualification: String,
}

/// Gold-unit capability config.
#[derive(Debug, Clone)]
pub struct GoldConfig {
    /// Granted once a worker fails too many gold units; blocks admission.
    pub blocked_qualification: String,
    /// Failures tolerated before the block is granted.
    pub max_incorrect_golds: u32,
}

/// Per-run shared state, composed by explicit field union at startup.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    /// Admission gate applied to every registration.
    pub qualifications: Vec<QualificationReq>,
    pub onboarding: Option<OnboardingConfig>,
    pub screening: Option<ScreeningConfig>,
    pub gold: Option<GoldConfig>,
}

/// Task-type-specific lifecycle hooks.
///
/// Defaults make every capability opt-in: a minimal blueprint only decides
/// what a unit's data looks like and what to do with a submission.
pub trait Blueprint: Send + Sync + 'static {
    /// Init payload for an onboarding agent.
    fn onboarding_data(&self, _worker: &Worker) -> Value {
        Value::Null
    }

    /// Decide a finished onboarding flow. Called once per onboarding agent.
    fn validate_onboarding(&self, _worker: &Worker, _submission: &Value) -> bool {
        true
    }

    /// Narrow the eligible unit set for a worker. Called fresh on every
    /// registration; must not assume the result stays valid.
    fn filter_units_for_worker(&self, _worker: &Worker, units: Vec<Unit>) -> Vec<Unit> {
        units
    }

    /// Per-unit admission check applied after filtering.
    fn worker_can_do_unit(&self, _worker: &Worker, _unit: &Unit) -> bool {
        true
    }

    /// Fired exactly once after a unit's submission is accepted.
    fn on_unit_submitted(&self, _unit: &Unit, _submission: &Value) -> Result<(), BlueprintError> {
        Ok(())
    }

    /// Next screening payload, or `None` when the supply is exhausted.
    fn screening_data(&self) -> Option<Value> {
        None
    }

    /// Judge a screening submission.
    fn validate_screening(&self, _submission: &Value) -> bool {
        true
    }

    /// Whether this worker should receive a gold unit now.
    fn worker_needs_gold(&self, _worker: &Worker, _granted: &HashMap<String, f64>) -> bool {
        false
    }

    /// Next gold payload, or `None` when the supply is exhausted.
    fn gold_data(&self) -> Option<Value> {
        None
    }

    /// Judge a gold submission against its known-correct answer.
    fn validate_gold(&self, _submission: &Value) -> bool {
        true
    }
}

/// Explicit blueprint registry, constructed once at process start and
/// passed by reference. No global mutable state, no import-order effects.
#[derive(Default)]
pub struct Registry {
    blueprints: HashMap<String, std::sync::Arc<dyn Blueprint>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, blueprint: std::sync::Arc<dyn Blueprint>) {
        self.blueprints.insert(name.into(), blueprint);
    }

    pub fn get(&self, name: &str) -> Option<std::sync::Arc<dyn Blueprint>> {
        self.blueprints.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.blueprints.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
#[path = "blueprint_tests.rs"]
mod tests;
