// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;

struct NullBlueprint;
impl Blueprint for NullBlueprint {}

#[test]
fn defaults_opt_out_of_every_capability() {
    let bp = NullBlueprint;
    let worker = Worker::new(hive_core::WorkerId::new("w-1"), "alice");

    assert_eq!(bp.onboarding_data(&worker), Value::Null);
    assert!(bp.validate_onboarding(&worker, &Value::Null));
    assert!(bp.screening_data().is_none());
    assert!(bp.gold_data().is_none());
    assert!(!bp.worker_needs_gold(&worker, &HashMap::new()));
}

#[test]
fn onboarding_config_naming_convention() {
    let config = OnboardingConfig::for_task("sentiment");
    assert_eq!(config.passed_qualification, "sentiment-onboarding-passed");
    assert_eq!(config.failed_qualification, "sentiment-onboarding-failed");
}

#[test]
fn shared_state_composes_by_field_union() {
    let shared = SharedState {
        qualifications: vec![],
        onboarding: Some(OnboardingConfig::for_task("t")),
        screening: None,
        gold: Some(GoldConfig {
            blocked_qualification: "t-gold-blocked".into(),
            max_incorrect_golds: 2,
        }),
    };
    assert!(shared.onboarding.is_some());
    assert!(shared.screening.is_none());
    assert!(shared.gold.is_some());
}

#[test]
fn registry_lookup() {
    let mut registry = Registry::new();
    registry.register("null", Arc::new(NullBlueprint));

    assert!(registry.get("null").is_some());
    assert!(registry.get("other").is_none());
    assert_eq!(registry.names(), vec!["null"]);
}
