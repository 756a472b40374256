// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn grants(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[yare::parameterized(
    exists_granted = { QualComparator::Exists, Some(1.0), true },
    exists_absent = { QualComparator::Exists, None, false },
    not_exists_absent = { QualComparator::NotExists, None, true },
    not_exists_granted = { QualComparator::NotExists, Some(0.0), false },
    equal_hit = { QualComparator::EqualTo(2.0), Some(2.0), true },
    equal_miss = { QualComparator::EqualTo(2.0), Some(3.0), false },
    equal_absent = { QualComparator::EqualTo(2.0), None, false },
    not_equal_hit = { QualComparator::NotEqualTo(2.0), Some(3.0), true },
    not_equal_absent = { QualComparator::NotEqualTo(2.0), None, false },
    less_than = { QualComparator::LessThan(5.0), Some(4.0), true },
    less_than_eq_boundary = { QualComparator::LessThanOrEqualTo(5.0), Some(5.0), true },
    greater_than_boundary = { QualComparator::GreaterThan(5.0), Some(5.0), false },
    greater_than_eq = { QualComparator::GreaterThanOrEqualTo(5.0), Some(5.0), true },
    any_of_hit = { QualComparator::AnyOf(vec![1.0, 2.0]), Some(2.0), true },
    any_of_miss = { QualComparator::AnyOf(vec![1.0, 2.0]), Some(3.0), false },
    none_of_hit = { QualComparator::NoneOf(vec![1.0, 2.0]), Some(3.0), true },
    none_of_absent = { QualComparator::NoneOf(vec![1.0]), None, false },
)]
fn comparator(cmp: QualComparator, granted: Option<f64>, expected: bool) {
    assert_eq!(cmp.passes(granted), expected);
}

#[test]
fn empty_requirements_admit_everyone() {
    assert!(worker_passes(&[], &grants(&[])));
}

#[test]
fn all_requirements_must_pass() {
    let reqs = vec![
        QualificationReq::new("trained", QualComparator::Exists),
        QualificationReq::new("banned", QualComparator::NotExists),
    ];

    assert!(worker_passes(&reqs, &grants(&[("trained", 1.0)])));
    assert!(!worker_passes(&reqs, &grants(&[])));
    assert!(!worker_passes(
        &reqs,
        &grants(&[("trained", 1.0), ("banned", 1.0)])
    ));
}

#[test]
fn requirement_serde_round_trip() {
    let req = QualificationReq::new("score", QualComparator::GreaterThanOrEqualTo(0.8));
    let json = serde_json::to_string(&req).unwrap();
    let back: QualificationReq = serde_json::from_str(&json).unwrap();
    assert_eq!(back, req);
}

#[test]
fn requirement_json_shape_is_flat() {
    let req = QualificationReq::new("score", QualComparator::AnyOf(vec![1.0, 2.0]));
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(value["qualification_name"], "score");
    assert_eq!(value["comparator"], "any_of");
}
