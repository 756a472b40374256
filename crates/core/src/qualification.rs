// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Qualification gate used by every admission decision.
//!
//! A qualification is a named, numerically-valued predicate attached to a
//! worker. Requirements pair a qualification name with a comparator; a worker
//! is admitted only when every requirement passes against their grants.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::worker::WorkerId;

crate::define_id! {
    /// Unique identifier for a qualification definition.
    pub struct QualificationId;
}

/// A named predicate definition that can be granted to workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub id: QualificationId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A (worker, qualification, value) grant.
///
/// At most one grant exists per (worker, qualification) pair; re-granting
/// overwrites the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantedQualification {
    pub worker_id: WorkerId,
    pub qualification_name: String,
    pub value: f64,
}

/// Comparator applied to a worker's granted value for one qualification.
///
/// `Exists`/`NotExists` test presence only; the rest compare the granted
/// value (an absent grant fails every value comparison).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "comparator", content = "value", rename_all = "snake_case")]
pub enum QualComparator {
    Exists,
    NotExists,
    EqualTo(f64),
    NotEqualTo(f64),
    LessThan(f64),
    GreaterThan(f64),
    LessThanOrEqualTo(f64),
    GreaterThanOrEqualTo(f64),
    AnyOf(Vec<f64>),
    NoneOf(Vec<f64>),
}

impl QualComparator {
    /// Evaluate against the worker's granted value, if any.
    pub fn passes(&self, granted: Option<f64>) -> bool {
        match self {
            QualComparator::Exists => granted.is_some(),
            QualComparator::NotExists => granted.is_none(),
            QualComparator::EqualTo(v) => granted == Some(*v),
            QualComparator::NotEqualTo(v) => matches!(granted, Some(g) if g != *v),
            QualComparator::LessThan(v) => matches!(granted, Some(g) if g < *v),
            QualComparator::GreaterThan(v) => matches!(granted, Some(g) if g > *v),
            QualComparator::LessThanOrEqualTo(v) => matches!(granted, Some(g) if g <= *v),
            QualComparator::GreaterThanOrEqualTo(v) => matches!(granted, Some(g) if g >= *v),
            QualComparator::AnyOf(vs) => matches!(granted, Some(g) if vs.contains(&g)),
            QualComparator::NoneOf(vs) => matches!(granted, Some(g) if !vs.contains(&g)),
        }
    }
}

/// One admission requirement: a qualification name plus a comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationReq {
    pub qualification_name: String,
    #[serde(flatten)]
    pub comparator: QualComparator,
}

impl QualificationReq {
    pub fn new(name: impl Into<String>, comparator: QualComparator) -> Self {
        Self {
            qualification_name: name.into(),
            comparator,
        }
    }
}

/// Check every requirement against a worker's grant map.
///
/// An empty requirement list admits everyone.
pub fn worker_passes(reqs: &[QualificationReq], granted: &HashMap<String, f64>) -> bool {
    reqs.iter().all(|req| {
        req.comparator
            .passes(granted.get(&req.qualification_name).copied())
    })
}

#[cfg(test)]
#[path = "qualification_tests.rs"]
mod tests;
