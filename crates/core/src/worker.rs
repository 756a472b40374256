// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identity.
//!
//! A Worker is the stable identity of a human participant across runs. It is
//! created on first registration and never deleted; admission decisions are
//! made with qualifications, not by removing the worker.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a worker.
    pub struct WorkerId;
}

/// Stable identity of a human participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    /// The crowd-provider-visible name for this worker.
    pub name: String,
    /// Blocked workers are refused at registration before any other gate.
    pub is_blocked: bool,
}

impl Worker {
    pub fn new(id: WorkerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_blocked: false,
        }
    }
}
