// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Get-or-create caching in front of a [`Store`].
//!
//! Caches identity-stable entities only (workers, qualification
//! definitions); units and agents mutate status and are always read through.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use hive_core::{Qualification, Worker, WorkerId};

use crate::store::{Store, StoreError};

/// Id-keyed entity cache with explicit get-or-create semantics.
pub struct EntityCache {
    store: Arc<dyn Store>,
    workers_by_name: Mutex<HashMap<String, Worker>>,
    qualifications: Mutex<HashMap<String, Qualification>>,
}

impl EntityCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            workers_by_name: Mutex::new(HashMap::new()),
            qualifications: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Resolve a worker by crowd-provider name, creating on first sight.
    pub async fn get_or_create_worker(&self, name: &str) -> Result<Worker, StoreError> {
        if let Some(worker) = self.workers_by_name.lock().get(name) {
            return Ok(worker.clone());
        }

        let worker = match self.store.find_worker_by_name(name).await? {
            Some(worker) => worker,
            None => self.store.create_worker(name).await?,
        };
        self.workers_by_name
            .lock()
            .insert(name.to_string(), worker.clone());
        Ok(worker)
    }

    /// Drop a cached worker (after a blocked-flag change).
    pub fn invalidate_worker(&self, id: &WorkerId) {
        self.workers_by_name.lock().retain(|_, w| &w.id != id);
    }

    /// Resolve a qualification definition by name, creating on first sight.
    pub async fn get_or_create_qualification(
        &self,
        name: &str,
    ) -> Result<Qualification, StoreError> {
        if let Some(q) = self.qualifications.lock().get(name) {
            return Ok(q.clone());
        }
        let q = self.store.ensure_qualification(name).await?;
        self.qualifications.lock().insert(name.to_string(), q.clone());
        Ok(q)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
