// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assignment production and unit launching.
//!
//! Assignments come from an eager list or a backpressured generator; units
//! are promoted into the launched state in periodic passes, bounded by the
//! concurrency cap. Screening and gold units bypass both the pool and the
//! cap. "Are more assignments possibly coming" is observable independently
//! of "is the unlaunched pool empty": both true at once is the only valid
//! termination signal.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use hive_core::{
    InitializationData, RunConfig, Unit, UnitId, UnitStatus, GOLD_UNIT_INDEX,
    SCREENING_UNIT_INDEX,
};
use hive_store::{Store, StoreError};

/// Where assignment data comes from.
pub enum AssignmentSource {
    /// Materialize everything up front.
    Eager(Vec<InitializationData>),
    /// Pull lazily; the channel closing marks exhaustion.
    Generator(mpsc::Receiver<InitializationData>),
}

/// Produces assignments/units and rate-limits their launch.
pub struct TaskLauncher {
    store: Arc<dyn Store>,
    pay_amount: f64,
    max_concurrent: usize,
    generator_poll: Duration,
    launch_interval: Duration,
    /// Every unit this run created, for best-effort expiry at shutdown.
    tracked: Mutex<Vec<UnitId>>,
    /// Created, not yet launched, in creation order.
    unlaunched: Mutex<VecDeque<UnitId>>,
    generation_done: AtomicBool,
    stop: Notify,
}

impl TaskLauncher {
    pub fn new(store: Arc<dyn Store>, config: &RunConfig, pay_amount: f64) -> Self {
        Self {
            store,
            pay_amount,
            max_concurrent: config.max_num_concurrent_units,
            generator_poll: config.generator_poll_interval(),
            launch_interval: config.launch_pass_interval(),
            tracked: Mutex::new(Vec::new()),
            unlaunched: Mutex::new(VecDeque::new()),
            generation_done: AtomicBool::new(false),
            stop: Notify::new(),
        }
    }

    /// Whether the assignment source can still produce more.
    pub fn generation_done(&self) -> bool {
        self.generation_done.load(Ordering::SeqCst)
    }

    pub fn has_unlaunched(&self) -> bool {
        !self.unlaunched.lock().is_empty()
    }

    /// The only valid termination signal for the launch loop.
    pub fn is_fully_done(&self) -> bool {
        self.generation_done() && !self.has_unlaunched()
    }

    /// Stop background loops (shutdown).
    pub fn stop(&self) {
        self.generation_done.store(true, Ordering::SeqCst);
        self.stop.notify_waiters();
    }

    async fn materialize(&self, data: InitializationData) -> Result<(), StoreError> {
        let assignment = self.store.create_assignment(&data).await?;
        for index in 0..data.unit_count() {
            let unit = self
                .store
                .create_unit(&assignment.id, index as i32, self.pay_amount)
                .await?;
            self.tracked.lock().push(unit.id.clone());
            self.unlaunched.lock().push_back(unit.id);
        }
        Ok(())
    }

    /// Turn the data source into assignments and units.
    ///
    /// Eager sources materialize immediately; generator sources run until
    /// exhaustion, sleeping between pulls. Marks generation done on return.
    pub async fn create_assignments(&self, source: AssignmentSource) -> Result<(), StoreError> {
        let result = match source {
            AssignmentSource::Eager(list) => {
                for data in list {
                    self.materialize(data).await?;
                }
                Ok(())
            }
            AssignmentSource::Generator(mut rx) => loop {
                tokio::select! {
                    _ = self.stop.notified() => break Ok(()),
                    next = rx.recv() => {
                        let Some(data) = next else { break Ok(()) };
                        self.materialize(data).await?;
                        tokio::time::sleep(self.generator_poll).await;
                    }
                }
            },
        };
        self.generation_done.store(true, Ordering::SeqCst);
        info!("assignment generation done");
        result
    }

    /// One launch pass: reap terminal units, then top up to the cap.
    ///
    /// Returns how many units were launched this pass.
    pub async fn launch_pass(&self) -> Result<usize, StoreError> {
        // Reap: drop terminal units from tracking of the active count.
        let tracked: Vec<UnitId> = self.tracked.lock().clone();
        let mut active = 0usize;
        for unit_id in &tracked {
            let unit = self.store.get_unit(unit_id).await?;
            if unit.is_quality_control() {
                continue;
            }
            if matches!(unit.status, UnitStatus::Launched | UnitStatus::Assigned) {
                active += 1;
            }
        }

        let capacity = if self.max_concurrent == 0 {
            usize::MAX
        } else {
            self.max_concurrent.saturating_sub(active)
        };

        let mut launched = 0;
        for _ in 0..capacity {
            let Some(unit_id) = self.unlaunched.lock().pop_front() else {
                break;
            };
            self.store
                .update_unit_status(&unit_id, UnitStatus::Launched)
                .await?;
            launched += 1;
        }
        if launched > 0 {
            debug!(launched, active, "launch pass");
        }
        Ok(launched)
    }

    /// Keep the launched pool topped up until generation is done and the
    /// unlaunched pool drains.
    pub async fn launch_units(&self) {
        loop {
            if let Err(e) = self.launch_pass().await {
                warn!(error = %e, "launch pass failed");
            }
            if self.is_fully_done() {
                break;
            }
            tokio::select! {
                _ = self.stop.notified() => break,
                _ = tokio::time::sleep(self.launch_interval) => {}
            }
        }
    }

    async fn launch_quality_control(
        &self,
        data: serde_json::Value,
        unit_index: i32,
    ) -> Result<Unit, StoreError> {
        let assignment = self
            .store
            .create_assignment(&InitializationData::single(data))
            .await?;
        let unit = self
            .store
            .create_unit(&assignment.id, unit_index, self.pay_amount)
            .await?;
        self.store
            .update_unit_status(&unit.id, UnitStatus::Launched)
            .await?;
        self.tracked.lock().push(unit.id.clone());
        self.store.get_unit(&unit.id).await
    }

    /// Create and immediately launch a screening unit, out-of-band from the
    /// normal pool and the concurrency cap.
    pub async fn launch_screening_unit(
        &self,
        data: serde_json::Value,
    ) -> Result<Unit, StoreError> {
        self.launch_quality_control(data, SCREENING_UNIT_INDEX).await
    }

    /// Create and immediately launch a gold unit.
    pub async fn launch_gold_unit(&self, data: serde_json::Value) -> Result<Unit, StoreError> {
        self.launch_quality_control(data, GOLD_UNIT_INDEX).await
    }

    /// Best-effort expiry of every tracked unit; one failure never stops
    /// the rest.
    pub async fn expire_units(&self) {
        let tracked: Vec<UnitId> = self.tracked.lock().clone();
        for unit_id in tracked {
            let status = match self.store.get_unit(&unit_id).await {
                Ok(unit) => unit.status,
                Err(e) => {
                    warn!(unit = %unit_id, error = %e, "failed to read unit during expiry");
                    continue;
                }
            };
            if status.is_terminal() {
                continue;
            }
            if let Err(e) = self
                .store
                .update_unit_status(&unit_id, UnitStatus::Expired)
                .await
            {
                warn!(unit = %unit_id, error = %e, "failed to expire unit");
            }
        }
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
