// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live run assembly and phased shutdown.
//!
//! `LiveRun::launch` wires the architect's channels, the IO handler, the
//! worker pool, the launcher, and the task supervisor together, and spawns
//! the coordination tasks: channel events, outbound traffic, runner events,
//! the status/staleness poll, assignment generation, and the launch loop.
//! Shutdown runs in phases, each bounded by the configured phase timeout,
//! so one stuck phase can never hang the process.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use hive_core::{Clock, IdGen, RunConfig, SystemClock, UnitStatus, UuidIdGen};
use hive_store::Store;

use crate::architect::Architect;
use crate::blueprint::{Blueprint, SharedState};
use crate::error::RuntimeError;
use crate::io_handler::{channel_callbacks, ChannelEvent, ClientIOHandler};
use crate::launcher::{AssignmentSource, TaskLauncher};
use crate::runner::{TaskRunner, TaskSupervisor};
use crate::worker_pool::WorkerPool;

/// Everything a live run needs beyond the architect and the store.
pub struct LiveRunOptions {
    pub config: RunConfig,
    pub blueprint: Arc<dyn Blueprint>,
    pub shared: SharedState,
    pub runner: Arc<dyn TaskRunner>,
    pub source: AssignmentSource,
    /// Reward per unit, in the crowd provider's currency.
    pub pay_amount: f64,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGen>,
}

impl LiveRunOptions {
    pub fn new(
        config: RunConfig,
        blueprint: Arc<dyn Blueprint>,
        runner: Arc<dyn TaskRunner>,
        source: AssignmentSource,
    ) -> Self {
        Self {
            config,
            blueprint,
            shared: SharedState::default(),
            runner,
            source,
            pay_amount: 0.0,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGen),
        }
    }
}

/// One live task run: coordination tasks plus handles for shutdown.
pub struct LiveRun {
    config: RunConfig,
    store: Arc<dyn Store>,
    pool: Arc<WorkerPool>,
    io: Arc<ClientIOHandler>,
    launcher: Arc<TaskLauncher>,
    tasks: Vec<JoinHandle<()>>,
}

impl LiveRun {
    /// Assemble and start a run.
    pub async fn launch(
        architect: &dyn Architect,
        store: Arc<dyn Store>,
        options: LiveRunOptions,
    ) -> Result<Self, RuntimeError> {
        let LiveRunOptions {
            config,
            blueprint,
            shared,
            runner,
            source,
            pay_amount,
            clock,
            ids,
        } = options;

        let (channel_tx, mut channel_rx) = mpsc::unbounded_channel::<ChannelEvent>();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let launcher = Arc::new(TaskLauncher::new(Arc::clone(&store), &config, pay_amount));
        let supervisor = TaskSupervisor::new(runner, event_tx, &config);
        let pool = Arc::new(WorkerPool::new(
            config.clone(),
            Arc::clone(&clock),
            Arc::clone(&store),
            blueprint,
            shared,
            Arc::clone(&launcher),
            supervisor,
            ids,
            outbound_tx,
        ));
        let io = Arc::new(ClientIOHandler::new(clock, Arc::clone(&pool)));

        let mut tasks = Vec::new();

        // Eager sources materialize and launch before the first packet can
        // be processed, so a registration arriving right after launch
        // already sees claimable units. Generator sources fill in from a
        // background task.
        if matches!(source, AssignmentSource::Eager(_)) {
            launcher.create_assignments(source).await?;
            launcher.launch_pass().await?;
        } else {
            let gen_launcher = Arc::clone(&launcher);
            tasks.push(tokio::spawn(async move {
                if let Err(e) = gen_launcher.create_assignments(source).await {
                    warn!(error = %e, "assignment generation failed");
                }
            }));
        }

        let channels = architect.get_channels(channel_callbacks(channel_tx)).await;
        info!(channels = channels.len(), "launching live run");
        for channel in channels {
            io.add_channel(channel)?;
        }

        // Channel lifecycle and inbound packets.
        let channel_io = Arc::clone(&io);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = channel_rx.recv().await {
                match event {
                    ChannelEvent::Open(id) => channel_io.handle_open(&id),
                    ChannelEvent::Catastrophic(id) => channel_io.handle_catastrophic(&id).await,
                    ChannelEvent::Message(id, packet) => {
                        channel_io.handle_message(&id, packet).await;
                    }
                }
            }
        }));

        // Pool-originated traffic onto the wire.
        let outbound_io = Arc::clone(&io);
        tasks.push(tokio::spawn(async move {
            while let Some(outbound) = outbound_rx.recv().await {
                outbound_io.handle_outbound(outbound);
            }
        }));

        // Execution outcomes back into the pool.
        let event_pool = Arc::clone(&pool);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                event_pool.handle_runner_event(event).await;
            }
        }));

        // Periodic status reconciliation and staleness sweep.
        let poll_io = Arc::clone(&io);
        let poll_pool = Arc::clone(&pool);
        let poll_interval = config.status_poll_interval();
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                poll_io.broadcast_status_request();
                poll_pool.sweep_stale_agents().await;
            }
        }));

        // Top-up passes for capacity freed by completed units.
        let loop_launcher = Arc::clone(&launcher);
        tasks.push(tokio::spawn(async move {
            loop_launcher.launch_units().await;
        }));

        Ok(Self {
            config,
            store,
            pool,
            io,
            launcher,
            tasks,
        })
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn io(&self) -> &Arc<ClientIOHandler> {
        &self.io
    }

    pub fn launcher(&self) -> &Arc<TaskLauncher> {
        &self.launcher
    }

    /// Whether the run has nothing left to do: generation finished, every
    /// unit terminal.
    pub async fn is_complete(&self) -> Result<bool, RuntimeError> {
        if !self.launcher.is_fully_done() {
            return Ok(false);
        }
        for status in [UnitStatus::Created, UnitStatus::Launched, UnitStatus::Assigned] {
            if !self.store.units_with_status(status).await?.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Block until [`is_complete`] holds.
    pub async fn wait_until_complete(&self) -> Result<(), RuntimeError> {
        let poll = self.config.generator_poll_interval();
        loop {
            if self.is_complete().await? {
                return Ok(());
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Phased shutdown; every phase is bounded by the configured timeout.
    pub async fn shutdown(mut self) {
        let phase = self.config.shutdown_phase_timeout();
        info!("shutting down live run");

        // Phase 1: stop admitting, terminate live executions.
        self.pool.begin_shutdown();
        self.launcher.stop();

        // Phase 2: expire whatever is still circulating.
        if tokio::time::timeout(phase, self.launcher.expire_units())
            .await
            .is_err()
        {
            warn!("unit expiry did not finish inside the shutdown phase");
        }

        // Phase 3: drop the transports.
        self.io.close_all();

        // Phase 4: join execution threads off the async runtime.
        let pool = Arc::clone(&self.pool);
        match tokio::task::spawn_blocking(move || pool.join_executions(phase)).await {
            Ok(0) => info!("all execution threads joined"),
            Ok(abandoned) => warn!(abandoned, "execution threads abandoned at shutdown"),
            Err(e) => warn!(error = %e, "failed to join execution threads"),
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("live run stopped");
    }
}

impl Drop for LiveRun {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
