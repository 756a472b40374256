// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hive-runtime: live-run coordination for crowdsourced task work.
//!
//! The runtime splits into two concurrency domains. Coordination (packet
//! dispatch, registration, status reconciliation, unit launching) runs on
//! tokio tasks and never blocks. Execution (task logic that waits on human
//! input) gets one OS thread per in-flight unit, assignment, or onboarding,
//! supervised by [`TaskSupervisor`] and settled back into the
//! [`WorkerPool`] through [`RunnerEvent`]s. [`LiveRun`] assembles the whole
//! thing from an [`Architect`]'s channels and a [`Store`].
//!
//! [`Store`]: hive_store::Store

pub mod architect;
pub mod blueprint;
pub mod error;
pub mod io_handler;
pub mod launcher;
pub mod live_agent;
pub mod run;
pub mod runner;
pub mod worker_pool;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use architect::{Architect, ArchitectError};
pub use blueprint::{
    Blueprint, BlueprintError, GoldConfig, OnboardingConfig, Registry, ScreeningConfig,
    SharedState,
};
pub use error::{ExecOutcome, RunError, RuntimeError, Termination};
pub use io_handler::{channel_callbacks, ChannelEvent, ClientIOHandler};
pub use launcher::{AssignmentSource, TaskLauncher};
pub use live_agent::{LiveAgent, OnboardingAgent};
pub use run::{LiveRun, LiveRunOptions};
pub use runner::{RunnerEvent, TaskRunner, TaskSupervisor};
pub use worker_pool::{Outbound, WorkerPool};

#[cfg(any(test, feature = "test-support"))]
pub use test_support::MockArchitect;
