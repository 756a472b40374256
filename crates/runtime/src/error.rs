// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime error taxonomy.
//!
//! The four recognized abnormal terminations are plain tagged values, not
//! error types to downcast: cleanup dispatch in the task supervisor is a
//! match over [`Termination`]. They end one unit or assignment, never the
//! whole run.

use thiserror::Error;

use hive_store::StoreError;

/// Why an execution ended without a normal submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Termination {
    /// The worker explicitly backed out of the task.
    #[error("agent returned the task")]
    Returned,

    /// No response within the configured window.
    #[error("agent timed out")]
    Timeout,

    /// The worker's connection is gone.
    #[error("agent disconnected")]
    Disconnected,

    /// A run-wide shutdown forced the execution to stop.
    #[error("run is shutting down")]
    Shutdown,
}

/// Error surface for task-logic implementations.
#[derive(Debug, Error)]
pub enum RunError {
    /// One of the recognized abnormal terminations.
    #[error(transparent)]
    Terminated(#[from] Termination),

    /// Anything else from task logic; logged and treated as a disconnect.
    #[error("task logic error: {0}")]
    Task(String),
}

/// How one execution ended, as reported to the worker pool.
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    /// Task logic finished and the worker submitted this payload.
    Submitted(serde_json::Value),
    /// One of the recognized abnormal terminations; cleanup already ran.
    Abnormal(Termination),
    /// Unexpected task-logic failure; cleanup already ran, error logged.
    Failed(String),
}

/// Errors from the coordination domain.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("channel error: {0}")]
    Channel(#[from] hive_wire::ChannelError),

    #[error("no agent found for id {0}")]
    UnknownAgent(String),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
