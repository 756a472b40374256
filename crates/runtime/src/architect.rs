// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment seam.
//!
//! An architect owns where the server-facing routers run (a cloud host, a
//! local process) and hands the runtime its channels. Deployment mechanics
//! are entirely out of this crate's hands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use hive_wire::{Channel, ChannelCallbacks};

/// Architect errors
#[derive(Debug, Error)]
pub enum ArchitectError {
    #[error("download failed for {name}: {reason}")]
    Download { name: String, reason: String },

    #[error("deployment error: {0}")]
    Deploy(String),
}

/// Provider of channels to deployed routers.
#[async_trait]
pub trait Architect: Send + Sync {
    /// Build one channel per deployed router, wired to the given callbacks.
    /// The runtime opens and closes them.
    async fn get_channels(&self, callbacks: ChannelCallbacks) -> Vec<Arc<dyn Channel>>;

    /// Fetch a worker-uploaded file from the deployment into `dir`.
    async fn download_file(&self, name: &str, dir: &Path) -> Result<PathBuf, ArchitectError>;
}
