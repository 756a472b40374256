// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles for runs without a real deployment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use hive_wire::{Channel, ChannelCallbacks, MockChannel, MockRemote};

use crate::architect::{Architect, ArchitectError};

/// Architect backed by in-memory channels; tests drive the remote side.
pub struct MockArchitect {
    channel_count: usize,
    remotes: Mutex<Vec<MockRemote>>,
}

impl MockArchitect {
    pub fn new(channel_count: usize) -> Self {
        Self {
            channel_count,
            remotes: Mutex::new(Vec::new()),
        }
    }

    /// Remote handles for every channel handed out so far.
    pub fn remotes(&self) -> Vec<MockRemote> {
        self.remotes.lock().clone()
    }
}

#[async_trait]
impl Architect for MockArchitect {
    async fn get_channels(&self, callbacks: ChannelCallbacks) -> Vec<Arc<dyn Channel>> {
        (0..self.channel_count)
            .map(|i| {
                let (channel, remote) = MockChannel::new(format!("mock-{i}"), callbacks.clone());
                self.remotes.lock().push(remote);
                Arc::new(channel) as Arc<dyn Channel>
            })
            .collect()
    }

    async fn download_file(&self, name: &str, dir: &Path) -> Result<PathBuf, ArchitectError> {
        let path = dir.join(name);
        tokio::fs::write(&path, b"")
            .await
            .map_err(|e| ArchitectError::Download {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(path)
    }
}
