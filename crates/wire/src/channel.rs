// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One duplex logical connection carrying packets.
//!
//! Transports implement [`Channel`]; the IO handler only ever sees this
//! trait. Inbound packets and lifecycle changes are delivered through
//! [`ChannelCallbacks`] supplied at construction.

use std::sync::Arc;

use thiserror::Error;

use crate::packet::Packet;

/// Channel errors
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("channel is closed")]
    Closed,
}

/// Observable lifecycle of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Not yet opened, or between reconnect attempts.
    Connecting,
    /// Transport is live and writable.
    Alive,
    /// Unrecoverable failure; `on_catastrophic` has fired.
    Dead,
    /// Closed by the owner.
    Closed,
}

/// Callbacks a transport invokes from its driver task.
///
/// `on_open` fires once per established connection, `on_message` once per
/// inbound packet, `on_catastrophic` exactly once if the transport gives up.
#[derive(Clone)]
pub struct ChannelCallbacks {
    pub on_open: Arc<dyn Fn(&str) + Send + Sync>,
    pub on_catastrophic: Arc<dyn Fn(&str) + Send + Sync>,
    pub on_message: Arc<dyn Fn(&str, Packet) + Send + Sync>,
}

impl ChannelCallbacks {
    pub fn new(
        on_open: impl Fn(&str) + Send + Sync + 'static,
        on_catastrophic: impl Fn(&str) + Send + Sync + 'static,
        on_message: impl Fn(&str, Packet) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_open: Arc::new(on_open),
            on_catastrophic: Arc::new(on_catastrophic),
            on_message: Arc::new(on_message),
        }
    }

    /// Callbacks that drop everything; useful as a placeholder in tests.
    pub fn noop() -> Self {
        Self::new(|_| {}, |_| {}, |_, _| {})
    }
}

impl std::fmt::Debug for ChannelCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelCallbacks").finish_non_exhaustive()
    }
}

/// One duplex logical connection.
pub trait Channel: Send + Sync {
    /// Stable identifier for routing replies back to this channel.
    fn channel_id(&self) -> &str;

    /// Establish the transport. Idempotent: a second call on an open
    /// channel is a no-op. Must be called from within a tokio runtime.
    fn open(&self) -> Result<(), ChannelError>;

    /// Whether the transport is currently live and writable.
    fn is_alive(&self) -> bool;

    fn status(&self) -> ChannelStatus;

    /// Queue a packet for sending. Returns false (without blocking) when
    /// the transport is not currently writable or the queue is full.
    fn enqueue_send(&self, packet: Packet) -> bool;

    /// Release all transport resources. Safe to call twice.
    fn close(&self);
}
