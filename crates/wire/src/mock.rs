// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory channel for tests.
//!
//! `MockChannel` implements [`Channel`] for the server side; the paired
//! [`MockRemote`] plays the client-facing router: it injects inbound
//! packets (including redeliveries), inspects what the server sent, and
//! scripts connection loss.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::{Channel, ChannelCallbacks, ChannelError, ChannelStatus};
use crate::packet::Packet;

struct MockInner {
    id: String,
    opened: AtomicBool,
    alive: AtomicBool,
    closed: AtomicBool,
    writable: AtomicBool,
    catastrophic_fired: AtomicBool,
    sent: Mutex<Vec<Packet>>,
    callbacks: ChannelCallbacks,
}

/// Test-side handle for a [`MockChannel`].
#[derive(Clone)]
pub struct MockRemote {
    inner: Arc<MockInner>,
}

impl MockRemote {
    /// Inject an inbound packet, as if decoded off the wire.
    pub fn deliver(&self, packet: Packet) {
        (self.inner.callbacks.on_message)(&self.inner.id, packet);
    }

    /// Drain everything the server has sent so far.
    pub fn take_sent(&self) -> Vec<Packet> {
        std::mem::take(&mut self.inner.sent.lock())
    }

    /// Packets sent and not yet drained.
    pub fn sent_count(&self) -> usize {
        self.inner.sent.lock().len()
    }

    /// Simulate backpressure: `enqueue_send` returns false while unwritable.
    pub fn set_writable(&self, writable: bool) {
        self.inner.writable.store(writable, Ordering::SeqCst);
    }

    /// Simulate a recoverable connection loss.
    pub fn drop_connection(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
    }

    /// Restore the connection and fire `on_open` again.
    pub fn reconnect(&self) {
        self.inner.alive.store(true, Ordering::SeqCst);
        (self.inner.callbacks.on_open)(&self.inner.id);
    }

    /// Simulate an unrecoverable failure; fires `on_catastrophic` once.
    pub fn fail_catastrophically(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
        if !self.inner.catastrophic_fired.swap(true, Ordering::SeqCst) {
            (self.inner.callbacks.on_catastrophic)(&self.inner.id);
        }
    }
}

/// In-memory [`Channel`] implementation.
pub struct MockChannel {
    inner: Arc<MockInner>,
}

impl MockChannel {
    pub fn new(channel_id: impl Into<String>, callbacks: ChannelCallbacks) -> (Self, MockRemote) {
        let inner = Arc::new(MockInner {
            id: channel_id.into(),
            opened: AtomicBool::new(false),
            alive: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            writable: AtomicBool::new(true),
            catastrophic_fired: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            callbacks,
        });
        (
            Self {
                inner: Arc::clone(&inner),
            },
            MockRemote { inner },
        )
    }
}

impl Channel for MockChannel {
    fn channel_id(&self) -> &str {
        &self.inner.id
    }

    fn open(&self) -> Result<(), ChannelError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        if self.inner.opened.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.alive.store(true, Ordering::SeqCst);
        (self.inner.callbacks.on_open)(&self.inner.id);
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst) && !self.inner.closed.load(Ordering::SeqCst)
    }

    fn status(&self) -> ChannelStatus {
        if self.inner.closed.load(Ordering::SeqCst) {
            ChannelStatus::Closed
        } else if self.inner.catastrophic_fired.load(Ordering::SeqCst) {
            ChannelStatus::Dead
        } else if self.is_alive() {
            ChannelStatus::Alive
        } else {
            ChannelStatus::Connecting
        }
    }

    fn enqueue_send(&self, packet: Packet) -> bool {
        if !self.is_alive() || !self.inner.writable.load(Ordering::SeqCst) {
            return false;
        }
        self.inner.sent.lock().push(packet);
        true
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.alive.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
