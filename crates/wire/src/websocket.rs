// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Websocket reference transport.
//!
//! A driver task owns the socket: it connects, pumps the outgoing queue,
//! decodes inbound frames, and reconnects on recoverable failures with a
//! fixed backoff while `is_alive()` reports false. Once the socket has been
//! down longer than the death timeout (or the initial connect times out),
//! the channel escalates to catastrophic exactly once and stops retrying.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelCallbacks, ChannelError, ChannelStatus};
use crate::packet::Packet;

/// Outgoing queue depth before `enqueue_send` reports unwritable.
const OUTGOING_QUEUE_SIZE: usize = 256;

struct Inner {
    id: String,
    status: Mutex<ChannelStatus>,
    opened: AtomicBool,
    closed: AtomicBool,
    catastrophic_fired: AtomicBool,
    outgoing_tx: Mutex<Option<mpsc::Sender<Packet>>>,
    shutdown: Notify,
    callbacks: ChannelCallbacks,
}

impl Inner {
    fn set_status(&self, status: ChannelStatus) {
        *self.status.lock() = status;
    }

    /// Fires `on_catastrophic` at most once for the channel's lifetime.
    fn escalate(&self) {
        if !self.catastrophic_fired.swap(true, Ordering::SeqCst) {
            self.set_status(ChannelStatus::Dead);
            (self.callbacks.on_catastrophic)(&self.id);
        }
    }
}

/// Websocket-backed [`Channel`].
pub struct WebsocketChannel {
    url: String,
    backoff: Duration,
    death_timeout: Duration,
    inner: Arc<Inner>,
}

impl WebsocketChannel {
    pub fn new(
        channel_id: impl Into<String>,
        url: impl Into<String>,
        backoff: Duration,
        death_timeout: Duration,
        callbacks: ChannelCallbacks,
    ) -> Self {
        Self {
            url: url.into(),
            backoff,
            death_timeout,
            inner: Arc::new(Inner {
                id: channel_id.into(),
                status: Mutex::new(ChannelStatus::Connecting),
                opened: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                catastrophic_fired: AtomicBool::new(false),
                outgoing_tx: Mutex::new(None),
                shutdown: Notify::new(),
                callbacks,
            }),
        }
    }

    async fn drive(
        inner: Arc<Inner>,
        url: String,
        backoff: Duration,
        death_timeout: Duration,
        mut outgoing_rx: mpsc::Receiver<Packet>,
    ) {
        // The initial connect gets one bounded attempt; a timeout here is
        // unrecoverable.
        let mut first_attempt = true;
        let mut down_since = Instant::now();

        loop {
            if inner.closed.load(Ordering::SeqCst) {
                return;
            }

            let connected = tokio::time::timeout(death_timeout, connect_async(&url)).await;
            let ws = match connected {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(e)) => {
                    if first_attempt {
                        warn!(channel = %inner.id, error = %e, "initial connect failed");
                        inner.escalate();
                        return;
                    }
                    if down_since.elapsed() >= death_timeout {
                        warn!(channel = %inner.id, error = %e, "reconnect window exhausted");
                        inner.escalate();
                        return;
                    }
                    debug!(channel = %inner.id, error = %e, "reconnect attempt failed");
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                Err(_elapsed) => {
                    warn!(channel = %inner.id, "connect timed out");
                    inner.escalate();
                    return;
                }
            };

            first_attempt = false;
            inner.set_status(ChannelStatus::Alive);
            info!(channel = %inner.id, "channel open");
            (inner.callbacks.on_open)(&inner.id);

            let (mut sink, mut stream) = ws.split();

            // Pump until the socket drops or the owner closes us.
            loop {
                tokio::select! {
                    _ = inner.shutdown.notified() => {
                        let _ = sink.send(Message::Close(None)).await;
                        inner.set_status(ChannelStatus::Closed);
                        return;
                    }
                    outgoing = outgoing_rx.recv() => {
                        let Some(packet) = outgoing else {
                            inner.set_status(ChannelStatus::Closed);
                            return;
                        };
                        let text = match packet.to_json() {
                            Ok(text) => text,
                            Err(e) => {
                                warn!(channel = %inner.id, error = %e, "dropping unencodable packet");
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            debug!(channel = %inner.id, error = %e, "send failed, socket lost");
                            break;
                        }
                    }
                    frame = stream.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => {
                                match Packet::from_json(&text) {
                                    Ok(packet) => (inner.callbacks.on_message)(&inner.id, packet),
                                    Err(e) => {
                                        warn!(channel = %inner.id, error = %e, "dropping malformed packet");
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(payload))) => {
                                let _ = sink.send(Message::Pong(payload)).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!(channel = %inner.id, "socket closed by peer");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                debug!(channel = %inner.id, error = %e, "socket error");
                                break;
                            }
                        }
                    }
                }
            }

            // Recoverable loss: reconnect with fixed backoff until the
            // death timeout elapses.
            inner.set_status(ChannelStatus::Connecting);
            down_since = Instant::now();
            tokio::time::sleep(backoff).await;
        }
    }
}

impl Channel for WebsocketChannel {
    fn channel_id(&self) -> &str {
        &self.inner.id
    }

    fn open(&self) -> Result<(), ChannelError> {
        if self.inner.opened.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }

        let (tx, rx) = mpsc::channel(OUTGOING_QUEUE_SIZE);
        *self.inner.outgoing_tx.lock() = Some(tx);

        tokio::spawn(Self::drive(
            Arc::clone(&self.inner),
            self.url.clone(),
            self.backoff,
            self.death_timeout,
            rx,
        ));
        Ok(())
    }

    fn is_alive(&self) -> bool {
        *self.inner.status.lock() == ChannelStatus::Alive
    }

    fn status(&self) -> ChannelStatus {
        *self.inner.status.lock()
    }

    fn enqueue_send(&self, packet: Packet) -> bool {
        if !self.is_alive() {
            return false;
        }
        let guard = self.inner.outgoing_tx.lock();
        match guard.as_ref() {
            Some(tx) => tx.try_send(packet).is_ok(),
            None => false,
        }
    }

    fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.set_status(ChannelStatus::Closed);
        self.inner.shutdown.notify_waiters();
        // Drop the sender so a parked driver task unblocks.
        self.inner.outgoing_tx.lock().take();
    }
}
