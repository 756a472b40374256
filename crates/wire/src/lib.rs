// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hive-wire: the packet wire format and the duplex channel abstraction.
//!
//! A `Channel` is one logical duplex connection carrying `Packet`s between
//! the server and a client-facing router. `WebsocketChannel` is the
//! reference transport; tests use the in-memory `MockChannel` behind the
//! `test-support` feature.

pub mod channel;
pub mod packet;
pub mod websocket;

#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use channel::{Channel, ChannelCallbacks, ChannelError, ChannelStatus};
pub use packet::{MalformedPacket, Packet, PacketType, SYSTEM_CHANNEL_ID};
pub use websocket::WebsocketChannel;

#[cfg(any(test, feature = "test-support"))]
pub use mock::{MockChannel, MockRemote};
