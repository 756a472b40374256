// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hive-store: persistence seam for run entities.
//!
//! The runtime only ever talks to the [`Store`] trait. `LocalStore` is the
//! in-process reference implementation; `EntityCache` adds get-or-create
//! caching in front of any store.

pub mod cache;
pub mod local;
pub mod store;

pub use cache::EntityCache;
pub use local::LocalStore;
pub use store::{Store, StoreError};
