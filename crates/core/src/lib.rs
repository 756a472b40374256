// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hive-core: data model for the crowdsourcing live-run coordination runtime.
//!
//! Pure value types shared by every other crate: entity ids, workers, units,
//! assignments, the agent status state machine, the qualification gate, and
//! run configuration. No IO lives here.

pub mod agent;
pub mod assignment;
pub mod clock;
pub mod config;
pub mod details;
pub mod id;
pub mod qualification;
pub mod status;
pub mod unit;
pub mod worker;

pub use agent::AgentRecord;
pub use assignment::{Assignment, AssignmentId, InitializationData};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, RunConfig};
pub use details::{AgentDetails, RegistrationFailure};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use qualification::{
    worker_passes, GrantedQualification, QualComparator, Qualification, QualificationId,
    QualificationReq,
};
pub use status::AgentStatus;
pub use unit::{Unit, UnitId, UnitStatus, GOLD_UNIT_INDEX, SCREENING_UNIT_INDEX};
pub use worker::{Worker, WorkerId};

crate::define_id! {
    /// Unique identifier for one worker's live attempt at one unit.
    pub struct AgentId;
}

crate::define_id! {
    /// Correlation id tying an inbound registration request to its reply.
    pub struct RequestId;
}
