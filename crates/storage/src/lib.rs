// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentflow-storage: the durable, single-writer state store (§4, §6.5).
//! `Store` owns the WAL and the in-memory [`state::MaterializedState`]
//! projection derived from it; `SignalQueue` durably queues operator
//! control signals between submission and application.

pub mod error;
pub mod paths;
pub mod signal_queue;
pub mod state;
pub mod store;
pub mod wal;

pub use error::{StorageError, StorageResult};
pub use paths::{resolve_base_path, ProjectPaths};
pub use signal_queue::SignalQueue;
pub use state::MaterializedState;
pub use store::{SharedStore, Store, HEARTBEAT_THROTTLE_MS};
pub use wal::Wal;
