// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agentflow-adapters: the three HTTP collaborators (§6.1) — `Llm`,
//! `SessionApi`, and the notifier's `ChannelTransport` — each a narrow
//! async trait with one `reqwest`-backed production implementation and
//! one in-memory fake gated behind the `test-support` feature.

pub mod llm;
pub mod notify;
pub mod session;

pub use llm::{HttpLlm, Llm, LlmError, LlmMessage, LlmRequest};
pub use notify::{
    ChannelResolver, ChannelTransport, DeliveryOutcome, HttpChannelTransport, NotifyChannel, NotifyError,
    NotifyMessage, Notifier,
};
pub use session::{HttpSessionApi, SessionApi, SessionError, SessionMessage};

#[cfg(any(test, feature = "test-support"))]
pub use llm::FakeLlm;
#[cfg(any(test, feature = "test-support"))]
pub use notify::fake::FakeChannelTransport;
#[cfg(any(test, feature = "test-support"))]
pub use session::FakeSessionApi;
