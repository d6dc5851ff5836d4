// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event processing for smsflow.
//!
//! - [`EventDispatcher`] turns one webhook batch into delayed tasks.
//! - [`ConversationEngine`] handles one claimed task: it applies the inbound
//!   event to the contact's conversation and sends the scripted reply.
//! - [`OutboundDispatcher`] sends replies and keeps the device counters.
//! - [`WorkerPool`] pulls due tasks concurrently until cancelled.

pub mod conversation;
pub mod dispatcher;
pub mod outbound;
pub mod shutdown;
pub mod worker;

pub use conversation::{ConversationEngine, JobOutcome};
pub use dispatcher::{DelayWindow, DispatchSummary, EventDispatcher};
pub use outbound::{DispatchOutcome, OutboundDispatcher};
pub use worker::WorkerPool;

#[cfg(test)]
pub(crate) mod testing;
