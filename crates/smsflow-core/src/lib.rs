// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for smsflow.
//!
//! This crate provides the error type, the domain types, the reply-script
//! state machine, and the adapter traits implemented by the storage and
//! carrier gateway crates.

pub mod error;
pub mod script;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SmsflowError;
pub use script::{ReplyMode, ReplyScript, Transition};
pub use types::{
    AdapterType, Batch, BatchSummary, ContactNumber, ContactRecord, Conversation, DeviceId,
    DeviceInfo, DeviceStats, EventId, HealthStatus, InboundEvent, MessageType, OutboundSms,
    PoolStatus, QueuedTask,
};

pub use traits::{PluginAdapter, SmsGateway, StorageAdapter};
