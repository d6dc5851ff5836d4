// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite durable store for smsflow.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-connection model via `tokio-rusqlite`. Holds the delayed task queue,
//! conversation state, the archived set, device counters, the campaign pool
//! with its batches, and the reply script.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
