// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign pool management.
//!
//! Contact records are imported onto the tail of a FIFO pool and drained
//! only by reservation, which atomically moves records from the pool head
//! into a new immutable [`Batch`](smsflow_core::Batch).

pub mod csv_io;
pub mod manager;
pub mod normalize;

pub use csv_io::{batch_to_csv, parse_csv};
pub use manager::{CampaignPool, ImportSummary};
pub use normalize::{normalize_records, Normalized};
