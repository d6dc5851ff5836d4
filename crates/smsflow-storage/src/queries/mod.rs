// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per table group. Each takes `&Database` and runs its
//! statements through the connection's background thread.

pub mod conversations;
pub mod devices;
pub mod pool;
pub mod settings;
pub mod tasks;
