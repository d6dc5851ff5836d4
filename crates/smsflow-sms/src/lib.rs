// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Carrier SMS gateway client for smsflow.
//!
//! Implements [`smsflow_core::SmsGateway`] over the gateway's HTTP API:
//! a form-encoded send endpoint and a device listing endpoint, both
//! authenticated with the account API key.

pub mod client;
pub mod types;

pub use client::HttpSmsGateway;
