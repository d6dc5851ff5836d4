// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for smsflow integration tests.
//!
//! Provides a mock carrier gateway and a harness wired to a temp SQLite
//! database, so the webhook, engine, and campaign paths can be exercised
//! without a real gateway.
//!
//! # Components
//!
//! - [`MockGateway`] - Mock SMS gateway with captured sends and a failure switch
//! - [`TestHarness`] - Temp storage, config, and mock gateway in one place

pub mod harness;
pub mod mock_gateway;

pub use harness::{form_body, TestHarness, TestHarnessBuilder, TEST_ADMIN_TOKEN, TEST_SECRET};
pub use mock_gateway::MockGateway;
