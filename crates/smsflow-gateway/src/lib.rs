// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of smsflow.
//!
//! Routes:
//! - `POST {webhook.path}`: inbound gateway webhook (signature checked)
//! - `GET /health`: public liveness and storage health
//! - `/admin/...`: operator JSON API, mounted only when a bearer token is set

pub mod admin;
pub mod auth;
pub mod error;
pub mod server;
pub mod signature;
pub mod webhook;

pub use server::{build_router, start_server, AppState, WebhookSettings};
pub use signature::SignatureVerifier;
