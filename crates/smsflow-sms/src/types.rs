// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types of the gateway API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope returned by every gateway endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<GatewayErrorBody>,
}

/// Error detail reported by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayErrorBody {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GatewayResponse {
    /// The gateway's error message, or a generic one.
    pub fn error_message(&self) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| "gateway reported failure".to_string())
    }
}

/// Form fields of a send request.
#[derive(Debug, Clone, Serialize)]
pub struct SendForm<'a> {
    pub number: &'a str,
    pub message: &'a str,
    pub devices: &'a str,
    #[serde(rename = "type")]
    pub message_type: &'a str,
    pub prioritize: u8,
    pub key: &'a str,
}
