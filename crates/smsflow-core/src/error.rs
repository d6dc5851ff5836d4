// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for smsflow.

use thiserror::Error;

/// The primary error type used across all smsflow adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SmsflowError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Inbound payload signature missing or invalid.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Request or operation input rejected (missing field, malformed JSON,
    /// non-positive reservation total).
    #[error("validation error: {0}")]
    Validation(String),

    /// Reservation requested against an empty campaign pool.
    #[error("validation error: campaign pool is empty")]
    EmptyPool,

    /// Carrier gateway call failed, timed out, or reported failure.
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SmsflowError {
    /// Build a storage error from any boxed-compatible source.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }

    /// Build a delivery error without an underlying source.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error belongs to the validation class (client input problems).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::EmptyPool)
    }
}
