// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound reply dispatch.
//!
//! Sends are single attempts. A failure is logged and counted against the
//! device, never retried and never propagated.

use std::sync::Arc;

use smsflow_core::{OutboundSms, SmsGateway, StorageAdapter};
use tracing::{debug, warn};

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed(String),
    /// Blank text; no network call was made.
    Skipped,
}

pub struct OutboundDispatcher {
    gateway: Arc<dyn SmsGateway>,
    storage: Arc<dyn StorageAdapter>,
}

impl OutboundDispatcher {
    pub fn new(gateway: Arc<dyn SmsGateway>, storage: Arc<dyn StorageAdapter>) -> Self {
        Self { gateway, storage }
    }

    /// Sends `msg` and updates the device counters.
    ///
    /// `sent` counts every attempted send; `errors` additionally counts the
    /// failed ones.
    pub async fn dispatch(&self, msg: &OutboundSms) -> DispatchOutcome {
        if msg.message.trim().is_empty() {
            debug!(number = %msg.number, "blank reply skipped");
            return DispatchOutcome::Skipped;
        }

        let result = self.gateway.send_message(msg).await;

        if let Err(e) = self.storage.record_sent(&msg.device).await {
            warn!(device = %msg.device, error = %e, "failed to count sent message");
        }

        match result {
            Ok(()) => {
                debug!(number = %msg.number, device = %msg.device, message_type = %msg.message_type, "reply sent");
                DispatchOutcome::Sent
            }
            Err(e) => {
                warn!(number = %msg.number, device = %msg.device, error = %e, "reply delivery failed");
                if let Err(e) = self.storage.record_error(&msg.device).await {
                    warn!(device = %msg.device, error = %e, "failed to count delivery error");
                }
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}
