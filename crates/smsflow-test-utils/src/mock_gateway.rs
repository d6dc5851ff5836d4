// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock SMS gateway for deterministic testing.
//!
//! `MockGateway` implements `SmsGateway`, captures every outbound message
//! for assertions, and can be switched into a failing mode to exercise the
//! delivery-error path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use smsflow_core::traits::adapter::PluginAdapter;
use smsflow_core::traits::gateway::SmsGateway;
use smsflow_core::types::{AdapterType, DeviceInfo, HealthStatus, OutboundSms};
use smsflow_core::SmsflowError;

/// A mock carrier gateway for testing.
///
/// Every call to `send_message()` is captured, including calls made while
/// failing, so tests can assert on attempted deliveries.
pub struct MockGateway {
    sent: Arc<Mutex<Vec<OutboundSms>>>,
    failing: AtomicBool,
    devices: Vec<DeviceInfo>,
}

impl MockGateway {
    /// Create a mock gateway with two registered devices, ids 1 and 2.
    pub fn new() -> Self {
        let devices = [(1, "Phone A"), (2, "Phone B")]
            .into_iter()
            .map(|(id, name)| DeviceInfo {
                id: json!(id),
                name: Some(name.to_string()),
                model: Some("mock".to_string()),
                extra: serde_json::Map::new(),
            })
            .collect();
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
            devices,
        }
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Get all messages passed to `send_message()`.
    pub async fn sent_messages(&self) -> Vec<OutboundSms> {
        self.sent.lock().await.clone()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all captured messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, SmsflowError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SmsflowError> {
        Ok(())
    }
}

#[async_trait]
impl SmsGateway for MockGateway {
    async fn send_message(&self, msg: &OutboundSms) -> Result<(), SmsflowError> {
        self.sent.lock().await.push(msg.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(SmsflowError::delivery("mock gateway failure"));
        }
        Ok(())
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, SmsflowError> {
        Ok(self.devices.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsflow_core::types::{ContactNumber, DeviceId, MessageType};

    fn sms(text: &str) -> OutboundSms {
        OutboundSms {
            number: ContactNumber("+15550001".into()),
            message: text.into(),
            device: DeviceId("1".into()),
            message_type: MessageType::Sms,
        }
    }

    #[tokio::test]
    async fn captures_sends() {
        let gw = MockGateway::new();
        gw.send_message(&sms("hi")).await.unwrap();
        gw.send_message(&sms("again")).await.unwrap();
        assert_eq!(gw.sent_count().await, 2);
        assert_eq!(gw.sent_messages().await[1].message, "again");

        gw.clear_sent().await;
        assert_eq!(gw.sent_count().await, 0);
    }

    #[tokio::test]
    async fn failing_mode_still_captures() {
        let gw = MockGateway::new();
        gw.set_failing(true);
        assert!(gw.send_message(&sms("hi")).await.is_err());
        assert_eq!(gw.sent_count().await, 1);
    }

    #[tokio::test]
    async fn lists_two_devices() {
        let devices = MockGateway::new().list_devices().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, json!(1));
    }
}
