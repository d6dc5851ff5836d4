// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Carrier gateway trait for outbound sends and device discovery.

use async_trait::async_trait;

use crate::error::SmsflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{DeviceInfo, OutboundSms};

/// Client for the external SMS gateway.
///
/// Implementations make exactly one attempt per call. A non-success
/// response, an unparsable body, or a timeout is a
/// [`SmsflowError::Delivery`].
#[async_trait]
pub trait SmsGateway: PluginAdapter {
    /// Sends one message through the given device.
    async fn send_message(&self, msg: &OutboundSms) -> Result<(), SmsflowError>;

    /// Lists the devices registered with the gateway.
    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, SmsflowError>;
}
