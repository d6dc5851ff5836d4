// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the smsflow pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::SmsflowError;

/// Phone number identifying a contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactNumber(pub String);

/// Gateway-assigned identifier of one inbound message event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

/// Identifier of a gateway device (a phone attached to the carrier gateway).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl fmt::Display for ContactNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl EventId {
    /// Last five characters of the id, used in log lines.
    pub fn short(&self) -> &str {
        let start = self
            .0
            .char_indices()
            .rev()
            .nth(4)
            .map(|(i, _)| i)
            .unwrap_or(0);
        &self.0[start..]
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Gateway,
}

/// Message type accepted by the carrier gateway.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageType {
    /// Plain text message.
    Sms,
    /// Rich message.
    #[default]
    Mms,
}

// --- Inbound ---

/// One inbound message notification from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: EventId,
    pub number: ContactNumber,
    pub device: DeviceId,
}

impl InboundEvent {
    /// Parses one element of a webhook event array.
    ///
    /// `ID`, `number` and `deviceID` are required; `device` is accepted in place
    /// of `deviceID`. Ids and device ids may be JSON strings or numbers. Extra
    /// keys are ignored.
    pub fn from_value(value: &Value) -> Result<Self, SmsflowError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SmsflowError::Validation("event is not a JSON object".into()))?;

        let id = scalar_field(obj.get("ID"))
            .ok_or_else(|| SmsflowError::Validation("event is missing `ID`".into()))?;
        let number = scalar_field(obj.get("number"))
            .ok_or_else(|| SmsflowError::Validation("event is missing `number`".into()))?;
        let device = device_field(value)
            .ok_or_else(|| SmsflowError::Validation("event is missing `deviceID`".into()))?;

        Ok(Self {
            id: EventId(id),
            number: ContactNumber(number),
            device,
        })
    }

    /// Parses the raw JSON text of one queued event.
    pub fn from_json(payload: &str) -> Result<Self, SmsflowError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| SmsflowError::Validation(format!("invalid event JSON: {e}")))?;
        Self::from_value(&value)
    }
}

/// Extracts the device id of a raw event element, if it carries one.
pub fn device_field(value: &Value) -> Option<DeviceId> {
    let obj = value.as_object()?;
    scalar_field(obj.get("deviceID"))
        .or_else(|| scalar_field(obj.get("device")))
        .map(DeviceId)
}

/// Extracts the event id of a raw event element, if it carries one.
pub fn event_id_field(value: &Value) -> Option<EventId> {
    scalar_field(value.as_object()?.get("ID")).map(EventId)
}

fn scalar_field(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

// --- Conversation ---

/// Per-contact conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub number: ContactNumber,
    /// Index into the reply script.
    pub step: u32,
    /// Device that last received a message from this contact.
    pub device: Option<DeviceId>,
    /// Inbound events seen for this contact.
    pub in_count: u32,
    /// Most recent event ids already acted on, oldest first.
    pub processed_ids: Vec<String>,
}

impl Conversation {
    /// A fresh conversation at step 0.
    pub fn new(number: ContactNumber) -> Self {
        Self {
            number,
            step: 0,
            device: None,
            in_count: 0,
            processed_ids: Vec::new(),
        }
    }

    /// Whether the event id has already been acted on.
    pub fn has_processed(&self, id: &EventId) -> bool {
        self.processed_ids.iter().any(|p| *p == id.0)
    }

    /// Records an event id, keeping only the `cap` most recent.
    pub fn mark_processed(&mut self, id: &EventId, cap: usize) {
        if !self.has_processed(id) {
            self.processed_ids.push(id.0.clone());
        }
        let cap = cap.max(1);
        if self.processed_ids.len() > cap {
            let excess = self.processed_ids.len() - cap;
            self.processed_ids.drain(..excess);
        }
    }
}

// --- Outbound ---

/// A message to be sent through the carrier gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundSms {
    pub number: ContactNumber,
    pub message: String,
    pub device: DeviceId,
    pub message_type: MessageType,
}

/// Device descriptor returned by the gateway device listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "ID", alias = "id")]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Any other descriptor fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// --- Device stats ---

/// Per-device traffic counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub device: String,
    pub received: u64,
    pub sent: u64,
    pub errors: u64,
    /// RFC 3339 timestamp of the last received event.
    pub last_seen: Option<String>,
    /// Cycle generation index, incremented by an operator action.
    pub cycle: u64,
    pub cycle_received: u64,
    pub cycle_sent: u64,
}

// --- Campaign pool ---

/// One imported contact: a designated number plus arbitrary variable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub number: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl ContactRecord {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Batch metadata without its reserved items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: i64,
    pub devices: Vec<String>,
    pub per_device: u32,
    pub requested_total: u64,
    pub taken_total: u64,
    pub remaining_after: u64,
    pub created_at: String,
}

/// An immutable, atomically reserved slice of the campaign pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(flatten)]
    pub summary: BatchSummary,
    pub items: Vec<ContactRecord>,
}

/// Pool occupancy reported to the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Records waiting for reservation.
    pub pool_size: u64,
    /// Records consumed into batches (audit archive).
    pub consumed: u64,
}

// --- Task queue ---

/// A unit of work claimed from the delayed task queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub attempts: u32,
    pub max_attempts: u32,
}
