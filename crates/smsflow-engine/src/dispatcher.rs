// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event dispatch.
//!
//! A webhook batch is parsed once, then each element is queued on its own
//! with a randomized delay. One element failing to queue never affects its
//! siblings.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use smsflow_config::model::SmsflowConfig;
use smsflow_core::types::{device_field, event_id_field};
use smsflow_core::{SmsflowError, StorageAdapter};
use tracing::{debug, info, warn};

/// Inclusive window a reply delay is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayWindow {
    pub min: Duration,
    pub max: Duration,
}

impl DelayWindow {
    pub fn from_secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max.max(min)),
        }
    }

    /// Uniform sample in `[min, max]`, at whole-second resolution.
    pub fn sample(&self) -> Duration {
        let (lo, hi) = (self.min.as_secs(), self.max.as_secs());
        if lo >= hi {
            return self.min;
        }
        Duration::from_secs(rand::thread_rng().gen_range(lo..=hi))
    }
}

/// Counts for one dispatched batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub queued: usize,
    pub failed: usize,
}

/// Queues inbound events for delayed processing.
pub struct EventDispatcher {
    storage: Arc<dyn StorageAdapter>,
    queue_name: String,
    window: DelayWindow,
    max_attempts: u32,
}

impl EventDispatcher {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        queue_name: impl Into<String>,
        window: DelayWindow,
        max_attempts: u32,
    ) -> Self {
        Self {
            storage,
            queue_name: queue_name.into(),
            window,
            max_attempts,
        }
    }

    pub fn from_config(storage: Arc<dyn StorageAdapter>, config: &SmsflowConfig) -> Self {
        Self::new(
            storage,
            config.webhook.queue_name.clone(),
            DelayWindow::from_secs(config.webhook.min_delay_secs, config.webhook.max_delay_secs),
            config.worker.max_attempts,
        )
    }

    /// Parses a raw webhook field into its event array.
    ///
    /// Invalid JSON and a non-array document are both validation errors.
    /// Individual elements are not inspected here.
    pub fn parse_batch(raw: &str) -> Result<Vec<Value>, SmsflowError> {
        let doc: Value = serde_json::from_str(raw)
            .map_err(|e| SmsflowError::Validation(format!("invalid JSON: {e}")))?;
        match doc {
            Value::Array(items) => Ok(items),
            _ => Err(SmsflowError::Validation(
                "expected a JSON array of events".into(),
            )),
        }
    }

    /// Queues every element of `events`, returning per-batch counts.
    ///
    /// A successfully queued element that carries a device id counts as
    /// received traffic for that device.
    pub async fn dispatch(&self, events: &[Value], request_id: &str) -> DispatchSummary {
        let mut summary = DispatchSummary {
            total: events.len(),
            ..DispatchSummary::default()
        };

        for event in events {
            let event_id = event_id_field(event)
                .map(|id| id.short().to_string())
                .unwrap_or_else(|| "-".to_string());

            match self.submit(event).await {
                Ok((task_id, delay)) => {
                    summary.queued += 1;
                    debug!(
                        request_id,
                        event_id = %event_id,
                        task_id,
                        delay_secs = delay.as_secs(),
                        "event queued"
                    );
                    if let Some(device) = device_field(event) {
                        if let Err(e) = self.storage.record_received(&device).await {
                            warn!(request_id, event_id = %event_id, device = %device, error = %e, "failed to count received event");
                        }
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(request_id, event_id = %event_id, error = %e, "failed to queue event");
                }
            }
        }

        info!(
            request_id,
            total = summary.total,
            queued = summary.queued,
            failed = summary.failed,
            "webhook batch dispatched"
        );
        summary
    }

    async fn submit(&self, event: &Value) -> Result<(i64, Duration), SmsflowError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| SmsflowError::Internal(format!("failed to encode event: {e}")))?;
        let delay = self.window.sample();
        let task_id = self
            .storage
            .enqueue_delayed(&self.queue_name, &payload, delay, self.max_attempts)
            .await?;
        Ok((task_id, delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::open_storage;

    #[test]
    fn window_samples_stay_in_bounds() {
        let window = DelayWindow::from_secs(60, 180);
        for _ in 0..500 {
            let d = window.sample().as_secs();
            assert!((60..=180).contains(&d), "{d} out of range");
        }
    }

    #[test]
    fn degenerate_window_is_fixed() {
        assert_eq!(DelayWindow::from_secs(5, 5).sample(), Duration::from_secs(5));
        // An inverted window collapses to its minimum.
        assert_eq!(DelayWindow::from_secs(9, 3).sample(), Duration::from_secs(9));
    }

    #[test]
    fn parse_batch_rejects_bad_documents() {
        assert!(EventDispatcher::parse_batch("[]").unwrap().is_empty());
        assert_eq!(EventDispatcher::parse_batch(r#"[{"ID":"1"},2]"#).unwrap().len(), 2);

        let err = EventDispatcher::parse_batch("{not json").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("invalid JSON"));

        let err = EventDispatcher::parse_batch(r#"{"ID":"1"}"#).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[tokio::test]
    async fn every_element_is_queued_and_counted() {
        let (storage, _dir) = open_storage().await;
        let dispatcher =
            EventDispatcher::new(storage.clone(), "default", DelayWindow::from_secs(0, 0), 3);
        let events = EventDispatcher::parse_batch(
            r#"[{"ID":"e1","number":"+1","deviceID":7},{"ID":"e2","number":"+2"}]"#,
        )
        .unwrap();

        let summary = dispatcher.dispatch(&events, "req").await;
        assert_eq!(summary, DispatchSummary { total: 2, queued: 2, failed: 0 });

        // Only the element with a device id counts as received.
        let stats = storage.list_device_stats().await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].device, "7");
        assert_eq!(stats[0].received, 1);

        let task = storage
            .claim_due("default", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        let payload: Value = serde_json::from_str(&task.payload).unwrap();
        assert_eq!(payload["ID"], "e1");
        assert_eq!(task.max_attempts, 3);
    }

    #[tokio::test]
    async fn failed_submission_does_not_stop_the_batch() {
        // Never initialized, so every enqueue fails.
        let storage = Arc::new(smsflow_storage::SqliteStorage::new(Default::default()));
        let dispatcher =
            EventDispatcher::new(storage, "default", DelayWindow::from_secs(0, 0), 3);
        let events = EventDispatcher::parse_batch(
            r#"[{"ID":"a","number":"+1","deviceID":"d"},{"ID":"b","number":"+1","deviceID":"d"}]"#,
        )
        .unwrap();

        let summary = dispatcher.dispatch(&events, "req").await;
        assert_eq!(summary, DispatchSummary { total: 2, queued: 0, failed: 2 });
    }
}
