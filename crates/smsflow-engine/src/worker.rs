// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker pool over the delayed task queue.
//!
//! Each worker claims one due task at a time under a lease. A handled task is
//! acked; a store failure returns it to the queue with a delay until its
//! attempts run out. A worker that dies mid-task leaves the lease to expire,
//! after which another worker picks the task up again.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use smsflow_config::model::SmsflowConfig;
use smsflow_core::types::event_id_field;
use smsflow_core::{SmsGateway, SmsflowError, StorageAdapter};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::conversation::{ConversationEngine, JobOutcome};

/// Tunables of a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub queue_name: String,
    pub concurrency: usize,
    pub poll_interval: Duration,
    pub lease: Duration,
    pub retry_delay: Duration,
    pub processed_ids_cap: usize,
}

impl WorkerSettings {
    pub fn from_config(config: &SmsflowConfig) -> Self {
        Self {
            queue_name: config.webhook.queue_name.clone(),
            concurrency: config.worker.concurrency.max(1),
            poll_interval: Duration::from_millis(config.worker.poll_interval_ms.max(1)),
            lease: Duration::from_secs(config.worker.lease_secs),
            retry_delay: Duration::from_secs(config.worker.retry_delay_secs),
            processed_ids_cap: config.worker.processed_ids_cap,
        }
    }
}

pub struct WorkerPool {
    storage: Arc<dyn StorageAdapter>,
    engine: ConversationEngine,
    settings: WorkerSettings,
}

impl WorkerPool {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        gateway: Arc<dyn SmsGateway>,
        settings: WorkerSettings,
    ) -> Self {
        let engine =
            ConversationEngine::new(storage.clone(), gateway, settings.processed_ids_cap);
        Self {
            storage,
            engine,
            settings,
        }
    }

    /// Claims and handles at most one due task.
    ///
    /// Returns `Ok(None)` when nothing is due. A processing failure is
    /// returned after the task has been handed back to the queue.
    pub async fn run_once(&self) -> Result<Option<JobOutcome>, SmsflowError> {
        let Some(task) = self
            .storage
            .claim_due(&self.settings.queue_name, self.settings.lease)
            .await?
        else {
            return Ok(None);
        };

        let event_id = serde_json::from_str::<Value>(&task.payload)
            .ok()
            .and_then(|v| event_id_field(&v))
            .map(|id| id.short().to_string())
            .unwrap_or_else(|| "-".to_string());
        debug!(task_id = task.id, event_id = %event_id, attempt = task.attempts, "task claimed");

        match self.engine.process_payload(&task.payload).await {
            Ok(outcome) => {
                self.storage.ack(task.id).await?;
                Ok(Some(outcome))
            }
            Err(e) => {
                error!(
                    task_id = task.id,
                    event_id = %event_id,
                    attempt = task.attempts,
                    max_attempts = task.max_attempts,
                    error = %e,
                    "event processing failed"
                );
                self.storage
                    .fail(task.id, self.settings.retry_delay)
                    .await?;
                Err(e)
            }
        }
    }

    /// Runs `concurrency` workers until `cancel` fires.
    ///
    /// Workers check the token between tasks, so a task in progress is
    /// always finished.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut workers = JoinSet::new();
        for worker_id in 0..self.settings.concurrency {
            let pool = self.clone();
            let cancel = cancel.clone();
            workers.spawn(async move { pool.worker_loop(worker_id, cancel).await });
        }
        info!(
            concurrency = self.settings.concurrency,
            queue = %self.settings.queue_name,
            "worker pool started"
        );

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task panicked");
            }
        }
        info!("worker pool stopped");
    }

    async fn worker_loop(&self, worker_id: usize, cancel: CancellationToken) {
        debug!(worker_id, "worker started");
        while !cancel.is_cancelled() {
            let idle = match self.run_once().await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(e) => {
                    warn!(worker_id, error = %e, "worker backing off");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    _ = cancel.cancelled() => break,
                }
            }
        }
        debug!(worker_id, "worker stopped");
    }
}
