// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use smsflow_config::model::StorageConfig;
use smsflow_core::script::{ReplyScript, Transition};
use smsflow_core::{
    AdapterType, Batch, BatchSummary, ContactNumber, ContactRecord, Conversation, DeviceId,
    DeviceStats, HealthStatus, InboundEvent, PluginAdapter, PoolStatus, QueuedTask, SmsflowError,
    StorageAdapter,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the query modules. The
/// database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// The underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, SmsflowError> {
        self.db.get().ok_or_else(|| SmsflowError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(db: &Database) -> Result<(), SmsflowError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SmsflowError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        let probe = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), SmsflowError> {
        if let Some(db) = self.db.get() {
            Self::checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SmsflowError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SmsflowError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SmsflowError> {
        Self::checkpoint(self.db()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Delayed task queue ---

    async fn enqueue_delayed(
        &self,
        queue: &str,
        payload: &str,
        delay: Duration,
        max_attempts: u32,
    ) -> Result<i64, SmsflowError> {
        queries::tasks::enqueue_delayed(self.db()?, queue, payload, delay, max_attempts).await
    }

    async fn claim_due(
        &self,
        queue: &str,
        lease: Duration,
    ) -> Result<Option<QueuedTask>, SmsflowError> {
        queries::tasks::claim_due(self.db()?, queue, lease).await
    }

    async fn ack(&self, task_id: i64) -> Result<(), SmsflowError> {
        queries::tasks::ack(self.db()?, task_id).await
    }

    async fn fail(&self, task_id: i64, retry_delay: Duration) -> Result<(), SmsflowError> {
        queries::tasks::fail(self.db()?, task_id, retry_delay).await
    }

    // --- Conversations ---

    async fn apply_inbound(
        &self,
        event: &InboundEvent,
        script: &ReplyScript,
        processed_ids_cap: usize,
    ) -> Result<Transition, SmsflowError> {
        queries::conversations::apply_inbound(self.db()?, event, script, processed_ids_cap).await
    }

    async fn get_conversation(
        &self,
        number: &ContactNumber,
    ) -> Result<Option<Conversation>, SmsflowError> {
        queries::conversations::get_conversation(self.db()?, number).await
    }

    async fn is_archived(&self, number: &ContactNumber) -> Result<bool, SmsflowError> {
        queries::conversations::is_archived(self.db()?, number).await
    }

    async fn unarchive(&self, number: &ContactNumber) -> Result<bool, SmsflowError> {
        queries::conversations::unarchive(self.db()?, number).await
    }

    // --- Device stats ---

    async fn record_received(&self, device: &DeviceId) -> Result<(), SmsflowError> {
        queries::devices::record_received(self.db()?, device).await
    }

    async fn record_sent(&self, device: &DeviceId) -> Result<(), SmsflowError> {
        queries::devices::record_sent(self.db()?, device).await
    }

    async fn record_error(&self, device: &DeviceId) -> Result<(), SmsflowError> {
        queries::devices::record_error(self.db()?, device).await
    }

    async fn device_stats(&self, device: &DeviceId) -> Result<Option<DeviceStats>, SmsflowError> {
        queries::devices::device_stats(self.db()?, device).await
    }

    async fn list_device_stats(&self) -> Result<Vec<DeviceStats>, SmsflowError> {
        queries::devices::list_device_stats(self.db()?).await
    }

    async fn advance_cycle(&self, device: &DeviceId) -> Result<DeviceStats, SmsflowError> {
        queries::devices::advance_cycle(self.db()?, device).await
    }

    async fn advance_all_cycles(&self) -> Result<Vec<DeviceStats>, SmsflowError> {
        queries::devices::advance_all_cycles(self.db()?).await
    }

    // --- Campaign pool ---

    async fn append_pool(&self, records: &[ContactRecord]) -> Result<u64, SmsflowError> {
        queries::pool::append_pool(self.db()?, records).await
    }

    async fn pool_status(&self) -> Result<PoolStatus, SmsflowError> {
        queries::pool::pool_status(self.db()?).await
    }

    async fn reserve_batch(
        &self,
        devices: &[DeviceId],
        per_device: u32,
    ) -> Result<Batch, SmsflowError> {
        queries::pool::reserve_batch(self.db()?, devices, per_device).await
    }

    async fn get_batch(&self, batch_id: i64) -> Result<Option<Batch>, SmsflowError> {
        queries::pool::get_batch(self.db()?, batch_id).await
    }

    async fn list_batches(&self) -> Result<Vec<BatchSummary>, SmsflowError> {
        queries::pool::list_batches(self.db()?).await
    }

    // --- Reply script ---

    async fn load_script(&self) -> Result<ReplyScript, SmsflowError> {
        queries::settings::load_script(self.db()?).await
    }

    async fn save_script(&self, script: &ReplyScript) -> Result<(), SmsflowError> {
        queries::settings::save_script(self.db()?, script).await
    }
}
