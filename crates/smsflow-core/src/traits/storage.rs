// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the durable store.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SmsflowError;
use crate::script::{ReplyScript, Transition};
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Batch, BatchSummary, ContactNumber, ContactRecord, Conversation, DeviceId, DeviceStats,
    InboundEvent, PoolStatus, QueuedTask,
};

/// Adapter for the durable store.
///
/// Every composite mutation is atomic: concurrent callers (other workers,
/// other processes sharing the store) never observe or produce a partial
/// update.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), SmsflowError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), SmsflowError>;

    // --- Delayed task queue ---

    /// Submits a payload that becomes due after `delay`. Returns the task id.
    async fn enqueue_delayed(
        &self,
        queue: &str,
        payload: &str,
        delay: Duration,
        max_attempts: u32,
    ) -> Result<i64, SmsflowError>;

    /// Claims the oldest due task (or one whose lease expired) for `lease`.
    async fn claim_due(
        &self,
        queue: &str,
        lease: Duration,
    ) -> Result<Option<QueuedTask>, SmsflowError>;

    /// Removes a claimed task once its work is done.
    async fn ack(&self, task_id: i64) -> Result<(), SmsflowError>;

    /// Returns a claimed task to the queue after `retry_delay`, or marks it
    /// failed once its attempts are exhausted.
    async fn fail(&self, task_id: i64, retry_delay: Duration) -> Result<(), SmsflowError>;

    // --- Conversations ---

    /// Applies one inbound event to its contact's conversation in a single
    /// transaction and returns what happened.
    async fn apply_inbound(
        &self,
        event: &InboundEvent,
        script: &ReplyScript,
        processed_ids_cap: usize,
    ) -> Result<Transition, SmsflowError>;

    async fn get_conversation(
        &self,
        number: &ContactNumber,
    ) -> Result<Option<Conversation>, SmsflowError>;

    async fn is_archived(&self, number: &ContactNumber) -> Result<bool, SmsflowError>;

    /// Removes a number from the archived set. Returns whether it was present.
    async fn unarchive(&self, number: &ContactNumber) -> Result<bool, SmsflowError>;

    // --- Device stats ---

    /// Counts one received event and stamps `last_seen`.
    async fn record_received(&self, device: &DeviceId) -> Result<(), SmsflowError>;

    async fn record_sent(&self, device: &DeviceId) -> Result<(), SmsflowError>;

    async fn record_error(&self, device: &DeviceId) -> Result<(), SmsflowError>;

    async fn device_stats(&self, device: &DeviceId) -> Result<Option<DeviceStats>, SmsflowError>;

    async fn list_device_stats(&self) -> Result<Vec<DeviceStats>, SmsflowError>;

    /// Zeroes one device's cycle counters and increments its cycle index.
    async fn advance_cycle(&self, device: &DeviceId) -> Result<DeviceStats, SmsflowError>;

    /// Advances the cycle of every known device.
    async fn advance_all_cycles(&self) -> Result<Vec<DeviceStats>, SmsflowError>;

    // --- Campaign pool ---

    /// Appends records to the pool tail. Returns the new pool size.
    async fn append_pool(&self, records: &[ContactRecord]) -> Result<u64, SmsflowError>;

    async fn pool_status(&self) -> Result<PoolStatus, SmsflowError>;

    /// Pops up to `per_device * devices.len()` records from the pool head
    /// into a new batch. Fails with [`SmsflowError::EmptyPool`] (creating
    /// nothing) when the pool is empty.
    async fn reserve_batch(
        &self,
        devices: &[DeviceId],
        per_device: u32,
    ) -> Result<Batch, SmsflowError>;

    async fn get_batch(&self, batch_id: i64) -> Result<Option<Batch>, SmsflowError>;

    /// Lists batch metadata, newest first.
    async fn list_batches(&self) -> Result<Vec<BatchSummary>, SmsflowError>;

    // --- Reply script ---

    /// Loads the reply script, or the default script when none is stored.
    async fn load_script(&self) -> Result<ReplyScript, SmsflowError>;

    async fn save_script(&self, script: &ReplyScript) -> Result<(), SmsflowError>;
}
