// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign pool operations over a [`StorageAdapter`].

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use smsflow_core::{
    Batch, BatchSummary, ContactRecord, DeviceId, PoolStatus, SmsflowError, StorageAdapter,
};
use tracing::info;

use crate::csv_io::{batch_to_csv, parse_csv};
use crate::normalize::normalize_records;

/// Result of one import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: u64,
    pub skipped: usize,
    pub pool_size: u64,
}

/// The campaign pool manager.
pub struct CampaignPool {
    storage: Arc<dyn StorageAdapter>,
}

impl CampaignPool {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Appends records to the pool tail. Nothing is deduplicated.
    pub async fn import(
        &self,
        records: impl IntoIterator<Item = ContactRecord>,
    ) -> Result<ImportSummary, SmsflowError> {
        let normalized = normalize_records(records);
        self.append(normalized.records, normalized.skipped).await
    }

    /// Parses CSV text and appends its records.
    pub async fn import_csv(
        &self,
        text: &str,
        number_column: Option<&str>,
    ) -> Result<ImportSummary, SmsflowError> {
        let normalized = parse_csv(text.as_bytes(), number_column)?;
        self.append(normalized.records, normalized.skipped).await
    }

    async fn append(
        &self,
        records: Vec<ContactRecord>,
        skipped: usize,
    ) -> Result<ImportSummary, SmsflowError> {
        let imported = records.len() as u64;
        let pool_size = if records.is_empty() {
            self.storage.pool_status().await?.pool_size
        } else {
            self.storage.append_pool(&records).await?
        };
        info!(imported, skipped, pool_size, "campaign records imported");
        Ok(ImportSummary {
            imported,
            skipped,
            pool_size,
        })
    }

    /// Reserves `per_device` records for each distinct device into a new batch.
    ///
    /// Device ids are trimmed and deduplicated in order. An empty device list
    /// or a zero count is a validation error; an empty pool is
    /// [`SmsflowError::EmptyPool`]. Neither creates a batch.
    pub async fn reserve(
        &self,
        devices: &[DeviceId],
        per_device: u32,
    ) -> Result<Batch, SmsflowError> {
        let mut seen = HashSet::new();
        let devices: Vec<DeviceId> = devices
            .iter()
            .map(|d| d.0.trim())
            .filter(|d| !d.is_empty() && seen.insert(d.to_string()))
            .map(|d| DeviceId(d.to_string()))
            .collect();

        if devices.is_empty() {
            return Err(SmsflowError::Validation(
                "at least one device is required".into(),
            ));
        }
        if per_device == 0 {
            return Err(SmsflowError::Validation(
                "per-device count must be positive".into(),
            ));
        }

        let batch = self.storage.reserve_batch(&devices, per_device).await?;
        info!(
            batch_id = batch.summary.batch_id,
            devices = batch.summary.devices.len(),
            requested = batch.summary.requested_total,
            taken = batch.summary.taken_total,
            remaining = batch.summary.remaining_after,
            "batch reserved"
        );
        Ok(batch)
    }

    pub async fn batch(&self, batch_id: i64) -> Result<Option<Batch>, SmsflowError> {
        self.storage.get_batch(batch_id).await
    }

    /// Batch metadata, newest first.
    pub async fn batches(&self) -> Result<Vec<BatchSummary>, SmsflowError> {
        self.storage.list_batches().await
    }

    pub async fn status(&self) -> Result<PoolStatus, SmsflowError> {
        self.storage.pool_status().await
    }

    /// A batch's items as CSV, or `None` for an unknown batch.
    pub async fn export_csv(&self, batch_id: i64) -> Result<Option<String>, SmsflowError> {
        match self.storage.get_batch(batch_id).await? {
            Some(batch) => batch_to_csv(&batch).map(Some),
            None => Ok(None),
        }
    }
}
