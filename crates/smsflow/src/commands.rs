// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator commands that act directly on the local store.
//!
//! Results are printed to stdout as pretty JSON (or CSV for `batch --csv`).

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use smsflow_campaign::CampaignPool;
use smsflow_config::model::SmsflowConfig;
use smsflow_core::{ContactNumber, ContactRecord, DeviceId, ReplyScript, SmsflowError, StorageAdapter};
use smsflow_storage::SqliteStorage;

use crate::serve::open_storage;

fn print_json<T: Serialize>(value: &T) -> Result<(), SmsflowError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| SmsflowError::Internal(format!("failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}

fn read_file(path: &Path) -> Result<String, SmsflowError> {
    std::fs::read_to_string(path)
        .map_err(|e| SmsflowError::Validation(format!("cannot read {}: {e}", path.display())))
}

/// Runs `f` against the opened store and closes it afterwards.
async fn with_storage<T, F, Fut>(config: &SmsflowConfig, f: F) -> Result<T, SmsflowError>
where
    F: FnOnce(Arc<SqliteStorage>) -> Fut,
    Fut: std::future::Future<Output = Result<T, SmsflowError>>,
{
    let storage = open_storage(config).await?;
    let result = f(storage.clone()).await;
    storage.close().await?;
    result
}

/// `smsflow import FILE [--number-column C]`
pub async fn import(
    config: &SmsflowConfig,
    file: &Path,
    number_column: Option<&str>,
) -> Result<(), SmsflowError> {
    let text = read_file(file)?;
    let is_json = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let summary = with_storage(config, |storage| async move {
        let pool = CampaignPool::new(storage);
        if is_json {
            let records: Vec<ContactRecord> = serde_json::from_str(&text)
                .map_err(|e| SmsflowError::Validation(format!("invalid records: {e}")))?;
            pool.import(records).await
        } else {
            pool.import_csv(&text, number_column).await
        }
    })
    .await?;
    print_json(&summary)
}

/// `smsflow reserve --device D... --per-device N`
pub async fn reserve(
    config: &SmsflowConfig,
    devices: Vec<String>,
    per_device: u32,
) -> Result<(), SmsflowError> {
    let devices: Vec<DeviceId> = devices.into_iter().map(DeviceId).collect();
    let batch = with_storage(config, |storage| async move {
        CampaignPool::new(storage).reserve(&devices, per_device).await
    })
    .await?;
    print_json(&batch)
}

/// `smsflow batch ID [--csv]`
pub async fn batch(config: &SmsflowConfig, id: i64, csv: bool) -> Result<(), SmsflowError> {
    let not_found = || SmsflowError::Validation(format!("batch {id} not found"));
    with_storage(config, |storage| async move {
        let pool = CampaignPool::new(storage);
        if csv {
            let text = pool.export_csv(id).await?.ok_or_else(not_found)?;
            print!("{text}");
            Ok(())
        } else {
            let batch = pool.batch(id).await?.ok_or_else(not_found)?;
            print_json(&batch)
        }
    })
    .await
}

/// `smsflow stats`
pub async fn stats(config: &SmsflowConfig) -> Result<(), SmsflowError> {
    let stats = with_storage(config, |storage| async move {
        storage.list_device_stats().await
    })
    .await?;
    print_json(&stats)
}

/// `smsflow cycle [DEVICE | --all]`; `None` advances every device.
pub async fn cycle(config: &SmsflowConfig, device: Option<String>) -> Result<(), SmsflowError> {
    with_storage(config, |storage| async move {
        match device {
            Some(device) => print_json(&storage.advance_cycle(&DeviceId(device)).await?),
            None => print_json(&storage.advance_all_cycles().await?),
        }
    })
    .await
}

/// `smsflow script show`
pub async fn script_show(config: &SmsflowConfig) -> Result<(), SmsflowError> {
    let script = with_storage(config, |storage| async move { storage.load_script().await }).await?;
    print_json(&script)
}

/// `smsflow script set FILE`
pub async fn script_set(config: &SmsflowConfig, file: &Path) -> Result<(), SmsflowError> {
    let script: ReplyScript = serde_json::from_str(&read_file(file)?)
        .map_err(|e| SmsflowError::Validation(format!("invalid script: {e}")))?;
    with_storage(config, |storage| {
        let script = script.clone();
        async move { storage.save_script(&script).await }
    })
    .await?;
    tracing::info!(enabled = script.enabled, "reply script replaced");
    print_json(&script)
}

#[derive(Serialize)]
struct Unarchived {
    number: String,
    removed: bool,
}

/// `smsflow unarchive NUMBER`
pub async fn unarchive(config: &SmsflowConfig, number: String) -> Result<(), SmsflowError> {
    let contact = ContactNumber(number);
    let removed = with_storage(config, |storage| {
        let contact = contact.clone();
        async move { storage.unarchive(&contact).await }
    })
    .await?;
    print_json(&Unarchived {
        number: contact.0,
        removed,
    })
}
