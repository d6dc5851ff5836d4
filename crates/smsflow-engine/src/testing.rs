// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for this crate's unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use smsflow_config::model::StorageConfig;
use smsflow_core::{
    AdapterType, DeviceInfo, HealthStatus, OutboundSms, PluginAdapter, SmsGateway, SmsflowError,
    StorageAdapter,
};
use smsflow_storage::SqliteStorage;

pub(crate) async fn open_storage() -> (Arc<SqliteStorage>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("engine.db").to_string_lossy().into_owned(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();
    (Arc::new(storage), dir)
}

/// Gateway that records every send and can be switched to fail.
#[derive(Default)]
pub(crate) struct RecordingGateway {
    sent: Mutex<Vec<OutboundSms>>,
    failing: AtomicBool,
}

impl RecordingGateway {
    pub(crate) fn sent(&self) -> Vec<OutboundSms> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PluginAdapter for RecordingGateway {
    fn name(&self) -> &str {
        "recording"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
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
impl SmsGateway for RecordingGateway {
    async fn send_message(&self, msg: &OutboundSms) -> Result<(), SmsflowError> {
        self.sent.lock().unwrap().push(msg.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(SmsflowError::delivery("gateway down"));
        }
        Ok(())
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, SmsflowError> {
        Ok(Vec::new())
    }
}
