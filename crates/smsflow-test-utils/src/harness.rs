// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles temp SQLite storage, a mock gateway, and a config
//! with test credentials. Tests queue events through [`TestHarness::dispatcher`]
//! or the HTTP router, then drive the worker with [`TestHarness::drain`].

use std::sync::Arc;
use std::time::Duration;

use smsflow_config::model::{SmsflowConfig, StorageConfig};
use smsflow_core::{SmsGateway, SmsflowError, StorageAdapter};
use smsflow_engine::worker::WorkerSettings;
use smsflow_engine::{EventDispatcher, JobOutcome, WorkerPool};
use smsflow_storage::queries::tasks;
use smsflow_storage::SqliteStorage;

use crate::mock_gateway::MockGateway;

/// Webhook signing secret configured by the harness.
pub const TEST_SECRET: &str = "test-webhook-secret";

/// Operator bearer token configured by the harness.
pub const TEST_ADMIN_TOKEN: &str = "test-admin-token";

/// Encodes a single `field=value` pair as an
/// `application/x-www-form-urlencoded` body.
pub fn form_body(field: &str, value: &str) -> String {
    format!("{}={}", percent_encode(field), percent_encode(value))
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    debug_mode: bool,
    admin_token: bool,
    max_attempts: u32,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            debug_mode: false,
            admin_token: true,
            max_attempts: 3,
        }
    }

    /// Skip webhook signature checks.
    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Leave `admin.bearer_token` unset so the operator API is not mounted.
    pub fn without_admin(mut self) -> Self {
        self.admin_token = false;
        self
    }

    /// Attempts before a failing task is parked.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Build the test harness, creating and migrating the temp database.
    pub async fn build(self) -> Result<TestHarness, SmsflowError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| SmsflowError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let sqlite = Arc::new(SqliteStorage::new(storage_config.clone()));
        sqlite.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = sqlite.clone();

        let mut config = SmsflowConfig {
            storage: storage_config,
            ..SmsflowConfig::default()
        };
        config.webhook.secret = Some(TEST_SECRET.to_string());
        config.webhook.debug_mode = self.debug_mode;
        config.webhook.min_delay_secs = 0;
        config.webhook.max_delay_secs = 0;
        config.worker.concurrency = 2;
        config.worker.poll_interval_ms = 10;
        config.worker.retry_delay_secs = 0;
        config.worker.max_attempts = self.max_attempts;
        if self.admin_token {
            config.admin.bearer_token = Some(TEST_ADMIN_TOKEN.to_string());
        }

        Ok(TestHarness {
            storage,
            sqlite,
            mock_gateway: Arc::new(MockGateway::new()),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock gateway and temp storage.
pub struct TestHarness {
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    sqlite: Arc<SqliteStorage>,
    /// The mock carrier gateway.
    pub mock_gateway: Arc<MockGateway>,
    /// Configuration with test credentials and zero dispatch delay.
    pub config: SmsflowConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The mock gateway as a trait object.
    pub fn gateway(&self) -> Arc<dyn SmsGateway> {
        self.mock_gateway.clone()
    }

    /// An event dispatcher built from the harness config.
    pub fn dispatcher(&self) -> EventDispatcher {
        EventDispatcher::from_config(self.storage.clone(), &self.config)
    }

    /// A worker pool built from the harness config.
    pub fn worker_pool(&self) -> WorkerPool {
        let mut settings = WorkerSettings::from_config(&self.config);
        settings.poll_interval = Duration::from_millis(10);
        WorkerPool::new(self.storage.clone(), self.gateway(), settings)
    }

    /// Process due tasks one at a time until the queue has none left.
    ///
    /// A task that errors is released for retry and its error returned.
    pub async fn drain(&self) -> Result<Vec<JobOutcome>, SmsflowError> {
        let pool = self.worker_pool();
        let mut outcomes = Vec::new();
        while let Some(outcome) = pool.run_once().await? {
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Number of tasks on the configured queue with the given status.
    pub async fn task_count(&self, status: &str) -> Result<u64, SmsflowError> {
        tasks::count_by_status(self.sqlite.db()?, &self.config.webhook.queue_name, status).await
    }

    /// Number of tasks left on the configured queue, acked ones excluded.
    pub async fn queue_len(&self) -> Result<u64, SmsflowError> {
        tasks::queue_len(self.sqlite.db()?, &self.config.webhook.queue_name).await
    }
}
