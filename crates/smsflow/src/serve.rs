// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `smsflow serve` and `smsflow worker` implementations.
//!
//! `serve` runs the webhook/admin HTTP server and the worker pool in one
//! process; `worker` runs only the pool. Both stop on SIGINT/SIGTERM, giving
//! in-flight tasks `worker.shutdown_timeout_secs` to finish.

use std::sync::Arc;
use std::time::Duration;

use smsflow_config::model::SmsflowConfig;
use smsflow_core::{SmsGateway, SmsflowError, StorageAdapter};
use smsflow_engine::shutdown;
use smsflow_engine::worker::WorkerSettings;
use smsflow_engine::WorkerPool;
use smsflow_gateway::{start_server, AppState};
use smsflow_sms::HttpSmsGateway;
use smsflow_storage::SqliteStorage;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Opens and migrates the configured SQLite store.
pub async fn open_storage(config: &SmsflowConfig) -> Result<Arc<SqliteStorage>, SmsflowError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

fn open_gateway(config: &SmsflowConfig) -> Result<Arc<dyn SmsGateway>, SmsflowError> {
    Ok(Arc::new(HttpSmsGateway::new(&config.sms)?))
}

fn spawn_workers(
    config: &SmsflowConfig,
    storage: Arc<dyn StorageAdapter>,
    gateway: Arc<dyn SmsGateway>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let pool = Arc::new(WorkerPool::new(
        storage,
        gateway,
        WorkerSettings::from_config(config),
    ));
    tokio::spawn(pool.run(cancel))
}

/// Runs the `smsflow serve` command.
pub async fn run_serve(config: SmsflowConfig) -> Result<(), SmsflowError> {
    info!(name = %config.service.name, "starting smsflow serve");
    if config.webhook.debug_mode {
        warn!("webhook.debug_mode is set, signatures are not checked");
    }

    let storage = open_storage(&config).await?;
    let gateway = open_gateway(&config)?;
    let cancel = shutdown::install_signal_handler();

    let workers = spawn_workers(&config, storage.clone(), gateway.clone(), cancel.clone());
    let state = AppState::new(storage.clone(), gateway, &config);
    let served = start_server(&config, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "HTTP server failed, stopping workers");
        cancel.cancel();
    }

    shutdown::drain_workers(
        workers,
        Duration::from_secs(config.worker.shutdown_timeout_secs),
    )
    .await;
    storage.close().await?;
    info!("smsflow serve shutdown complete");
    served
}

/// Runs the `smsflow worker` command.
pub async fn run_worker(config: SmsflowConfig) -> Result<(), SmsflowError> {
    info!(name = %config.service.name, "starting smsflow worker");

    let storage = open_storage(&config).await?;
    let gateway = open_gateway(&config)?;
    let cancel = shutdown::install_signal_handler();

    let workers = spawn_workers(&config, storage.clone(), gateway, cancel.clone());
    cancel.cancelled().await;

    shutdown::drain_workers(
        workers,
        Duration::from_secs(config.worker.shutdown_timeout_secs),
    )
    .await;
    storage.close().await?;
    info!("smsflow worker shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins when set. Logs go to stderr so command output on stdout
/// stays machine-readable.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("smsflow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
