// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling and worker draining.
//!
//! SIGTERM and SIGINT cancel a shared [`CancellationToken`]. Workers stop
//! claiming new tasks, and the process waits a bounded time for the ones in
//! flight.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal
/// arrives.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            info!("received SIGINT (Ctrl+C), initiating shutdown");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT (Ctrl+C), initiating shutdown");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, initiating shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl+C, initiating shutdown");
}

/// Waits up to `timeout` for a cancelled worker pool to finish.
///
/// Returns `true` if the pool stopped in time. A pool still running at the
/// deadline is aborted; its in-flight tasks are redelivered once their lease
/// expires.
pub async fn drain_workers(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let abort = handle.abort_handle();
    match tokio::time::timeout(timeout, handle).await {
        Ok(_) => {
            info!("workers drained");
            true
        }
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "drain timeout reached, aborting workers");
            abort.abort();
            false
        }
    }
}
