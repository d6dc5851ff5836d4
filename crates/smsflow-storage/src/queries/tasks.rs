// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delayed task queue with leases for at-least-once execution.
//!
//! A task becomes claimable once `run_at` has passed. Claiming sets a lease
//! (`locked_until`); a task whose lease expires without an ack or fail is
//! claimable again, which is how work held by a crashed worker is redelivered.
//!
//! Acked tasks are deleted. Failed tasks are kept for inspection and purged
//! once they are older than [`FAILED_RETENTION_DAYS`].

use std::time::Duration;

use rusqlite::{params, TransactionBehavior};
use smsflow_core::{QueuedTask, SmsflowError};

use crate::database::{map_tr_err, now_millis, Database};

/// Days a failed task stays in the table before it is purged.
pub const FAILED_RETENTION_DAYS: u32 = 7;

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Insert a task that becomes due after `delay`. Returns its id.
pub async fn enqueue_delayed(
    db: &Database,
    queue_name: &str,
    payload: &str,
    delay: Duration,
    max_attempts: u32,
) -> Result<i64, SmsflowError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    let run_at = now_millis().saturating_add(millis(delay));
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO tasks (queue_name, payload, max_attempts, run_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![queue_name, payload, max_attempts, run_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the oldest due task of the named queue for `lease`.
///
/// In the same transaction, tasks whose lease expired with no attempts left
/// are marked failed so they are never claimed again, and failed tasks past
/// the retention window are deleted.
pub async fn claim_due(
    db: &Database,
    queue_name: &str,
    lease: Duration,
) -> Result<Option<QueuedTask>, SmsflowError> {
    let queue_name = queue_name.to_string();
    let now = now_millis();
    let locked_until = now.saturating_add(millis(lease));
    db.connection()
        .call(move |conn| -> Result<Option<QueuedTask>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            tx.execute(
                "UPDATE tasks SET status = 'failed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE queue_name = ?1 AND status = 'processing'
                   AND locked_until <= ?2 AND attempts >= max_attempts",
                params![queue_name, now],
            )?;

            tx.execute(
                "DELETE FROM tasks
                 WHERE queue_name = ?1 AND status = 'failed'
                   AND updated_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2)",
                params![queue_name, format!("-{FAILED_RETENTION_DAYS} days")],
            )?;

            let result = tx.query_row(
                "SELECT id, queue_name, payload, attempts, max_attempts
                 FROM tasks
                 WHERE queue_name = ?1
                   AND ((status = 'pending' AND run_at <= ?2)
                     OR (status = 'processing' AND locked_until <= ?2))
                 ORDER BY run_at ASC, id ASC
                 LIMIT 1",
                params![queue_name, now],
                |row| {
                    Ok(QueuedTask {
                        id: row.get(0)?,
                        queue_name: row.get(1)?,
                        payload: row.get(2)?,
                        attempts: row.get(3)?,
                        max_attempts: row.get(4)?,
                    })
                },
            );

            let task = match result {
                Ok(task) => task,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

            tx.execute(
                "UPDATE tasks SET status = 'processing', attempts = attempts + 1,
                 locked_until = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![locked_until, task.id],
            )?;
            tx.commit()?;

            Ok(Some(QueuedTask {
                attempts: task.attempts + 1,
                ..task
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// Remove a finished task from the queue.
pub async fn ack(db: &Database, id: i64) -> Result<(), SmsflowError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Return a task to the queue after `retry_delay`, or mark it failed when
/// its attempts are exhausted.
pub async fn fail(db: &Database, id: i64, retry_delay: Duration) -> Result<(), SmsflowError> {
    let run_at = now_millis().saturating_add(millis(retry_delay));
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE tasks SET
                   status = CASE WHEN attempts >= max_attempts THEN 'failed' ELSE 'pending' END,
                   run_at = CASE WHEN attempts >= max_attempts THEN run_at ELSE ?1 END,
                   locked_until = NULL,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![run_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count tasks of a queue in the given status.
pub async fn count_by_status(
    db: &Database,
    queue_name: &str,
    status: &str,
) -> Result<u64, SmsflowError> {
    let queue_name = queue_name.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE queue_name = ?1 AND status = ?2",
                params![queue_name, status],
                |row| row.get(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}

/// Count all tasks of a queue, whatever their status.
pub async fn queue_len(db: &Database, queue_name: &str) -> Result<u64, SmsflowError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE queue_name = ?1",
                params![queue_name],
                |row| row.get(0),
            )
        })
        .await
        .map(|n| n.max(0) as u64)
        .map_err(map_tr_err)
}
