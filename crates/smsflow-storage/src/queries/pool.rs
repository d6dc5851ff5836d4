// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign pool, batch reservation, and the consumption archive.
//!
//! A reservation pops records from the pool head, copies them into a new
//! batch and into `pool_archive`, all inside one immediate transaction.
//! Popped records never return to the pool.

use std::collections::BTreeMap;

use rusqlite::types::Type;
use rusqlite::{params, Connection, TransactionBehavior};
use smsflow_core::{Batch, BatchSummary, ContactRecord, DeviceId, PoolStatus, SmsflowError};

use crate::database::{map_tr_err, now_rfc3339, Database};

fn encode_fields(fields: &BTreeMap<String, String>) -> Result<String, rusqlite::Error> {
    serde_json::to_string(fields).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn decode_json<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> Result<T, rusqlite::Error> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn pool_size(conn: &Connection) -> Result<u64, rusqlite::Error> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM pool_records", [], |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

/// Append records to the pool tail. Returns the new pool size.
pub async fn append_pool(db: &Database, records: &[ContactRecord]) -> Result<u64, SmsflowError> {
    let records = records.to_vec();
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            {
                let mut stmt =
                    tx.prepare("INSERT INTO pool_records (number, fields) VALUES (?1, ?2)")?;
                for record in &records {
                    stmt.execute(params![record.number, encode_fields(&record.fields)?])?;
                }
            }
            let size = pool_size(&tx)?;
            tx.commit()?;
            Ok(size)
        })
        .await
        .map_err(map_tr_err)
}

/// Pool size and consumed-record count.
pub async fn pool_status(db: &Database) -> Result<PoolStatus, SmsflowError> {
    db.connection()
        .call(|conn| -> Result<PoolStatus, rusqlite::Error> {
            let consumed: i64 =
                conn.query_row("SELECT COUNT(*) FROM pool_archive", [], |row| row.get(0))?;
            Ok(PoolStatus {
                pool_size: pool_size(conn)?,
                consumed: consumed.max(0) as u64,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Reserve up to `per_device * devices.len()` records into a new batch.
///
/// Fails with [`SmsflowError::Validation`] for a zero total and with
/// [`SmsflowError::EmptyPool`] when nothing is left; neither creates a batch.
pub async fn reserve_batch(
    db: &Database,
    devices: &[DeviceId],
    per_device: u32,
) -> Result<Batch, SmsflowError> {
    let requested_total = u64::from(per_device) * devices.len() as u64;
    if requested_total == 0 {
        return Err(SmsflowError::Validation(
            "reservation total must be positive".into(),
        ));
    }
    let devices: Vec<String> = devices.iter().map(|d| d.0.clone()).collect();
    let created_at = now_rfc3339();

    let reserved = db
        .connection()
        .call(move |conn| -> Result<Option<Batch>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let size = pool_size(&tx)?;
            if size == 0 {
                tx.commit()?;
                return Ok(None);
            }

            let take = requested_total.min(size);
            let popped: Vec<(i64, String, String)> = {
                let mut stmt = tx.prepare(
                    "SELECT seq, number, fields FROM pool_records ORDER BY seq ASC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![take as i64], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?;
                rows.collect::<Result<_, _>>()?
            };
            if let Some((last_seq, _, _)) = popped.last() {
                tx.execute("DELETE FROM pool_records WHERE seq <= ?1", params![last_seq])?;
            }

            let taken_total = popped.len() as u64;
            let remaining_after = size - taken_total;
            let devices_json = serde_json::to_string(&devices)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            tx.execute(
                "INSERT INTO batches
                   (devices, per_device, requested_total, taken_total, remaining_after, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    devices_json,
                    per_device,
                    requested_total as i64,
                    taken_total as i64,
                    remaining_after as i64,
                    created_at,
                ],
            )?;
            let batch_id = tx.last_insert_rowid();

            let mut items = Vec::with_capacity(popped.len());
            {
                let mut item_stmt = tx.prepare(
                    "INSERT INTO batch_items (batch_id, position, number, fields)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                let mut archive_stmt = tx.prepare(
                    "INSERT INTO pool_archive (batch_id, number, fields) VALUES (?1, ?2, ?3)",
                )?;
                for (position, (_, number, fields)) in popped.into_iter().enumerate() {
                    item_stmt.execute(params![batch_id, position as i64, number, fields])?;
                    archive_stmt.execute(params![batch_id, number, fields])?;
                    items.push(ContactRecord {
                        number,
                        fields: decode_json(2, &fields)?,
                    });
                }
            }
            tx.commit()?;

            Ok(Some(Batch {
                summary: BatchSummary {
                    batch_id,
                    devices,
                    per_device,
                    requested_total,
                    taken_total,
                    remaining_after,
                    created_at,
                },
                items,
            }))
        })
        .await
        .map_err(map_tr_err)?;

    reserved.ok_or(SmsflowError::EmptyPool)
}

fn summary_from_row(row: &rusqlite::Row<'_>) -> Result<BatchSummary, rusqlite::Error> {
    let devices: String = row.get(1)?;
    Ok(BatchSummary {
        batch_id: row.get(0)?,
        devices: decode_json(1, &devices)?,
        per_device: row.get(2)?,
        requested_total: row.get::<_, i64>(3)?.max(0) as u64,
        taken_total: row.get::<_, i64>(4)?.max(0) as u64,
        remaining_after: row.get::<_, i64>(5)?.max(0) as u64,
        created_at: row.get(6)?,
    })
}

const SUMMARY_COLUMNS: &str =
    "batch_id, devices, per_device, requested_total, taken_total, remaining_after, created_at";

/// Fetch a batch with its items in reservation order.
pub async fn get_batch(db: &Database, batch_id: i64) -> Result<Option<Batch>, SmsflowError> {
    db.connection()
        .call(move |conn| -> Result<Option<Batch>, rusqlite::Error> {
            let result = conn.query_row(
                &format!("SELECT {SUMMARY_COLUMNS} FROM batches WHERE batch_id = ?1"),
                params![batch_id],
                summary_from_row,
            );
            let summary = match result {
                Ok(summary) => summary,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e),
            };

            let mut stmt = conn.prepare(
                "SELECT number, fields FROM batch_items WHERE batch_id = ?1 ORDER BY position ASC",
            )?;
            let items = stmt
                .query_map(params![batch_id], |row| {
                    let fields: String = row.get(1)?;
                    Ok(ContactRecord {
                        number: row.get(0)?,
                        fields: decode_json(1, &fields)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Some(Batch { summary, items }))
        })
        .await
        .map_err(map_tr_err)
}

/// List batch metadata, newest first.
pub async fn list_batches(db: &Database) -> Result<Vec<BatchSummary>, SmsflowError> {
    db.connection()
        .call(|conn| -> Result<Vec<BatchSummary>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM batches ORDER BY batch_id DESC"
            ))?;
            let rows = stmt.query_map([], summary_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
