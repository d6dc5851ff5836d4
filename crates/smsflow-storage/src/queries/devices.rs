// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-device counters. Every update is a single atomic upsert.

use rusqlite::{params, Connection, Row, TransactionBehavior};
use smsflow_core::{DeviceId, DeviceStats, SmsflowError};

use crate::database::{map_tr_err, now_rfc3339, Database};

const COLUMNS: &str =
    "device, received, sent, errors, last_seen, cycle, cycle_received, cycle_sent";

fn count(row: &Row<'_>, idx: usize) -> Result<u64, rusqlite::Error> {
    Ok(row.get::<_, i64>(idx)?.max(0) as u64)
}

fn from_row(row: &Row<'_>) -> Result<DeviceStats, rusqlite::Error> {
    Ok(DeviceStats {
        device: row.get(0)?,
        received: count(row, 1)?,
        sent: count(row, 2)?,
        errors: count(row, 3)?,
        last_seen: row.get(4)?,
        cycle: count(row, 5)?,
        cycle_received: count(row, 6)?,
        cycle_sent: count(row, 7)?,
    })
}

fn read_one(conn: &Connection, device: &str) -> Result<Option<DeviceStats>, rusqlite::Error> {
    let result = conn.query_row(
        &format!("SELECT {COLUMNS} FROM device_stats WHERE device = ?1"),
        params![device],
        from_row,
    );
    match result {
        Ok(stats) => Ok(Some(stats)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_all(conn: &Connection) -> Result<Vec<DeviceStats>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM device_stats ORDER BY device ASC"
    ))?;
    let rows = stmt.query_map([], from_row)?;
    rows.collect()
}

async fn upsert_increment(db: &Database, device: &DeviceId, sql: &'static str) -> Result<(), SmsflowError> {
    let device = device.0.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(sql, params![device])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count one received event and stamp `last_seen`.
pub async fn record_received(db: &Database, device: &DeviceId) -> Result<(), SmsflowError> {
    let device = device.0.clone();
    let seen = now_rfc3339();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO device_stats (device, received, cycle_received, last_seen)
                 VALUES (?1, 1, 1, ?2)
                 ON CONFLICT (device) DO UPDATE SET
                   received = received + 1,
                   cycle_received = cycle_received + 1,
                   last_seen = excluded.last_seen",
                params![device, seen],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count one attempted send.
pub async fn record_sent(db: &Database, device: &DeviceId) -> Result<(), SmsflowError> {
    upsert_increment(
        db,
        device,
        "INSERT INTO device_stats (device, sent, cycle_sent) VALUES (?1, 1, 1)
         ON CONFLICT (device) DO UPDATE SET
           sent = sent + 1,
           cycle_sent = cycle_sent + 1",
    )
    .await
}

/// Count one failed send.
pub async fn record_error(db: &Database, device: &DeviceId) -> Result<(), SmsflowError> {
    upsert_increment(
        db,
        device,
        "INSERT INTO device_stats (device, errors) VALUES (?1, 1)
         ON CONFLICT (device) DO UPDATE SET errors = errors + 1",
    )
    .await
}

pub async fn device_stats(
    db: &Database,
    device: &DeviceId,
) -> Result<Option<DeviceStats>, SmsflowError> {
    let device = device.0.clone();
    db.connection()
        .call(move |conn| read_one(conn, &device))
        .await
        .map_err(map_tr_err)
}

pub async fn list_device_stats(db: &Database) -> Result<Vec<DeviceStats>, SmsflowError> {
    db.connection()
        .call(|conn| read_all(conn))
        .await
        .map_err(map_tr_err)
}

/// Zero one device's cycle counters and increment its cycle index.
///
/// An unknown device is created at cycle 1.
pub async fn advance_cycle(db: &Database, device: &DeviceId) -> Result<DeviceStats, SmsflowError> {
    let device = device.0.clone();
    db.connection()
        .call(move |conn| -> Result<DeviceStats, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO device_stats (device, cycle) VALUES (?1, 1)
                 ON CONFLICT (device) DO UPDATE SET
                   cycle = cycle + 1,
                   cycle_received = 0,
                   cycle_sent = 0",
                params![device],
            )?;
            let stats = read_one(&tx, &device)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(stats)
        })
        .await
        .map_err(map_tr_err)
}

/// Advance the cycle of every known device.
pub async fn advance_all_cycles(db: &Database) -> Result<Vec<DeviceStats>, SmsflowError> {
    db.connection()
        .call(|conn| -> Result<Vec<DeviceStats>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "UPDATE device_stats SET cycle = cycle + 1, cycle_received = 0, cycle_sent = 0",
                [],
            )?;
            let all = read_all(&tx)?;
            tx.commit()?;
            Ok(all)
        })
        .await
        .map_err(map_tr_err)
}
