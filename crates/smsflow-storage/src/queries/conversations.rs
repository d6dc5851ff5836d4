// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state and the archived set.

use rusqlite::types::Type;
use rusqlite::{params, Connection, TransactionBehavior};
use smsflow_core::script::{plan_transition, ReplyScript, StateWrite, Transition};
use smsflow_core::{ContactNumber, Conversation, DeviceId, InboundEvent, SmsflowError};

use crate::database::{map_tr_err, Database};

fn read_conversation(conn: &Connection, number: &str) -> Result<Option<Conversation>, rusqlite::Error> {
    let result = conn.query_row(
        "SELECT number, step, device, in_count, processed_ids
         FROM conversations WHERE number = ?1",
        params![number],
        |row| {
            let ids: String = row.get(4)?;
            let processed_ids: Vec<String> = serde_json::from_str(&ids)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
            Ok(Conversation {
                number: ContactNumber(row.get(0)?),
                step: row.get(1)?,
                device: row.get::<_, Option<String>>(2)?.map(DeviceId),
                in_count: row.get(3)?,
                processed_ids,
            })
        },
    );
    match result {
        Ok(conv) => Ok(Some(conv)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn archived(conn: &Connection, number: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM archived_numbers WHERE number = ?1)",
        params![number],
        |row| row.get(0),
    )
}

fn upsert(conn: &Connection, conv: &Conversation) -> Result<(), rusqlite::Error> {
    let ids = serde_json::to_string(&conv.processed_ids)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO conversations (number, step, device, in_count, processed_ids)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (number) DO UPDATE SET
           step = excluded.step,
           device = excluded.device,
           in_count = excluded.in_count,
           processed_ids = excluded.processed_ids,
           updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![
            conv.number.0,
            conv.step,
            conv.device.as_ref().map(|d| d.0.as_str()),
            conv.in_count,
            ids,
        ],
    )?;
    Ok(())
}

fn archive_and_delete(conn: &Connection, number: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO archived_numbers (number) VALUES (?1)",
        params![number],
    )?;
    conn.execute("DELETE FROM conversations WHERE number = ?1", params![number])?;
    Ok(())
}

/// Read, decide, and write one inbound event in a single immediate transaction.
pub async fn apply_inbound(
    db: &Database,
    event: &InboundEvent,
    script: &ReplyScript,
    processed_ids_cap: usize,
) -> Result<Transition, SmsflowError> {
    let event = event.clone();
    let script = script.clone();
    db.connection()
        .call(move |conn| -> Result<Transition, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let number = event.number.0.as_str();

            let is_archived = archived(&tx, number)?;
            let existing = if is_archived {
                None
            } else {
                read_conversation(&tx, number)?
            };

            let plan = plan_transition(is_archived, existing, &event, &script, processed_ids_cap);
            match &plan.write {
                StateWrite::Nothing => {}
                StateWrite::Upsert(conv) => upsert(&tx, conv)?,
                StateWrite::ArchiveAndDelete => archive_and_delete(&tx, number)?,
            }
            tx.commit()?;
            Ok(plan.transition)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a contact's conversation record.
pub async fn get_conversation(
    db: &Database,
    number: &ContactNumber,
) -> Result<Option<Conversation>, SmsflowError> {
    let number = number.0.clone();
    db.connection()
        .call(move |conn| read_conversation(conn, &number))
        .await
        .map_err(map_tr_err)
}

/// Whether a number is in the archived set.
pub async fn is_archived(db: &Database, number: &ContactNumber) -> Result<bool, SmsflowError> {
    let number = number.0.clone();
    db.connection()
        .call(move |conn| archived(conn, &number))
        .await
        .map_err(map_tr_err)
}

/// Remove a number from the archived set. Returns whether it was present.
pub async fn unarchive(db: &Database, number: &ContactNumber) -> Result<bool, SmsflowError> {
    let number = number.0.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM archived_numbers WHERE number = ?1",
                params![number],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}
