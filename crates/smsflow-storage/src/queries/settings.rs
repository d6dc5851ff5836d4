// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value settings holding the reply script document.

use rusqlite::params;
use smsflow_core::{ReplyScript, SmsflowError};

use crate::database::{map_tr_err, Database};

const REPLY_SCRIPT_KEY: &str = "reply_script";

async fn get_value(db: &Database, key: &'static str) -> Result<Option<String>, SmsflowError> {
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

async fn set_value(db: &Database, key: &'static str, value: String) -> Result<(), SmsflowError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Load the reply script, or the default script when none is stored.
pub async fn load_script(db: &Database) -> Result<ReplyScript, SmsflowError> {
    match get_value(db, REPLY_SCRIPT_KEY).await? {
        Some(raw) => serde_json::from_str(&raw).map_err(SmsflowError::storage),
        None => Ok(ReplyScript::default()),
    }
}

/// Replace the stored reply script.
pub async fn save_script(db: &Database, script: &ReplyScript) -> Result<(), SmsflowError> {
    let raw = serde_json::to_string(script).map_err(SmsflowError::storage)?;
    set_value(db, REPLY_SCRIPT_KEY, raw).await
}
