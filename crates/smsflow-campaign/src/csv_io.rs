// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV import of contact records and CSV export of batches.

use std::collections::BTreeSet;
use std::io::Read;

use smsflow_core::{Batch, ContactRecord, SmsflowError};
use tracing::debug;

use crate::normalize::{normalize_records, Normalized};

/// Header names recognized as the number column, in priority order.
pub const NUMBER_COLUMNS: &[&str] = &["number", "phone", "telephone", "mobile"];

fn csv_error(e: csv::Error) -> SmsflowError {
    SmsflowError::Validation(format!("invalid CSV: {e}"))
}

fn find_number_column(headers: &csv::StringRecord, wanted: Option<&str>) -> Option<usize> {
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
    };
    match wanted {
        Some(name) => position(name),
        None => NUMBER_COLUMNS.iter().find_map(|name| position(*name)),
    }
}

/// Parses a CSV document with a header row into normalized records.
///
/// The number column is `number_column` when given, otherwise the first
/// header matching [`NUMBER_COLUMNS`], compared case-insensitively. Every
/// other non-blank header becomes a variable field. Short rows are padded
/// with empty values.
pub fn parse_csv<R: Read>(
    reader: R,
    number_column: Option<&str>,
) -> Result<Normalized, SmsflowError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_error)?.clone();
    let number_idx = find_number_column(&headers, number_column).ok_or_else(|| {
        SmsflowError::Validation(match number_column {
            Some(name) => format!("number column '{name}' not found in CSV header"),
            None => format!(
                "no number column found in CSV header (expected one of: {})",
                NUMBER_COLUMNS.join(", ")
            ),
        })
    })?;

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row.map_err(csv_error)?;
        let number = row.get(number_idx).unwrap_or_default().to_string();
        let mut record = ContactRecord::new(number);
        for (idx, name) in headers.iter().enumerate() {
            if idx == number_idx || name.is_empty() {
                continue;
            }
            record
                .fields
                .insert(name.to_string(), row.get(idx).unwrap_or_default().to_string());
        }
        records.push(record);
    }

    let normalized = normalize_records(records);
    debug!(
        records = normalized.records.len(),
        skipped = normalized.skipped,
        "CSV parsed"
    );
    Ok(normalized)
}

/// Renders a batch's items as CSV: `number` first, then the union of all
/// field names in sorted order.
pub fn batch_to_csv(batch: &Batch) -> Result<String, SmsflowError> {
    let columns: BTreeSet<&str> = batch
        .items
        .iter()
        .flat_map(|r| r.fields.keys().map(String::as_str))
        .filter(|k| *k != "number")
        .collect();

    let mut wtr = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["number"];
    header.extend(columns.iter().copied());
    wtr.write_record(&header)
        .map_err(|e| SmsflowError::Internal(format!("CSV write failed: {e}")))?;

    for item in &batch.items {
        let mut row = vec![item.number.as_str()];
        row.extend(
            columns
                .iter()
                .map(|c| item.fields.get(*c).map(String::as_str).unwrap_or_default()),
        );
        wtr.write_record(&row)
            .map_err(|e| SmsflowError::Internal(format!("CSV write failed: {e}")))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| SmsflowError::Internal(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| SmsflowError::Internal(format!("CSV not UTF-8: {e}")))
}
