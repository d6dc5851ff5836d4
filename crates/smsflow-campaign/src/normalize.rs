// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record normalization ahead of an import.

use smsflow_core::ContactRecord;

/// Records that survived normalization, plus how many were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub records: Vec<ContactRecord>,
    pub skipped: usize,
}

/// Trims numbers and field names, and drops records with a blank number.
///
/// Field values are kept verbatim. Fields with a blank name are dropped.
pub fn normalize_records(input: impl IntoIterator<Item = ContactRecord>) -> Normalized {
    let mut out = Normalized::default();
    for record in input {
        let number = record.number.trim();
        if number.is_empty() {
            out.skipped += 1;
            continue;
        }
        let fields = record
            .fields
            .into_iter()
            .filter_map(|(k, v)| {
                let k = k.trim();
                (!k.is_empty()).then(|| (k.to_string(), v))
            })
            .collect();
        out.records.push(ContactRecord {
            number: number.to_string(),
            fields,
        });
    }
    out
}
