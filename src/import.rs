//! Builds ACH files from CSV entry listings.
//!
//! Each CSV describes one file: every row is one entry, and rows sharing a
//! `batch` value form one batch in the order the values first appear.

use crate::amount::Amount;
use crate::batch::{
    Addenda05, Batch, BatchHeader, EntryDetail, CREDITS_ONLY, DEBITS_ONLY,
    MIXED_DEBITS_AND_CREDITS,
};
use crate::error::{AchError, Result};
use crate::file::{File, FileHeader};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Largest amount the 10 digit entry amount field holds, in cents.
const MAX_ENTRY_CENTS: u64 = 9_999_999_999;

/// One entry as read from CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryRecord {
    /// Immediate origin routing number (9 digits)
    pub origin: String,

    /// Immediate destination routing number (9 digits)
    pub destination: String,

    #[serde(default)]
    pub origin_name: String,

    #[serde(default)]
    pub destination_name: String,

    /// Batch key grouping rows into batches
    pub batch: u32,

    pub company_name: String,
    pub company_id: String,
    pub sec_code: String,
    pub entry_description: String,

    /// Effective entry date, `YYYY-MM-DD`
    pub effective_date: String,

    pub transaction_code: u8,

    /// Receiving DFI routing number (9 digits, check digit included)
    pub routing: String,

    pub account: String,

    /// Dollar amount, at most 2 decimal places
    pub amount: Amount,

    pub name: String,

    /// Optional payment related information, rendered as an addenda record
    #[serde(default)]
    pub addenda: Option<String>,
}

/// Computes the ABA check digit for the first 8 digits of a routing number.
///
/// Returns `None` if `first8` is not exactly 8 ASCII digits.
pub fn aba_check_digit(first8: &str) -> Option<u8> {
    if first8.len() != 8 {
        return None;
    }
    let mut sum = 0u32;
    for (digit, weight) in first8.chars().zip([3u32, 7, 1].iter().cycle()) {
        sum += digit.to_digit(10)? * weight;
    }
    Some(((10 - sum % 10) % 10) as u8)
}

/// Splits a 9 digit routing number into its 8 digit identification and check
/// digit, verifying the check digit.
fn split_routing(routing: &str) -> std::result::Result<(String, u8), String> {
    if routing.len() != 9 || !routing.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("routing number {:?} is not 9 digits", routing));
    }
    let (ident, check) = routing.split_at(8);
    let expected = aba_check_digit(ident).ok_or_else(|| format!("bad routing number {:?}", routing))?;
    let actual = check.parse::<u8>().map_err(|_| format!("bad check digit in {:?}", routing))?;
    if expected != actual {
        return Err(format!(
            "routing number {} has check digit {}, expected {}",
            routing, actual, expected
        ));
    }
    Ok((ident.to_string(), actual))
}

/// Reads one ACH file from an entry listing.
///
/// `created` stamps the file header. The returned file is rebalanced.
///
/// # Errors
///
/// Returns `AchError::InvalidRecord` for rows that fail to parse, rows whose
/// routing pair differs from the first row, invalid routing numbers or
/// dates, amounts over 99,999,999.99, and listings with no rows.
pub fn read_file<R: Read>(reader: R, created: NaiveDateTime) -> Result<File> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let mut groups: Vec<(u32, Vec<(usize, EntryRecord)>)> = Vec::new();
    let mut index: HashMap<u32, usize> = HashMap::new();
    let mut first: Option<EntryRecord> = None;

    for (row_idx, result) in csv_reader.deserialize::<EntryRecord>().enumerate() {
        let row = row_idx + 2; // 1-indexed, accounting for header row
        let record = result.map_err(|e| AchError::InvalidRecord {
            row,
            message: e.to_string(),
        })?;

        if let Some(f) = &first {
            if f.origin != record.origin || f.destination != record.destination {
                return Err(AchError::InvalidRecord {
                    row,
                    message: format!(
                        "routing pair {} -> {} differs from {} -> {}",
                        record.origin, record.destination, f.origin, f.destination
                    ),
                });
            }
        } else {
            first = Some(record.clone());
        }

        let slot = *index.entry(record.batch).or_insert_with(|| {
            groups.push((record.batch, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push((row, record));
    }

    let first = first.ok_or(AchError::InvalidRecord {
        row: 1,
        message: "listing has no entries".to_string(),
    })?;

    let mut file = File::new(FileHeader {
        immediate_origin: first.origin.clone(),
        immediate_destination: first.destination.clone(),
        created,
        file_id_modifier: 'A',
        immediate_origin_name: first.origin_name.clone(),
        immediate_destination_name: first.destination_name.clone(),
        reference_code: String::new(),
    });

    for (key, rows) in &groups {
        file.add_batch(build_batch(*key, rows)?);
    }
    file.rebalance()?;

    debug!(
        "Read file {} with {} batches",
        file.routing_pair(),
        file.batches().len()
    );
    Ok(file)
}

/// Reads one ACH file from an entry listing on disk.
pub fn read_path(path: &Path, created: NaiveDateTime) -> Result<File> {
    let file = std::fs::File::open(path)?;
    read_file(std::io::BufReader::new(file), created)
}

fn build_batch(key: u32, rows: &[(usize, EntryRecord)]) -> Result<Batch> {
    // Safety: groups are only created together with their first row
    let (first_row, first) = &rows[0];
    let invalid = |row: usize, message: String| AchError::InvalidRecord { row, message };

    let odfi: String = first.origin.chars().take(8).collect();
    let effective_entry_date = NaiveDate::parse_from_str(&first.effective_date, "%Y-%m-%d")
        .map_err(|e| invalid(*first_row, format!("effective date {:?}: {}", first.effective_date, e)))?;

    let mut entries = Vec::with_capacity(rows.len());
    for (seq, (row, record)) in rows.iter().enumerate() {
        let (rdfi_identification, check_digit) =
            split_routing(&record.routing).map_err(|m| invalid(*row, m))?;
        if !matches!(record.amount.to_cents(), Some(cents) if cents <= MAX_ENTRY_CENTS) {
            return Err(invalid(
                *row,
                format!("amount {} does not fit the entry amount field", record.amount),
            ));
        }
        entries.push(EntryDetail {
            transaction_code: record.transaction_code,
            rdfi_identification,
            check_digit,
            dfi_account_number: record.account.clone(),
            amount: record.amount,
            individual_identification_number: String::new(),
            individual_name: record.name.clone(),
            discretionary_data: String::new(),
            addenda: record
                .addenda
                .as_ref()
                .filter(|text| !text.is_empty())
                .map(|text| Addenda05 {
                    payment_related_information: text.clone(),
                }),
            trace_number: format!("{}{:07}", odfi, seq + 1),
        });
    }

    let service_class_code = if entries.iter().all(EntryDetail::is_credit) {
        CREDITS_ONLY
    } else if entries.iter().all(EntryDetail::is_debit) {
        DEBITS_ONLY
    } else {
        MIXED_DEBITS_AND_CREDITS
    };

    let mut batch = Batch::new(BatchHeader {
        service_class_code,
        company_name: first.company_name.clone(),
        company_discretionary_data: String::new(),
        company_identification: first.company_id.clone(),
        standard_entry_class_code: first.sec_code.clone(),
        company_entry_description: first.entry_description.clone(),
        company_descriptive_date: String::new(),
        effective_entry_date,
        odfi_identification: odfi,
        batch_number: key,
    });
    for entry in entries {
        batch.add_entry(entry);
    }
    Ok(batch)
}
