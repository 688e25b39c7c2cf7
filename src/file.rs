//! File model: header, ordered batches and the derived file control.
//!
//! Maintains the invariant that the file control reflects exactly the batches
//! present, as long as `File::rebalance` runs after every membership change.

use crate::amount::Amount;
use crate::batch::Batch;
use crate::error::{AchError, Result};
use chrono::NaiveDateTime;
use std::fmt;

/// Records per block; rendered files are padded to a multiple of this.
pub const BLOCKING_FACTOR: usize = 10;

const ENTRY_HASH_MODULUS: u64 = 10_000_000_000;

/// The (immediate origin, immediate destination) pair files are grouped by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingPair {
    pub origin: String,
    pub destination: String,
}

impl fmt::Display for RoutingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.origin, self.destination)
    }
}

/// File header record ("1" record).
#[derive(Debug, Clone)]
pub struct FileHeader {
    /// 9 digit routing number of the sending point.
    pub immediate_origin: String,
    /// 9 digit routing number of the receiving point.
    pub immediate_destination: String,
    /// File creation date and time (rendered as YYMMDD and HHMM).
    pub created: NaiveDateTime,
    pub file_id_modifier: char,
    pub immediate_origin_name: String,
    pub immediate_destination_name: String,
    pub reference_code: String,
}

impl FileHeader {
    pub fn routing_pair(&self) -> RoutingPair {
        RoutingPair {
            origin: self.immediate_origin.clone(),
            destination: self.immediate_destination.clone(),
        }
    }

    /// Copy of this header with a new creation timestamp.
    pub fn restamped(&self, now: NaiveDateTime) -> FileHeader {
        FileHeader {
            created: now,
            ..self.clone()
        }
    }
}

/// File control record ("9" record).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileControl {
    pub batch_count: u32,
    pub block_count: u32,
    pub entry_addenda_count: u32,
    pub entry_hash: u64,
    pub total_debit: Amount,
    pub total_credit: Amount,
}

/// An ACH file.
#[derive(Debug, Clone)]
pub struct File {
    header: FileHeader,
    batches: Vec<Batch>,
    control: FileControl,
}

impl File {
    /// Creates a file with no batches. Call [`File::rebalance`] before rendering.
    pub fn new(header: FileHeader) -> Self {
        File {
            header,
            batches: Vec::new(),
            control: FileControl::default(),
        }
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn control(&self) -> &FileControl {
        &self.control
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Mutable access to batches for ordinal rewrites. Changing batch content
    /// through this requires a rebalance.
    pub fn batches_mut(&mut self) -> &mut [Batch] {
        &mut self.batches
    }

    pub fn routing_pair(&self) -> RoutingPair {
        self.header.routing_pair()
    }

    /// Splits the file into its header and batches, dropping the control.
    pub fn into_parts(self) -> (FileHeader, Vec<Batch>) {
        (self.header, self.batches)
    }

    pub fn add_batch(&mut self, batch: Batch) {
        self.batches.push(batch);
    }

    /// Removes and returns the most recently added batch.
    pub fn pop_batch(&mut self) -> Option<Batch> {
        self.batches.pop()
    }

    /// Returns `true` if a batch with the same content (ignoring batch
    /// number) is already present.
    pub fn contains_batch(&self, batch: &Batch) -> bool {
        self.batches.iter().any(|b| b.same_content(batch))
    }

    /// Total entry and addenda records across all batches.
    pub fn entry_addenda_count(&self) -> usize {
        self.batches.iter().map(Batch::entry_addenda_count).sum()
    }

    /// Number of records before block padding.
    pub fn record_count(&self) -> usize {
        2 + self.batches.iter().map(Batch::line_count).sum::<usize>()
    }

    /// Rebalances every batch, then derives the file control from them.
    ///
    /// A file with no batches is valid and gets zeroed totals.
    pub fn rebalance(&mut self) -> Result<()> {
        validate_routing_number("immediate origin", &self.header.immediate_origin)?;
        validate_routing_number("immediate destination", &self.header.immediate_destination)?;
        if !self.header.file_id_modifier.is_ascii_alphanumeric() {
            return Err(AchError::Validation(format!(
                "file ID modifier {:?} is not A-Z or 0-9",
                self.header.file_id_modifier
            )));
        }

        for batch in &mut self.batches {
            batch.rebalance()?;
        }

        let mut control = FileControl::default();
        let mut hash = 0u64;
        for batch in &self.batches {
            hash = (hash + batch.control().entry_hash) % ENTRY_HASH_MODULUS;
            control.total_debit = control
                .total_debit
                .checked_add(batch.control().total_debit)
                .ok_or_else(|| total_overflow("debit"))?;
            control.total_credit = control
                .total_credit
                .checked_add(batch.control().total_credit)
                .ok_or_else(|| total_overflow("credit"))?;
        }
        control.entry_hash = hash;
        control.batch_count = to_u32("batch count", self.batches.len())?;
        control.entry_addenda_count = to_u32("entry/addenda count", self.entry_addenda_count())?;
        control.block_count = to_u32(
            "block count",
            self.record_count().div_ceil(BLOCKING_FACTOR),
        )?;

        self.control = control;
        Ok(())
    }
}

fn validate_routing_number(field: &str, value: &str) -> Result<()> {
    if value.len() != 9 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AchError::Validation(format!(
            "{} {:?} is not a 9 digit routing number",
            field, value
        )));
    }
    Ok(())
}

fn total_overflow(total: &str) -> AchError {
    AchError::Validation(format!("file {} total overflows", total))
}

fn to_u32(field: &str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| AchError::Validation(format!("{} {} is too large", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchHeader, EntryDetail, MIXED_DEBITS_AND_CREDITS};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn header() -> FileHeader {
        FileHeader {
            immediate_origin: "231380104".to_string(),
            immediate_destination: "091000019".to_string(),
            created: NaiveDate::from_ymd_opt(2026, 10, 15)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            file_id_modifier: 'A',
            immediate_origin_name: "MY BANK".to_string(),
            immediate_destination_name: "FEDERAL RESERVE".to_string(),
            reference_code: String::new(),
        }
    }

    fn batch(description: &str, amounts: &[&str]) -> Batch {
        let mut batch = Batch::new(BatchHeader {
            service_class_code: MIXED_DEBITS_AND_CREDITS,
            company_name: "ACME CORP".to_string(),
            company_discretionary_data: String::new(),
            company_identification: "1234567890".to_string(),
            standard_entry_class_code: "PPD".to_string(),
            company_entry_description: description.to_string(),
            company_descriptive_date: String::new(),
            effective_entry_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            odfi_identification: "23138010".to_string(),
            batch_number: 1,
        });
        for (i, amount) in amounts.iter().enumerate() {
            batch.add_entry(EntryDetail {
                transaction_code: 22,
                rdfi_identification: "09100001".to_string(),
                check_digit: 9,
                dfi_account_number: "12345678".to_string(),
                amount: Amount::from_str(amount).unwrap(),
                individual_identification_number: String::new(),
                individual_name: "JANE DOE".to_string(),
                discretionary_data: String::new(),
                addenda: None,
                trace_number: format!("23138010{:07}", i + 1),
            });
        }
        batch
    }

    #[test]
    fn test_empty_file_rebalances() {
        let mut file = File::new(header());
        file.rebalance().unwrap();

        assert_eq!(file.control().batch_count, 0);
        assert_eq!(file.control().block_count, 1);
        assert!(file.control().total_credit.is_zero());
    }

    #[test]
    fn test_rebalance_sums_batches() {
        let mut file = File::new(header());
        file.add_batch(batch("PAYROLL", &["10.00", "5.25"]));
        file.add_batch(batch("BONUS", &["1.00"]));
        file.rebalance().unwrap();

        let control = file.control();
        assert_eq!(control.batch_count, 2);
        assert_eq!(control.entry_addenda_count, 3);
        assert_eq!(control.entry_hash, 3 * 9100001);
        assert_eq!(control.total_credit.to_string(), "16.25");
        // 2 file records + (2 + 2) + (2 + 1) batch records = 9 records -> 1 block
        assert_eq!(file.record_count(), 9);
        assert_eq!(control.block_count, 1);
    }

    #[test]
    fn test_pop_batch_and_rebalance_restores_totals() {
        let mut file = File::new(header());
        file.add_batch(batch("PAYROLL", &["10.00"]));
        file.rebalance().unwrap();
        let before = file.control().clone();

        file.add_batch(batch("BONUS", &["3.00"]));
        file.rebalance().unwrap();
        assert_ne!(file.control(), &before);

        let popped = file.pop_batch().unwrap();
        file.rebalance().unwrap();
        assert_eq!(popped.header().company_entry_description, "BONUS");
        assert_eq!(file.control(), &before);
    }

    #[test]
    fn test_contains_batch_uses_content_equality() {
        let mut file = File::new(header());
        file.add_batch(batch("PAYROLL", &["10.00"]));

        let mut renumbered = batch("PAYROLL", &["10.00"]);
        renumbered.set_batch_number(42);
        assert!(file.contains_batch(&renumbered));
        assert!(!file.contains_batch(&batch("PAYROLL", &["10.01"])));
    }

    #[test]
    fn test_rebalance_rejects_bad_routing_number() {
        let mut h = header();
        h.immediate_origin = "12345".to_string();
        let mut file = File::new(h);
        assert!(matches!(file.rebalance(), Err(AchError::Validation(_))));
    }

    #[test]
    fn test_rebalance_rejects_non_ascii_file_id_modifier() {
        let mut h = header();
        h.file_id_modifier = 'É';
        let mut file = File::new(h);
        assert!(matches!(file.rebalance(), Err(AchError::Validation(_))));
    }

    #[test]
    fn test_restamped_keeps_routing_pair() {
        let h = header();
        let later = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(1, 2, 0)
            .unwrap();
        let restamped = h.restamped(later);
        assert_eq!(restamped.routing_pair(), h.routing_pair());
        assert_eq!(restamped.created, later);
    }
}
