//! Batch model: header, entry details with optional addenda, and control.
//!
//! A batch's control record is derived data. `Batch::rebalance` recomputes it
//! from the header and entries and must run after any change to either.

use crate::amount::Amount;
use crate::error::{AchError, Result};
use chrono::NaiveDate;
use std::fmt;

/// Service class code for batches mixing debits and credits.
pub const MIXED_DEBITS_AND_CREDITS: u16 = 200;

/// Service class code for credit-only batches.
pub const CREDITS_ONLY: u16 = 220;

/// Service class code for debit-only batches.
pub const DEBITS_ONLY: u16 = 225;

/// Entry hash and file entry hash keep only the rightmost 10 digits.
const ENTRY_HASH_MODULUS: u64 = 10_000_000_000;

const CREDIT_CODES: [u8; 12] = [22, 23, 24, 32, 33, 34, 42, 43, 44, 52, 53, 54];
const DEBIT_CODES: [u8; 10] = [27, 28, 29, 37, 38, 39, 47, 48, 49, 55];

/// Batch header record ("5" record).
#[derive(Debug, Clone)]
pub struct BatchHeader {
    pub service_class_code: u16,
    pub company_name: String,
    pub company_discretionary_data: String,
    pub company_identification: String,
    /// Standard entry class code, e.g. `PPD`, `CCD`, `WEB`.
    pub standard_entry_class_code: String,
    pub company_entry_description: String,
    pub company_descriptive_date: String,
    pub effective_entry_date: NaiveDate,
    /// First 8 digits of the originating DFI routing number.
    pub odfi_identification: String,
    /// Sequence ordinal of the batch within its file.
    pub batch_number: u32,
}

impl BatchHeader {
    /// Compares every header field except `batch_number`.
    ///
    /// Fields are destructured exhaustively so adding one to the struct
    /// forces a decision here.
    pub fn same_content(&self, other: &BatchHeader) -> bool {
        let BatchHeader {
            service_class_code,
            company_name,
            company_discretionary_data,
            company_identification,
            standard_entry_class_code,
            company_entry_description,
            company_descriptive_date,
            effective_entry_date,
            odfi_identification,
            batch_number: _,
        } = self;

        *service_class_code == other.service_class_code
            && *company_name == other.company_name
            && *company_discretionary_data == other.company_discretionary_data
            && *company_identification == other.company_identification
            && *standard_entry_class_code == other.standard_entry_class_code
            && *company_entry_description == other.company_entry_description
            && *company_descriptive_date == other.company_descriptive_date
            && *effective_entry_date == other.effective_entry_date
            && *odfi_identification == other.odfi_identification
    }
}

/// Payment related information addenda ("7" record, type 05).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addenda05 {
    pub payment_related_information: String,
}

/// Entry detail record ("6" record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDetail {
    pub transaction_code: u8,
    /// First 8 digits of the receiving DFI routing number.
    pub rdfi_identification: String,
    pub check_digit: u8,
    pub dfi_account_number: String,
    pub amount: Amount,
    pub individual_identification_number: String,
    pub individual_name: String,
    pub discretionary_data: String,
    pub addenda: Option<Addenda05>,
    pub trace_number: String,
}

impl EntryDetail {
    /// Returns `true` for debit transaction codes.
    pub fn is_debit(&self) -> bool {
        DEBIT_CODES.contains(&self.transaction_code)
    }

    /// Returns `true` for credit transaction codes.
    pub fn is_credit(&self) -> bool {
        CREDIT_CODES.contains(&self.transaction_code)
    }

    /// Number of records this entry contributes to entry/addenda counts.
    pub fn record_count(&self) -> usize {
        1 + usize::from(self.addenda.is_some())
    }
}

/// Batch control record ("8" record).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchControl {
    pub service_class_code: u16,
    pub entry_addenda_count: u32,
    pub entry_hash: u64,
    pub total_debit: Amount,
    pub total_credit: Amount,
    pub company_identification: String,
    pub odfi_identification: String,
    pub batch_number: u32,
}

/// A batch of entries sharing one header.
#[derive(Debug, Clone)]
pub struct Batch {
    header: BatchHeader,
    entries: Vec<EntryDetail>,
    control: BatchControl,
}

impl Batch {
    /// Creates an empty batch. Call [`Batch::rebalance`] once entries are added.
    pub fn new(header: BatchHeader) -> Self {
        Batch {
            header,
            entries: Vec::new(),
            control: BatchControl::default(),
        }
    }

    pub fn header(&self) -> &BatchHeader {
        &self.header
    }

    pub fn entries(&self) -> &[EntryDetail] {
        &self.entries
    }

    pub fn control(&self) -> &BatchControl {
        &self.control
    }

    pub fn add_entry(&mut self, entry: EntryDetail) {
        self.entries.push(entry);
    }

    /// Overwrites the sequence ordinal on both the header and the control.
    pub fn set_batch_number(&mut self, number: u32) {
        self.header.batch_number = number;
        self.control.batch_number = number;
    }

    /// Number of entry and addenda records.
    pub fn entry_addenda_count(&self) -> usize {
        self.entries.iter().map(EntryDetail::record_count).sum()
    }

    /// Number of rendered lines: header, entries, addenda and control.
    pub fn line_count(&self) -> usize {
        2 + self.entry_addenda_count()
    }

    /// Ordinal-independent equality: same header content and identical entries.
    ///
    /// The batch number is excluded because the same logical batch can arrive
    /// in several files under different ordinals.
    pub fn same_content(&self, other: &Batch) -> bool {
        self.header.same_content(&other.header) && self.entries == other.entries
    }

    /// Recomputes the control record from the header and entries.
    ///
    /// # Errors
    ///
    /// Returns `AchError::Validation` if the batch has no entries, an entry
    /// has an unknown transaction code or an RDFI identification that is not
    /// 8 digits, an entry's direction contradicts the service class code, or
    /// a total overflows.
    pub fn rebalance(&mut self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(AchError::Validation(format!("batch {} has no entries", self)));
        }

        let mut control = BatchControl {
            service_class_code: self.header.service_class_code,
            company_identification: self.header.company_identification.clone(),
            odfi_identification: self.header.odfi_identification.clone(),
            batch_number: self.header.batch_number,
            ..BatchControl::default()
        };

        let overflow = |total: &str| {
            AchError::Validation(format!("batch {}: total {} overflows", self, total))
        };

        let mut hash = 0u64;
        for entry in &self.entries {
            let rdfi = &entry.rdfi_identification;
            if rdfi.len() != 8 || !rdfi.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AchError::Validation(format!(
                    "batch {}: RDFI identification {:?} is not 8 digits",
                    self, rdfi
                )));
            }
            let rdfi: u64 = rdfi.parse().map_err(|_| {
                AchError::Validation(format!("batch {}: bad RDFI identification {:?}", self, rdfi))
            })?;
            hash = (hash + rdfi) % ENTRY_HASH_MODULUS;

            if entry.is_debit() {
                if self.header.service_class_code == CREDITS_ONLY {
                    return Err(AchError::Validation(format!(
                        "batch {}: debit entry {} in credit-only batch",
                        self, entry.trace_number
                    )));
                }
                control.total_debit = control
                    .total_debit
                    .checked_add(entry.amount)
                    .ok_or_else(|| overflow("debit"))?;
            } else if entry.is_credit() {
                if self.header.service_class_code == DEBITS_ONLY {
                    return Err(AchError::Validation(format!(
                        "batch {}: credit entry {} in debit-only batch",
                        self, entry.trace_number
                    )));
                }
                control.total_credit = control
                    .total_credit
                    .checked_add(entry.amount)
                    .ok_or_else(|| overflow("credit"))?;
            } else {
                return Err(AchError::Validation(format!(
                    "batch {}: unknown transaction code {} on entry {}",
                    self, entry.transaction_code, entry.trace_number
                )));
            }
        }

        control.entry_hash = hash;
        control.entry_addenda_count = u32::try_from(self.entry_addenda_count())
            .map_err(|_| AchError::Validation(format!("batch {} has too many entries", self)))?;
        self.control = control;
        Ok(())
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} ({} {} {})",
            self.header.batch_number,
            self.header.company_identification,
            self.header.standard_entry_class_code,
            self.header.company_entry_description
        )
    }
}
