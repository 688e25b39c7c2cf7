//! Renders files into the NACHA fixed-width text encoding.
//!
//! Every record is 94 characters. Files are padded with all-`9` records to a
//! multiple of the blocking factor.

use crate::amount::Amount;
use crate::batch::{Addenda05, Batch, BatchControl, BatchHeader, EntryDetail};
use crate::capacity::count_non_empty_lines;
use crate::error::{AchError, Result};
use crate::file::{File, FileControl, FileHeader, BLOCKING_FACTOR};
use std::io::Write;

/// Length of every rendered record.
pub const RECORD_LENGTH: usize = 94;

/// Serializes a file into its canonical line-oriented text.
pub trait Render {
    fn render(&self, file: &File) -> Result<String>;
}

impl<R: Render + ?Sized> Render for &R {
    fn render(&self, file: &File) -> Result<String> {
        (**self).render(file)
    }
}

/// The standard NACHA renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NachaWriter;

impl NachaWriter {
    pub fn new() -> Self {
        NachaWriter
    }

    /// Renders `file`, writes it to `writer` and returns the number of lines
    /// written.
    pub fn write<W: Write>(&self, file: &File, mut writer: W) -> Result<usize> {
        let text = self.render(file)?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(count_non_empty_lines(&text))
    }
}

impl Render for NachaWriter {
    fn render(&self, file: &File) -> Result<String> {
        check_controls(file)?;

        let mut lines = Vec::with_capacity(file.record_count() + BLOCKING_FACTOR);
        lines.push(file_header_record(file.header())?);
        for batch in file.batches() {
            lines.push(batch_header_record(batch.header())?);
            for entry in batch.entries() {
                lines.push(entry_record(entry)?);
                if let Some(addenda) = &entry.addenda {
                    lines.push(addenda_record(addenda, entry)?);
                }
            }
            lines.push(batch_control_record(batch.control())?);
        }
        lines.push(file_control_record(file.control())?);

        while lines.len() % BLOCKING_FACTOR != 0 {
            lines.push("9".repeat(RECORD_LENGTH));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }
}

/// Verifies the control records agree with the batches present.
fn check_controls(file: &File) -> Result<()> {
    for batch in file.batches() {
        check_batch_control(batch)?;
    }

    let control = file.control();
    let batches = file.batches();
    if control.batch_count as usize != batches.len() {
        return Err(AchError::ControlMismatch(format!(
            "file control batch count {} but file has {} batches",
            control.batch_count,
            batches.len()
        )));
    }
    if control.entry_addenda_count as usize != file.entry_addenda_count() {
        return Err(AchError::ControlMismatch(format!(
            "file control entry/addenda count {} but batches hold {}",
            control.entry_addenda_count,
            file.entry_addenda_count()
        )));
    }
    let debit: Amount = batches.iter().map(|b| b.control().total_debit).sum();
    let credit: Amount = batches.iter().map(|b| b.control().total_credit).sum();
    if control.total_debit != debit || control.total_credit != credit {
        return Err(AchError::ControlMismatch(format!(
            "file control totals debit {} credit {} but batches sum to debit {} credit {}",
            control.total_debit, control.total_credit, debit, credit
        )));
    }
    Ok(())
}

fn check_batch_control(batch: &Batch) -> Result<()> {
    let control = batch.control();
    if control.entry_addenda_count as usize != batch.entry_addenda_count() {
        return Err(AchError::ControlMismatch(format!(
            "batch {} control entry/addenda count {} but batch holds {}",
            batch,
            control.entry_addenda_count,
            batch.entry_addenda_count()
        )));
    }
    if control.batch_number != batch.header().batch_number {
        return Err(AchError::ControlMismatch(format!(
            "batch {} control carries batch number {}",
            batch, control.batch_number
        )));
    }
    Ok(())
}

fn file_header_record(header: &FileHeader) -> Result<String> {
    let mut line = String::with_capacity(RECORD_LENGTH);
    line.push_str("101");
    line.push(' ');
    line.push_str(&digits("immediate destination", &header.immediate_destination, 9)?);
    line.push(' ');
    line.push_str(&digits("immediate origin", &header.immediate_origin, 9)?);
    line.push_str(&header.created.format("%y%m%d%H%M").to_string());
    line.push(header.file_id_modifier.to_ascii_uppercase());
    line.push_str("094101");
    line.push_str(&alpha(&header.immediate_destination_name, 23));
    line.push_str(&alpha(&header.immediate_origin_name, 23));
    line.push_str(&alpha(&header.reference_code, 8));
    Ok(line)
}

fn batch_header_record(header: &BatchHeader) -> Result<String> {
    let mut line = String::with_capacity(RECORD_LENGTH);
    line.push('5');
    line.push_str(&numeric("service class code", u64::from(header.service_class_code), 3)?);
    line.push_str(&alpha(&header.company_name, 16));
    line.push_str(&alpha(&header.company_discretionary_data, 20));
    line.push_str(&alpha(&header.company_identification, 10));
    line.push_str(&alpha(&header.standard_entry_class_code, 3));
    line.push_str(&alpha(&header.company_entry_description, 10));
    line.push_str(&alpha(&header.company_descriptive_date, 6));
    line.push_str(&header.effective_entry_date.format("%y%m%d").to_string());
    line.push_str("   ");
    line.push('1');
    line.push_str(&digits("ODFI identification", &header.odfi_identification, 8)?);
    line.push_str(&numeric("batch number", u64::from(header.batch_number), 7)?);
    Ok(line)
}

fn entry_record(entry: &EntryDetail) -> Result<String> {
    let mut line = String::with_capacity(RECORD_LENGTH);
    line.push('6');
    line.push_str(&numeric("transaction code", u64::from(entry.transaction_code), 2)?);
    line.push_str(&digits("RDFI identification", &entry.rdfi_identification, 8)?);
    line.push_str(&numeric("check digit", u64::from(entry.check_digit), 1)?);
    line.push_str(&alpha(&entry.dfi_account_number, 17));
    line.push_str(&amount("amount", entry.amount, 10)?);
    line.push_str(&alpha(&entry.individual_identification_number, 15));
    line.push_str(&alpha(&entry.individual_name, 22));
    line.push_str(&alpha(&entry.discretionary_data, 2));
    line.push(if entry.addenda.is_some() { '1' } else { '0' });
    line.push_str(&digits("trace number", &entry.trace_number, 15)?);
    Ok(line)
}

fn addenda_record(addenda: &Addenda05, entry: &EntryDetail) -> Result<String> {
    let trace = digits("trace number", &entry.trace_number, 15)?;
    let mut line = String::with_capacity(RECORD_LENGTH);
    line.push_str("705");
    line.push_str(&alpha(&addenda.payment_related_information, 80));
    line.push_str("0001");
    line.push_str(&trace[8..]);
    Ok(line)
}

fn batch_control_record(control: &BatchControl) -> Result<String> {
    let mut line = String::with_capacity(RECORD_LENGTH);
    line.push('8');
    line.push_str(&numeric("service class code", u64::from(control.service_class_code), 3)?);
    line.push_str(&numeric("entry/addenda count", u64::from(control.entry_addenda_count), 6)?);
    line.push_str(&numeric("entry hash", control.entry_hash, 10)?);
    line.push_str(&amount("total debit", control.total_debit, 12)?);
    line.push_str(&amount("total credit", control.total_credit, 12)?);
    line.push_str(&alpha(&control.company_identification, 10));
    line.push_str(&" ".repeat(25));
    line.push_str(&digits("ODFI identification", &control.odfi_identification, 8)?);
    line.push_str(&numeric("batch number", u64::from(control.batch_number), 7)?);
    Ok(line)
}

fn file_control_record(control: &FileControl) -> Result<String> {
    let mut line = String::with_capacity(RECORD_LENGTH);
    line.push('9');
    line.push_str(&numeric("batch count", u64::from(control.batch_count), 6)?);
    line.push_str(&numeric("block count", u64::from(control.block_count), 6)?);
    line.push_str(&numeric("entry/addenda count", u64::from(control.entry_addenda_count), 8)?);
    line.push_str(&numeric("entry hash", control.entry_hash, 10)?);
    line.push_str(&amount("total debit", control.total_debit, 12)?);
    line.push_str(&amount("total credit", control.total_credit, 12)?);
    line.push_str(&" ".repeat(39));
    Ok(line)
}

/// Upper-cases, truncates and space-pads an alphanumeric field.
fn alpha(value: &str, width: usize) -> String {
    let mut out: String = value
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c.to_ascii_uppercase() } else { ' ' })
        .take(width)
        .collect();
    while out.len() < width {
        out.push(' ');
    }
    out
}

/// Zero-pads a number to `width`, failing if it does not fit.
fn numeric(field: &'static str, value: u64, width: usize) -> Result<String> {
    let out = format!("{:0width$}", value, width = width);
    if out.len() > width {
        return Err(AchError::FieldOverflow {
            field,
            value: value.to_string(),
            width,
        });
    }
    Ok(out)
}

/// Zero-pads a string of digits to `width`.
fn digits(field: &'static str, value: &str, width: usize) -> Result<String> {
    if value.len() > width || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AchError::FieldOverflow {
            field,
            value: value.to_string(),
            width,
        });
    }
    Ok(format!("{:0>width$}", value, width = width))
}

fn amount(field: &'static str, value: Amount, width: usize) -> Result<String> {
    let cents = value.to_cents().ok_or_else(|| AchError::FieldOverflow {
        field,
        value: value.to_string(),
        width,
    })?;
    numeric(field, cents, width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::MIXED_DEBITS_AND_CREDITS;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn sample_file(entries: usize, with_addenda: bool) -> File {
        let mut file = File::new(FileHeader {
            immediate_origin: "231380104".to_string(),
            immediate_destination: "091000019".to_string(),
            created: NaiveDate::from_ymd_opt(2026, 10, 15)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            file_id_modifier: 'A',
            immediate_origin_name: "My Bank".to_string(),
            immediate_destination_name: "Federal Reserve Bank".to_string(),
            reference_code: String::new(),
        });
        let mut batch = Batch::new(BatchHeader {
            service_class_code: MIXED_DEBITS_AND_CREDITS,
            company_name: "ACME CORP".to_string(),
            company_discretionary_data: String::new(),
            company_identification: "1234567890".to_string(),
            standard_entry_class_code: "PPD".to_string(),
            company_entry_description: "PAYROLL".to_string(),
            company_descriptive_date: String::new(),
            effective_entry_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            odfi_identification: "23138010".to_string(),
            batch_number: 1,
        });
        for i in 0..entries {
            batch.add_entry(EntryDetail {
                transaction_code: 22,
                rdfi_identification: "09100001".to_string(),
                check_digit: 9,
                dfi_account_number: "12345678".to_string(),
                amount: Amount::from_str("100.00").unwrap(),
                individual_identification_number: String::new(),
                individual_name: "Jane Doe".to_string(),
                discretionary_data: String::new(),
                addenda: with_addenda.then(|| Addenda05 {
                    payment_related_information: "INVOICE 42".to_string(),
                }),
                trace_number: format!("23138010{:07}", i + 1),
            });
        }
        file.add_batch(batch);
        file.rebalance().unwrap();
        file
    }

    #[test]
    fn test_every_record_is_94_characters_and_padded_to_block() {
        let text = NachaWriter.render(&sample_file(3, true)).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 10);
        assert!(lines.iter().all(|l| l.len() == RECORD_LENGTH));
        // 2 file + 2 batch + 3 entries + 3 addenda = 10 records, no padding needed
        assert!(lines[9].starts_with('9') && !lines[9].chars().all(|c| c == '9'));
    }

    #[test]
    fn test_padding_lines_fill_block() {
        let text = NachaWriter.render(&sample_file(1, false)).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 10);
        assert!(lines[5..].iter().all(|l| l.chars().all(|c| c == '9')));
    }

    #[test]
    fn test_write_returns_line_count() {
        let file = sample_file(12, false);
        let mut out = Vec::new();

        let lines = NachaWriter.write(&file, &mut out).unwrap();

        assert_eq!(lines, 20);
        assert_eq!(String::from_utf8(out).unwrap(), NachaWriter.render(&file).unwrap());
    }

    #[test]
    fn test_record_layout() {
        let text = NachaWriter.render(&sample_file(1, true)).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(&lines[0][..40], "101 091000019 2313801042610150930A094101");
        assert_eq!(&lines[0][40..63], "FEDERAL RESERVE BANK   ");
        assert!(lines[1].starts_with("5200ACME CORP"));
        assert!(lines[1].ends_with("231380100000001"));
        assert!(lines[2].starts_with("62209100001912345678         0000010000"));
        assert_eq!(&lines[2][78..79], "1");
        assert!(lines[3].starts_with("705INVOICE 42"));
        assert!(lines[3].ends_with("00010000001"));
        assert!(lines[4].starts_with("82000000020009100001000000000000000000010000"));
        assert!(lines[5].starts_with("9000001000001000000020009100001"));
    }

    #[test]
    fn test_render_rejects_stale_control() {
        let mut file = sample_file(2, false);
        let duplicate = file.batches()[0].clone();
        file.add_batch(duplicate);
        let err = NachaWriter.render(&file).unwrap_err();
        assert!(matches!(err, AchError::ControlMismatch(_)));
    }

    #[test]
    fn test_render_rejects_amount_overflow() {
        let mut file = sample_file(1, false);
        let mut batch = file.batches()[0].clone();
        let mut big = batch.entries()[0].clone();
        big.amount = Amount::from_str("100000000.00").unwrap();
        batch.add_entry(big);
        file.add_batch(batch);
        file.rebalance().unwrap();

        let err = NachaWriter.render(&file).unwrap_err();
        assert!(matches!(err, AchError::FieldOverflow { field: "amount", .. }));
    }

    #[test]
    fn test_alpha_truncates_and_pads() {
        assert_eq!(alpha("abc", 5), "ABC  ");
        assert_eq!(alpha("abcdefgh", 3), "ABC");
        assert_eq!(alpha("é", 2), "  ");
    }
}
