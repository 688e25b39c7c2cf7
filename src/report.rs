//! Merge summary output.

use crate::error::Result;
use crate::file::File;
use std::io::Write;

/// Name for the `index`th (0-based) output file.
pub fn output_file_name(index: usize, file: &File) -> String {
    let pair = file.routing_pair();
    format!("{:03}-{}-{}.ach", index + 1, pair.origin, pair.destination)
}

/// Writes one CSV row per output file, in output order.
///
/// `line_counts` holds the rendered line count of each file, as returned by
/// [`NachaWriter::write`](crate::writer::NachaWriter::write).
pub fn write_summary<W: Write>(files: &[File], line_counts: &[usize], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "file",
        "origin",
        "destination",
        "batches",
        "entries",
        "debit",
        "credit",
        "lines",
    ])?;

    for (i, (file, lines)) in files.iter().zip(line_counts).enumerate() {
        let pair = file.routing_pair();
        let entries: usize = file.batches().iter().map(|b| b.entries().len()).sum();
        csv_writer.write_record([
            output_file_name(i, file),
            pair.origin,
            pair.destination,
            file.batches().len().to_string(),
            entries.to_string(),
            file.control().total_debit.to_string(),
            file.control().total_credit.to_string(),
            lines.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::read_file;
    use crate::writer::NachaWriter;
    use chrono::NaiveDate;
    use std::io::Cursor;

    #[test]
    fn test_summary_format() {
        let csv = "origin,destination,origin_name,destination_name,batch,company_name,company_id,sec_code,entry_description,effective_date,transaction_code,routing,account,amount,name,addenda
231380104,091000019,,,1,Acme,1234567890,PPD,PAYROLL,2026-10-16,22,091000019,111,10.00,Jane,
231380104,091000019,,,1,Acme,1234567890,PPD,PAYROLL,2026-10-16,27,091000019,222,4.00,Bob,
";
        let created = NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let file = read_file(Cursor::new(csv), created).unwrap();

        let lines = NachaWriter.write(&file, std::io::sink()).unwrap();
        let mut output = Vec::new();
        write_summary(&[file], &[lines], &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.starts_with("file,origin,destination,batches,entries,debit,credit,lines"));
        assert!(output_str.contains("001-231380104-091000019.ach,231380104,091000019,1,2,4.00,10.00,10"));
    }
}
