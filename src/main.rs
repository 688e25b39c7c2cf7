//! ACH Merge CLI
//!
//! Reads CSV entry listings (one per ACH file), merges them and writes the
//! resulting NACHA files into an output directory. A CSV summary of the
//! output files is printed to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- out/ payroll.csv vendors.csv > summary.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `info` to control logging verbosity
//! - `ACH_MERGE_LINE_LIMIT`: Override the 10,000 line limit
//! - `ACH_MERGE_SMALL_FILE_BATCHES`: Override the batch count below which line counting is skipped

use ach_merge::report::{output_file_name, write_summary};
use ach_merge::{import, AchError, MergeConfig, Merger, NachaWriter, Result};
use chrono::Local;
use log::info;
use std::env;
use std::fs;
use std::io::{self, BufWriter};
use std::path::Path;
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        return Err(AchError::MissingArgument);
    }

    let output_dir = Path::new(&args[1]);
    let config = MergeConfig::from_env()?;
    let created = Local::now().naive_local();

    let mut inputs = Vec::with_capacity(args.len() - 2);
    for path in &args[2..] {
        info!("Reading {}", path);
        inputs.push(import::read_path(Path::new(path), created)?);
    }

    let merger = Merger::new(config);
    info!(
        "Merging {} files with a {} line limit",
        inputs.len(),
        merger.config().line_limit
    );
    let merged = merger.merge(inputs)?;

    fs::create_dir_all(output_dir)?;
    let writer = NachaWriter::new();
    let mut line_counts = Vec::with_capacity(merged.len());
    for (i, file) in merged.iter().enumerate() {
        let path = output_dir.join(output_file_name(i, file));
        let lines = writer.write(file, BufWriter::new(fs::File::create(&path)?))?;
        info!("Wrote {} ({} lines)", path.display(), lines);
        line_counts.push(lines);
    }

    let stdout = io::stdout();
    let handle = stdout.lock();
    write_summary(&merged, &line_counts, handle)?;

    Ok(())
}
