//! Error types for ACH file merging.

use thiserror::Error;

/// Result type alias for merge operations
pub type Result<T> = std::result::Result<T, AchError>;

/// Errors that can occur while loading, merging or rendering ACH files.
#[derive(Error, Debug)]
pub enum AchError {
    /// Failed to open, read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid entry listing record
    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Unparsable configuration override
    #[error("Invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },

    /// A file or batch was rejected while recomputing its control totals
    #[error("Validation error: {0}")]
    Validation(String),

    /// A numeric field does not fit its fixed-width column
    #[error("{field} value {value} does not fit in {width} characters")]
    FieldOverflow {
        field: &'static str,
        value: String,
        width: usize,
    },

    /// Control record totals disagree with the batches present
    #[error("Control record mismatch: {0}")]
    ControlMismatch(String),

    /// Rendering a merge candidate failed
    #[error("Problem getting line count of file (origin {origin}, destination {destination}): {source}")]
    Measure {
        origin: String,
        destination: String,
        #[source]
        source: Box<AchError>,
    },

    /// A merge candidate rendered to zero lines
    #[error("File (origin {origin}, destination {destination}) rendered to zero lines")]
    EmptyMeasurement { origin: String, destination: String },

    /// A single batch cannot be placed in any file under the line limit
    #[error("Batch {batch} needs {lines} lines on its own, over the {limit} line limit")]
    BatchExceedsLimit {
        batch: String,
        lines: usize,
        limit: usize,
    },

    /// Missing command line arguments
    #[error("Missing arguments. Usage: ach-merge <output-dir> <input.csv>...")]
    MissingArgument,
}
