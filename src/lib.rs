//! # ACH Merge
//!
//! Consolidates NACHA ACH files into as few files as possible. Batches are
//! merged only into files sharing the same immediate origin and destination,
//! duplicate batches collapse to one copy, and every output file stays under
//! the 10,000 line limit NACHA rules impose on rendered files.
//!
//! ## Design Principles
//!
//! - **Greedy placement**: Batches are appended in the order they are read
//! - **Derived controls**: Batch and file control records are recomputed after every change
//! - **Cheap capacity checks**: Files with few batches skip rendering when counting lines
//! - **All-or-nothing**: Any failure aborts the merge without partial output
//!
//! ## Example
//!
//! ```no_run
//! use ach_merge::{import, merge_files, NachaWriter};
//! use chrono::Local;
//! use std::path::Path;
//!
//! let now = Local::now().naive_local();
//! let a = import::read_path(Path::new("a.csv"), now).unwrap();
//! let b = import::read_path(Path::new("b.csv"), now).unwrap();
//!
//! for file in merge_files(vec![a, b]).unwrap() {
//!     NachaWriter.write(&file, std::io::stdout()).unwrap();
//! }
//! ```

pub mod amount;
pub mod batch;
pub mod capacity;
pub mod config;
pub mod error;
pub mod file;
pub mod import;
pub mod merge;
pub mod report;
pub mod writer;

pub use amount::Amount;
pub use batch::{Addenda05, Batch, BatchControl, BatchHeader, EntryDetail};
pub use capacity::{count_non_empty_lines, LineCounter};
pub use config::{MergeConfig, NACHA_FILE_LINE_LIMIT, SMALL_FILE_BATCH_THRESHOLD};
pub use error::{AchError, Result};
pub use file::{File, FileControl, FileHeader, RoutingPair};
pub use merge::{merge_files, renumber_batches, Merger};
pub use writer::{NachaWriter, Render};
