//! Consolidates ACH files into as few files as possible.
//!
//! Batches can only be merged into files routed from and to the same ABA
//! routing numbers. Batches are placed greedily in the order they are read;
//! when a batch would push its candidate file over the line limit, the
//! candidate is sealed and a fresh file for the same routing pair continues
//! accumulating. Batch numbers are rewritten at the end so they start at 1
//! and never collide within a file.

use crate::batch::Batch;
use crate::capacity::LineCounter;
use crate::config::MergeConfig;
use crate::error::{AchError, Result};
use crate::file::{File, FileHeader, RoutingPair};
use crate::writer::{NachaWriter, Render};
use chrono::{Local, NaiveDateTime};
use log::{debug, info};
use std::collections::HashMap;

/// Merges `files` with the standard renderer and default limits.
pub fn merge_files(files: Vec<File>) -> Result<Vec<File>> {
    Merger::new(MergeConfig::default()).merge(files)
}

/// Rewrites batch numbers to 1..=N in the file's batch order.
pub fn renumber_batches(file: &mut File) {
    for (i, batch) in file.batches_mut().iter_mut().enumerate() {
        batch.set_batch_number(i as u32 + 1);
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measurement {
    /// Small files skip rendering.
    Estimate,
    /// Always render.
    Exact,
}

/// The merge engine.
///
/// # Ownership
///
/// Input files are consumed. The header of the first file seen for a routing
/// pair becomes the header of that pair's first output file; files split off
/// later get the same header with a fresh creation timestamp.
///
/// # Errors
///
/// Merging is all-or-nothing. A rebalance failure, a render failure while
/// counting lines, a zero line count or a batch that cannot fit in a file on
/// its own aborts the merge and no output is returned.
pub struct Merger<R> {
    counter: LineCounter<R>,
    config: MergeConfig,
    clock: fn() -> NaiveDateTime,
}

impl Merger<NachaWriter> {
    pub fn new(config: MergeConfig) -> Self {
        Merger::with_renderer(NachaWriter, config)
    }
}

impl<R: Render> Merger<R> {
    pub fn with_renderer(renderer: R, config: MergeConfig) -> Self {
        Merger {
            counter: LineCounter::new(renderer, config.small_file_batches),
            config,
            clock: local_now,
        }
    }

    /// Replaces the clock used to stamp files split off on overflow.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merges `files`, returning sealed files first (in the order they were
    /// sealed) followed by the still-open file of each routing pair (in the
    /// order the pairs were first seen).
    pub fn merge(&self, files: Vec<File>) -> Result<Vec<File>> {
        let input_count = files.len();
        let mut state = MergeState::default();

        for file in files {
            let (header, batches) = file.into_parts();
            let slot = state.open_slot(header)?;
            for batch in batches {
                self.place(&mut state, slot, batch)?;
            }
        }

        let out = state.finish();
        info!("Merged {} files into {} files", input_count, out.len());
        Ok(out)
    }

    /// Appends `batch` to the open file in `slot`, sealing it and continuing
    /// in a fresh file when the batch does not fit.
    fn place(&self, state: &mut MergeState, slot: usize, batch: Batch) -> Result<()> {
        let candidate = &mut state.open[slot];
        if candidate.contains_batch(&batch) {
            debug!(
                "Skipping duplicate batch {} for {}",
                batch,
                candidate.routing_pair()
            );
            return Ok(());
        }

        // A lone batch needs its own records plus the file header and control.
        let alone = batch.line_count() + 2;
        if alone > self.config.line_limit {
            return Err(AchError::BatchExceedsLimit {
                batch: batch.to_string(),
                lines: alone,
                limit: self.config.line_limit,
            });
        }

        candidate.add_batch(batch);
        candidate.rebalance()?;

        let lines = self.measure(candidate, Measurement::Estimate)?;
        if lines <= self.config.line_limit {
            return Ok(());
        }

        let carried = candidate.pop_batch().ok_or_else(|| {
            AchError::Validation(format!(
                "file for {} lost its last batch",
                candidate.routing_pair()
            ))
        })?;
        candidate.rebalance()?;

        if candidate.batches().is_empty() {
            return Err(AchError::BatchExceedsLimit {
                batch: carried.to_string(),
                lines,
                limit: self.config.line_limit,
            });
        }

        let mut fresh = File::new(candidate.header().restamped((self.clock)()));
        fresh.rebalance()?;
        let sealed = std::mem::replace(candidate, fresh);
        info!(
            "Sealed file for {} with {} batches, next batch would reach {} lines",
            sealed.routing_pair(),
            sealed.batches().len(),
            lines
        );
        state.sealed.push(sealed);

        let candidate = &mut state.open[slot];
        let description = carried.to_string();
        candidate.add_batch(carried);
        candidate.rebalance()?;

        let lines = self.measure(candidate, Measurement::Exact)?;
        if lines > self.config.line_limit {
            return Err(AchError::BatchExceedsLimit {
                batch: description,
                lines,
                limit: self.config.line_limit,
            });
        }
        Ok(())
    }

    fn measure(&self, file: &File, mode: Measurement) -> Result<usize> {
        let result = match mode {
            Measurement::Estimate => self.counter.line_count(file),
            Measurement::Exact => self.counter.exact_line_count(file),
        };

        let RoutingPair {
            origin,
            destination,
        } = file.routing_pair();
        match result {
            Ok(0) => Err(AchError::EmptyMeasurement {
                origin,
                destination,
            }),
            Ok(n) => Ok(n),
            Err(e) => Err(AchError::Measure {
                origin,
                destination,
                source: Box::new(e),
            }),
        }
    }
}

/// Working state owned by a single merge call.
#[derive(Default)]
struct MergeState {
    /// At most one open file per routing pair, in first-seen order.
    open: Vec<File>,
    slots: HashMap<RoutingPair, usize>,
    sealed: Vec<File>,
}

impl MergeState {
    /// Returns the open file slot for the header's routing pair, creating an
    /// empty file with this header if the pair is new.
    fn open_slot(&mut self, header: FileHeader) -> Result<usize> {
        let pair = header.routing_pair();
        if let Some(&slot) = self.slots.get(&pair) {
            return Ok(slot);
        }

        let mut file = File::new(header);
        file.rebalance()?;
        let slot = self.open.len();
        debug!("Opened file for {}", pair);
        self.open.push(file);
        self.slots.insert(pair, slot);
        Ok(slot)
    }

    fn finish(self) -> Vec<File> {
        let mut out = self.sealed;
        out.extend(self.open);
        for file in &mut out {
            renumber_batches(file);
        }
        out
    }
}
