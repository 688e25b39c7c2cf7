//! Merge limits and their environment overrides.

use crate::error::{AchError, Result};
use log::info;
use std::env;

/// NACHA rules cap a rendered file at 10,000 lines.
pub const NACHA_FILE_LINE_LIMIT: usize = 10_000;

/// Files with fewer batches than this are assumed to be under the line limit
/// without rendering them.
pub const SMALL_FILE_BATCH_THRESHOLD: usize = 100;

/// Environment variable overriding [`MergeConfig::line_limit`].
pub const LINE_LIMIT_ENV: &str = "ACH_MERGE_LINE_LIMIT";

/// Environment variable overriding [`MergeConfig::small_file_batches`].
pub const SMALL_FILE_BATCHES_ENV: &str = "ACH_MERGE_SMALL_FILE_BATCHES";

/// Limits applied while merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeConfig {
    /// Maximum non-empty rendered lines per output file.
    pub line_limit: usize,

    /// Batch count below which line counting skips rendering.
    pub small_file_batches: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            line_limit: NACHA_FILE_LINE_LIMIT,
            small_file_batches: SMALL_FILE_BATCH_THRESHOLD,
        }
    }
}

impl MergeConfig {
    /// Builds a config from defaults, applying any environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = MergeConfig::default();
        if let Some(v) = lookup(LINE_LIMIT_ENV) {
            config.line_limit = parse_positive(LINE_LIMIT_ENV, &v)?;
            info!("Using {} as the line limit", config.line_limit);
        }
        if let Some(v) = lookup(SMALL_FILE_BATCHES_ENV) {
            config.small_file_batches = v.trim().parse().map_err(|_| AchError::InvalidConfig {
                key: SMALL_FILE_BATCHES_ENV,
                value: v.clone(),
            })?;
            info!(
                "Skipping line counts for files under {} batches",
                config.small_file_batches
            );
        }
        Ok(config)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AchError::InvalidConfig {
            key,
            value: value.to_string(),
        }),
    }
}
