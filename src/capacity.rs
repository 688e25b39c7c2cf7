//! Line counting for merge candidates.
//!
//! Rendering a whole file just to count its lines is expensive, so files with
//! few batches are assumed to be under the limit. A file under
//! `small_file_batches` batches reports a count of 1 without being rendered;
//! that assumption only holds while a handful of batches cannot reach the
//! line limit.

use crate::error::Result;
use crate::file::File;
use crate::writer::Render;

/// Count reported for files skipped by the small-file shortcut.
pub const SHORTCUT_LINE_COUNT: usize = 1;

/// Measures how many lines a file renders to.
pub struct LineCounter<R> {
    renderer: R,
    small_file_batches: usize,
}

impl<R: Render> LineCounter<R> {
    pub fn new(renderer: R, small_file_batches: usize) -> Self {
        LineCounter {
            renderer,
            small_file_batches,
        }
    }

    /// Returns the line count, skipping the render for small files.
    pub fn line_count(&self, file: &File) -> Result<usize> {
        if file.batches().len() < self.small_file_batches {
            return Ok(SHORTCUT_LINE_COUNT);
        }
        self.exact_line_count(file)
    }

    /// Renders the file and counts its non-empty lines.
    pub fn exact_line_count(&self, file: &File) -> Result<usize> {
        let text = self.renderer.render(file)?;
        Ok(count_non_empty_lines(&text))
    }
}

/// Counts lines that contain anything at all.
pub fn count_non_empty_lines(text: &str) -> usize {
    text.lines().filter(|line| !line.is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AchError;
    use crate::file::FileHeader;
    use chrono::NaiveDate;
    use std::cell::Cell;

    struct FixedRender<'a> {
        text: &'static str,
        calls: &'a Cell<usize>,
    }

    impl Render for FixedRender<'_> {
        fn render(&self, _file: &File) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.text.to_string())
        }
    }

    struct FailingRender;

    impl Render for FailingRender {
        fn render(&self, _file: &File) -> Result<String> {
            Err(AchError::ControlMismatch("stale".to_string()))
        }
    }

    fn empty_file() -> File {
        File::new(FileHeader {
            immediate_origin: "231380104".to_string(),
            immediate_destination: "091000019".to_string(),
            created: NaiveDate::from_ymd_opt(2026, 10, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            file_id_modifier: 'A',
            immediate_origin_name: String::new(),
            immediate_destination_name: String::new(),
            reference_code: String::new(),
        })
    }

    #[test]
    fn test_count_non_empty_lines_skips_blanks() {
        assert_eq!(count_non_empty_lines("a\n\nb\n\n\nc\n"), 3);
        assert_eq!(count_non_empty_lines(""), 0);
    }

    #[test]
    fn test_small_files_are_not_rendered() {
        let calls = Cell::new(0);
        let counter = LineCounter::new(FixedRender { text: "a\nb\n", calls: &calls }, 100);

        assert_eq!(counter.line_count(&empty_file()).unwrap(), SHORTCUT_LINE_COUNT);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_zero_threshold_always_renders() {
        let calls = Cell::new(0);
        let counter = LineCounter::new(FixedRender { text: "a\n\nb\n", calls: &calls }, 0);

        assert_eq!(counter.line_count(&empty_file()).unwrap(), 2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_exact_line_count_ignores_threshold() {
        let calls = Cell::new(0);
        let counter = LineCounter::new(FixedRender { text: "x\n", calls: &calls }, 100);

        assert_eq!(counter.exact_line_count(&empty_file()).unwrap(), 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_render_failure_propagates() {
        let counter = LineCounter::new(FailingRender, 0);
        assert!(matches!(
            counter.line_count(&empty_file()),
            Err(AchError::ControlMismatch(_))
        ));
    }
}
