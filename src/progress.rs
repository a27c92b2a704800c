//! # Progress Reporting Module
//!
//! Questo modulo mostra l'avanzamento di un batch mentre i risultati arrivano.
//!
//! ## Responsabilità:
//! - Progress bar visuale con `indicatif` per feedback real-time
//! - Una riga di log per ogni file (rapporto di compressione o errore)
//! - In modalità JSON, un evento `file_complete` per ogni file al posto della barra
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================>---------------] 6/10 (60%) report.pdf
//! [O] report.pdf: Ratio: 42.0% (1.00 MB -> 593.92 KB)
//! [X] broken.pdf: Failed - Ghostscript failed: exit status: 1, output: ...
//! ```

use crate::batch::{JobResult, ProgressSink};
use crate::file_manager::FileManager;
use crate::json_output::JsonMessage;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages the terminal progress bar
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Move the bar to `completed` and print a log line above it
    pub fn update(&self, completed: u64, line: &str, message: &str) {
        self.bar.println(line);
        self.bar.set_position(completed);
        self.bar.set_message(message.to_string());
    }

    /// Hide the bar while `f` runs, so prompts on stderr stay readable
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Log line for one result, in the `[O]` / `[X]` format
pub fn format_result_line(result: &JobResult) -> String {
    let name = result.job.display_name();
    match &result.error {
        Some(e) => format!("[X] {}: Failed - {}", name, e),
        None => {
            let mut line = format!(
                "[O] {}: Ratio: {:.1}% ({} -> {})",
                name,
                result.ratio(),
                FileManager::format_size(result.original_size),
                FileManager::format_size(result.final_size)
            );
            if result.is_unoptimized() {
                line.push_str("\n    -> Larger/Same size. Marked as unoptimized.");
            }
            line
        }
    }
}

/// Progress sink used by the CLI: progress bar or JSON events
pub enum BatchReporter {
    Terminal(ProgressManager),
    Json,
}

impl BatchReporter {
    pub fn new(total_files: usize, json_output: bool) -> Self {
        if json_output {
            Self::Json
        } else {
            Self::Terminal(ProgressManager::new(total_files as u64))
        }
    }

    /// Handle to the terminal bar, if any
    pub fn progress_manager(&self) -> Option<ProgressManager> {
        match self {
            Self::Terminal(progress) => Some(progress.clone()),
            Self::Json => None,
        }
    }

    pub fn finish(&self, message: &str) {
        if let Self::Terminal(progress) = self {
            progress.finish(message);
        }
    }
}

impl ProgressSink for BatchReporter {
    fn on_result(&mut self, completed: usize, total: usize, result: &JobResult) {
        match self {
            Self::Terminal(progress) => progress.update(
                completed as u64,
                &format_result_line(result),
                &format!("Processed {}/{}", completed, total),
            ),
            Self::Json => JsonMessage::file_complete(completed, total, result).emit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Job;
    use crate::compression::{CompressionOptions, SizeReport, TransformFailure};
    use crate::error::CompressError;
    use std::path::PathBuf;

    fn job() -> Job {
        Job::new(
            PathBuf::from("/docs/report.pdf"),
            PathBuf::from("/docs/compressed/report_spc_compressed.pdf"),
            CompressionOptions::default(),
        )
    }

    #[test]
    fn test_success_line() {
        let result = JobResult::from_transform(
            job(),
            Ok(SizeReport {
                original_size: 2048,
                final_size: 1024,
            }),
        );
        assert_eq!(format_result_line(&result), "[O] report.pdf: Ratio: 50.0% (2.00 KB -> 1.00 KB)");
    }

    #[test]
    fn test_unoptimized_line_is_marked() {
        let result = JobResult::from_transform(
            job(),
            Ok(SizeReport {
                original_size: 100,
                final_size: 120,
            }),
        );
        let line = format_result_line(&result);
        assert!(line.starts_with("[O] report.pdf: Ratio: -20.0%"));
        assert!(line.ends_with("Marked as unoptimized."));
    }

    #[test]
    fn test_failure_line_carries_tool_output() {
        let result = JobResult::from_transform(
            job(),
            Err(TransformFailure::new(
                100,
                CompressError::ExternalToolFailed {
                    exit_info: "exit status: 1".to_string(),
                    captured_output: "**** Unable to open the initial device".to_string(),
                },
            )),
        );
        let line = format_result_line(&result);
        assert!(line.starts_with("[X] report.pdf: Failed - "));
        assert!(line.contains("Unable to open the initial device"));
    }

    #[test]
    fn test_suspend_returns_closure_value() {
        let progress = ProgressManager::new(2);
        assert_eq!(progress.suspend(|| 42), 42);
        progress.finish("done");
    }

    #[test]
    fn test_json_reporter_has_no_bar() {
        assert!(BatchReporter::new(3, true).progress_manager().is_none());
        let terminal = BatchReporter::new(3, false);
        assert!(terminal.progress_manager().is_some());
        terminal.finish("done");
    }
}
