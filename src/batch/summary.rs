//! # Batch Aggregation
//!
//! Accumula i `JobResult` man mano che arrivano e produce il `BatchSummary` finale.

use crate::batch::job::JobResult;
use crate::error::CompressError;
use crate::file_manager::FileManager;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of deleting unoptimized outputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    /// Delete failures are counted, never surfaced per file
    pub failed: usize,
}

/// Final statistics of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    /// Includes jobs reported as cancelled
    pub failed: usize,
    pub cancelled: usize,
    /// Output paths of successful jobs whose output is not smaller than the input
    pub unoptimized: Vec<PathBuf>,
    pub original_bytes: u64,
    pub final_bytes: u64,
    pub elapsed: Duration,
    /// Present only when the caller agreed to delete unoptimized outputs
    pub cleanup: Option<CleanupReport>,
}

impl BatchSummary {
    /// Reduction over all successful jobs
    pub fn overall_reduction_percent(&self) -> f64 {
        crate::batch::job::compression_ratio(self.original_bytes, self.final_bytes)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Done in {:.3}s. Success: {}, Failures: {} | {} -> {} ({:.1}%)",
            self.elapsed.as_secs_f64(),
            self.succeeded,
            self.failed,
            FileManager::format_size(self.original_bytes),
            FileManager::format_size(self.final_bytes),
            self.overall_reduction_percent()
        )
    }
}

/// Running counters updated once per result
#[derive(Debug)]
pub struct BatchAggregator {
    total: usize,
    completed: usize,
    succeeded: usize,
    failed: usize,
    cancelled: usize,
    unoptimized: Vec<PathBuf>,
    original_bytes: u64,
    final_bytes: u64,
}

impl BatchAggregator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            unoptimized: Vec::new(),
            original_bytes: 0,
            final_bytes: 0,
        }
    }

    pub fn record(&mut self, result: &JobResult) {
        self.completed += 1;

        match &result.error {
            None => {
                self.succeeded += 1;
                self.original_bytes += result.original_size;
                self.final_bytes += result.final_size;
                if result.is_unoptimized() {
                    self.unoptimized.push(result.job.output_path.clone());
                }
            }
            Some(CompressError::Cancelled) => {
                self.failed += 1;
                self.cancelled += 1;
            }
            Some(_) => self.failed += 1,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// `completed / total`, 1.0 for an empty batch
    pub fn progress_fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn finish(self, elapsed: Duration) -> BatchSummary {
        BatchSummary {
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            cancelled: self.cancelled,
            unoptimized: self.unoptimized,
            original_bytes: self.original_bytes,
            final_bytes: self.final_bytes,
            elapsed,
            cleanup: None,
        }
    }
}
