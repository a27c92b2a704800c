//! # Job and Result Types
//!
//! Valori immutabili scambiati tra coordinatore, pool ed executor.

use crate::compression::{CompressionOptions, SizeReport, TransformFailure};
use crate::error::CompressError;
use std::path::PathBuf;

/// One input PDF paired with its derived output location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub options: CompressionOptions,
}

impl Job {
    pub fn new(input_path: PathBuf, output_path: PathBuf, options: CompressionOptions) -> Self {
        Self {
            input_path,
            output_path,
            options,
        }
    }

    /// File name of the input, for log lines
    pub fn display_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.display().to_string())
    }
}

/// Outcome of exactly one job
#[derive(Debug)]
pub struct JobResult {
    pub job: Job,
    /// Input size in bytes, 0 if the input could not be stat'ed
    pub original_size: u64,
    /// Output size in bytes, 0 if the transform failed
    pub final_size: u64,
    pub error: Option<CompressError>,
}

impl JobResult {
    pub fn from_transform(job: Job, outcome: Result<SizeReport, TransformFailure>) -> Self {
        match outcome {
            Ok(sizes) => Self {
                job,
                original_size: sizes.original_size,
                final_size: sizes.final_size,
                error: None,
            },
            Err(failure) => Self {
                job,
                original_size: failure.original_size,
                final_size: 0,
                error: Some(failure.error),
            },
        }
    }

    /// Result for a job that was never started because the batch was cancelled
    pub fn cancelled(job: Job) -> Self {
        Self {
            job,
            original_size: 0,
            final_size: 0,
            error: Some(CompressError::Cancelled),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Percentage saved, negative when the output grew
    pub fn ratio(&self) -> f64 {
        compression_ratio(self.original_size, self.final_size)
    }

    /// A successful job whose output is not smaller than its input
    pub fn is_unoptimized(&self) -> bool {
        self.is_success() && is_unoptimized(self.original_size, self.final_size)
    }
}

/// `(1 - final/original) * 100`, or 0.0 for an empty original
pub fn compression_ratio(original_size: u64, final_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (1.0 - (final_size as f64 / original_size as f64)) * 100.0
}

/// Output did not shrink (equal size counts as unoptimized)
pub fn is_unoptimized(original_size: u64, final_size: u64) -> bool {
    final_size >= original_size
}
