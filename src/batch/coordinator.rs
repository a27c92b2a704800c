//! # Batch Coordinator
//!
//! Orchestratore principale di un batch di compressione.
//!
//! ## Stati:
//! `Idle → BuildingJobs → AwaitingOverwriteConfirmation → Running →
//! AwaitingCleanupConfirmation → Done`
//!
//! - La conferma di sovrascrittura è chiesta solo se almeno un output esiste già;
//!   una risposta negativa chiude il batch senza eseguire alcun job
//! - La conferma di cleanup è chiesta solo se almeno un output non è più piccolo
//!   dell'input; gli errori di cancellazione vengono solo contati
//! - Le conferme non vengono mai chieste dagli executor del pool
//! - Controlli di esistenza e cancellazioni su disco girano in `spawn_blocking`
//! - Un coordinatore esegue un solo batch: il suo `CancelFlag` vale per quel batch

use crate::batch::job::{Job, JobResult};
use crate::batch::path_resolver::PathResolver;
use crate::batch::pool::{CancelFlag, JobPool};
use crate::batch::summary::{BatchAggregator, BatchSummary, CleanupReport};
use crate::compression::{ArtifactTransformer, CompressionOptions, GhostscriptTransformer};
use crate::config::Config;
use crate::error::CompressError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Yes/no questions the batch may ask its caller
pub trait Confirmations {
    /// Called before any job runs, with every derived output that already exists
    fn confirm_overwrite(&self, existing_outputs: &[PathBuf]) -> bool;

    /// Called after the batch, with every output that did not shrink
    fn confirm_cleanup(&self, unoptimized_outputs: &[PathBuf]) -> bool;
}

/// Receives one call per result, in completion order
pub trait ProgressSink {
    fn on_result(&mut self, completed: usize, total: usize, result: &JobResult);
}

impl<F> ProgressSink for F
where
    F: FnMut(usize, usize, &JobResult),
{
    fn on_result(&mut self, completed: usize, total: usize, result: &JobResult) {
        self(completed, total, result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    BuildingJobs,
    AwaitingOverwriteConfirmation,
    Running,
    AwaitingCleanupConfirmation,
    Done,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::BuildingJobs => "building jobs",
            Self::AwaitingOverwriteConfirmation => "awaiting overwrite confirmation",
            Self::Running => "running",
            Self::AwaitingCleanupConfirmation => "awaiting cleanup confirmation",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Inputs and naming rules of one batch
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub inputs: Vec<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub suffix: String,
    pub options: CompressionOptions,
    pub concurrency: usize,
}

impl BatchRequest {
    pub fn from_config(config: &Config, inputs: Vec<PathBuf>) -> Self {
        Self {
            inputs,
            target_dir: config.output_path.clone(),
            suffix: config.effective_suffix().to_string(),
            options: config.compression_options(),
            concurrency: config.workers,
        }
    }
}

/// How a batch ended
#[derive(Debug)]
pub enum BatchOutcome {
    /// The caller refused to overwrite existing outputs; no job ran
    Aborted { existing_outputs: Vec<PathBuf> },
    Completed(BatchSummary),
}

/// Drives one batch from input list to summary.
///
/// The cancel flag is never reset, so a coordinator refuses a second `run`.
pub struct BatchCoordinator {
    pool: JobPool,
    cancel: CancelFlag,
    state: BatchState,
}

impl BatchCoordinator {
    pub fn new(transformer: Arc<dyn ArtifactTransformer>) -> Self {
        Self {
            pool: JobPool::new(transformer),
            cancel: CancelFlag::new(),
            state: BatchState::Idle,
        }
    }

    /// Coordinator backed by Ghostscript, using the configured or resolved binary
    pub fn from_config(config: &Config) -> Self {
        let binary = config.ghostscript_binary();
        info!("Using Ghostscript: {}", binary.display());
        Self::new(Arc::new(GhostscriptTransformer::new(binary)))
    }

    /// Handle that stops executors from starting new jobs once set
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    fn enter(&mut self, next: BatchState) {
        debug!("Batch state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Derive every job of the batch; fails before anything runs
    pub fn build_jobs(request: &BatchRequest) -> Result<Vec<Job>, CompressError> {
        if request.inputs.is_empty() {
            return Err(CompressError::Validation("no input files".to_string()));
        }

        let jobs = request
            .inputs
            .iter()
            .map(|input| {
                let output = PathResolver::output_path(input, request.target_dir.as_deref(), &request.suffix)?;
                Ok(Job::new(input.clone(), output, request.options))
            })
            .collect::<Result<Vec<_>, CompressError>>()?;

        PathResolver::check_collisions(
            jobs.iter()
                .map(|job| (job.input_path.as_path(), job.output_path.as_path())),
        )?;

        Ok(jobs)
    }

    /// Derived outputs that already exist on disk, in job order
    pub fn existing_outputs(jobs: &[Job]) -> Vec<PathBuf> {
        jobs.iter()
            .filter(|job| job.output_path.exists())
            .map(|job| job.output_path.clone())
            .collect()
    }

    /// Run a whole batch.
    ///
    /// Batch-level errors (empty input list, underivable or colliding output
    /// paths) are returned before any job starts. Per-job errors end up in the
    /// corresponding `JobResult` and in the summary counts.
    pub async fn run(
        &mut self,
        request: &BatchRequest,
        confirmations: &dyn Confirmations,
        progress: &mut dyn ProgressSink,
    ) -> Result<BatchOutcome, CompressError> {
        if self.state != BatchState::Idle {
            return Err(CompressError::Validation(
                "this coordinator already ran a batch, create a new one".to_string(),
            ));
        }

        self.enter(BatchState::BuildingJobs);
        let jobs = match Self::build_jobs(request) {
            Ok(jobs) => jobs,
            Err(e) => {
                self.enter(BatchState::Done);
                return Err(e);
            }
        };

        let job_snapshot = jobs.clone();
        let existing_outputs = match run_blocking(move || Self::existing_outputs(&job_snapshot)).await {
            Ok(existing) => existing,
            Err(e) => {
                self.enter(BatchState::Done);
                return Err(e);
            }
        };
        if !existing_outputs.is_empty() {
            self.enter(BatchState::AwaitingOverwriteConfirmation);
            info!("Found {} existing files that will be overwritten", existing_outputs.len());
            if !confirmations.confirm_overwrite(&existing_outputs) {
                info!("Cancelled by user, no file was processed");
                self.enter(BatchState::Done);
                return Ok(BatchOutcome::Aborted { existing_outputs });
            }
        }

        self.enter(BatchState::Running);
        let total = jobs.len();
        info!(
            "Starting compression of {} files with {} workers",
            total,
            JobPool::effective_concurrency(request.concurrency, total)
        );

        let start_time = Instant::now();
        let mut results = self.pool.run(jobs, request.concurrency, self.cancel.clone());
        let mut aggregator = BatchAggregator::new(total);

        while let Some(result) = results.recv().await {
            aggregator.record(&result);
            match &result.error {
                Some(e) => debug!("{} failed: {}", result.job.display_name(), e),
                None => debug!(
                    "{} compressed: {:.1}% ({} -> {} bytes)",
                    result.job.display_name(),
                    result.ratio(),
                    result.original_size,
                    result.final_size
                ),
            }
            progress.on_result(aggregator.completed(), total, &result);
        }

        if aggregator.completed() != total {
            warn!(
                "Result stream closed after {} of {} results",
                aggregator.completed(),
                total
            );
        }

        let mut summary = aggregator.finish(start_time.elapsed());

        if !summary.unoptimized.is_empty() {
            self.enter(BatchState::AwaitingCleanupConfirmation);
            info!(
                "{} files were already optimized (compression did not reduce size)",
                summary.unoptimized.len()
            );
            if confirmations.confirm_cleanup(&summary.unoptimized) {
                let paths = summary.unoptimized.clone();
                let requested = paths.len();
                let report = run_blocking(move || Self::delete_outputs(&paths))
                    .await
                    .unwrap_or_else(|e| {
                        warn!("Cleanup did not complete: {}", e);
                        CleanupReport {
                            deleted: 0,
                            failed: requested,
                        }
                    });
                info!("Deleted {} unoptimized files", report.deleted);
                summary.cleanup = Some(report);
            }
        }

        self.enter(BatchState::Done);
        info!("{}", summary.format_summary());
        Ok(BatchOutcome::Completed(summary))
    }

    /// Delete the given outputs, counting failures
    pub fn delete_outputs(paths: &[PathBuf]) -> CleanupReport {
        let mut report = CleanupReport::default();
        for path in paths {
            match remove_output(path) {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    debug!("{}", e);
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Run blocking filesystem work off the async task
async fn run_blocking<T, F>(f: F) -> Result<T, CompressError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CompressError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
}

fn remove_output(path: &Path) -> Result<(), CompressError> {
    std::fs::remove_file(path).map_err(|source| CompressError::DeleteFailed {
        path: path.to_path_buf(),
        source,
    })
}
