//! # Job Pool
//!
//! Esegue un batch chiuso di job con un numero fisso di executor.
//!
//! ## Modello:
//! - La coda è pre-popolata e chiusa: nessun job può essere aggiunto dopo l'avvio
//! - Ogni executor è un thread `spawn_blocking` che preleva il prossimo job libero
//!   e chiama il transformer in modo sincrono
//! - Un job fallito non interrompe gli altri executor
//! - I risultati arrivano sul canale in ordine di completamento; il canale ha
//!   capacità `len(jobs)` quindi nessun executor si blocca pubblicando
//! - Il canale si chiude quando tutti gli executor sono usciti
//!
//! ## Cancellazione:
//! Il `CancelFlag` viene controllato prima di ogni prelievo. I job già in corso
//! terminano; quelli ancora in coda vengono riportati come `Cancelled` senza
//! invocare Ghostscript.

use crate::batch::job::{Job, JobResult};
use crate::compression::ArtifactTransformer;
use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Batch-scoped cancellation signal shared by all executors
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop executors from starting further jobs
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Closed work queue; each job is handed out exactly once
struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl JobQueue {
    fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs: Mutex::new(jobs.into()),
        }
    }

    fn claim(&self) -> Option<Job> {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }
}

/// Bounded pool running an `ArtifactTransformer` over a batch of jobs
#[derive(Clone)]
pub struct JobPool {
    transformer: Arc<dyn ArtifactTransformer>,
}

impl JobPool {
    pub fn new(transformer: Arc<dyn ArtifactTransformer>) -> Self {
        Self { transformer }
    }

    /// Number of executors actually started for a batch
    pub fn effective_concurrency(concurrency: usize, job_count: usize) -> usize {
        concurrency.max(1).min(job_count)
    }

    /// Start the batch and return the stream of results.
    ///
    /// Must be called from within a Tokio runtime. The receiver yields one
    /// `JobResult` per job and is closed once every executor has exited.
    pub fn run(&self, jobs: Vec<Job>, concurrency: usize, cancel: CancelFlag) -> mpsc::Receiver<JobResult> {
        let total = jobs.len();
        let executors = Self::effective_concurrency(concurrency, total);
        let (tx, rx) = mpsc::channel(total.max(1));

        debug!("Starting pool: {} jobs, {} executors", total, executors);

        let queue = Arc::new(JobQueue::new(jobs));
        let mut handles = Vec::with_capacity(executors);

        for executor_id in 0..executors {
            let queue = Arc::clone(&queue);
            let transformer = Arc::clone(&self.transformer);
            let cancel = cancel.clone();
            let tx = tx.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                run_executor(executor_id, &queue, transformer.as_ref(), &cancel, &tx)
            }));
        }
        drop(tx);

        if !handles.is_empty() {
            tokio::spawn(async move {
                for (executor_id, outcome) in join_all(handles).await.into_iter().enumerate() {
                    if let Err(e) = outcome {
                        error!("Executor {} terminated abnormally: {}", executor_id, e);
                    }
                }
                debug!("All executors finished");
            });
        }

        rx
    }
}

fn run_executor(
    executor_id: usize,
    queue: &JobQueue,
    transformer: &dyn ArtifactTransformer,
    cancel: &CancelFlag,
    tx: &mpsc::Sender<JobResult>,
) {
    loop {
        if cancel.is_cancelled() {
            while let Some(job) = queue.claim() {
                if tx.blocking_send(JobResult::cancelled(job)).is_err() {
                    return;
                }
            }
            debug!("Executor {} stopped after cancellation", executor_id);
            return;
        }

        let Some(job) = queue.claim() else {
            debug!("Executor {} found the queue empty", executor_id);
            return;
        };

        debug!("Executor {} processing {}", executor_id, job.input_path.display());
        let outcome = transformer.transform(&job.input_path, &job.output_path, &job.options);
        let result = JobResult::from_transform(job, outcome);

        if tx.blocking_send(result).is_err() {
            debug!("Result receiver dropped, executor {} exiting", executor_id);
            return;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::compression::{CompressionOptions, SizeReport, TransformFailure};
    use crate::error::CompressError;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// In-process transformer with scripted sizes; inputs named `fail*` exit non-zero
    pub(crate) struct ScriptedTransformer {
        pub original_size: u64,
        pub final_size: u64,
        pub delay: Duration,
        running: AtomicUsize,
        pub peak: AtomicUsize,
        pub calls: AtomicUsize,
    }

    impl ScriptedTransformer {
        pub(crate) fn new(original_size: u64, final_size: u64) -> Self {
            Self {
                original_size,
                final_size,
                delay: Duration::ZERO,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl ArtifactTransformer for ScriptedTransformer {
        fn transform(
            &self,
            input_path: &Path,
            _output_path: &Path,
            _options: &CompressionOptions,
        ) -> Result<SizeReport, TransformFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.running.fetch_sub(1, Ordering::SeqCst);

            let name = input_path.file_name().unwrap_or_default().to_string_lossy();
            if name.starts_with("fail") {
                return Err(TransformFailure::new(
                    self.original_size,
                    CompressError::ExternalToolFailed {
                        exit_info: "exit status: 1".to_string(),
                        captured_output: format!("Error: cannot open {}", name),
                    },
                ));
            }
            Ok(SizeReport {
                original_size: self.original_size,
                final_size: self.final_size,
            })
        }
    }

    pub(crate) fn jobs(names: &[&str]) -> Vec<Job> {
        names
            .iter()
            .map(|name| {
                Job::new(
                    PathBuf::from(format!("docs/{}.pdf", name)),
                    PathBuf::from(format!("docs/compressed/{}_spc_compressed.pdf", name)),
                    CompressionOptions::default(),
                )
            })
            .collect()
    }

    async fn drain(mut rx: mpsc::Receiver<JobResult>) -> Vec<JobResult> {
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    #[test]
    fn test_effective_concurrency() {
        assert_eq!(JobPool::effective_concurrency(0, 5), 1);
        assert_eq!(JobPool::effective_concurrency(3, 5), 3);
        assert_eq!(JobPool::effective_concurrency(16, 5), 5);
        assert_eq!(JobPool::effective_concurrency(4, 0), 0);
    }

    #[tokio::test]
    async fn test_one_result_per_job_for_any_concurrency() {
        let names: Vec<String> = (0..9).map(|i| format!("doc{}", i)).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

        for concurrency in [0, 1, 2, 3, 9, 20] {
            let pool = JobPool::new(Arc::new(ScriptedTransformer::new(1000, 400)));
            let submitted = jobs(&name_refs);
            let expected: HashSet<PathBuf> = submitted.iter().map(|j| j.input_path.clone()).collect();

            let results = drain(pool.run(submitted, concurrency, CancelFlag::new())).await;

            assert_eq!(results.len(), 9, "concurrency {}", concurrency);
            let seen: HashSet<PathBuf> = results.iter().map(|r| r.job.input_path.clone()).collect();
            assert_eq!(seen, expected);
        }
    }

    #[tokio::test]
    async fn test_parallelism_is_bounded() {
        let transformer = Arc::new(ScriptedTransformer::new(1000, 400).with_delay(Duration::from_millis(30)));
        let pool = JobPool::new(transformer.clone());

        let results = drain(pool.run(jobs(&["a", "b", "c", "d", "e", "f"]), 2, CancelFlag::new())).await;

        assert_eq!(results.len(), 6);
        assert!(transformer.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(transformer.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let pool = JobPool::new(Arc::new(ScriptedTransformer::new(1000, 400)));
        let results = drain(pool.run(jobs(&["one", "fail_two", "three"]), 2, CancelFlag::new())).await;

        assert_eq!(results.len(), 3);
        let failed: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].job.input_path.ends_with("fail_two.pdf"));
        assert!(results.iter().filter(|r| r.is_success()).all(|r| (r.ratio() - 60.0).abs() < 1e-9));
    }

    #[tokio::test]
    async fn test_empty_batch_closes_immediately() {
        let pool = JobPool::new(Arc::new(ScriptedTransformer::new(1, 1)));
        let results = drain(pool.run(Vec::new(), 4, CancelFlag::new())).await;
        assert!(results.is_empty());
    }

    /// Raises the cancel flag from inside the first job
    struct CancellingTransformer {
        cancel: CancelFlag,
        calls: AtomicUsize,
    }

    impl ArtifactTransformer for CancellingTransformer {
        fn transform(
            &self,
            _input_path: &Path,
            _output_path: &Path,
            _options: &CompressionOptions,
        ) -> Result<SizeReport, TransformFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cancel.cancel();
            Ok(SizeReport {
                original_size: 10,
                final_size: 5,
            })
        }
    }

    #[test]
    fn test_cancellation_stops_claiming_new_jobs() {
        let cancel = CancelFlag::new();
        let transformer = Arc::new(CancellingTransformer {
            cancel: cancel.clone(),
            calls: AtomicUsize::new(0),
        });
        let pool = JobPool::new(transformer.clone());

        let results = tokio_test::block_on(async {
            drain(pool.run(jobs(&["a", "b", "c", "d", "e"]), 1, cancel)).await
        });

        assert_eq!(transformer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|r| r.is_success()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r.error, Some(CompressError::Cancelled)))
                .count(),
            4
        );
    }
}
