//! # Batch Module
//!
//! Modulo che separa le responsabilità di un batch in sottomoduli:
//! - `coordinator`: Orchestratore principale (job, conferme, aggregazione, cleanup)
//! - `pool`: Pool di executor con coda chiusa e stream dei risultati
//! - `job`: Tipi `Job` e `JobResult`, rapporto di compressione
//! - `summary`: Aggregazione dei risultati e `BatchSummary`
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod coordinator;
pub mod job;
pub mod path_resolver;
pub mod pool;
pub mod summary;

pub use coordinator::{BatchCoordinator, BatchOutcome, BatchRequest, BatchState, Confirmations, ProgressSink};
pub use job::{compression_ratio, is_unoptimized, Job, JobResult};
pub use path_resolver::PathResolver;
pub use pool::{CancelFlag, JobPool};
pub use summary::{BatchAggregator, BatchSummary, CleanupReport};
