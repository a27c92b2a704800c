//! # PDF Batch Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Errori per job e per batch
//! - `compression`: Profili di qualità e trasformazione tramite Ghostscript
//! - `tool_resolver`: Ricerca di Ghostscript e istruzioni di installazione
//! - `batch`: Job, pool di esecutori, aggregazione e coordinatore del batch
//! - `file_manager`: Espansione degli input (file e cartelle)
//! - `prompt`: Risposte alle conferme (sovrascrittura, cleanup)
//! - `progress`: Progress bar e righe di log per file
//! - `json_output`: Eventi JSON per uso programmatico
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use pdf_batch_compressor::{BatchCoordinator, BatchRequest, Config, PolicyConfirmations};
//!
//! let config = Config::default();
//! let mut coordinator = BatchCoordinator::from_config(&config);
//! let request = BatchRequest::from_config(&config, inputs);
//! let outcome = coordinator
//!     .run(&request, &PolicyConfirmations::from_config(&config), &mut |_, _, _: &_| {})
//!     .await?;
//! ```

pub mod batch;
pub mod compression;
pub mod config;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod progress;
pub mod prompt;
pub mod tool_resolver;

pub use batch::{BatchCoordinator, BatchOutcome, BatchRequest, BatchSummary, Job, JobResult};
pub use compression::{ArtifactTransformer, CompressionOptions, GhostscriptTransformer, QualityProfile};
pub use config::Config;
pub use error::CompressError;
pub use prompt::PolicyConfirmations;
pub use tool_resolver::GhostscriptResolver;
