//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare gli errori di un job e del batch
//! - Conserva l'output catturato da Ghostscript per diagnosticare i fallimenti
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - Errori per-job (restano dentro il `JobResult`, non interrompono il batch):
//!   `InputNotFound`, `OutputDirUnwritable`, `ExternalToolFailed`,
//!   `OutputMissingAfterSuccess`, `Cancelled`
//! - Errori di cleanup: `DeleteFailed` (solo conteggiato)
//! - Errori di batch (riportati prima che parta qualsiasi job):
//!   `InvalidInput`, `OutputCollision`, `OutputOverwritesInput`, `Validation`
//! - Errori di ambiente: `MissingDependency`, `Io`
//!
//! ## Esempio:
//! ```rust,ignore
//! if !input_path.exists() {
//!     return Err(CompressError::InputNotFound { path: input_path.to_path_buf(), source });
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for PDF compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("Input file not found or unreadable: {path}: {source}")]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create output directory {path}: {source}")]
    OutputDirUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ghostscript failed: {exit_info}, output: {captured_output}")]
    ExternalToolFailed {
        exit_info: String,
        captured_output: String,
    },

    #[error("Ghostscript reported success but produced no output at {path}: {source}")]
    OutputMissingAfterSuccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job cancelled before it started")]
    Cancelled,

    #[error("Invalid input path: {0}")]
    InvalidInput(PathBuf),

    #[error("Inputs {first} and {second} would both be written to {output}")]
    OutputCollision {
        first: PathBuf,
        second: PathBuf,
        output: PathBuf,
    },

    #[error("Output of {input} would overwrite {output}, which is also an input of this batch")]
    OutputOverwritesInput { input: PathBuf, output: PathBuf },

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Configuration error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
