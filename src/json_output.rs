//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per comunicazione con
//! altri processi (frontend, script).
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch
//! - `file_complete`: Fine elaborazione di un file (successo o errore)
//! - `aborted`: Batch annullato prima di partire (sovrascrittura rifiutata)
//! - `cleanup`: Esito della cancellazione degli output non ottimizzati
//! - `complete`: Fine batch con statistiche finali
//! - `error`: Errore di batch

use crate::batch::{BatchSummary, CleanupReport, JobResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Start {
        total_files: usize,
        workers: usize,
        quality: Option<String>,
        output_dir: Option<PathBuf>,
    },

    FileComplete {
        input: PathBuf,
        output: PathBuf,
        completed: usize,
        total: usize,
        original_size: u64,
        final_size: u64,
        ratio: f64,
        unoptimized: bool,
        error: Option<String>,
    },

    Aborted {
        existing_outputs: Vec<PathBuf>,
    },

    Cleanup {
        deleted: usize,
        failed: usize,
    },

    Complete {
        total: usize,
        succeeded: usize,
        failed: usize,
        cancelled: usize,
        unoptimized: Vec<PathBuf>,
        original_bytes: u64,
        final_bytes: u64,
        duration_seconds: f64,
    },

    Error {
        message: String,
    },
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn file_complete(completed: usize, total: usize, result: &JobResult) -> Self {
        let success = result.is_success();
        Self::FileComplete {
            input: result.job.input_path.clone(),
            output: result.job.output_path.clone(),
            completed,
            total,
            original_size: result.original_size,
            final_size: result.final_size,
            ratio: if success { result.ratio() } else { 0.0 },
            unoptimized: result.is_unoptimized(),
            error: result.error.as_ref().map(|e| e.to_string()),
        }
    }

    pub fn cleanup(report: &CleanupReport) -> Self {
        Self::Cleanup {
            deleted: report.deleted,
            failed: report.failed,
        }
    }

    pub fn complete(summary: &BatchSummary) -> Self {
        Self::Complete {
            total: summary.total,
            succeeded: summary.succeeded,
            failed: summary.failed,
            cancelled: summary.cancelled,
            unoptimized: summary.unoptimized.clone(),
            original_bytes: summary.original_bytes,
            final_bytes: summary.final_bytes,
            duration_seconds: summary.elapsed.as_secs_f64(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
