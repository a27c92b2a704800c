//! # File Management Module
//!
//! Questo modulo gestisce la raccolta dei PDF da comprimere.
//!
//! ## Responsabilità:
//! - Espansione degli argomenti: file singoli o cartelle (ricerca ricorsiva)
//! - Riconoscimento dei PDF tramite estensione (case-insensitive)
//! - Formattazione human-readable delle dimensioni
//!
//! Il core del batch non scansiona mai il filesystem: riceve solo la lista
//! ordinata prodotta qui.
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::collect_inputs(&[PathBuf::from("/path/to/docs")])?;
//! ```

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Manages input discovery
pub struct FileManager;

impl FileManager {
    /// Check if a file has a `.pdf` extension
    pub fn is_pdf(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }

    /// Find all PDF files below a directory, sorted by path
    pub fn find_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| anyhow::anyhow!("failed to scan folder {}: {}", dir.display(), e))?;
            if entry.file_type().is_file() && Self::is_pdf(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Expand command line arguments into an ordered list of PDF files.
    ///
    /// Files are kept as given (even without a `.pdf` extension), folders are
    /// walked recursively. Duplicates keep their first position.
    pub fn collect_inputs(args: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut inputs: Vec<PathBuf> = Vec::new();

        for arg in args {
            if arg.is_dir() {
                let found = Self::find_pdf_files(arg)?;
                if found.is_empty() {
                    warn!("No PDF files were found in {}", arg.display());
                } else {
                    debug!("Added {} PDF files from {}", found.len(), arg.display());
                }
                inputs.extend(found);
            } else if arg.exists() {
                inputs.push(arg.clone());
            } else {
                return Err(anyhow::anyhow!("Input does not exist: {}", arg.display()));
            }
        }

        let mut seen = std::collections::HashSet::new();
        inputs.retain(|path| seen.insert(path.clone()));
        Ok(inputs)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
