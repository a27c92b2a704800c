//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di un batch
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `quality`: Profilo Ghostscript (default: ebook, `null` = default del tool)
//! - `suffix`: Suffisso del nome di output (default: "_spc_compressed")
//! - `output_path`: Directory di output (default: None = `./compressed` accanto a ogni file)
//! - `workers`: Numero di worker paralleli (default: CPU disponibili)
//! - `ghostscript_path`: Percorso esplicito di Ghostscript (default: ricerca su PATH)
//! - `overwrite`: Cosa fare se l'output esiste già (ask/always/never)
//! - `cleanup`: Cosa fare con gli output non ottimizzati (ask/delete/keep)
//! - `json_output`: Eventi JSON su stdout invece della progress bar
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     quality: Some(QualityProfile::Screen),
//!     workers: 8,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::compression::{CompressionOptions, QualityProfile};
use crate::tool_resolver::GhostscriptResolver;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffix appended to output file stems when none is configured
pub const DEFAULT_SUFFIX: &str = "_spc_compressed";

/// Answer to the overwrite question when outputs already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    Ask,
    Always,
    Never,
}

/// Answer to the cleanup question when outputs did not shrink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    Ask,
    Delete,
    Keep,
}

/// Configuration for batch PDF compression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ghostscript PDFSETTINGS profile (None = let Ghostscript decide)
    pub quality: Option<QualityProfile>,
    /// Suffix appended to the output file stem
    pub suffix: String,
    /// Output directory for compressed files (None = `compressed/` next to each input)
    pub output_path: Option<PathBuf>,
    /// Number of parallel workers
    pub workers: usize,
    /// Explicit Ghostscript binary, bypassing PATH lookup
    pub ghostscript_path: Option<PathBuf>,
    /// What to do when derived outputs already exist
    pub overwrite: OverwritePolicy,
    /// What to do with outputs that are not smaller than their input
    pub cleanup: CleanupPolicy,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quality: Some(QualityProfile::Ebook),
            suffix: DEFAULT_SUFFIX.to_string(),
            output_path: None,
            workers: default_workers(),
            ghostscript_path: None,
            overwrite: OverwritePolicy::Ask,
            cleanup: CleanupPolicy::Ask,
            json_output: false,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.suffix.contains(std::path::is_separator) {
            return Err(anyhow::anyhow!(
                "Suffix must not contain path separators: {}",
                self.suffix
            ));
        }

        if let Some(ref output_path) = self.output_path {
            if output_path.exists() && !output_path.is_dir() {
                return Err(anyhow::anyhow!(
                    "Output path is not a directory: {}",
                    output_path.display()
                ));
            }
        }

        if let Some(ref gs) = self.ghostscript_path {
            if !gs.is_file() {
                return Err(anyhow::anyhow!(
                    "Ghostscript binary does not exist: {}",
                    gs.display()
                ));
            }
        }

        Ok(())
    }

    /// Options handed to every job of the batch
    pub fn compression_options(&self) -> CompressionOptions {
        CompressionOptions {
            quality: self.quality,
        }
    }

    /// Configured suffix, or the default one when empty
    pub fn effective_suffix(&self) -> &str {
        if self.suffix.is_empty() {
            DEFAULT_SUFFIX
        } else {
            &self.suffix
        }
    }

    /// Ghostscript binary: the configured override or the process-wide lookup
    pub fn ghostscript_binary(&self) -> PathBuf {
        self.ghostscript_path
            .clone()
            .unwrap_or_else(|| GhostscriptResolver::resolved().to_path_buf())
    }

    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pdf-batch-compressor").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.workers = 0;
        assert!(config.validate().is_err());

        config.workers = 2;
        config.suffix = "a/b".to_string();
        assert!(config.validate().is_err());

        config.suffix = "_small".to_string();
        config.ghostscript_path = Some(PathBuf::from("/definitely/not/here/gs"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_path_must_be_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();

        let mut config = Config::default();
        config.output_path = Some(file);
        assert!(config.validate().is_err());

        // A directory that does not exist yet is created by the first job
        config.output_path = Some(temp_dir.path().join("later"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.quality, Some(QualityProfile::Ebook));
        assert_eq!(config.suffix, "_spc_compressed");
        assert!(config.output_path.is_none());
        assert!(config.workers >= 1);
        assert_eq!(config.overwrite, OverwritePolicy::Ask);
        assert_eq!(config.cleanup, CleanupPolicy::Ask);
    }

    #[test]
    fn test_empty_suffix_falls_back() {
        let config = Config {
            suffix: String::new(),
            ..Default::default()
        };
        assert_eq!(config.effective_suffix(), DEFAULT_SUFFIX);
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let original_config = Config {
            quality: None,
            suffix: "_small".to_string(),
            workers: 3,
            cleanup: CleanupPolicy::Delete,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.quality, None);
        assert_eq!(loaded_config.suffix, "_small");
        assert_eq!(loaded_config.workers, 3);
        assert_eq!(loaded_config.cleanup, CleanupPolicy::Delete);
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "quality": "screen" }"#).await.unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.quality, Some(QualityProfile::Screen));
        assert_eq!(config.suffix, DEFAULT_SUFFIX);
    }

    #[tokio::test]
    async fn test_missing_file_yields_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.suffix, DEFAULT_SUFFIX);
    }
}
