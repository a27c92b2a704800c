//! # PDF Compression Module
//!
//! Questo modulo gestisce la compressione di un singolo PDF tramite Ghostscript.
//!
//! ## Responsabilità:
//! - Definisce `QualityProfile` e `CompressionOptions` (profilo `-dPDFSETTINGS`)
//! - Definisce il trait `ArtifactTransformer`, il punto di iniezione usato dal pool
//! - Implementa `GhostscriptTransformer`: crea le directory di output, invoca
//!   Ghostscript in modo bloccante, misura dimensione prima e dopo
//!
//! ## Pipeline di compressione:
//! 1. Stat del file di input (`InputNotFound` se fallisce)
//! 2. Creazione ricorsiva della directory di output (`OutputDirUnwritable`)
//! 3. Ghostscript con template fisso:
//!    `-sDEVICE=pdfwrite -dCompatibilityLevel=1.4 -dNOPAUSE -dQUIET -dBATCH
//!    -sOutputFile=<out> [-dPDFSETTINGS=/<profilo>] <in>`
//! 4. Exit code diverso da zero: stdout e stderr finiscono nell'errore
//! 5. Stat del file di output (`OutputMissingAfterSuccess` se manca)
//!
//! ## Profili:
//! - `None`: nessun flag, Ghostscript usa il suo default
//! - `Some(QualityProfile::Default)`: flag esplicito `-dPDFSETTINGS=/default`

use crate::error::CompressError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

/// Ghostscript `PDFSETTINGS` presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QualityProfile {
    Default,
    Screen,
    Ebook,
    Printer,
    Prepress,
}

impl QualityProfile {
    pub const ALL: [QualityProfile; 5] = [
        Self::Default,
        Self::Screen,
        Self::Ebook,
        Self::Printer,
        Self::Prepress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Screen => "screen",
            Self::Ebook => "ebook",
            Self::Printer => "printer",
            Self::Prepress => "prepress",
        }
    }
}

impl fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityProfile {
    type Err = CompressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('/');
        Self::ALL
            .into_iter()
            .find(|profile| profile.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                CompressError::Validation(format!(
                    "unknown quality profile '{}' (expected one of: default, screen, ebook, printer, prepress)",
                    s
                ))
            })
    }
}

/// Options passed through to the transformer for every job of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionOptions {
    /// `None` leaves the choice to Ghostscript and emits no `-dPDFSETTINGS` flag
    pub quality: Option<QualityProfile>,
}

impl CompressionOptions {
    pub fn with_quality(quality: QualityProfile) -> Self {
        Self {
            quality: Some(quality),
        }
    }
}

/// Sizes measured around a successful transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    pub original_size: u64,
    pub final_size: u64,
}

/// A failed transform, with the input size when it could be measured (0 otherwise)
#[derive(Debug)]
pub struct TransformFailure {
    pub original_size: u64,
    pub error: CompressError,
}

impl TransformFailure {
    pub fn new(original_size: u64, error: CompressError) -> Self {
        Self {
            original_size,
            error,
        }
    }
}

/// Rewrites one input file into one output file.
///
/// Implementations are called synchronously from executor threads and may block
/// for as long as the underlying tool runs.
pub trait ArtifactTransformer: Send + Sync {
    fn transform(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &CompressionOptions,
    ) -> Result<SizeReport, TransformFailure>;
}

/// Compresses PDFs by running Ghostscript's `pdfwrite` device
#[derive(Debug, Clone)]
pub struct GhostscriptTransformer {
    binary: PathBuf,
}

impl GhostscriptTransformer {
    /// Create a transformer bound to an already resolved Ghostscript binary
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Build the fixed Ghostscript argument list for one job
    pub fn build_args(input_path: &Path, output_path: &Path, options: &CompressionOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-sDEVICE=pdfwrite",
            "-dCompatibilityLevel=1.4",
            "-dNOPAUSE",
            "-dQUIET",
            "-dBATCH",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        let mut output_flag = OsString::from("-sOutputFile=");
        output_flag.push(output_path.as_os_str());
        args.push(output_flag);

        if let Some(quality) = options.quality {
            args.push(OsString::from(format!("-dPDFSETTINGS=/{}", quality)));
        }

        args.push(input_path.as_os_str().to_os_string());
        args
    }

    fn run_ghostscript(&self, args: &[OsString]) -> Result<(), CompressError> {
        let start_time = Instant::now();

        let mut command = Command::new(&self.binary);
        command.args(args).stdin(Stdio::null());

        // Terminal SIGINT must not reach running jobs; cancellation goes through CancelFlag
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let output = command
            .output()
            .map_err(|e| CompressError::ExternalToolFailed {
                exit_info: format!("failed to execute {}: {}", self.binary.display(), e),
                captured_output: String::new(),
            })?;

        debug!(
            "Ghostscript exited with {} after {:.1}s",
            output.status,
            start_time.elapsed().as_secs_f64()
        );

        if !output.status.success() {
            let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
            captured.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(CompressError::ExternalToolFailed {
                exit_info: output.status.to_string(),
                captured_output: captured.trim().to_string(),
            });
        }

        Ok(())
    }
}

impl ArtifactTransformer for GhostscriptTransformer {
    fn transform(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &CompressionOptions,
    ) -> Result<SizeReport, TransformFailure> {
        let original_size = std::fs::metadata(input_path)
            .map_err(|source| {
                TransformFailure::new(
                    0,
                    CompressError::InputNotFound {
                        path: input_path.to_path_buf(),
                        source,
                    },
                )
            })?
            .len();

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| {
                TransformFailure::new(
                    original_size,
                    CompressError::OutputDirUnwritable {
                        path: parent.to_path_buf(),
                        source,
                    },
                )
            })?;
        }

        debug!(
            "Compressing {} -> {} (profile: {})",
            input_path.display(),
            output_path.display(),
            options.quality.map(|q| q.as_str()).unwrap_or("tool default")
        );

        let args = Self::build_args(input_path, output_path, options);
        self.run_ghostscript(&args)
            .map_err(|e| TransformFailure::new(original_size, e))?;

        let final_size = std::fs::metadata(output_path)
            .map_err(|source| {
                TransformFailure::new(
                    original_size,
                    CompressError::OutputMissingAfterSuccess {
                        path: output_path.to_path_buf(),
                        source,
                    },
                )
            })?
            .len();

        Ok(SizeReport {
            original_size,
            final_size,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Writes an executable shell script standing in for Ghostscript.
    ///
    /// `body` runs after `$out` (from `-sOutputFile=`) and `$in` (last argument) are set.
    #[cfg(unix)]
    pub(crate) fn fake_ghostscript(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            "#!/bin/sh\nout=\"\"\nin=\"\"\nfor arg in \"$@\"; do\n  case \"$arg\" in\n    -sOutputFile=*) out=\"${{arg#-sOutputFile=}}\" ;;\n  esac\n  in=\"$arg\"\ndone\n{}\n",
            body
        );
        let path = dir.join("fake-gs");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn arg_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_args_without_profile_omit_pdfsettings() {
        let args = GhostscriptTransformer::build_args(
            Path::new("in/report.pdf"),
            Path::new("out/report_small.pdf"),
            &CompressionOptions::default(),
        );
        let args = arg_strings(&args);
        assert_eq!(
            args,
            vec![
                "-sDEVICE=pdfwrite",
                "-dCompatibilityLevel=1.4",
                "-dNOPAUSE",
                "-dQUIET",
                "-dBATCH",
                "-sOutputFile=out/report_small.pdf",
                "in/report.pdf",
            ]
        );
    }

    #[test]
    fn test_default_profile_is_explicit_flag() {
        let args = GhostscriptTransformer::build_args(
            Path::new("a.pdf"),
            Path::new("b.pdf"),
            &CompressionOptions::with_quality(QualityProfile::Default),
        );
        let args = arg_strings(&args);
        assert!(args.contains(&"-dPDFSETTINGS=/default".to_string()));
        assert_eq!(args.last().unwrap(), "a.pdf");
    }

    #[test]
    fn test_quality_profile_parsing() {
        assert_eq!("ebook".parse::<QualityProfile>().unwrap(), QualityProfile::Ebook);
        assert_eq!("/Screen".parse::<QualityProfile>().unwrap(), QualityProfile::Screen);
        assert!("fax".parse::<QualityProfile>().is_err());
        for profile in QualityProfile::ALL {
            assert_eq!(profile.to_string().parse::<QualityProfile>().unwrap(), profile);
        }
    }

    #[test]
    fn test_missing_input_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let transformer = GhostscriptTransformer::new("gs");
        let failure = transformer
            .transform(
                &temp_dir.path().join("missing.pdf"),
                &temp_dir.path().join("out.pdf"),
                &CompressionOptions::default(),
            )
            .unwrap_err();
        assert_eq!(failure.original_size, 0);
        assert!(matches!(failure.error, CompressError::InputNotFound { .. }));
    }

    #[test]
    fn test_unspawnable_binary_is_a_tool_failure() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.pdf");
        std::fs::write(&input, vec![0u8; 64]).unwrap();

        let transformer = GhostscriptTransformer::new(temp_dir.path().join("no-such-gs"));
        let failure = transformer
            .transform(&input, &temp_dir.path().join("out.pdf"), &CompressionOptions::default())
            .unwrap_err();
        assert_eq!(failure.original_size, 64);
        assert!(matches!(failure.error, CompressError::ExternalToolFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run_creates_dirs_and_measures_sizes() {
        let temp_dir = TempDir::new().unwrap();
        let gs = fake_ghostscript(temp_dir.path(), "head -c 40 \"$in\" > \"$out\"");
        let input = temp_dir.path().join("report.pdf");
        std::fs::write(&input, vec![b'x'; 100]).unwrap();
        let output = temp_dir.path().join("nested").join("compressed").join("report_small.pdf");

        let sizes = GhostscriptTransformer::new(gs)
            .transform(&input, &output, &CompressionOptions::with_quality(QualityProfile::Ebook))
            .unwrap();

        assert_eq!(sizes, SizeReport { original_size: 100, final_size: 40 });
        assert!(output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_captures_output() {
        let temp_dir = TempDir::new().unwrap();
        let gs = fake_ghostscript(
            temp_dir.path(),
            "echo \"processing $in\"\necho \"Unrecoverable error\" >&2\nexit 1",
        );
        let input = temp_dir.path().join("broken.pdf");
        std::fs::write(&input, b"not a pdf").unwrap();

        let failure = GhostscriptTransformer::new(gs)
            .transform(&input, &temp_dir.path().join("out.pdf"), &CompressionOptions::default())
            .unwrap_err();

        assert_eq!(failure.original_size, 9);
        match failure.error {
            CompressError::ExternalToolFailed { captured_output, .. } => {
                assert!(captured_output.contains("processing"));
                assert!(captured_output.contains("Unrecoverable error"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_success_without_output_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let gs = fake_ghostscript(temp_dir.path(), "exit 0");
        let input = temp_dir.path().join("report.pdf");
        std::fs::write(&input, vec![b'x'; 10]).unwrap();

        let failure = GhostscriptTransformer::new(gs)
            .transform(&input, &temp_dir.path().join("out.pdf"), &CompressionOptions::default())
            .unwrap_err();
        assert!(matches!(failure.error, CompressError::OutputMissingAfterSuccess { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_ghostscript_runs_in_its_own_process_group() {
        let temp_dir = TempDir::new().unwrap();
        let gs = fake_ghostscript(
            temp_dir.path(),
            "echo \"$(ps -o pgid= -p $$) $(ps -o pgid= -p $PPID)\" > \"$out\"",
        );
        let input = temp_dir.path().join("report.pdf");
        std::fs::write(&input, vec![b'x'; 10]).unwrap();
        let output = temp_dir.path().join("out.pdf");

        GhostscriptTransformer::new(gs)
            .transform(&input, &output, &CompressionOptions::default())
            .unwrap();

        let groups = std::fs::read_to_string(&output).unwrap();
        let groups: Vec<&str> = groups.split_whitespace().collect();
        assert_eq!(groups.len(), 2, "unexpected ps output: {:?}", groups);
        assert_ne!(groups[0], groups[1]);
    }
}
