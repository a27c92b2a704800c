//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output. Il calcolo è puro: stessi input,
//! stesso path, così il coordinatore può controllare le sovrascritture prima
//! di avviare qualsiasi job.

use crate::config::DEFAULT_SUFFIX;
use crate::error::CompressError;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Name of the directory created next to each input when no target is given
pub const DEFAULT_OUTPUT_DIR: &str = "compressed";

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Derive the output path for one input.
    ///
    /// - with a target directory: `<target>/<stem><suffix>.pdf`
    /// - otherwise: `<input dir>/compressed/<stem><suffix>.pdf`
    ///
    /// An empty suffix falls back to `_spc_compressed`.
    pub fn output_path(input_path: &Path, target_dir: Option<&Path>, suffix: &str) -> Result<PathBuf, CompressError> {
        let file_stem = input_path
            .file_stem()
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| CompressError::InvalidInput(input_path.to_path_buf()))?
            .to_string_lossy();

        let suffix = if suffix.is_empty() { DEFAULT_SUFFIX } else { suffix };
        let filename = format!("{}{}.pdf", file_stem, suffix);

        let output_dir = match target_dir {
            Some(dir) => dir.to_path_buf(),
            None => input_path
                .parent()
                .unwrap_or(Path::new(""))
                .join(DEFAULT_OUTPUT_DIR),
        };

        Ok(output_dir.join(filename))
    }

    /// Reject batches where two distinct inputs map to the same output, or
    /// where an output would replace another input of the same batch
    pub fn check_collisions<'a, I>(pairs: I) -> Result<(), CompressError>
    where
        I: IntoIterator<Item = (&'a Path, &'a Path)>,
    {
        let pairs: Vec<(&Path, &Path)> = pairs.into_iter().collect();
        let inputs: HashSet<&Path> = pairs.iter().map(|(input, _)| *input).collect();

        let mut seen: HashMap<&Path, &Path> = HashMap::new();
        for (input, output) in pairs {
            if inputs.contains(output) {
                return Err(CompressError::OutputOverwritesInput {
                    input: input.to_path_buf(),
                    output: output.to_path_buf(),
                });
            }
            if let Some(first) = seen.insert(output, input) {
                return Err(CompressError::OutputCollision {
                    first: first.to_path_buf(),
                    second: input.to_path_buf(),
                    output: output.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}
