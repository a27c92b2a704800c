//! # Confirmation Prompts
//!
//! Risponde alle domande del coordinatore (sovrascrittura e cleanup) secondo
//! le policy configurate; con `ask` chiede all'utente sul terminale.
//! Senza terminale interattivo una domanda `ask` riceve sempre "no".
//! Durante la domanda la progress bar viene sospesa.

use crate::batch::Confirmations;
use crate::config::{CleanupPolicy, Config, OverwritePolicy};
use crate::progress::ProgressManager;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::warn;

/// Confirmations driven by configuration and, when asked to, by the user
pub struct PolicyConfirmations {
    overwrite: OverwritePolicy,
    cleanup: CleanupPolicy,
    interactive: bool,
    progress: Option<ProgressManager>,
}

impl PolicyConfirmations {
    pub fn new(overwrite: OverwritePolicy, cleanup: CleanupPolicy, interactive: bool) -> Self {
        Self {
            overwrite,
            cleanup,
            interactive,
            progress: None,
        }
    }

    /// Suspend this bar while a question is on screen
    pub fn with_progress(mut self, progress: Option<ProgressManager>) -> Self {
        self.progress = progress;
        self
    }

    /// Interactive only when not emitting JSON and stdin is a terminal
    pub fn from_config(config: &Config) -> Self {
        let interactive = !config.json_output && std::io::stdin().is_terminal();
        Self::new(config.overwrite, config.cleanup, interactive)
    }

    fn ask_user(&self, question: &str) -> bool {
        if !self.interactive {
            warn!("{} (no interactive terminal, answering no)", question);
            return false;
        }
        self.ask_over_progress(&mut std::io::stdin().lock(), &mut std::io::stderr(), question)
    }

    fn ask_over_progress<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W, question: &str) -> bool {
        let mut prompt = || ask(input, output, question);
        match &self.progress {
            Some(progress) => progress.suspend(prompt),
            None => prompt(),
        }
    }
}

/// Print `question [y/N]` and read one line; anything but y/yes is a no
pub fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> bool {
    if write!(output, "{} [y/N] ", question).and_then(|_| output.flush()).is_err() {
        return false;
    }

    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn list_paths(paths: &[PathBuf]) -> String {
    const SHOWN: usize = 3;
    let mut listing: Vec<String> = paths
        .iter()
        .take(SHOWN)
        .map(|path| format!("  {}", path.display()))
        .collect();
    if paths.len() > SHOWN {
        listing.push(format!("  ... and {} more", paths.len() - SHOWN));
    }
    listing.join("\n")
}

impl Confirmations for PolicyConfirmations {
    fn confirm_overwrite(&self, existing_outputs: &[PathBuf]) -> bool {
        match self.overwrite {
            OverwritePolicy::Always => true,
            OverwritePolicy::Never => false,
            OverwritePolicy::Ask => self.ask_user(&format!(
                "Found {} existing files that will be overwritten:\n{}\nContinue?",
                existing_outputs.len(),
                list_paths(existing_outputs)
            )),
        }
    }

    fn confirm_cleanup(&self, unoptimized_outputs: &[PathBuf]) -> bool {
        match self.cleanup {
            CleanupPolicy::Delete => true,
            CleanupPolicy::Keep => false,
            CleanupPolicy::Ask => self.ask_user(&format!(
                "{} files were already optimized (compression did not reduce size):\n{}\nDelete these output files?",
                unoptimized_outputs.len(),
                list_paths(unoptimized_outputs)
            )),
        }
    }
}
