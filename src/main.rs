//! # PDF Batch Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Caricamento della configurazione e applicazione degli override da CLI
//! - Espansione degli input e avvio del coordinatore del batch
//! - Ctrl-C: nessun nuovo file viene avviato, quelli in corso terminano;
//!   un secondo Ctrl-C esce subito
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (input, quality, workers, output, etc.)
//! 2. Configura il logging (`RUST_LOG`, altrimenti INFO o DEBUG con `--verbose`)
//! 3. Carica il file di configurazione e applica gli argomenti
//! 4. Raccoglie i PDF da file e cartelle
//! 5. Esegue il batch e stampa (o emette in JSON) il riepilogo
//!
//! ## Esempio di utilizzo:
//! ```bash
//! pdf-compress ~/Documents/scans report.pdf --quality screen --workers 4
//! pdf-compress check
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pdf_batch_compressor::batch::{BatchOutcome, BatchRequest, BatchSummary, CancelFlag};
use pdf_batch_compressor::config::{CleanupPolicy, OverwritePolicy};
use pdf_batch_compressor::file_manager::FileManager;
use pdf_batch_compressor::json_output::JsonMessage;
use pdf_batch_compressor::progress::BatchReporter;
use pdf_batch_compressor::tool_resolver::HostInfo;
use pdf_batch_compressor::{
    BatchCoordinator, CompressError, Config, GhostscriptResolver, PolicyConfirmations, QualityProfile,
};

#[derive(Parser)]
#[command(name = "pdf-compress")]
#[command(about = "Compress PDF files in parallel with Ghostscript")]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// PDF files or folders (folders are searched recursively)
    inputs: Vec<PathBuf>,

    /// Ghostscript quality profile
    #[arg(short, long, value_enum)]
    quality: Option<QualityProfile>,

    /// Pass no quality profile and let Ghostscript use its own default
    #[arg(long, conflicts_with = "quality")]
    tool_default: bool,

    /// Suffix appended to output file names
    #[arg(short, long)]
    suffix: Option<String>,

    /// Output directory (if not specified, a `compressed` folder next to each file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Ghostscript binary to use instead of searching PATH
    #[arg(long)]
    gs: Option<PathBuf>,

    /// What to do when output files already exist
    #[arg(long, value_enum)]
    overwrite: Option<OverwritePolicy>,

    /// What to do with outputs that did not get smaller
    #[arg(long, value_enum)]
    cleanup: Option<CleanupPolicy>,

    /// Answer yes to every question (overwrite and cleanup)
    #[arg(short, long)]
    yes: bool,

    /// Output progress and results as JSON lines
    #[arg(long)]
    json: bool,

    /// Configuration file (default: user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store the effective settings in the configuration file
    #[arg(long)]
    save_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Check that Ghostscript is installed
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Command::Check) = args.command {
        return check_dependencies();
    }

    let json_output = args.json;
    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) if json_output => {
            JsonMessage::error(format!("{:#}", e)).emit();
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}

fn check_dependencies() -> Result<()> {
    let host = HostInfo::detect();
    info!("Detected system: {}", host);

    match GhostscriptResolver::new().check_with_instructions() {
        Ok(path) => {
            println!("Ghostscript found: {}", path.display());
            Ok(())
        }
        Err(message) => Err(CompressError::MissingDependency(message).into()),
    }
}

async fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config.as_ref().cloned().or_else(Config::default_path) {
        Some(path) => {
            if args.config.is_some() && !path.exists() {
                return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
            }
            Config::from_file(&path).await?
        }
        None => Config::default(),
    };

    if let Some(quality) = args.quality {
        config.quality = Some(quality);
    }
    if args.tool_default {
        config.quality = None;
    }
    if let Some(ref suffix) = args.suffix {
        config.suffix = suffix.clone();
    }
    if let Some(ref output) = args.output {
        config.output_path = Some(output.clone());
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(ref gs) = args.gs {
        config.ghostscript_path = Some(gs.clone());
    }
    if let Some(overwrite) = args.overwrite {
        config.overwrite = overwrite;
    }
    if let Some(cleanup) = args.cleanup {
        config.cleanup = cleanup;
    }
    if args.yes {
        config.overwrite = OverwritePolicy::Always;
        config.cleanup = CleanupPolicy::Delete;
    }
    if args.json {
        config.json_output = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args).await?;

    if args.save_config {
        let path = args
            .config
            .clone()
            .or_else(Config::default_path)
            .ok_or_else(|| anyhow::anyhow!("No configuration directory available"))?;
        config.save_to_file(&path).await?;
        info!("Configuration saved to {}", path.display());
    }

    if args.inputs.is_empty() {
        if args.save_config {
            return Ok(());
        }
        return Err(anyhow::anyhow!("No input files or folders given"));
    }

    if config.ghostscript_path.is_none() {
        if let Err(message) = GhostscriptResolver::new().check_with_instructions() {
            warn!("{}", message);
        }
    }

    let inputs = FileManager::collect_inputs(&args.inputs)?;
    if inputs.is_empty() {
        return Err(anyhow::anyhow!("No PDF files were found"));
    }

    let request = BatchRequest::from_config(&config, inputs);
    let mut coordinator = BatchCoordinator::from_config(&config);

    let cancel = coordinator.cancel_flag();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&cancel) {
                Interrupt::Cancel => {
                    warn!("Interrupted: no new files will be started (press Ctrl-C again to quit now)")
                }
                Interrupt::Exit => {
                    warn!("Interrupted again, exiting");
                    std::process::exit(130);
                }
            }
        }
    });

    if config.json_output {
        JsonMessage::Start {
            total_files: request.inputs.len(),
            workers: request.concurrency,
            quality: config.quality.map(|q| q.to_string()),
            output_dir: config.output_path.clone(),
        }
        .emit();
    } else {
        info!("Found {} PDF files", request.inputs.len());
        if let Some(ref output_dir) = config.output_path {
            info!("Output directory: {}", output_dir.display());
        }
    }

    let mut reporter = BatchReporter::new(request.inputs.len(), config.json_output);
    let confirmations = PolicyConfirmations::from_config(&config).with_progress(reporter.progress_manager());

    let outcome = match coordinator.run(&request, &confirmations, &mut reporter).await {
        Ok(outcome) => outcome,
        Err(e) => {
            reporter.finish("Failed");
            error!("{}", e);
            return Err(e.into());
        }
    };

    match outcome {
        BatchOutcome::Aborted { existing_outputs } => {
            reporter.finish("Cancelled");
            if config.json_output {
                JsonMessage::Aborted { existing_outputs }.emit();
            } else {
                println!("Cancelled by user. No file was processed.");
            }
        }
        BatchOutcome::Completed(summary) => {
            reporter.finish("Completed");
            report_summary(&summary, config.json_output);
        }
    }

    Ok(())
}

/// What a Ctrl-C does at this point of the batch
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// Stop starting new files, let running ones finish
    Cancel,
    /// Already cancelled: quit immediately
    Exit,
}

fn on_interrupt(cancel: &CancelFlag) -> Interrupt {
    if cancel.is_cancelled() {
        Interrupt::Exit
    } else {
        cancel.cancel();
        Interrupt::Cancel
    }
}

fn report_summary(summary: &BatchSummary, json_output: bool) {
    if json_output {
        if let Some(ref cleanup) = summary.cleanup {
            JsonMessage::cleanup(cleanup).emit();
        }
        JsonMessage::complete(summary).emit();
        return;
    }

    if let Some(ref cleanup) = summary.cleanup {
        println!("Deleted {} unoptimized files.", cleanup.deleted);
        if cleanup.failed > 0 {
            println!("Could not delete {} files.", cleanup.failed);
        }
    } else if !summary.unoptimized.is_empty() {
        println!(
            "{} files did not get smaller and were kept.",
            summary.unoptimized.len()
        );
    }

    if summary.cancelled > 0 {
        println!("{} files were not started because the batch was interrupted.", summary.cancelled);
    }

    println!("{}", summary.format_summary());
}
