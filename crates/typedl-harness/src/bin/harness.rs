//! CLI entrypoint for the typedl harness.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use typedl_core::{LibraryDescriptor, LoaderConfig, Manifest};
use typedl_harness::invoke::call_symbol;
use typedl_harness::structured_log::{LogEmitter, validate_log_file};
use typedl_harness::{probe, validate};

/// Manifest tooling for typedl.
#[derive(Debug, Parser)]
#[command(name = "typedl-harness")]
#[command(about = "Validate, probe and call declared library symbols")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the descriptor for a manifest and print a summary.
    Validate {
        /// Manifest JSON path.
        #[arg(long)]
        manifest: PathBuf,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Open the manifest's library and resolve every declaration.
    Probe {
        /// Manifest JSON path.
        #[arg(long)]
        manifest: PathBuf,
        /// Library path overriding the manifest's `library`.
        #[arg(long)]
        library: Option<String>,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Output JSON report path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Call one declaration with text arguments and print the result.
    Call {
        /// Manifest JSON path.
        #[arg(long)]
        manifest: PathBuf,
        /// Declared symbol name.
        #[arg(long)]
        symbol: String,
        /// Argument, parsed as the declared parameter type (repeatable).
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
        /// Library path overriding the manifest's `library`.
        #[arg(long)]
        library: Option<String>,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Validate a structured JSONL log file.
    ValidateLog {
        /// Structured JSONL log path.
        #[arg(long)]
        log: PathBuf,
    },
}

fn load_descriptor(
    manifest: &Path,
    library: Option<String>,
) -> Result<LibraryDescriptor, Box<dyn std::error::Error>> {
    let mut manifest = Manifest::from_file(manifest)?;
    if let Some(library) = library {
        manifest.library = library;
    }
    Ok(manifest.to_descriptor()?)
}

/// Log emitter writing to `path`, or discarding entries when no path is given.
fn emitter(path: Option<&Path>, scope: &str) -> std::io::Result<LogEmitter<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::sink()),
    };
    let run_id = format!("pid{}", std::process::id());
    Ok(LogEmitter::to_writer(sink, scope, &run_id))
}

fn write_output(body: &str, output: Option<&Path>) -> std::io::Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, body)?;
            eprintln!("Wrote report to {}", path.display());
            Ok(())
        }
        None => {
            println!("{body}");
            Ok(())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = LoaderConfig::global();

    match cli.command {
        Command::Validate { manifest, log } => {
            let mut log = emitter(log.as_deref(), "validate")?;
            let summary = validate(&manifest, &mut log)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            eprintln!(
                "{}: {} declaration(s), {} callable",
                summary.library,
                summary.symbols.len(),
                summary.symbols.iter().filter(|s| s.callable).count()
            );
        }
        Command::Probe {
            manifest,
            library,
            log,
            output,
        } => {
            let descriptor = load_descriptor(&manifest, library)?;
            let mut log = emitter(log.as_deref(), "probe")?;
            let report = probe(descriptor, config, &mut log)?;
            write_output(&report.to_json()?, output.as_deref())?;
            if !report.ok() {
                return Err(format!(
                    "{} of {} declaration(s) did not resolve",
                    report.missing,
                    report.symbols.len()
                )
                .into());
            }
        }
        Command::Call {
            manifest,
            symbol,
            args,
            library,
            log,
        } => {
            let descriptor = load_descriptor(&manifest, library)?;
            let mut log = emitter(log.as_deref(), "call")?;
            let value = call_symbol(descriptor, &symbol, &args, config, &mut log)?;
            println!("{value}");
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            if !errors.is_empty() {
                return Err(format!("{} error(s) in {lines} line(s)", errors.len()).into());
            }
            eprintln!("{}: {lines} valid line(s)", log.display());
        }
    }
    Ok(())
}
