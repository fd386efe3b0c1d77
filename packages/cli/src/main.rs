mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{inspect, normalize, replay, trim, InspectArgs, NormalizeArgs, ReplayArgs, TrimArgs};
use tracing_subscriber::EnvFilter;

/// Folio CLI - inspect, trim and replay edits on serialized documents
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log editor activity to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the section tree with markup open/close markers
    Inspect(InspectArgs),

    /// Print the part of a document covered by a range
    Trim(TrimArgs),

    /// Apply a JSON edit script and print the result
    Replay(ReplayArgs),

    /// Re-serialize a document, merging redundant markers
    Normalize(NormalizeArgs),
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "folio_editor=debug,folio_model=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Inspect(args) => inspect(args),
            Command::Trim(args) => trim(args),
            Command::Replay(args) => replay(args, &cwd),
            Command::Normalize(args) => normalize(args),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
