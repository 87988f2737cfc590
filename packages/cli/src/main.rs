mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, import, init, merge, show, ApplyArgs, ImportArgs, InitArgs, MergeArgs, ShowArgs,
};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Gridweave CLI - collaborative tables on a CRDT document
#[derive(Parser, Debug)]
#[command(name = "gridweave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty table document
    Init(InitArgs),

    /// Convert a positional JSON table into a table document
    Import(ImportArgs),

    /// Print a table document
    Show(ShowArgs),

    /// Apply a JSON operation script to a table document
    Apply(ApplyArgs),

    /// Merge replica documents into a target document
    Merge(MergeArgs),
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()
        .context("Cannot get current directory")?
        .display()
        .to_string();

    let config = Config::load(&cwd)?;
    init_tracing(&config);
    tracing::debug!(cwd = %cwd, "Loaded configuration");

    match cli.command {
        Command::Init(args) => init(args, &cwd, &config),
        Command::Import(args) => import(args, &cwd, &config),
        Command::Show(args) => show(args, &cwd, &config),
        Command::Apply(args) => apply(args, &cwd, &config),
        Command::Merge(args) => merge(args, &cwd, &config),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
