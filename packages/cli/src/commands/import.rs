use super::{resolve, save_table};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use gridweave_engine::{LegacyTable, MigrationOutcome, TableDocument, TableEngine};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Positional table as JSON: { headers, rows, columnWidths }
    pub input: PathBuf,

    /// Output document (defaults to the input with a .ydoc extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Drop the legacy collections after migrating
    #[arg(long)]
    pub purge: bool,
}

pub fn import(args: ImportArgs, cwd: &str, config: &Config) -> Result<()> {
    let input = resolve(cwd, &args.input);
    let output = match &args.output {
        Some(output) => resolve(cwd, output),
        None => input.with_extension("ydoc"),
    };

    let content = fs::read_to_string(&input)
        .with_context(|| format!("Cannot read {}", input.display()))?;
    let table: LegacyTable = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a positional table", input.display()))?;

    println!("📥 {} {}", "Importing".green().bold(), input.display());

    let document = match config.engine.client_id {
        Some(id) => TableDocument::with_client_id(id),
        None => TableDocument::new(),
    };
    document.write_legacy_table(&table)?;

    let mut engine = TableEngine::open(document, config.engine.clone())?;
    match engine.migration() {
        MigrationOutcome::Migrated { columns, rows } => {
            println!("   {} Migrated {} columns, {} rows", "✓".green(), columns, rows);
        }
        other => println!("   {} Nothing to migrate ({:?})", "•".dimmed(), other),
    }

    if args.purge && engine.purge_legacy()? {
        println!("   {} Purged legacy collections", "✓".green());
    }

    save_table(&engine, &output)?;
    println!("   {} Wrote {}", "✓".green(), output.display());

    Ok(())
}
