use super::{resolve, save_table};
use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use gridweave_engine::{NewColumn, TableEngine};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Table document to create
    #[arg(default_value = "table.ydoc")]
    pub file: PathBuf,

    /// Starting headers (comma separated)
    #[arg(short = 'H', long, value_delimiter = ',')]
    pub headers: Vec<String>,

    /// Also write a default gridweave.config.json
    #[arg(long)]
    pub config: bool,

    /// Force overwrite an existing document
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str, config: &Config) -> Result<()> {
    let path = resolve(cwd, &args.file);

    if path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            path.display().to_string().bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing table document...".bright_blue().bold());

    let mut engine = TableEngine::new(config.engine.clone())?;
    if !args.headers.is_empty() {
        let columns: Vec<NewColumn> = args
            .headers
            .iter()
            .map(|name| NewColumn::named(name.trim()))
            .collect();
        engine.insert_columns(0, &columns)?;
        println!("  {} Added {} columns", "✓".green(), columns.len());
    }
    save_table(&engine, &path)?;
    println!("  {} Created {}", "✓".green(), args.file.display());

    if args.config {
        let config_path = resolve(cwd, DEFAULT_CONFIG_NAME.as_ref());
        if config_path.exists() {
            println!("  {} {} already exists, leaving it", "•".dimmed(), DEFAULT_CONFIG_NAME);
        } else {
            let config_json = serde_json::to_string_pretty(&Config::default())?;
            fs::write(&config_path, config_json)?;
            println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
        }
    }

    println!();
    println!("{}", "✅ Table initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: gridweave apply {} ops.json", args.file.display());
    println!("  2. Run: gridweave show {}", args.file.display());

    Ok(())
}
