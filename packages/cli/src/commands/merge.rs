use super::{open_table, resolve, save_table};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Document that receives the other replicas' changes
    pub target: PathBuf,

    /// Replica documents to merge in
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,
}

pub fn merge(args: MergeArgs, cwd: &str, config: &Config) -> Result<()> {
    let target = resolve(cwd, &args.target);
    let mut engine = open_table(&target, config)?;

    println!("🔀 {} into {}", "Merging".green().bold(), args.target.display());

    for source in &args.sources {
        let path = resolve(cwd, source);
        let update = fs::read(&path).with_context(|| format!("Cannot read {}", path.display()))?;
        engine
            .apply_update(&update)
            .with_context(|| format!("Cannot merge {}", path.display()))?;
        println!("   {} {}", "✓".green(), source.display());
    }

    save_table(&engine, &target)?;
    println!(
        "   {} {} rows × {} columns",
        "✓".green(),
        engine.row_count()?,
        engine.column_count()?
    );

    Ok(())
}
