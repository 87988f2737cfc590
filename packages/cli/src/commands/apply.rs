use super::{open_table, resolve, save_table};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use gridweave_engine::TableOp;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Table document to modify
    pub file: PathBuf,

    /// JSON file holding one operation or an array of operations
    pub ops: PathBuf,

    /// Apply the operations but do not write the document back
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OpScript {
    Many(Vec<TableOp>),
    One(TableOp),
}

impl OpScript {
    fn into_ops(self) -> Vec<TableOp> {
        match self {
            OpScript::Many(ops) => ops,
            OpScript::One(op) => vec![op],
        }
    }
}

pub fn parse_ops(content: &str) -> Result<Vec<TableOp>> {
    let script: OpScript = serde_json::from_str(content)?;
    Ok(script.into_ops())
}

pub fn apply(args: ApplyArgs, cwd: &str, config: &Config) -> Result<()> {
    let path = resolve(cwd, &args.file);
    let ops_path = resolve(cwd, &args.ops);

    let content = fs::read_to_string(&ops_path)
        .with_context(|| format!("Cannot read {}", ops_path.display()))?;
    let ops = parse_ops(&content)
        .with_context(|| format!("{} is not a valid operation script", ops_path.display()))?;

    let mut engine = open_table(&path, config)?;
    println!(
        "🔧 {} {} operations to {}",
        "Applying".green().bold(),
        ops.len(),
        args.file.display()
    );

    for op in ops {
        let name = op.name();
        let result = engine
            .apply(op)
            .with_context(|| format!("{} failed", name))?;

        let marker = if result.affected == 0 {
            "•".dimmed()
        } else {
            "✓".green()
        };
        match &result.lock_id {
            Some(lock_id) => println!(
                "   {} {} → lock {} (v{})",
                marker, name, lock_id, result.version
            ),
            None => println!(
                "   {} {} → {} affected (v{})",
                marker, name, result.affected, result.version
            ),
        }
    }

    if args.dry_run {
        println!("   {} Dry run, document left unchanged", "•".dimmed());
    } else {
        save_table(&engine, &path)?;
        println!("   {} Wrote {}", "✓".green(), args.file.display());
    }

    Ok(())
}
