use super::{open_table, resolve};
use crate::config::Config;
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use gridweave_engine::{LockedCells, TableProjection};
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Table document to print
    #[arg(default_value = "table.ydoc")]
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: ShowFormat,
}

pub fn show(args: ShowArgs, cwd: &str, config: &Config) -> Result<()> {
    let engine = open_table(&resolve(cwd, &args.file), config)?;
    let table = engine.table();
    let locks = engine.locked_cells();

    match args.format {
        ShowFormat::Json => {
            let output = json!({ "table": table, "lockedCells": locks });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        ShowFormat::Text => {
            for line in render_text(&table, &locks) {
                println!("{}", line);
            }
            println!();
            println!(
                "{} rows × {} columns, {} locked cells",
                table.rows.len(),
                table.headers.len(),
                locks.len()
            );
            if !locks.dangling.is_empty() {
                println!(
                    "{} {} locks reference deleted cells",
                    "⚠️".yellow(),
                    locks.dangling.len()
                );
            }
        }
    }

    Ok(())
}

/// Plain-text grid; locked cells are marked with a trailing `*`
fn render_text(table: &TableProjection, locks: &LockedCells) -> Vec<String> {
    let cell_text = |r: usize, c: usize, value: &str| {
        if locks.is_locked(r, c) {
            format!("{}*", value)
        } else {
            value.to_string()
        }
    };

    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for (r, row) in table.rows.iter().enumerate() {
        for (c, header) in table.headers.iter().enumerate() {
            let value = row.get(header).map(String::as_str).unwrap_or("");
            widths[c] = widths[c].max(cell_text(r, c, value).chars().count());
        }
    }

    let pad = |text: &str, width: usize| {
        let fill = width.saturating_sub(text.chars().count());
        format!("{}{}", text, " ".repeat(fill))
    };

    let mut lines = Vec::with_capacity(table.rows.len() + 2);
    let header_line: Vec<String> = table
        .headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w).bold().to_string())
        .collect();
    lines.push(header_line.join(" │ "));
    lines.push(
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );

    for (r, row) in table.rows.iter().enumerate() {
        let cells: Vec<String> = table
            .headers
            .iter()
            .enumerate()
            .map(|(c, header)| {
                let value = row.get(header).map(String::as_str).unwrap_or("");
                let text = pad(&cell_text(r, c, value), widths[c]);
                if locks.is_locked(r, c) {
                    text.yellow().to_string()
                } else {
                    text
                }
            })
            .collect();
        lines.push(cells.join(" │ "));
    }

    lines
}
