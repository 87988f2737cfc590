pub mod apply;
pub mod import;
pub mod init;
pub mod merge;
pub mod show;

pub use apply::{apply, ApplyArgs};
pub use import::{import, ImportArgs};
pub use init::{init, InitArgs};
pub use merge::{merge, MergeArgs};
pub use show::{show, ShowArgs};

use crate::config::Config;
use anyhow::{Context, Result};
use gridweave_engine::{TableDocument, TableEngine};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve a user-supplied path against the working directory
pub fn resolve(cwd: &str, path: &Path) -> PathBuf {
    PathBuf::from(cwd).join(path)
}

/// Open a table document saved as a full-state update
pub fn open_table(path: &Path, config: &Config) -> Result<TableEngine> {
    let bytes = fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let document = TableDocument::from_update(&bytes, config.engine.client_id)
        .with_context(|| format!("{} is not a table document", path.display()))?;
    let engine = TableEngine::open(document, config.engine.clone())
        .with_context(|| format!("Cannot open table in {}", path.display()))?;
    Ok(engine)
}

/// Write the full document state back to disk
pub fn save_table(engine: &TableEngine, path: &Path) -> Result<()> {
    let state = engine.encode_state()?;
    fs::write(path, state).with_context(|| format!("Cannot write {}", path.display()))?;
    tracing::debug!(path = %path.display(), version = engine.version(), "Saved table document");
    Ok(())
}
