//! # Table Engine
//!
//! Entry point tying the pieces together for one replica:
//!
//! ```text
//! open(document, config)
//!   ├─ migrate legacy schema (once)
//!   ├─ ProjectionHub ← observe_deep on the five collections
//!   └─ UndoStack     ← local-origin transactions only
//!
//! operation
//!   ├─ one LOCAL_ORIGIN transaction (mutations / locks)
//!   ├─ commit → observers refresh projections
//!   └─ structural repair if the projection asked for it
//! ```
//!
//! All entry points are synchronous and expect to be driven from one logical
//! thread. Remote edits enter through [`TableEngine::apply_update`].

use crate::config::EngineConfig;
use crate::document::{Collections, TableDocument, LOCAL_ORIGIN};
use crate::errors::TableResult;
use crate::ids::{ColumnId, LockId, RowId};
use crate::locks::{self, CellRange};
use crate::migration::{self, normalize_orders, repair_column_order, MigrationOutcome};
use crate::model::{ColumnDefinition, LockRange, NewColumn, RowRecord, SortDirection};
use crate::mutations::{self, MutationResult, TableOp};
use crate::projection::{
    column_positions, display_columns, row_positions, LockedCells, ProjectionHub, TableProjection,
};
use crate::undo_stack::UndoStack;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use yrs::{Subscription, TransactionMut};

// Fields drop in declaration order: observers go before the document.
pub struct TableEngine {
    _subscriptions: Vec<Subscription>,
    hub: Arc<ProjectionHub>,
    undo: UndoStack,
    config: EngineConfig,
    /// Incremented by every local operation, undo and redo
    version: u64,
    migration: MigrationOutcome,
    document: TableDocument,
}

impl TableEngine {
    /// Open an engine over an injected document, migrating it if needed
    pub fn open(document: TableDocument, config: EngineConfig) -> TableResult<Self> {
        let migration = migration::migrate(&document, &config, false)?;
        tracing::debug!(?migration, client_id = document.client_id(), "Opened table document");

        let hub = {
            let txn = document.read()?;
            ProjectionHub::new(document.collections().clone(), &txn)
        };
        let subscriptions = ProjectionHub::observe(&hub);
        let undo = UndoStack::new(&document, config.undo_capture_timeout_ms);

        let mut engine = Self {
            document,
            config,
            hub,
            undo,
            version: 0,
            migration,
            _subscriptions: subscriptions,
        };
        engine.repair_if_requested()?;
        Ok(engine)
    }

    /// Open an engine over a fresh, empty document
    pub fn new(config: EngineConfig) -> TableResult<Self> {
        let document = match config.client_id {
            Some(id) => TableDocument::with_client_id(id),
            None => TableDocument::new(),
        };
        Self::open(document, config)
    }

    pub fn document(&self) -> &TableDocument {
        &self.document
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// What migration did when this engine was opened
    pub fn migration(&self) -> &MigrationOutcome {
        &self.migration
    }

    /// Run `f` inside one local transaction, then repair if needed
    fn transact<R, F>(&mut self, operation: &'static str, f: F) -> TableResult<R>
    where
        F: FnOnce(&Collections, &mut TransactionMut) -> TableResult<R>,
    {
        let result = {
            let c = self.document.collections();
            let mut txn = self.document.write(LOCAL_ORIGIN)?;
            f(c, &mut txn)?
        };
        self.version += 1;
        tracing::debug!(operation, version = self.version, "Applied table operation");

        self.repair_if_requested()?;
        Ok(result)
    }

    /// Structural repairs requested by the projection layer.
    ///
    /// Runs after the triggering transaction has committed; both repairs
    /// re-check their condition inside their own transaction.
    fn repair_if_requested(&mut self) -> TableResult<()> {
        if !self.hub.take_repair_request() {
            return Ok(());
        }
        repair_column_order(&self.document)?;
        normalize_orders(&self.document)?;
        Ok(())
    }

    // ---- structural mutations ------------------------------------------

    /// Rename the column at `index`; no-op when out of range
    pub fn edit_header(&mut self, index: usize, name: &str) -> TableResult<bool> {
        self.transact("editHeader", |c, txn| {
            Ok(mutations::edit_header(c, txn, index, name))
        })
    }

    /// Insert rows keyed by header name at `at`; returns the count inserted
    pub fn insert_rows(&mut self, at: usize, rows: &[RowRecord]) -> TableResult<usize> {
        self.transact("insertRows", |c, txn| {
            Ok(mutations::insert_rows(c, txn, at, rows))
        })
    }

    /// Insert `count` blank rows; returns 0 when the table has no columns
    pub fn insert_empty_rows(&mut self, at: usize, count: usize) -> TableResult<usize> {
        self.transact("insertEmptyRows", |c, txn| {
            Ok(mutations::insert_empty_rows(c, txn, at, count))
        })
    }

    pub fn delete_rows(&mut self, indices: &[usize]) -> TableResult<usize> {
        self.transact("deleteRows", |c, txn| {
            Ok(mutations::delete_rows(c, txn, indices))
        })
    }

    pub fn insert_columns(&mut self, at: usize, columns: &[NewColumn]) -> TableResult<usize> {
        let width = self.config.default_column_width;
        self.transact("insertColumns", |c, txn| {
            Ok(mutations::insert_columns(c, txn, at, columns, width))
        })
    }

    pub fn delete_columns(&mut self, indices: &[usize]) -> TableResult<usize> {
        self.transact("deleteColumns", |c, txn| {
            Ok(mutations::delete_columns(c, txn, indices))
        })
    }

    pub fn update_column_width(&mut self, name: &str, width: f64) -> TableResult<bool> {
        self.transact("updateColumnWidth", |c, txn| {
            Ok(mutations::update_column_width(c, txn, name, width))
        })
    }

    pub fn update_cell(&mut self, row_index: usize, name: &str, value: &str) -> TableResult<bool> {
        self.transact("updateCell", |c, txn| {
            Ok(mutations::update_cell(c, txn, row_index, name, value))
        })
    }

    pub fn reorder_column(&mut self, from: usize, to: usize) -> TableResult<bool> {
        self.transact("reorderColumn", |c, txn| {
            Ok(mutations::reorder_column(c, txn, from, to))
        })
    }

    /// Sort rows by a column; returns how many rows changed position
    pub fn sort_rows_by_column(&mut self, name: &str, direction: SortDirection) -> TableResult<usize> {
        self.transact("sortRowsByColumn", |c, txn| {
            Ok(mutations::sort_rows_by_column(c, txn, name, direction))
        })
    }

    // ---- locks ---------------------------------------------------------

    /// Lock the cells currently inside the rectangle (inclusive, any corner order)
    pub fn lock_cell_range(
        &mut self,
        row_start: usize,
        row_end: usize,
        column_start: usize,
        column_end: usize,
        note: Option<&str>,
    ) -> TableResult<Option<LockId>> {
        let range = CellRange::new(row_start, row_end, column_start, column_end);
        let note = note.map(str::to_string);
        self.transact("lockCellRange", |c, txn| {
            locks::lock_cell_range(c, txn, range, note)
        })
    }

    pub fn unlock_range(&mut self, id: &LockId) -> TableResult<bool> {
        self.transact("unlockRange", |c, txn| Ok(locks::unlock_range(c, txn, id)))
    }

    pub fn unlock_all(&mut self) -> TableResult<usize> {
        self.transact("unlockAll", |c, txn| Ok(locks::unlock_all(c, txn)))
    }

    /// Apply a serialized operation
    pub fn apply(&mut self, op: TableOp) -> TableResult<MutationResult> {
        let mut lock_id = None;
        let affected = match &op {
            TableOp::EditHeader { index, name } => self.edit_header(*index, name)? as usize,
            TableOp::InsertRows { at, rows } => self.insert_rows(*at, rows)?,
            TableOp::InsertEmptyRows { at, count } => self.insert_empty_rows(*at, *count)?,
            TableOp::DeleteRows { indices } => self.delete_rows(indices)?,
            TableOp::InsertColumns { at, columns } => self.insert_columns(*at, columns)?,
            TableOp::DeleteColumns { indices } => self.delete_columns(indices)?,
            TableOp::UpdateColumnWidth { name, width } => {
                self.update_column_width(name, *width)? as usize
            }
            TableOp::UpdateCell {
                row_index,
                name,
                value,
            } => self.update_cell(*row_index, name, value)? as usize,
            TableOp::ReorderColumn { from, to } => self.reorder_column(*from, *to)? as usize,
            TableOp::SortRowsByColumn { name, direction } => {
                self.sort_rows_by_column(name, *direction)?
            }
            TableOp::LockCellRange {
                row_start,
                row_end,
                column_start,
                column_end,
                note,
            } => {
                lock_id = self.lock_cell_range(
                    *row_start,
                    *row_end,
                    *column_start,
                    *column_end,
                    note.as_deref(),
                )?;
                lock_id.is_some() as usize
            }
            TableOp::UnlockRange { lock_id } => self.unlock_range(lock_id)? as usize,
            TableOp::UnlockAll => self.unlock_all()?,
        };

        Ok(MutationResult {
            version: self.version,
            affected,
            lock_id,
        })
    }

    // ---- undo / redo ---------------------------------------------------

    pub fn undo(&mut self) -> TableResult<bool> {
        let undone = self.undo.undo()?;
        if undone {
            self.version += 1;
            self.repair_if_requested()?;
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> TableResult<bool> {
        let redone = self.undo.redo()?;
        if redone {
            self.version += 1;
            self.repair_if_requested()?;
        }
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo.undo_levels()
    }

    pub fn redo_levels(&self) -> usize {
        self.undo.redo_levels()
    }

    /// End the current undo step; the next edit starts a new one
    pub fn stop_capturing(&mut self) {
        self.undo.stop_capturing();
    }

    pub fn clear_history(&mut self) {
        self.undo.clear();
    }

    // ---- replica sync --------------------------------------------------

    /// Merge an update from another replica and refresh projections
    pub fn apply_update(&mut self, update: &[u8]) -> TableResult<()> {
        self.document.apply_update(update)?;
        self.repair_if_requested()
    }

    pub fn state_vector(&self) -> TableResult<Vec<u8>> {
        self.document.state_vector()
    }

    pub fn encode_state(&self) -> TableResult<Vec<u8>> {
        self.document.encode_state()
    }

    pub fn encode_delta(&self, state_vector: &[u8]) -> TableResult<Vec<u8>> {
        self.document.encode_delta(state_vector)
    }

    // ---- schema maintenance --------------------------------------------

    /// Clear the identity-stable collections and replay the legacy data
    pub fn force_remigrate(&mut self) -> TableResult<MigrationOutcome> {
        let outcome = migration::migrate(&self.document, &self.config, true)?;
        self.undo.clear();
        self.version += 1;
        self.repair_if_requested()?;
        self.migration = outcome.clone();
        Ok(outcome)
    }

    /// Remove the legacy collections once every replica has upgraded
    pub fn purge_legacy(&mut self) -> TableResult<bool> {
        self.document.purge_legacy()
    }

    // ---- reads ---------------------------------------------------------

    pub fn table(&self) -> TableProjection {
        self.hub.table()
    }

    pub fn headers(&self) -> Vec<String> {
        self.hub.table().headers
    }

    pub fn rows(&self) -> Vec<RowRecord> {
        self.hub.table().rows
    }

    pub fn column_widths(&self) -> BTreeMap<String, f64> {
        self.hub.table().column_widths
    }

    pub fn locked_cells(&self) -> LockedCells {
        self.hub.locked_cells()
    }

    /// Receiver that observes every change to the table projection
    pub fn subscribe_table(&self) -> watch::Receiver<TableProjection> {
        self.hub.subscribe_table()
    }

    /// Receiver that observes every change to the locked-cell projection
    pub fn subscribe_locks(&self) -> watch::Receiver<LockedCells> {
        self.hub.subscribe_locks()
    }

    pub fn row_count(&self) -> TableResult<usize> {
        Ok(self.row_ids()?.len())
    }

    pub fn column_count(&self) -> TableResult<usize> {
        Ok(self.column_ids()?.len())
    }

    /// Displayed row ids, in display order
    pub fn row_ids(&self) -> TableResult<Vec<RowId>> {
        let txn = self.document.read()?;
        let positions = row_positions(self.document.collections(), &txn);
        Ok(positions.into_iter().map(|(_, id)| id).collect())
    }

    /// Displayed column ids, in display order
    pub fn column_ids(&self) -> TableResult<Vec<ColumnId>> {
        let txn = self.document.read()?;
        let positions = column_positions(self.document.collections(), &txn);
        Ok(positions.into_iter().map(|(_, id)| id).collect())
    }

    pub fn lock_ranges(&self) -> TableResult<Vec<LockRange>> {
        let txn = self.document.read()?;
        Ok(self.document.collections().lock_ranges(&txn))
    }

    /// Definition of the column displayed at `index`
    pub fn column_definition(&self, index: usize) -> TableResult<Option<ColumnDefinition>> {
        let txn = self.document.read()?;
        Ok(display_columns(self.document.collections(), &txn)
            .into_iter()
            .nth(index))
    }

    /// First `"Column N"` not used by any displayed header
    pub fn next_column_name(&self) -> String {
        let used: HashSet<String> = self.headers().into_iter().collect();
        (1..)
            .map(|n| format!("Column {}", n))
            .find(|name| !used.contains(name))
            .unwrap_or_else(|| "Column".to_string())
    }
}

impl std::fmt::Debug for TableEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEngine")
            .field("document", &self.document)
            .field("version", &self.version)
            .field("undo", &self.undo)
            .finish()
    }
}
