//! # Undo/Redo Stack
//!
//! Linear undo/redo over locally-originated edits.
//!
//! ## Design
//!
//! - Scoped to the five identity-stable collections
//! - Only transactions tagged with the local origin are captured; remote
//!   updates, migration and structural repair never land on the stack
//! - Edits closer together than the capture timeout coalesce into one step
//! - A new local edit clears the redo stack
//!
//! Undoing restores ids as well as content: a deleted row comes back under
//! its original `RowId`, so locks that referenced it resolve again.

use crate::document::{TableDocument, LOCAL_ORIGIN};
use crate::errors::{TableError, TableResult};
use yrs::undo::Options;
use yrs::UndoManager;

pub struct UndoStack {
    manager: UndoManager,
}

impl UndoStack {
    pub fn new(document: &TableDocument, capture_timeout_ms: u64) -> Self {
        let c = document.collections();

        let mut options = Options::default();
        options.capture_timeout_millis = capture_timeout_ms;

        let mut manager = UndoManager::with_scope_and_options(document.doc(), &c.columns, options);
        manager.expand_scope(&c.column_order);
        manager.expand_scope(&c.rows);
        manager.expand_scope(&c.row_order);
        manager.expand_scope(&c.locks);
        manager.include_origin(LOCAL_ORIGIN);

        Self { manager }
    }

    /// Undo the most recent step; `false` when there is nothing to undo
    pub fn undo(&mut self) -> TableResult<bool> {
        self.manager
            .try_undo()
            .map_err(|e| TableError::Undo(e.to_string()))
    }

    /// Redo the most recently undone step
    pub fn redo(&mut self) -> TableResult<bool> {
        self.manager
            .try_redo()
            .map_err(|e| TableError::Undo(e.to_string()))
    }

    pub fn can_undo(&self) -> bool {
        self.manager.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.manager.can_redo()
    }

    pub fn undo_levels(&self) -> usize {
        self.manager.undo_stack().len()
    }

    pub fn redo_levels(&self) -> usize {
        self.manager.redo_stack().len()
    }

    /// Close the current step so the next edit starts a new one
    pub fn stop_capturing(&mut self) {
        self.manager.reset();
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.manager.clear();
    }
}

impl std::fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoStack")
            .field("undo_levels", &self.undo_levels())
            .field("redo_levels", &self.redo_levels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Collections, MIGRATION_ORIGIN, REMOTE_ORIGIN};
    use crate::ids::{ColumnId, RowId};

    fn push_row(document: &TableDocument, origin: &str, id: &str) {
        let c = document.collections().clone();
        let mut txn = document.write(origin).unwrap();
        c.put_row(&mut txn, &RowId::from(id), Vec::<(ColumnId, String)>::new());
        Collections::splice_ids(&c.row_order, &mut txn, usize::MAX, [id]);
    }

    fn row_count(document: &TableDocument) -> usize {
        let txn = document.read().unwrap();
        document.collections().row_count(&txn)
    }

    #[test]
    fn test_undo_stack_creation() {
        let document = TableDocument::new();
        let stack = UndoStack::new(&document, 0);
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_apply_and_undo_local_edit() {
        let document = TableDocument::new();
        let mut stack = UndoStack::new(&document, 0);

        push_row(&document, LOCAL_ORIGIN, "r1");
        assert_eq!(stack.undo_levels(), 1);

        assert!(stack.undo().unwrap());
        assert_eq!(row_count(&document), 0);
        assert_eq!(stack.redo_levels(), 1);

        assert!(stack.redo().unwrap());
        assert_eq!(row_count(&document), 1);
        assert_eq!(stack.undo_levels(), 1);
    }

    #[test]
    fn test_undo_and_redo_on_empty_history() {
        let document = TableDocument::new();
        let mut stack = UndoStack::new(&document, 0);

        assert!(!stack.undo().unwrap());
        assert!(!stack.redo().unwrap());
    }

    #[test]
    fn test_foreign_origins_are_not_captured() {
        let document = TableDocument::new();
        let stack = UndoStack::new(&document, 0);

        push_row(&document, REMOTE_ORIGIN, "r1");
        push_row(&document, MIGRATION_ORIGIN, "r2");

        assert_eq!(row_count(&document), 2);
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let document = TableDocument::new();
        let mut stack = UndoStack::new(&document, 0);

        push_row(&document, LOCAL_ORIGIN, "r1");
        stack.undo().unwrap();
        assert!(stack.can_redo());

        push_row(&document, LOCAL_ORIGIN, "r2");
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_rapid_edits_coalesce() {
        let document = TableDocument::new();
        let mut stack = UndoStack::new(&document, 60_000);

        push_row(&document, LOCAL_ORIGIN, "r1");
        push_row(&document, LOCAL_ORIGIN, "r2");
        assert_eq!(stack.undo_levels(), 1);

        stack.stop_capturing();
        push_row(&document, LOCAL_ORIGIN, "r3");
        assert_eq!(stack.undo_levels(), 2);

        stack.undo().unwrap();
        assert_eq!(row_count(&document), 2);
        stack.undo().unwrap();
        assert_eq!(row_count(&document), 0);
    }
}
