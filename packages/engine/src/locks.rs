//! # Cell Locks
//!
//! A lock captures the *identities* of the cells inside a rectangle at the
//! moment it is created. The rectangle itself is never stored, so a lock
//! follows its cells through reorders, renames and sorts.
//!
//! Deleting a row or column never touches the lock registry. Cells that stop
//! resolving simply drop out of the locked-cell projection, and come back if
//! the deletion is undone.

use crate::document::Collections;
use crate::errors::TableResult;
use crate::ids::{ColumnId, LockId, RowId};
use crate::model::{CellRef, LockRange};
use crate::projection::{column_positions, row_positions};
use yrs::{Map, ReadTxn, TransactionMut};

/// Inclusive display-coordinate rectangle; corners may come in any order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub row_start: usize,
    pub row_end: usize,
    pub column_start: usize,
    pub column_end: usize,
}

impl CellRange {
    pub fn new(row_start: usize, row_end: usize, column_start: usize, column_end: usize) -> Self {
        Self {
            row_start,
            row_end,
            column_start,
            column_end,
        }
    }

    /// A single cell
    pub fn cell(row: usize, column: usize) -> Self {
        Self::new(row, row, column, column)
    }

    fn rows(&self) -> (usize, usize) {
        (self.row_start.min(self.row_end), self.row_start.max(self.row_end))
    }

    fn columns(&self) -> (usize, usize) {
        (
            self.column_start.min(self.column_end),
            self.column_start.max(self.column_end),
        )
    }
}

/// Ids at the display positions `lo..=hi`, clipped to the live table
fn span<Id: Clone>(positions: &[(usize, Id)], (lo, hi): (usize, usize)) -> Vec<Id> {
    if lo >= positions.len() {
        return Vec::new();
    }
    positions[lo..=hi.min(positions.len() - 1)]
        .iter()
        .map(|(_, id)| id.clone())
        .collect()
}

/// Cells currently displayed inside `range`
pub(crate) fn resolve_cells<T: ReadTxn>(c: &Collections, txn: &T, range: CellRange) -> Vec<CellRef> {
    let rows: Vec<RowId> = span(&row_positions(c, txn), range.rows());
    let columns: Vec<ColumnId> = span(&column_positions(c, txn), range.columns());

    rows.iter()
        .flat_map(|row_id| {
            columns.iter().map(move |column_id| CellRef {
                row_id: row_id.clone(),
                column_id: column_id.clone(),
            })
        })
        .collect()
}

pub(crate) fn lock_cell_range(
    c: &Collections,
    txn: &mut TransactionMut,
    range: CellRange,
    note: Option<String>,
) -> TableResult<Option<LockId>> {
    let cells = resolve_cells(c, txn, range);
    if cells.is_empty() {
        return Ok(None);
    }

    let lock = LockRange {
        id: LockId::generate(),
        cells,
        note: note.filter(|note| !note.trim().is_empty()),
    };
    c.put_lock(txn, &lock)?;

    tracing::debug!(lock_id = %lock.id, cells = lock.cells.len(), "Locked cell range");
    Ok(Some(lock.id))
}

pub(crate) fn unlock_range(c: &Collections, txn: &mut TransactionMut, id: &LockId) -> bool {
    c.locks.remove(txn, id.as_str()).is_some()
}

pub(crate) fn unlock_all(c: &Collections, txn: &mut TransactionMut) -> usize {
    let count = c.locks.len(txn) as usize;
    c.locks.clear(txn);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{TableDocument, LOCAL_ORIGIN};

    fn grid(rows: usize, columns: usize) -> TableDocument {
        let document = TableDocument::new();
        let c = document.collections().clone();
        let mut txn = document.write(LOCAL_ORIGIN).unwrap();
        let column_ids: Vec<String> = (0..columns).map(|i| format!("c{}", i)).collect();
        let row_ids: Vec<String> = (0..rows).map(|i| format!("r{}", i)).collect();
        for id in &column_ids {
            c.put_column_definition(
                &mut txn,
                &crate::model::ColumnDefinition {
                    id: ColumnId::from(id.as_str()),
                    name: id.to_uppercase(),
                    width: 100.0,
                },
            );
        }
        for id in &row_ids {
            c.put_row(&mut txn, &RowId::from(id.as_str()), Vec::<(ColumnId, String)>::new());
        }
        Collections::splice_ids(&c.column_order, &mut txn, 0, column_ids);
        Collections::splice_ids(&c.row_order, &mut txn, 0, row_ids);
        drop(txn);
        document
    }

    #[test]
    fn test_range_is_normalized_and_clipped() {
        let document = grid(3, 2);
        let txn = document.read().unwrap();

        // Reversed corners, extending past the right edge
        let cells = resolve_cells(document.collections(), &txn, CellRange::new(2, 1, 5, 1));
        assert_eq!(
            cells,
            vec![
                CellRef {
                    row_id: RowId::from("r1"),
                    column_id: ColumnId::from("c1"),
                },
                CellRef {
                    row_id: RowId::from("r2"),
                    column_id: ColumnId::from("c1"),
                },
            ]
        );
    }

    #[test]
    fn test_lock_outside_table_mints_nothing() {
        let document = grid(2, 2);
        let c = document.collections().clone();
        let mut txn = document.write(LOCAL_ORIGIN).unwrap();

        let lock = lock_cell_range(&c, &mut txn, CellRange::new(5, 9, 0, 1), None).unwrap();
        assert_eq!(lock, None);
        assert_eq!(c.locks.len(&txn), 0);
    }

    #[test]
    fn test_lock_and_unlock() {
        let document = grid(2, 2);
        let c = document.collections().clone();
        let mut txn = document.write(LOCAL_ORIGIN).unwrap();

        let id = lock_cell_range(&c, &mut txn, CellRange::new(0, 1, 0, 1), Some("review".into()))
            .unwrap()
            .unwrap();
        let other = lock_cell_range(&c, &mut txn, CellRange::cell(0, 0), Some("  ".into()))
            .unwrap()
            .unwrap();

        let ranges = c.lock_ranges(&txn);
        let stored = ranges.iter().find(|range| range.id == id).unwrap();
        assert_eq!(stored.cells.len(), 4);
        assert_eq!(stored.note.as_deref(), Some("review"));
        let blank = ranges.iter().find(|range| range.id == other).unwrap();
        assert_eq!(blank.note, None);

        assert!(unlock_range(&c, &mut txn, &id));
        assert!(!unlock_range(&c, &mut txn, &id));
        assert_eq!(unlock_all(&c, &mut txn), 1);
        assert!(c.lock_ranges(&txn).is_empty());
    }
}
