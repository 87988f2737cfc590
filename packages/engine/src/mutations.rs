//! # Table Mutations
//!
//! Structural operations over the identity-stable collections.
//!
//! ## Design Principles
//!
//! 1. **Index in, identity out**: callers address rows and columns by display
//!    index; every operation resolves indices to ids against the state inside
//!    its own transaction and only ever writes ids.
//! 2. **One transaction per operation**: the engine opens the transaction,
//!    these functions only fill it, so a partial operation is never visible.
//! 3. **Out of range is a no-op**: nothing here fails on a bad index.
//!
//! ## Mutation Semantics
//!
//! ### Delete
//! - Indices are deduplicated and processed in descending order
//! - Lock entries referencing the deleted ids are left in place
//!
//! ### Reorder / Sort
//! - Concurrent reorders converge to *some* valid order, not necessarily
//!   either replica's intent
//! - Repeated ids left behind by concurrent moves are normalized away after
//!   the transaction commits

use crate::document::Collections;
use crate::ids::{ColumnId, LockId, RowId};
use crate::model::{out_to_text, ColumnDefinition, NewColumn, RowRecord, SortDirection};
use crate::projection::{column_positions, display_columns, display_rows, insertion_point, row_positions};
use crate::sort::sort_keys;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use yrs::{Array, Map, TransactionMut};

/// Serializable form of every mutating engine operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TableOp {
    /// Rename the column at a display index
    EditHeader { index: usize, name: String },

    /// Insert rows keyed by header name
    InsertRows { at: usize, rows: Vec<RowRecord> },

    /// Insert rows with every cell blank
    InsertEmptyRows { at: usize, count: usize },

    DeleteRows { indices: Vec<usize> },

    /// Insert columns, optionally with one value per existing row
    InsertColumns { at: usize, columns: Vec<NewColumn> },

    DeleteColumns { indices: Vec<usize> },

    UpdateColumnWidth { name: String, width: f64 },

    UpdateCell {
        row_index: usize,
        name: String,
        value: String,
    },

    /// Move a column within the display order
    ReorderColumn { from: usize, to: usize },

    SortRowsByColumn {
        name: String,
        direction: SortDirection,
    },

    /// Lock a rectangle of cells by display coordinates (inclusive)
    LockCellRange {
        row_start: usize,
        row_end: usize,
        column_start: usize,
        column_end: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },

    UnlockRange { lock_id: LockId },

    UnlockAll,
}

impl TableOp {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            TableOp::EditHeader { .. } => "editHeader",
            TableOp::InsertRows { .. } => "insertRows",
            TableOp::InsertEmptyRows { .. } => "insertEmptyRows",
            TableOp::DeleteRows { .. } => "deleteRows",
            TableOp::InsertColumns { .. } => "insertColumns",
            TableOp::DeleteColumns { .. } => "deleteColumns",
            TableOp::UpdateColumnWidth { .. } => "updateColumnWidth",
            TableOp::UpdateCell { .. } => "updateCell",
            TableOp::ReorderColumn { .. } => "reorderColumn",
            TableOp::SortRowsByColumn { .. } => "sortRowsByColumn",
            TableOp::LockCellRange { .. } => "lockCellRange",
            TableOp::UnlockRange { .. } => "unlockRange",
            TableOp::UnlockAll => "unlockAll",
        }
    }
}

/// Result of applying a `TableOp`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    /// Engine version after the operation
    pub version: u64,

    /// Rows, columns, cells or locks touched; 0 for a no-op
    pub affected: usize,

    /// Id minted by `LockCellRange`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_id: Option<LockId>,
}

pub(crate) fn edit_header(c: &Collections, txn: &mut TransactionMut, index: usize, name: &str) -> bool {
    let Some((_, id)) = column_positions(c, txn).into_iter().nth(index) else {
        return false;
    };
    let Some(entry) = c.column_entry(txn, &id) else {
        return false;
    };
    entry.insert(txn, "name", name.to_string());
    true
}

/// Name → id for the displayed columns; the rightmost duplicate wins
fn columns_by_name(columns: &[ColumnDefinition]) -> HashMap<&str, &ColumnId> {
    columns
        .iter()
        .map(|column| (column.name.as_str(), &column.id))
        .collect()
}

pub(crate) fn insert_rows(c: &Collections, txn: &mut TransactionMut, at: usize, rows: &[RowRecord]) -> usize {
    let columns = display_columns(c, txn);
    if columns.is_empty() || rows.is_empty() {
        return 0;
    }
    let by_name = columns_by_name(&columns);

    let mut ids = Vec::with_capacity(rows.len());
    for record in rows {
        let id = RowId::generate();
        let cells = columns.iter().map(|column| {
            let owns_name = by_name.get(column.name.as_str()) == Some(&&column.id);
            let value = if owns_name {
                record.get(&column.name).cloned().unwrap_or_default()
            } else {
                String::new()
            };
            (column.id.clone(), value)
        });
        c.put_row(txn, &id, cells);
        ids.push(id.into_string());
    }

    let raw = insertion_point(&row_positions(c, txn), at);
    Collections::splice_ids(&c.row_order, txn, raw, ids)
}

pub(crate) fn insert_empty_rows(c: &Collections, txn: &mut TransactionMut, at: usize, count: usize) -> usize {
    let columns = display_columns(c, txn);
    if columns.is_empty() || count == 0 {
        return 0;
    }

    let ids: Vec<String> = (0..count)
        .map(|_| {
            let id = RowId::generate();
            c.put_row(
                txn,
                &id,
                columns.iter().map(|column| (column.id.clone(), String::new())),
            );
            id.into_string()
        })
        .collect();

    let raw = insertion_point(&row_positions(c, txn), at);
    Collections::splice_ids(&c.row_order, txn, raw, ids)
}

/// Deduplicated indices, largest first
fn descending(indices: &[usize]) -> Vec<usize> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();
    sorted
}

pub(crate) fn delete_rows(c: &Collections, txn: &mut TransactionMut, indices: &[usize]) -> usize {
    let positions = row_positions(c, txn);

    // Raw positions grow with display index, so removing from the back
    // leaves the remaining positions valid
    let mut removed = 0;
    for index in descending(indices) {
        let Some((raw, id)) = positions.get(index) else {
            continue;
        };
        c.row_order.remove_range(txn, *raw as u32, 1);
        c.rows.remove(txn, id.as_str());
        removed += 1;
    }
    removed
}

pub(crate) fn insert_columns(
    c: &Collections,
    txn: &mut TransactionMut,
    at: usize,
    columns: &[NewColumn],
    default_width: f64,
) -> usize {
    if columns.is_empty() {
        return 0;
    }
    let rows = display_rows(c, txn);

    let mut ids = Vec::with_capacity(columns.len());
    for column in columns {
        let definition = ColumnDefinition {
            id: ColumnId::generate(),
            name: column.name.clone(),
            width: default_width,
        };
        c.put_column_definition(txn, &definition);

        for (position, (_, row)) in rows.iter().enumerate() {
            let value = column
                .data
                .as_ref()
                .and_then(|data| data.get(position))
                .cloned()
                .unwrap_or_default();
            row.insert(txn, definition.id.as_str(), value);
        }
        ids.push(definition.id.into_string());
    }
    let raw = insertion_point(&column_positions(c, txn), at);
    let inserted = Collections::splice_ids(&c.column_order, txn, raw, ids);

    // A table never has columns without rows. Replicas that each add the
    // first column concurrently derive the same row, so they merge into one.
    if rows.is_empty() {
        let id = RowId::derived("first-row");
        let cells: Vec<(ColumnId, String)> = display_columns(c, txn)
            .into_iter()
            .map(|column| (column.id, String::new()))
            .collect();
        c.put_row(txn, &id, cells);
        Collections::splice_ids(&c.row_order, txn, 0, [id.into_string()]);
    }

    inserted
}

pub(crate) fn delete_columns(c: &Collections, txn: &mut TransactionMut, indices: &[usize]) -> usize {
    let row_maps = c.row_maps(txn);
    let positions = column_positions(c, txn);

    let mut removed = 0;
    for index in descending(indices) {
        let Some((raw, id)) = positions.get(index) else {
            continue;
        };
        c.column_order.remove_range(txn, *raw as u32, 1);
        c.columns.remove(txn, id.as_str());
        for row in &row_maps {
            row.remove(txn, id.as_str());
        }
        removed += 1;
    }
    removed
}

pub(crate) fn update_column_width(c: &Collections, txn: &mut TransactionMut, name: &str, width: f64) -> bool {
    let Some(id) = c.resolve_column_by_name(txn, name) else {
        return false;
    };
    let Some(entry) = c.column_entry(txn, &id) else {
        return false;
    };
    entry.insert(txn, "width", width);
    true
}

pub(crate) fn update_cell(
    c: &Collections,
    txn: &mut TransactionMut,
    row_index: usize,
    name: &str,
    value: &str,
) -> bool {
    let Some(column) = c.resolve_column_by_name(txn, name) else {
        return false;
    };
    let row = row_positions(c, txn)
        .into_iter()
        .nth(row_index)
        .and_then(|(_, id)| c.row_map(txn, &id));
    let Some(row) = row else {
        return false;
    };
    row.insert(txn, column.into_string(), value.to_string());
    true
}

pub(crate) fn reorder_column(c: &Collections, txn: &mut TransactionMut, from: usize, to: usize) -> bool {
    let positions = column_positions(c, txn);
    let len = positions.len();
    if from == to || from >= len || to >= len {
        return false;
    }
    let (raw_from, id) = positions[from].clone();

    // Displayed entries once `from` is taken out, shifted to post-removal positions
    let rest: Vec<(usize, ColumnId)> = positions
        .into_iter()
        .filter(|(raw, _)| *raw != raw_from)
        .map(|(raw, id)| (if raw > raw_from { raw - 1 } else { raw }, id))
        .collect();
    let raw_to = insertion_point(&rest, to);

    c.column_order.remove_range(txn, raw_from as u32, 1);
    c.column_order.insert(txn, raw_to as u32, id.into_string());
    true
}

/// Rewrite the row order sorted by one column; returns how many rows moved
pub(crate) fn sort_rows_by_column(
    c: &Collections,
    txn: &mut TransactionMut,
    name: &str,
    direction: SortDirection,
) -> usize {
    let Some(column) = c.resolve_column_by_name(txn, name) else {
        return 0;
    };

    let entries: Vec<(RowId, String)> = display_rows(c, txn)
        .into_iter()
        .map(|(id, row)| {
            let value = row
                .get(txn, column.as_str())
                .map(|value| out_to_text(&value))
                .unwrap_or_default();
            (id, value)
        })
        .collect();
    let before: Vec<RowId> = entries.iter().map(|(id, _)| id.clone()).collect();

    let (kind, sorted) = sort_keys(entries, direction);
    let moved = sorted
        .iter()
        .zip(&before)
        .filter(|(after, before)| after != before)
        .count();
    if moved == 0 {
        return 0;
    }

    let len = c.row_order.len(txn);
    c.row_order.remove_range(txn, 0, len);
    Collections::splice_ids(&c.row_order, txn, 0, sorted.into_iter().map(RowId::into_string));

    tracing::debug!(column = %column, ?kind, ?direction, moved, "Sorted rows");
    moved
}
