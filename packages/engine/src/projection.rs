//! # Change Projection
//!
//! Rebuilds the UI-facing read models from the five source collections.
//!
//! ```text
//! columns ─┐
//! columnOrder ─┤                        ┌─> TableProjection (rows, headers, widths)
//! rows ─┼─> observe_deep ─> refresh ─┤
//! rowOrder ─┤                        └─> LockedCells ("row-col" → note)
//! lockedRanges ─┘
//! ```
//!
//! Projections are recomputed in full on every change, local or remote, and
//! published through `tokio::sync::watch` channels so any number of
//! observers can subscribe and unsubscribe independently. Observers are only
//! notified when a projection actually changed.

use crate::document::Collections;
use crate::ids::{ColumnId, LockId, RowId};
use crate::migration::{column_order_needs_repair, orders_need_normalizing};
use crate::model::{out_to_text, ColumnDefinition, RowRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use yrs::{DeepObservable, Map, MapRef, ReadTxn, Subscription};

/// Row-major view of the table plus header and width read models
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProjection {
    pub headers: Vec<String>,
    pub rows: Vec<RowRecord>,
    pub column_widths: BTreeMap<String, f64>,
}

/// Locked cells by current display position
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LockedCells {
    /// `"rowIndex-colIndex"` → note of the covering lock
    pub cells: BTreeMap<String, Option<String>>,
    /// Locks with at least one cell whose row or column no longer exists
    pub dangling: Vec<LockId>,
}

impl LockedCells {
    pub fn key(row: usize, column: usize) -> String {
        format!("{}-{}", row, column)
    }

    pub fn is_locked(&self, row: usize, column: usize) -> bool {
        self.cells.contains_key(&Self::key(row, column))
    }

    pub fn note(&self, row: usize, column: usize) -> Option<&str> {
        self.cells
            .get(&Self::key(row, column))
            .and_then(|note| note.as_deref())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Order entries that are displayed, with their raw position in the sequence.
///
/// Only the first occurrence of an id counts, and ids without a backing entry
/// are skipped. Display index `i` is element `i` of the result.
fn live_positions<Id, F>(order: Vec<Id>, live: F) -> Vec<(usize, Id)>
where
    Id: Clone + Eq + std::hash::Hash,
    F: Fn(&Id) -> bool,
{
    let mut seen = HashSet::new();
    order
        .into_iter()
        .enumerate()
        .filter(|(_, id)| seen.insert(id.clone()))
        .filter(|(_, id)| live(id))
        .collect()
}

pub(crate) fn column_positions<T: ReadTxn>(c: &Collections, txn: &T) -> Vec<(usize, ColumnId)> {
    live_positions(c.column_order(txn), |id| c.column_definition(txn, id).is_some())
}

pub(crate) fn row_positions<T: ReadTxn>(c: &Collections, txn: &T) -> Vec<(usize, RowId)> {
    live_positions(c.row_order(txn), |id| c.row_map(txn, id).is_some())
}

/// Raw sequence index that places a new entry at display index `at`
pub(crate) fn insertion_point<Id>(positions: &[(usize, Id)], at: usize) -> usize {
    match positions.get(at) {
        Some((raw, _)) => *raw,
        None => positions.last().map_or(0, |(raw, _)| raw + 1),
    }
}

/// Displayed columns in display order
pub(crate) fn display_columns<T: ReadTxn>(c: &Collections, txn: &T) -> Vec<ColumnDefinition> {
    column_positions(c, txn)
        .into_iter()
        .filter_map(|(_, id)| c.column_definition(txn, &id))
        .collect()
}

/// Displayed rows in display order
pub(crate) fn display_rows<T: ReadTxn>(c: &Collections, txn: &T) -> Vec<(RowId, MapRef)> {
    row_positions(c, txn)
        .into_iter()
        .filter_map(|(_, id)| c.row_map(txn, &id).map(|row| (id, row)))
        .collect()
}

pub fn project_table<T: ReadTxn>(c: &Collections, txn: &T) -> TableProjection {
    let columns = display_columns(c, txn);

    let headers = columns.iter().map(|column| column.name.clone()).collect();

    // Duplicate names collide; the rightmost column wins
    let column_widths = columns
        .iter()
        .map(|column| (column.name.clone(), column.width))
        .collect();

    let rows = display_rows(c, txn)
        .into_iter()
        .map(|(_, row)| {
            columns
                .iter()
                .map(|column| {
                    let value = row
                        .get(txn, column.id.as_str())
                        .map(|value| out_to_text(&value))
                        .unwrap_or_default();
                    (column.name.clone(), value)
                })
                .collect::<RowRecord>()
        })
        .collect();

    TableProjection {
        headers,
        rows,
        column_widths,
    }
}

pub fn project_locks<T: ReadTxn>(c: &Collections, txn: &T) -> LockedCells {
    let row_index: HashMap<RowId, usize> = display_rows(c, txn)
        .into_iter()
        .enumerate()
        .map(|(index, (id, _))| (id, index))
        .collect();
    let column_index: HashMap<ColumnId, usize> = display_columns(c, txn)
        .into_iter()
        .enumerate()
        .map(|(index, column)| (column.id, index))
        .collect();

    let mut locked = LockedCells::default();
    for lock in c.lock_ranges(txn) {
        let mut dropped = false;
        for cell in &lock.cells {
            match (row_index.get(&cell.row_id), column_index.get(&cell.column_id)) {
                (Some(row), Some(column)) => {
                    let note = locked.cells.entry(LockedCells::key(*row, *column)).or_insert(None);
                    if note.is_none() {
                        *note = lock.note.clone();
                    }
                }
                _ => dropped = true,
            }
        }
        if dropped {
            locked.dangling.push(lock.id.clone());
        }
    }
    locked
}

/// Publishes projections to subscribers and flags structural repairs.
///
/// Repairs cannot run inside an observer (the triggering transaction is
/// still open), so they are requested here and performed by the engine once
/// the transaction has committed.
pub struct ProjectionHub {
    collections: Collections,
    table: watch::Sender<TableProjection>,
    locks: watch::Sender<LockedCells>,
    repair_requested: AtomicBool,
}

impl ProjectionHub {
    pub fn new<T: ReadTxn>(collections: Collections, txn: &T) -> Arc<Self> {
        let (table, _) = watch::channel(project_table(&collections, txn));
        let (locks, _) = watch::channel(project_locks(&collections, txn));
        let hub = Arc::new(Self {
            collections,
            table,
            locks,
            repair_requested: AtomicBool::new(false),
        });
        hub.check_structure(txn);
        hub
    }

    /// Recompute every projection from `txn`'s view of the document
    pub fn refresh<T: ReadTxn>(&self, txn: &T) {
        let table = project_table(&self.collections, txn);
        let locks = project_locks(&self.collections, txn);

        self.check_structure(txn);

        let table_changed = self.table.send_if_modified(|current| {
            if *current == table {
                false
            } else {
                *current = table;
                true
            }
        });
        let locks_changed = self.locks.send_if_modified(|current| {
            if *current == locks {
                false
            } else {
                *current = locks;
                true
            }
        });

        if table_changed || locks_changed {
            tracing::debug!(table_changed, locks_changed, "Projections refreshed");
        }
    }

    fn check_structure<T: ReadTxn>(&self, txn: &T) {
        if column_order_needs_repair(&self.collections, txn)
            || orders_need_normalizing(&self.collections, txn)
        {
            self.repair_requested.store(true, Ordering::SeqCst);
        }
    }

    /// Consume a pending repair request
    pub(crate) fn take_repair_request(&self) -> bool {
        self.repair_requested.swap(false, Ordering::SeqCst)
    }

    /// Hook `refresh` to changes of all five collections
    pub(crate) fn observe(hub: &Arc<Self>) -> Vec<Subscription> {
        let c = &hub.collections;
        let mut subscriptions = Vec::with_capacity(5);

        for map in [&c.columns, &c.rows, &c.locks] {
            let hub = Arc::clone(hub);
            subscriptions.push(map.observe_deep(move |txn, _events| hub.refresh(txn)));
        }
        for array in [&c.column_order, &c.row_order] {
            let hub = Arc::clone(hub);
            subscriptions.push(array.observe_deep(move |txn, _events| hub.refresh(txn)));
        }

        subscriptions
    }

    pub fn table(&self) -> TableProjection {
        self.table.borrow().clone()
    }

    pub fn locked_cells(&self) -> LockedCells {
        self.locks.borrow().clone()
    }

    pub fn subscribe_table(&self) -> watch::Receiver<TableProjection> {
        self.table.subscribe()
    }

    pub fn subscribe_locks(&self) -> watch::Receiver<LockedCells> {
        self.locks.subscribe()
    }
}
