//! # Schema Migration
//!
//! Upgrades the positional schema (header list + rows keyed by header name +
//! header → width map) into the identity-stable collections, once, at
//! document open.
//!
//! Legacy collections are left untouched after migrating so replicas that
//! still run the old schema keep reading a consistent table until the
//! document is explicitly purged.

use crate::config::{EngineConfig, SCHEMA_VERSION};
use crate::document::{Collections, TableDocument, MIGRATION_ORIGIN};
use crate::errors::TableResult;
use crate::ids::{ColumnId, RowId};
use crate::model::{
    any_to_text, json_to_any, out_as_f64, out_as_str, out_to_text, ColumnDefinition, LegacyTable,
};
use std::collections::{HashMap, HashSet};
use yrs::{Any, Array, ArrayRef, Map, MapPrelim, MapRef, Out, ReadTxn};

/// What `migrate` did to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The document already carries the current schema version
    AlreadyCurrent,
    /// Nothing to convert; only the version stamp was written
    Stamped,
    /// Legacy data was converted
    Migrated { columns: usize, rows: usize },
}

/// Detect and upgrade a legacy table.
///
/// With `force`, the identity-stable collections (locks included) are
/// cleared and the legacy data is replayed regardless of the version stamp.
pub fn migrate(
    document: &TableDocument,
    config: &EngineConfig,
    force: bool,
) -> TableResult<MigrationOutcome> {
    let c = document.collections();
    let mut txn = document.write(MIGRATION_ORIGIN)?;

    let current = c
        .schema_version(&txn)
        .map(|version| version >= SCHEMA_VERSION)
        .unwrap_or(false);
    if current && !force {
        return Ok(MigrationOutcome::AlreadyCurrent);
    }

    let headers = legacy_headers(c, &txn);
    let has_legacy = !headers.is_empty() || c.legacy_rows.len(&txn) > 0;

    if force {
        tracing::info!("Forced re-migration, clearing identity-stable collections");
        c.clear_identity_collections(&mut txn);
    } else if has_identity_data(c, &txn) {
        c.set_schema_version(&mut txn, SCHEMA_VERSION);
        return Ok(MigrationOutcome::Stamped);
    }

    if !has_legacy {
        c.set_schema_version(&mut txn, SCHEMA_VERSION);
        return Ok(MigrationOutcome::Stamped);
    }

    let legacy_rows = legacy_rows(c, &txn);

    // Replicas migrating the same legacy table concurrently derive the same ids
    let mut columns: Vec<(String, ColumnId)> = Vec::with_capacity(headers.len());
    for (position, header) in headers.iter().enumerate() {
        let width = c
            .legacy_widths
            .get(&txn, header.as_str())
            .and_then(|value| out_as_f64(&value))
            .unwrap_or(config.default_column_width);
        let definition = ColumnDefinition {
            id: ColumnId::derived(&format!("legacy-column:{}:{}", position, header)),
            name: header.clone(),
            width,
        };
        c.put_column_definition(&mut txn, &definition);
        columns.push((header.clone(), definition.id));
    }
    Collections::splice_ids(
        &c.column_order,
        &mut txn,
        0,
        columns.iter().map(|(_, id)| id.to_string()),
    );

    let mut row_ids = Vec::with_capacity(legacy_rows.len());
    for (position, legacy) in legacy_rows.iter().enumerate() {
        let id = RowId::derived(&format!("legacy-row:{}", position));
        let cells = columns.iter().map(|(header, column)| {
            let value = legacy.get(header).cloned().unwrap_or_default();
            (column.clone(), value)
        });
        c.put_row(&mut txn, &id, cells);
        row_ids.push(id.into_string());
    }
    Collections::splice_ids(&c.row_order, &mut txn, 0, row_ids);

    c.set_schema_version(&mut txn, SCHEMA_VERSION);

    tracing::info!(
        columns = columns.len(),
        rows = legacy_rows.len(),
        "Migrated legacy table to identity-stable schema"
    );

    Ok(MigrationOutcome::Migrated {
        columns: columns.len(),
        rows: legacy_rows.len(),
    })
}

/// Column order is empty while columns and rows exist
pub(crate) fn column_order_needs_repair<T: ReadTxn>(c: &Collections, txn: &T) -> bool {
    c.column_count(txn) == 0
        && c.registry_len(txn) > 0
        && (c.row_count(txn) > 0 || c.row_store_len(txn) > 0)
}

/// Rebuild an empty column order from the registry keys (sorted).
///
/// The condition is re-checked inside the transaction, so a replica that
/// already received another replica's repair does nothing.
pub fn repair_column_order(document: &TableDocument) -> TableResult<bool> {
    let c = document.collections();
    let mut txn = document.write(MIGRATION_ORIGIN)?;

    if !column_order_needs_repair(c, &txn) {
        return Ok(false);
    }

    let mut ids = c.registry_ids(&txn);
    ids.sort();
    let restored = Collections::splice_ids(
        &c.column_order,
        &mut txn,
        0,
        ids.into_iter().map(ColumnId::into_string),
    );

    tracing::info!(columns = restored, "Restored empty column order from registry");
    Ok(true)
}

/// Positions in `order` holding a repeated id or an id `exists` rejects
fn stale_positions<T, F>(order: &ArrayRef, txn: &T, exists: F) -> Vec<u32>
where
    T: ReadTxn,
    F: Fn(&str) -> bool,
{
    let mut seen = HashSet::new();
    order
        .iter(txn)
        .enumerate()
        .filter(|(_, value)| match out_as_str(value) {
            Some(id) => !exists(id) || !seen.insert(id.to_string()),
            None => true,
        })
        .map(|(index, _)| index as u32)
        .collect()
}

fn stale_order_positions<T: ReadTxn>(c: &Collections, txn: &T) -> (Vec<u32>, Vec<u32>) {
    let columns: HashSet<String> = c.columns.keys(txn).map(str::to_string).collect();
    let rows: HashSet<String> = c.rows.keys(txn).map(str::to_string).collect();
    (
        stale_positions(&c.column_order, txn, |id| columns.contains(id)),
        stale_positions(&c.row_order, txn, |id| rows.contains(id)),
    )
}

/// An order sequence repeats an id or names one without an entry.
///
/// Both arise from concurrent structural edits: two replicas moving the
/// same column, or one deleting a row while another sorts.
pub(crate) fn orders_need_normalizing<T: ReadTxn>(c: &Collections, txn: &T) -> bool {
    let (columns, rows) = stale_order_positions(c, txn);
    !columns.is_empty() || !rows.is_empty()
}

/// Drop repeated and dangling ids from both order sequences.
///
/// The first occurrence of an id is kept. Replicas normalizing concurrently
/// always agree on the earliest occurrence in the merged order, so at least
/// one copy of every live id survives.
pub fn normalize_orders(document: &TableDocument) -> TableResult<usize> {
    let c = document.collections();
    let mut txn = document.write(MIGRATION_ORIGIN)?;

    let (columns, rows) = stale_order_positions(c, &txn);
    for index in columns.iter().rev() {
        c.column_order.remove_range(&mut txn, *index, 1);
    }
    for index in rows.iter().rev() {
        c.row_order.remove_range(&mut txn, *index, 1);
    }

    let removed = columns.len() + rows.len();
    if removed > 0 {
        tracing::info!(
            columns = columns.len(),
            rows = rows.len(),
            "Removed repeated or dangling ids from order sequences"
        );
    }
    Ok(removed)
}

fn has_identity_data<T: ReadTxn>(c: &Collections, txn: &T) -> bool {
    c.column_count(txn) > 0 || c.registry_len(txn) > 0 || c.row_count(txn) > 0
}

fn legacy_headers<T: ReadTxn>(c: &Collections, txn: &T) -> Vec<String> {
    c.legacy_headers
        .iter(txn)
        .map(|value| out_to_text(&value))
        .collect()
}

fn legacy_rows<T: ReadTxn>(c: &Collections, txn: &T) -> Vec<HashMap<String, String>> {
    c.legacy_rows
        .iter(txn)
        .map(|value| match value {
            Out::YMap(row) => row
                .iter(txn)
                .map(|(key, value)| (key.to_string(), out_to_text(&value)))
                .collect::<HashMap<String, String>>(),
            Out::Any(Any::Map(row)) => row
                .iter()
                .map(|(key, value)| (key.clone(), any_to_text(value)))
                .collect::<HashMap<String, String>>(),
            _ => {
                tracing::warn!("Legacy row is not a map, treating it as empty");
                HashMap::new()
            }
        })
        .collect()
}

impl TableDocument {
    /// Write a positional table into the legacy collections
    pub fn write_legacy_table(&self, table: &LegacyTable) -> TableResult<()> {
        let c = self.collections();
        let mut txn = self.write(MIGRATION_ORIGIN)?;

        for header in &table.headers {
            c.legacy_headers.push_back(&mut txn, header.clone());
        }
        for legacy in &table.rows {
            let row: MapRef = c.legacy_rows.push_back(&mut txn, MapPrelim::default());
            for (key, value) in legacy {
                if let Some(any) = json_to_any(value) {
                    row.insert(&mut txn, key.as_str(), any);
                }
            }
        }
        for (header, width) in &table.column_widths {
            c.legacy_widths.insert(&mut txn, header.as_str(), *width);
        }
        Ok(())
    }

    /// True when any legacy collection holds data
    pub fn has_legacy_data(&self) -> TableResult<bool> {
        let c = self.collections();
        let txn = self.read()?;
        Ok(c.legacy_headers.len(&txn) > 0
            || c.legacy_rows.len(&txn) > 0
            || c.legacy_widths.len(&txn) > 0)
    }

    /// Remove the legacy collections' contents; reports whether any existed
    pub fn purge_legacy(&self) -> TableResult<bool> {
        let c = self.collections();
        let mut txn = self.write(MIGRATION_ORIGIN)?;

        let headers = c.legacy_headers.len(&txn);
        let rows = c.legacy_rows.len(&txn);
        let widths = c.legacy_widths.len(&txn);
        if headers > 0 {
            c.legacy_headers.remove_range(&mut txn, 0, headers);
        }
        if rows > 0 {
            c.legacy_rows.remove_range(&mut txn, 0, rows);
        }
        c.legacy_widths.clear(&mut txn);

        Ok(headers + rows + widths > 0)
    }
}
