//! # Table Document Handle
//!
//! Owns the replicated `yrs` document and the root-level shared types the
//! engine works with. The handle is injected into the engine at
//! construction, so every engine instance works on exactly the document it
//! was given.
//!
//! ## Layout
//!
//! ```text
//! columns        Map<ColumnId, Map{id, name, width}>
//! columnOrder    Array<ColumnId>
//! rows           Map<RowId, Map<ColumnId, value>>
//! rowOrder       Array<RowId>
//! lockedRanges   Map<LockId, json(LockRange)>
//! meta           Map{schemaVersion}
//!
//! tableHeaders   Array<header>              (legacy)
//! tableData      Array<Map<header, value>>  (legacy)
//! colWidths      Map<header, width>         (legacy)
//! ```

use crate::errors::{TableError, TableResult};
use crate::ids::{ColumnId, LockId, RowId};
use crate::model::{out_as_f64, out_as_str, out_to_text, ColumnDefinition, LockRange};
use std::collections::HashMap;
use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{
    Array, ArrayRef, Doc, Map, MapPrelim, MapRef, Out, ReadTxn, StateVector, Transact,
    Transaction, TransactionMut, Update,
};

pub const COLUMNS: &str = "columns";
pub const COLUMN_ORDER: &str = "columnOrder";
pub const ROWS: &str = "rows";
pub const ROW_ORDER: &str = "rowOrder";
pub const LOCKED_RANGES: &str = "lockedRanges";
pub const META: &str = "meta";

pub const LEGACY_HEADERS: &str = "tableHeaders";
pub const LEGACY_ROWS: &str = "tableData";
pub const LEGACY_WIDTHS: &str = "colWidths";

pub(crate) const SCHEMA_VERSION_KEY: &str = "schemaVersion";

/// Transaction origin of edits made through the engine on this replica
pub const LOCAL_ORIGIN: &str = "gridweave:local";
/// Transaction origin of updates received from other replicas
pub const REMOTE_ORIGIN: &str = "gridweave:remote";
/// Transaction origin of schema migration and structural repair
pub const MIGRATION_ORIGIN: &str = "gridweave:migration";

/// Root shared types of a table document
#[derive(Clone)]
pub struct Collections {
    pub(crate) columns: MapRef,
    pub(crate) column_order: ArrayRef,
    pub(crate) rows: MapRef,
    pub(crate) row_order: ArrayRef,
    pub(crate) locks: MapRef,
    pub(crate) meta: MapRef,
    pub(crate) legacy_headers: ArrayRef,
    pub(crate) legacy_rows: ArrayRef,
    pub(crate) legacy_widths: MapRef,
}

impl Collections {
    fn attach(doc: &Doc) -> Self {
        Self {
            columns: doc.get_or_insert_map(COLUMNS),
            column_order: doc.get_or_insert_array(COLUMN_ORDER),
            rows: doc.get_or_insert_map(ROWS),
            row_order: doc.get_or_insert_array(ROW_ORDER),
            locks: doc.get_or_insert_map(LOCKED_RANGES),
            meta: doc.get_or_insert_map(META),
            legacy_headers: doc.get_or_insert_array(LEGACY_HEADERS),
            legacy_rows: doc.get_or_insert_array(LEGACY_ROWS),
            legacy_widths: doc.get_or_insert_map(LEGACY_WIDTHS),
        }
    }

    // ---- reads ---------------------------------------------------------

    pub fn column_order<T: ReadTxn>(&self, txn: &T) -> Vec<ColumnId> {
        self.column_order
            .iter(txn)
            .filter_map(|value| out_as_str(&value).map(ColumnId::from))
            .collect()
    }

    pub fn row_order<T: ReadTxn>(&self, txn: &T) -> Vec<RowId> {
        self.row_order
            .iter(txn)
            .filter_map(|value| out_as_str(&value).map(RowId::from))
            .collect()
    }

    pub fn column_at<T: ReadTxn>(&self, txn: &T, index: usize) -> Option<ColumnId> {
        let index = u32::try_from(index).ok()?;
        self.column_order
            .get(txn, index)
            .and_then(|value| out_as_str(&value).map(ColumnId::from))
    }

    pub fn row_at<T: ReadTxn>(&self, txn: &T, index: usize) -> Option<RowId> {
        let index = u32::try_from(index).ok()?;
        self.row_order
            .get(txn, index)
            .and_then(|value| out_as_str(&value).map(RowId::from))
    }

    pub fn column_count<T: ReadTxn>(&self, txn: &T) -> usize {
        self.column_order.len(txn) as usize
    }

    pub fn row_count<T: ReadTxn>(&self, txn: &T) -> usize {
        self.row_order.len(txn) as usize
    }

    pub fn column_definition<T: ReadTxn>(&self, txn: &T, id: &ColumnId) -> Option<ColumnDefinition> {
        self.column_entry(txn, id)
            .map(|entry| read_definition(txn, id, &entry))
    }

    /// Every registry entry, including ones missing from the column order
    pub fn column_definitions<T: ReadTxn>(&self, txn: &T) -> HashMap<ColumnId, ColumnDefinition> {
        let mut definitions = HashMap::new();
        for (key, value) in self.columns.iter(txn) {
            let id = ColumnId::from(key);
            match value {
                Out::YMap(entry) => {
                    let definition = read_definition(txn, &id, &entry);
                    definitions.insert(id, definition);
                }
                _ => tracing::warn!(column_id = %id, "Column registry entry is not a map, skipping"),
            }
        }
        definitions
    }

    pub fn registry_len<T: ReadTxn>(&self, txn: &T) -> usize {
        self.columns.len(txn) as usize
    }

    pub fn registry_ids<T: ReadTxn>(&self, txn: &T) -> Vec<ColumnId> {
        self.columns.keys(txn).map(ColumnId::from).collect()
    }

    pub fn row_map<T: ReadTxn>(&self, txn: &T, id: &RowId) -> Option<MapRef> {
        match self.rows.get(txn, id.as_str()) {
            Some(Out::YMap(row)) => Some(row),
            _ => None,
        }
    }

    pub fn row_store_len<T: ReadTxn>(&self, txn: &T) -> usize {
        self.rows.len(txn) as usize
    }

    /// Cell text; a missing row, a missing key and "" all read as ""
    pub fn cell_value<T: ReadTxn>(&self, txn: &T, row: &RowId, column: &ColumnId) -> String {
        self.row_map(txn, row)
            .and_then(|map| map.get(txn, column.as_str()))
            .map(|value| out_to_text(&value))
            .unwrap_or_default()
    }

    /// Column carrying `name` by linear scan of the displayed columns.
    ///
    /// Under duplicate names the rightmost column wins, matching the column
    /// whose value the row-major projection shows under that name.
    pub fn resolve_column_by_name<T: ReadTxn>(&self, txn: &T, name: &str) -> Option<ColumnId> {
        self.column_order(txn).into_iter().rev().find(|id| {
            self.column_definition(txn, id)
                .map(|definition| definition.name == name)
                .unwrap_or(false)
        })
    }

    pub(crate) fn column_entry<T: ReadTxn>(&self, txn: &T, id: &ColumnId) -> Option<MapRef> {
        match self.columns.get(txn, id.as_str()) {
            Some(Out::YMap(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Every row map in the store, including rows missing from the row order
    pub(crate) fn row_maps<T: ReadTxn>(&self, txn: &T) -> Vec<MapRef> {
        self.rows
            .iter(txn)
            .filter_map(|(_, value)| match value {
                Out::YMap(row) => Some(row),
                _ => None,
            })
            .collect()
    }

    /// Lock entries in `LockId` order; undecodable entries are skipped
    pub fn lock_ranges<T: ReadTxn>(&self, txn: &T) -> Vec<LockRange> {
        let mut ranges: Vec<LockRange> = self
            .locks
            .iter(txn)
            .filter_map(|(key, value)| match decode_lock(key, &value) {
                Ok(range) => Some(range),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping lock entry");
                    None
                }
            })
            .collect();
        ranges.sort_by(|a, b| a.id.cmp(&b.id));
        ranges
    }

    pub fn schema_version<T: ReadTxn>(&self, txn: &T) -> Option<u32> {
        self.meta
            .get(txn, SCHEMA_VERSION_KEY)
            .and_then(|value| out_as_f64(&value))
            .map(|version| version as u32)
    }

    // ---- writes --------------------------------------------------------

    pub(crate) fn put_column_definition(&self, txn: &mut TransactionMut, definition: &ColumnDefinition) {
        let entry: MapRef = self
            .columns
            .insert(txn, definition.id.as_str(), MapPrelim::default());
        entry.insert(txn, "id", definition.id.to_string());
        entry.insert(txn, "name", definition.name.clone());
        entry.insert(txn, "width", definition.width);
    }

    pub(crate) fn put_row<I>(&self, txn: &mut TransactionMut, id: &RowId, cells: I)
    where
        I: IntoIterator<Item = (ColumnId, String)>,
    {
        let row: MapRef = self.rows.insert(txn, id.as_str(), MapPrelim::default());
        for (column, value) in cells {
            row.insert(txn, column.into_string(), value);
        }
    }

    pub(crate) fn put_lock(&self, txn: &mut TransactionMut, range: &LockRange) -> TableResult<()> {
        let encoded = serde_json::to_string(range)?;
        self.locks.insert(txn, range.id.as_str(), encoded);
        Ok(())
    }

    /// Splice ids into an order sequence, clamping the position to its length
    pub(crate) fn splice_ids<I, S>(order: &ArrayRef, txn: &mut TransactionMut, at: usize, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let len = order.len(txn);
        let mut position = u32::try_from(at).unwrap_or(u32::MAX).min(len);
        let start = position;
        for id in ids {
            order.insert(txn, position, id.into());
            position += 1;
        }
        (position - start) as usize
    }

    pub(crate) fn set_schema_version(&self, txn: &mut TransactionMut, version: u32) {
        self.meta.insert(txn, SCHEMA_VERSION_KEY, f64::from(version));
    }

    pub(crate) fn clear_identity_collections(&self, txn: &mut TransactionMut) {
        self.columns.clear(txn);
        self.rows.clear(txn);
        self.locks.clear(txn);
        let columns = self.column_order.len(txn);
        if columns > 0 {
            self.column_order.remove_range(txn, 0, columns);
        }
        let rows = self.row_order.len(txn);
        if rows > 0 {
            self.row_order.remove_range(txn, 0, rows);
        }
    }
}

fn read_definition<T: ReadTxn>(txn: &T, id: &ColumnId, entry: &MapRef) -> ColumnDefinition {
    let name = entry
        .get(txn, "name")
        .map(|value| out_to_text(&value))
        .unwrap_or_default();
    let width = entry
        .get(txn, "width")
        .and_then(|value| out_as_f64(&value))
        .unwrap_or(0.0);
    ColumnDefinition {
        id: id.clone(),
        name,
        width,
    }
}

fn decode_lock(key: &str, value: &Out) -> TableResult<LockRange> {
    let raw = out_as_str(value).ok_or_else(|| TableError::InvalidLock {
        lock_id: key.to_string(),
        reason: "entry is not a string".to_string(),
    })?;
    let mut range: LockRange = serde_json::from_str(raw).map_err(|e| TableError::InvalidLock {
        lock_id: key.to_string(),
        reason: e.to_string(),
    })?;
    // The registry key is authoritative
    range.id = LockId::from(key);
    Ok(range)
}

/// Replicated table document (the CRDT substrate handle)
pub struct TableDocument {
    doc: Doc,
    collections: Collections,
}

impl TableDocument {
    /// Create an empty document with a random client id
    pub fn new() -> Self {
        Self::from_doc(Doc::new())
    }

    /// Create an empty document with a fixed client id
    pub fn with_client_id(client_id: u64) -> Self {
        Self::from_doc(Doc::with_client_id(client_id))
    }

    /// Wrap an existing `yrs` document
    pub fn from_doc(doc: Doc) -> Self {
        let collections = Collections::attach(&doc);
        Self { doc, collections }
    }

    /// Rebuild a document from an encoded full state
    pub fn from_update(update: &[u8], client_id: Option<u64>) -> TableResult<Self> {
        let document = match client_id {
            Some(id) => Self::with_client_id(id),
            None => Self::new(),
        };
        document.apply_update(update)?;
        Ok(document)
    }

    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn client_id(&self) -> u64 {
        self.doc.client_id()
    }

    pub(crate) fn read(&self) -> TableResult<Transaction<'_>> {
        self.doc
            .try_transact()
            .map_err(|e| TableError::Transaction(e.to_string()))
    }

    pub(crate) fn write(&self, origin: &str) -> TableResult<TransactionMut<'_>> {
        self.doc
            .try_transact_mut_with(origin)
            .map_err(|e| TableError::Transaction(e.to_string()))
    }

    // ---- replica sync --------------------------------------------------

    /// Current state vector (for delta sync)
    pub fn state_vector(&self) -> TableResult<Vec<u8>> {
        let txn = self.read()?;
        Ok(txn.state_vector().encode_v1())
    }

    /// Encode the full document state
    pub fn encode_state(&self) -> TableResult<Vec<u8>> {
        let txn = self.read()?;
        Ok(txn.encode_state_as_update_v1(&StateVector::default()))
    }

    /// Encode everything the holder of `state_vector` has not seen yet
    pub fn encode_delta(&self, state_vector: &[u8]) -> TableResult<Vec<u8>> {
        let sv = StateVector::decode_v1(state_vector).map_err(|e| TableError::Decode(e.to_string()))?;
        let txn = self.read()?;
        Ok(txn.encode_state_as_update_v1(&sv))
    }

    /// Merge an update produced by another replica
    pub(crate) fn apply_update(&self, update: &[u8]) -> TableResult<()> {
        let update = Update::decode_v1(update).map_err(|e| TableError::Decode(e.to_string()))?;
        let mut txn = self.write(REMOTE_ORIGIN)?;
        txn.apply_update(update)
            .map_err(|e| TableError::Apply(e.to_string()))?;
        Ok(())
    }
}

impl Default for TableDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TableDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableDocument")
            .field("client_id", &self.doc.client_id())
            .finish()
    }
}
