//! # Gridweave Engine
//!
//! Collaborative table engine on top of a `yrs` CRDT document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ document: TableDocument (yrs Doc handle)    │
//! │  - columns / columnOrder                    │
//! │  - rows / rowOrder                          │
//! │  - lockedRanges                             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ engine: TableEngine                         │
//! │  - Migrate the positional schema at open    │
//! │  - Structural mutations, one txn each       │
//! │  - Identity-captured cell locks             │
//! │  - Undo/redo of local edits                 │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ projection: watch channels                  │
//! │  - Row-major table, headers, widths         │
//! │  - Locked cells by display position         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Ids are the source of truth**: display indices are derived views
//! 2. **CRDT for convergence**: we define what each operation means
//! 3. **Projections are rebuilt, never patched**
//! 4. **The document is injected**: engines never share hidden state
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gridweave_engine::{EngineConfig, NewColumn, TableEngine};
//!
//! let mut engine = TableEngine::new(EngineConfig::default())?;
//! engine.insert_columns(0, &[NewColumn::named("Name"), NewColumn::named("Age")])?;
//! engine.update_cell(0, "Name", "Alice")?;
//!
//! let mut table = engine.subscribe_table();
//! engine.sort_rows_by_column("Age", SortDirection::Ascending)?;
//! println!("{:?}", table.borrow_and_update().rows);
//!
//! // Ship local state to another replica
//! let update = engine.encode_delta(&other.state_vector()?)?;
//! other.apply_update(&update)?;
//! ```

mod config;
mod document;
mod engine;
mod errors;
mod ids;
mod locks;
mod migration;
mod model;
mod mutations;
mod projection;
mod sort;
mod undo_stack;

pub use config::{EngineConfig, SCHEMA_VERSION};
pub use document::{
    Collections, TableDocument, LOCAL_ORIGIN, MIGRATION_ORIGIN, REMOTE_ORIGIN,
};
pub use engine::TableEngine;
pub use errors::{TableError, TableResult};
pub use ids::{ColumnId, LockId, RowId};
pub use locks::CellRange;
pub use migration::{migrate, normalize_orders, repair_column_order, MigrationOutcome};
pub use model::{
    CellRef, ColumnDefinition, LegacyTable, LockRange, NewColumn, RowRecord, SortDirection,
};
pub use mutations::{MutationResult, TableOp};
pub use projection::{project_locks, project_table, LockedCells, ProjectionHub, TableProjection};
pub use sort::{classify, parse_number, SortKind};
pub use undo_stack::UndoStack;
