//! # Table Model
//!
//! Plain Rust views of the values stored in the replicated document, plus
//! the small codec that turns substrate scalars back into cell text.

use crate::ids::{ColumnId, LockId, RowId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use yrs::{Any, Out};

/// Column registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub id: ColumnId,
    pub name: String,
    pub width: f64,
}

/// Stable address of a single cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRef {
    pub row_id: RowId,
    pub column_id: ColumnId,
}

/// A set of locked cells captured by identity, never by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRange {
    pub id: LockId,
    pub cells: Vec<CellRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Column to be inserted, with optional values for the existing rows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewColumn {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<String>>,
}

impl NewColumn {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
        }
    }

    pub fn with_data<I, S>(name: impl Into<String>, data: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            data: Some(data.into_iter().map(Into::into).collect()),
        }
    }
}

/// Row-major record keyed by header name
pub type RowRecord = BTreeMap<String, String>;

/// Sort direction for `sort_rows_by_column`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

/// Positional table as stored by the pre-identity schema
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTable {
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub column_widths: BTreeMap<String, f64>,
}

/// Text of a scalar substrate value; anything that is not a scalar reads as ""
pub(crate) fn any_to_text(value: &Any) -> String {
    match value {
        Any::String(s) => s.to_string(),
        Any::Number(n) => n.to_string(),
        Any::BigInt(n) => n.to_string(),
        Any::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

pub(crate) fn out_to_text(value: &Out) -> String {
    match value {
        Out::Any(any) => any_to_text(any),
        _ => String::new(),
    }
}

pub(crate) fn out_as_str(value: &Out) -> Option<&str> {
    match value {
        Out::Any(Any::String(s)) => Some(s.as_ref()),
        _ => None,
    }
}

pub(crate) fn out_as_f64(value: &Out) -> Option<f64> {
    match value {
        Out::Any(Any::Number(n)) => Some(*n),
        Out::Any(Any::BigInt(n)) => Some(*n as f64),
        Out::Any(Any::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Legacy JSON cell to substrate scalar; `None` for nulls and nested values
pub(crate) fn json_to_any(value: &serde_json::Value) -> Option<Any> {
    match value {
        serde_json::Value::String(s) => Some(Any::from(s.clone())),
        serde_json::Value::Number(n) => n.as_f64().map(Any::from),
        serde_json::Value::Bool(b) => Some(Any::from(*b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_text() {
        assert_eq!(any_to_text(&Any::from("Alice")), "Alice");
        assert_eq!(any_to_text(&Any::from(30.0)), "30");
        assert_eq!(any_to_text(&Any::from(2.5)), "2.5");
        assert_eq!(any_to_text(&Any::from(true)), "true");
        assert_eq!(any_to_text(&Any::Null), "");
    }

    #[test]
    fn test_lock_range_json_shape() {
        let lock = LockRange {
            id: LockId::from("lock-1"),
            cells: vec![CellRef {
                row_id: RowId::from("r1"),
                column_id: ColumnId::from("c1"),
            }],
            note: None,
        };

        let json = serde_json::to_value(&lock).unwrap();
        assert_eq!(json["cells"][0]["rowId"], "r1");
        assert_eq!(json["cells"][0]["columnId"], "c1");
        assert!(json.get("note").is_none());
    }

    #[test]
    fn test_sort_direction_aliases() {
        let asc: SortDirection = serde_json::from_str("\"asc\"").unwrap();
        let desc: SortDirection = serde_json::from_str("\"descending\"").unwrap();
        assert_eq!(asc, SortDirection::Ascending);
        assert_eq!(desc, SortDirection::Descending);
    }
}
