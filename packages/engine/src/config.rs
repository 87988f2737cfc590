use serde::{Deserialize, Serialize};

/// Schema version stamped into the document metadata once the
/// identity-stable collections are authoritative.
pub const SCHEMA_VERSION: u32 = 2;

/// Engine tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Width given to columns that carry no explicit width
    #[serde(default = "default_column_width")]
    pub default_column_width: f64,

    /// Local edits closer together than this are undone as one step
    #[serde(default = "default_undo_capture_timeout_ms")]
    pub undo_capture_timeout_ms: u64,

    /// Fixed substrate client id (random when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u64>,
}

fn default_column_width() -> f64 {
    150.0
}

fn default_undo_capture_timeout_ms() -> u64 {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_column_width: default_column_width(),
            undo_capture_timeout_ms: default_undo_capture_timeout_ms(),
            client_id: None,
        }
    }
}
