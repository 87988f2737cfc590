//! # Stable Identifiers
//!
//! Rows, columns and locks are addressed by opaque UUID strings that are
//! minted once and never reused. Display indices are derived from the order
//! sequences and change under insert/delete/reorder; these ids do not.
//!
//! Ids minted for data that several replicas may create independently
//! (migrated legacy columns and rows, the first row of an empty table) are
//! derived by name instead, so concurrent creators write the same keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const DERIVED_NAMESPACE: Uuid = Uuid::from_u128(0x6a0f_3c1e_8d5b_4e27_9b41_2f7c_d0e8_a513);

macro_rules! stable_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh, globally unique id
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Id derived from `key`; the same key yields the same id everywhere
            pub fn derived(key: &str) -> Self {
                let name = format!("{}:{}", stringify!($name), key);
                Self(Uuid::new_v5(&DERIVED_NAMESPACE, name.as_bytes()).to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

stable_id!(
    /// Identity of a row in the row store
    RowId
);

stable_id!(
    /// Identity of a column in the column registry
    ColumnId
);

stable_id!(
    /// Identity of a lock in the lock registry
    LockId
);
