//! Object rows stored in the metadata table
//!
//! Values are bincode-encoded before going into `redb`, the same way the
//! pack's other redb-backed stores persist their rows.

use serde::{Deserialize, Serialize};

/// One object's cache metadata (spec §3)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRow {
    pub path: String,
    pub local_path: String,
    pub size: u64,
    pub created_at: u64,
    pub last_accessed: u64,
    pub dirty: bool,
}
