//! Object metadata returned by a backend's stat call.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,
    pub size: u64,
    pub mtime: u64,
    pub is_directory: bool,
}
