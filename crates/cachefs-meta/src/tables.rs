//! Redb table definitions for the metadata store.

use redb::TableDefinition;

/// path -> bincode-encoded `ObjectRow`
pub const OBJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("objects");
