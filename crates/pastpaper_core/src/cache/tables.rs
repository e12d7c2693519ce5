//! redb table definitions for the on-device cache.

use redb::TableDefinition;

/// Key-value rows; values are JSON-encoded record arrays.
pub const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");
