//! Data models shared by the cache, store and flow layers.

/// Paper records, upload metadata and search filters.
pub mod paper;

pub use paper::{storage_path, Paper, PaperMetadata, SearchFilters};
