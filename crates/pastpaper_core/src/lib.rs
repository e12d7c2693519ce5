//! Core library for PastPaper: paper index sync, local cache, filtering and uploads.

/// On-device cache of the paper index and recently-viewed list.
pub mod cache;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants.
pub mod constants;
/// Application error types.
pub mod error;
/// Stateless paper filtering.
pub mod filter;
/// Data models for papers and filters.
pub mod models;
/// Object store access.
pub mod store;
/// Index synchronizer.
pub mod sync;
/// Upload submission flow.
pub mod upload_flow;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::LocalCache;
pub use config::Config;
pub use error::AppError;
pub use filter::filter_papers;
pub use models::{Paper, PaperMetadata, SearchFilters};
pub use store::{FirebaseStorage, PaperStore, UploadFile};
pub use sync::{IndexSnapshot, IndexSync, SyncState};
pub use upload_flow::{UploadFlow, UploadState};
