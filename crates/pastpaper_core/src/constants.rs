//! Shared constants used across PastPaper crates.

use std::time::Duration;

/// Root folder of every paper object in the bucket.
pub const PAPERS_ROOT: &str = "papers";

/// Segment count of a recognised paper path: root, board, class, subject, year, file.
pub const PAPER_PATH_SEGMENTS: usize = 6;

/// Upper bound for the recently-viewed list.
pub const MAX_RECENTLY_VIEWED: usize = 10;

/// Cache key holding the serialized paper index.
pub const PAPERS_KEY: &str = "pastpaper_papers";
/// Cache key holding the serialized recently-viewed list.
pub const RECENTLY_VIEWED_KEY: &str = "pastpaper_recently_viewed";

/// Default Firebase Storage REST host.
pub const DEFAULT_STORAGE_HOST: &str = "https://firebasestorage.googleapis.com";

/// Resumable upload chunks must be a multiple of this many bytes.
pub const UPLOAD_CHUNK_GRANULARITY: usize = 256 * 1024;
/// Default resumable upload chunk size.
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = UPLOAD_CHUNK_GRANULARITY;

/// Default per-request timeout for store calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How long a successful upload stays visible before the shell moves on.
pub const UPLOAD_SUCCESS_DISPLAY: Duration = Duration::from_secs(2);

/// User-facing message published when a refresh fails.
pub const REFRESH_ERROR_MESSAGE: &str =
    "Could not fetch papers from the server. Please check your connection and try again.";

/// User-facing message when an upload is submitted without a file.
pub const MISSING_FILE_MESSAGE: &str = "Please select a PDF file to upload.";

/// Cache file name within the default cache directory.
pub const CACHE_FILE_NAME: &str = "cache.redb";
