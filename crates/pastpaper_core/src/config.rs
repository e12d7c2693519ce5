//! Configuration loading from environment variables.

use crate::constants::{
    CACHE_FILE_NAME, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STORAGE_HOST,
    DEFAULT_UPLOAD_CHUNK_SIZE, UPLOAD_CHUNK_GRANULARITY,
};
use crate::error::AppError;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Connection parameters for the Firebase project backing the paper store.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    pub storage_bucket: Option<String>,
    pub messaging_sender_id: Option<String>,
    pub app_id: Option<String>,
    pub storage_host: String,
}

impl StoreConfig {
    /// Check that every parameter a store operation needs is present.
    ///
    /// # Returns
    /// The `(project_id, storage_bucket)` pair.
    ///
    /// # Errors
    /// Returns [`AppError::Configuration`] naming the missing variables.
    pub fn validate(&self) -> Result<(&str, &str), AppError> {
        match (self.project_id.as_deref(), self.storage_bucket.as_deref()) {
            (Some(project), Some(bucket)) => Ok((project, bucket)),
            (project, bucket) => {
                let mut missing = Vec::new();
                if project.is_none() {
                    missing.push("FIREBASE_PROJECT_ID");
                }
                if bucket.is_none() {
                    missing.push("FIREBASE_STORAGE_BUCKET");
                }
                Err(AppError::Configuration(format!(
                    "missing {}",
                    missing.join(", ")
                )))
            }
        }
    }

    /// Whether [`StoreConfig::validate`] would succeed.
    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Runtime configuration for PastPaper.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub cache_path: String,
    pub upload_chunk_size: usize,
    pub request_timeout_secs: u64,
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    std::env::current_dir().ok()
}

/// Default location of the on-device cache file.
pub fn default_cache_path() -> String {
    let home = resolve_home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".cache")
        .join("pastpaper")
        .join(CACHE_FILE_NAME)
        .to_string_lossy()
        .to_string()
}

/// Round a requested chunk size up to the resumable-upload granularity.
pub fn normalize_chunk_size(requested: usize) -> usize {
    let chunks = requested.div_ceil(UPLOAD_CHUNK_GRANULARITY).max(1);
    chunks * UPLOAD_CHUNK_GRANULARITY
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let store = StoreConfig {
            api_key: get("FIREBASE_API_KEY"),
            auth_domain: get("FIREBASE_AUTH_DOMAIN"),
            project_id: get("FIREBASE_PROJECT_ID"),
            storage_bucket: get("FIREBASE_STORAGE_BUCKET"),
            messaging_sender_id: get("FIREBASE_MESSAGING_SENDER_ID"),
            app_id: get("FIREBASE_APP_ID"),
            storage_host: get("FIREBASE_STORAGE_HOST")
                .map(|host| host.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_STORAGE_HOST.to_string()),
        };

        Self {
            store,
            cache_path: get("PASTPAPER_CACHE_PATH")
                .map(expand_tilde)
                .unwrap_or_else(default_cache_path),
            upload_chunk_size: get("PASTPAPER_UPLOAD_CHUNK_SIZE")
                .and_then(|s| s.parse().ok())
                .map(normalize_chunk_size)
                .unwrap_or(DEFAULT_UPLOAD_CHUNK_SIZE),
            request_timeout_secs: get("PASTPAPER_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}
