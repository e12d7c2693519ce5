//! Application error types for the store, cache and flow layers.
use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Store error ({status}): {message}")]
    Store { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Message suitable for showing to a user.
    ///
    /// Configuration problems get a static hint, transport and store failures
    /// get a generic retry suggestion, everything else uses its own display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(_) => {
                "The paper store is not configured. Set FIREBASE_PROJECT_ID and \
                 FIREBASE_STORAGE_BUCKET and try again."
                    .to_string()
            }
            Self::Network(_) | Self::Store { .. } => {
                "Could not reach the paper store. Please check your connection and try again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<redb::DatabaseError> for AppError {
    fn from(value: redb::DatabaseError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TransactionError> for AppError {
    fn from(value: redb::TransactionError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::TableError> for AppError {
    fn from(value: redb::TableError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::StorageError> for AppError {
    fn from(value: redb::StorageError) -> Self {
        Self::Database(value.into())
    }
}

impl From<redb::CommitError> for AppError {
    fn from(value: redb::CommitError) -> Self {
        Self::Database(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn configuration_errors_use_static_user_message() {
        let err = AppError::Configuration("missing FIREBASE_PROJECT_ID".to_string());
        assert!(err.user_message().contains("not configured"));
        assert!(!err.user_message().contains("missing FIREBASE_PROJECT_ID"));
    }

    #[test]
    fn store_errors_suggest_retry() {
        let err = AppError::Store {
            status: 503,
            message: "backend unavailable".to_string(),
        };
        assert!(err.user_message().contains("try again"));
    }

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = AppError::Validation("Please select a PDF file to upload.".to_string());
        assert_eq!(err.user_message(), "Please select a PDF file to upload.");
    }
}
