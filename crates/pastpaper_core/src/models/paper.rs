//! Paper records and the storage path convention they are derived from.

use crate::constants::{PAPERS_ROOT, PAPER_PATH_SEGMENTS};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One stored exam PDF and its category metadata.
///
/// `id` is generated client-side and is not derived from `path`, so the same
/// object discovered twice gets two different ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paper {
    pub id: String,
    pub name: String,
    pub class: String,
    pub board: String,
    pub subject: String,
    pub year: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Category fields entered by the uploader.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperMetadata {
    pub class: String,
    pub board: String,
    pub subject: String,
    pub year: String,
}

/// Build the canonical object path for an upload.
///
/// # Returns
/// `papers/{board}/{class}/{subject}/{year}/{file_name}`.
pub fn storage_path(metadata: &PaperMetadata, file_name: &str) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}",
        PAPERS_ROOT, metadata.board, metadata.class, metadata.subject, metadata.year, file_name
    )
}

impl Paper {
    /// Create a paper with a fresh id.
    pub fn new(metadata: PaperMetadata, name: String, path: String, url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            class: metadata.class,
            board: metadata.board,
            subject: metadata.subject,
            year: metadata.year,
            path,
            url,
        }
    }

    /// Reconstruct a paper from an object path found during discovery.
    ///
    /// # Returns
    /// `None` unless the path splits into exactly six `/`-separated segments.
    pub fn from_storage_path(path: &str) -> Option<Self> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != PAPER_PATH_SEGMENTS {
            return None;
        }
        let metadata = PaperMetadata {
            board: parts[1].to_string(),
            class: parts[2].to_string(),
            subject: parts[3].to_string(),
            year: parts[4].to_string(),
        };
        Some(Self::new(
            metadata,
            parts[5].to_string(),
            path.to_string(),
            None,
        ))
    }

    /// Category fields of this paper.
    pub fn metadata(&self) -> PaperMetadata {
        PaperMetadata {
            class: self.class.clone(),
            board: self.board.clone(),
            subject: self.subject.clone(),
            year: self.year.clone(),
        }
    }

    /// Return this paper with its download URL set.
    pub fn with_url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }
}

/// Optional equality predicates over the four category dimensions.
///
/// An empty string leaves that dimension unconstrained.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchFilters {
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub board: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub year: String,
}

fn dimension_matches(filter: &str, value: &str) -> bool {
    filter.is_empty() || filter == value
}

impl SearchFilters {
    /// Whether no dimension is constrained.
    pub fn is_empty(&self) -> bool {
        self.class.is_empty()
            && self.board.is_empty()
            && self.subject.is_empty()
            && self.year.is_empty()
    }

    /// Exact, case-sensitive match on every non-empty dimension.
    pub fn matches(&self, paper: &Paper) -> bool {
        dimension_matches(&self.class, &paper.class)
            && dimension_matches(&self.board, &paper.board)
            && dimension_matches(&self.subject, &paper.subject)
            && dimension_matches(&self.year, &paper.year)
    }
}
