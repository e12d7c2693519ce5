//! Object store access for paper PDFs.

/// Firebase Storage REST client.
pub mod firebase;
mod upload;

pub use firebase::FirebaseStorage;

use crate::error::AppError;
use crate::models::{Paper, PaperMetadata};
use async_trait::async_trait;
use std::path::Path;

/// Upload progress callback, called with a percentage in `[0, 100]`.
pub type ProgressFn<'a> = dyn Fn(f64) + Send + Sync + 'a;

/// A local file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

fn content_type_for(name: &str) -> &'static str {
    let is_pdf = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name).to_string();
        Self {
            name,
            content_type,
            bytes,
        }
    }

    /// Read a file from disk; the upload keeps its file name component.
    ///
    /// # Errors
    /// Returns an error if the path has no file name or cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self, AppError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                AppError::Validation(format!("'{}' is not a file path", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(name, bytes))
    }
}

/// Percentage of `total` covered by `transferred`, clamped to `[0, 100]`.
pub fn progress_percent(transferred: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((transferred as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

/// Operations the index synchronizer and upload flow need from the store.
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Enumerate every paper object under the papers root.
    ///
    /// Objects whose path does not have the six-segment shape are skipped.
    /// Returned papers carry fresh ids and no URL.
    async fn list_all_papers(&self) -> Result<Vec<Paper>, AppError>;

    /// Resolve a fetchable download URL for one object path.
    async fn get_paper_url(&self, path: &str) -> Result<String, AppError>;

    /// Upload `file` under the path derived from `metadata`.
    ///
    /// `on_progress` is called after every transferred chunk. A failed upload
    /// leaves any partially written object in place.
    async fn upload_paper(
        &self,
        file: &UploadFile,
        metadata: &PaperMetadata,
        on_progress: &ProgressFn<'_>,
    ) -> Result<Paper, AppError>;
}

#[cfg(test)]
mod tests {
    use super::{progress_percent, UploadFile};

    #[test]
    fn progress_is_clamped_percentage() {
        assert_eq!(progress_percent(0, 200), 0.0);
        assert_eq!(progress_percent(50, 200), 25.0);
        assert_eq!(progress_percent(200, 200), 100.0);
        assert_eq!(progress_percent(300, 200), 100.0);
        assert_eq!(progress_percent(0, 0), 100.0);
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(UploadFile::new("final.PDF", Vec::new()).content_type, "application/pdf");
        assert_eq!(
            UploadFile::new("notes.txt", Vec::new()).content_type,
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn from_path_keeps_file_name() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let path = temp.path().join("final.pdf");
        std::fs::write(&path, b"%PDF-1.7").expect("write");
        let file = UploadFile::from_path(&path).await.expect("read");
        assert_eq!(file.name, "final.pdf");
        assert_eq!(file.bytes, b"%PDF-1.7");
    }
}
