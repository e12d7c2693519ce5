//! Upload submission flow: validate, upload with progress, append to cache.

use crate::cache::LocalCache;
use crate::constants::{MISSING_FILE_MESSAGE, UPLOAD_SUCCESS_DISPLAY};
use crate::error::AppError;
use crate::models::{Paper, PaperMetadata};
use crate::store::{PaperStore, UploadFile};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Upload status shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    Idle,
    Uploading { progress: f64 },
    /// Terminal for this submission.
    Success(Paper),
    /// Recoverable; a new submission re-enters `Uploading`.
    Error(String),
}

/// One upload form's worth of state.
pub struct UploadFlow {
    store: Arc<dyn PaperStore>,
    cache: LocalCache,
    success_display: Duration,
    tx: watch::Sender<UploadState>,
}

impl UploadFlow {
    pub fn new(store: Arc<dyn PaperStore>, cache: LocalCache) -> Self {
        let (tx, _rx) = watch::channel(UploadState::Idle);
        Self {
            store,
            cache,
            success_display: UPLOAD_SUCCESS_DISPLAY,
            tx,
        }
    }

    /// Override how long `Success` is held before `submit` returns.
    pub fn with_success_display(mut self, duration: Duration) -> Self {
        self.success_display = duration;
        self
    }

    pub fn state(&self) -> UploadState {
        self.tx.borrow().clone()
    }

    /// Receiver that observes state and progress changes.
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.tx.subscribe()
    }

    /// Submit the form.
    ///
    /// On success the paper is prepended to the cached index, `Success` is
    /// held for the display duration, and the paper is returned so the shell
    /// can move on.
    ///
    /// # Errors
    /// - [`AppError::Validation`] when no file is selected (state unchanged)
    ///   or when the flow is already uploading or has succeeded.
    /// - The store's error when the upload fails; state becomes `Error`.
    pub async fn submit(
        &self,
        file: Option<UploadFile>,
        metadata: PaperMetadata,
    ) -> Result<Paper, AppError> {
        let rejection = match &*self.tx.borrow() {
            UploadState::Uploading { .. } => Some("An upload is already in progress."),
            UploadState::Success(_) => Some("This upload has already completed."),
            UploadState::Idle | UploadState::Error(_) => None,
        };
        if let Some(message) = rejection {
            return Err(AppError::Validation(message.to_string()));
        }
        let Some(file) = file else {
            return Err(AppError::Validation(MISSING_FILE_MESSAGE.to_string()));
        };

        self.tx.send_replace(UploadState::Uploading { progress: 0.0 });
        let tx = &self.tx;
        let on_progress = move |progress: f64| {
            tx.send_replace(UploadState::Uploading { progress });
        };

        match self.store.upload_paper(&file, &metadata, &on_progress).await {
            Ok(paper) => {
                self.cache.append(paper.clone());
                tracing::info!(id = %paper.id, path = %paper.path, "upload complete");
                self.tx.send_replace(UploadState::Success(paper.clone()));
                if !self.success_display.is_zero() {
                    tokio::time::sleep(self.success_display).await;
                }
                Ok(paper)
            }
            Err(err) => {
                tracing::error!("Upload failed: {}", err);
                let message = err.to_string();
                self.tx.send_replace(UploadState::Error(message));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{UploadFlow, UploadState};
    use crate::cache::LocalCache;
    use crate::constants::MISSING_FILE_MESSAGE;
    use crate::error::AppError;
    use crate::models::{Paper, PaperMetadata};
    use crate::store::UploadFile;
    use crate::test_support::FakeStore;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn metadata() -> PaperMetadata {
        PaperMetadata {
            class: "9".to_string(),
            board: "BISE".to_string(),
            subject: "Math".to_string(),
            year: "2023".to_string(),
        }
    }

    fn flow(store: Arc<FakeStore>, cache: LocalCache) -> UploadFlow {
        UploadFlow::new(store, cache).with_success_display(Duration::ZERO)
    }

    fn file() -> Option<UploadFile> {
        Some(UploadFile::new("final.pdf", b"%PDF-1.7".to_vec()))
    }

    #[tokio::test]
    async fn missing_file_is_rejected_without_state_change() {
        let flow = flow(Arc::new(FakeStore::default()), LocalCache::in_memory());
        let err = flow.submit(None, metadata()).await.expect_err("no file");
        assert!(matches!(err, AppError::Validation(ref m) if m == MISSING_FILE_MESSAGE));
        assert_eq!(flow.state(), UploadState::Idle);
    }

    #[tokio::test]
    async fn success_appends_to_cache_and_is_terminal() {
        let cache = LocalCache::in_memory();
        let existing = Paper::from_storage_path("papers/BISE/10/Urdu/2021/u.pdf").expect("paper");
        cache.set(std::slice::from_ref(&existing));
        let flow = flow(Arc::new(FakeStore::default()), cache.clone());

        let paper = flow.submit(file(), metadata()).await.expect("upload");
        assert_eq!(paper.path, "papers/BISE/9/Math/2023/final.pdf");
        assert_eq!(paper.name, "final.pdf");
        assert!(paper.url.is_some());
        assert_eq!(flow.state(), UploadState::Success(paper.clone()));
        assert_eq!(cache.get().expect("cached"), vec![paper, existing]);

        let err = flow.submit(file(), metadata()).await.expect_err("terminal");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn failure_surfaces_store_message_and_allows_resubmission() {
        let store = Arc::new(FakeStore::default());
        store.set_fail_upload(true);
        let cache = LocalCache::in_memory();
        let flow = flow(store.clone(), cache.clone());

        let err = flow.submit(file(), metadata()).await.expect_err("fails");
        assert!(matches!(err, AppError::Store { status: 403, .. }));
        match flow.state() {
            UploadState::Error(message) => assert!(message.contains("Permission denied.")),
            other => panic!("unexpected state: {:?}", other),
        }
        assert!(cache.get().is_none());

        store.set_fail_upload(false);
        let paper = flow.submit(file(), metadata()).await.expect("resubmission");
        assert_eq!(cache.get().expect("cached"), vec![paper]);
    }

    #[tokio::test]
    async fn progress_is_published_while_uploading() {
        let flow = flow(Arc::new(FakeStore::default()), LocalCache::in_memory());
        let rx = flow.subscribe();
        flow.submit(file(), metadata()).await.expect("upload");
        assert!(rx.has_changed().expect("sender alive"));
        assert!(matches!(flow.state(), UploadState::Success(_)));
    }

    #[tokio::test]
    async fn success_state_is_held_for_display_duration() {
        let flow = UploadFlow::new(Arc::new(FakeStore::default()), LocalCache::in_memory())
            .with_success_display(Duration::from_millis(50));
        let started = Instant::now();
        flow.submit(file(), metadata()).await.expect("upload");
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
