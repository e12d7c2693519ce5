//! Shared test-only helpers for pastpaper_core.

use crate::error::AppError;
use crate::models::{storage_path, Paper, PaperMetadata};
use crate::store::{PaperStore, ProgressFn, UploadFile};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory [`PaperStore`] with switchable failures.
///
/// Object paths are kept in insertion order and discovered in that order.
#[derive(Default)]
pub(crate) struct FakeStore {
    objects: Mutex<Vec<String>>,
    failing_urls: Mutex<HashSet<String>>,
    fail_list: AtomicBool,
    fail_upload: AtomicBool,
    pub(crate) list_calls: AtomicUsize,
    pub(crate) url_calls: AtomicUsize,
}

impl FakeStore {
    pub(crate) fn with_objects(paths: &[&str]) -> Self {
        let store = Self::default();
        store
            .objects
            .lock()
            .expect("objects lock")
            .extend(paths.iter().map(|p| p.to_string()));
        store
    }

    pub(crate) fn add_object(&self, path: &str) {
        self.objects
            .lock()
            .expect("objects lock")
            .push(path.to_string());
    }

    pub(crate) fn fail_url_for(&self, path: &str) {
        self.failing_urls
            .lock()
            .expect("failing urls lock")
            .insert(path.to_string());
    }

    pub(crate) fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn url_for(path: &str) -> String {
        format!("https://files.test/{}?alt=media", path)
    }
}

#[async_trait]
impl PaperStore for FakeStore {
    async fn list_all_papers(&self) -> Result<Vec<Paper>, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::Store {
                status: 503,
                message: "listing unavailable".to_string(),
            });
        }
        let objects = self.objects.lock().expect("objects lock").clone();
        Ok(objects
            .iter()
            .filter_map(|path| Paper::from_storage_path(path))
            .collect())
    }

    async fn get_paper_url(&self, path: &str) -> Result<String, AppError> {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self
            .failing_urls
            .lock()
            .expect("failing urls lock")
            .contains(path)
        {
            return Err(AppError::NotFound(path.to_string()));
        }
        Ok(Self::url_for(path))
    }

    async fn upload_paper(
        &self,
        file: &UploadFile,
        metadata: &PaperMetadata,
        on_progress: &ProgressFn<'_>,
    ) -> Result<Paper, AppError> {
        on_progress(0.0);
        if self.fail_upload.load(Ordering::SeqCst) {
            on_progress(40.0);
            return Err(AppError::Store {
                status: 403,
                message: "Permission denied.".to_string(),
            });
        }
        on_progress(50.0);
        on_progress(100.0);
        let path = storage_path(metadata, &file.name);
        self.add_object(&path);
        let url = Self::url_for(&path);
        Ok(Paper::new(
            metadata.clone(),
            file.name.clone(),
            path,
            Some(url),
        ))
    }
}
