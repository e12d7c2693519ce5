//! Paper store backed by the Firebase Storage REST API.

use super::{upload, PaperStore, ProgressFn, UploadFile};
use crate::config::{Config, StoreConfig};
use crate::constants::PAPERS_ROOT;
use crate::error::AppError;
use crate::models::{storage_path, Paper, PaperMetadata};
use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Default, Deserialize)]
struct ListResponse {
    #[serde(default)]
    prefixes: Vec<String>,
    #[serde(default)]
    items: Vec<ObjectRef>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectRef {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ObjectMetadata {
    #[serde(rename = "downloadTokens", default)]
    download_tokens: Option<String>,
}

impl ObjectMetadata {
    fn first_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()?
            .split(',')
            .map(str::trim)
            .find(|token| !token.is_empty())
    }
}

/// One folder level: leaf object names and sub-folder paths.
#[derive(Debug, Default)]
struct Listing {
    items: Vec<String>,
    folders: Vec<String>,
}

/// Extract a readable message from a store error response body.
pub(super) fn error_message_for_response(status: StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let error = value.get("error");
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .or_else(|| error.and_then(Value::as_str));
        if let Some(message) = message {
            return message.to_string();
        }
    }

    body.to_string()
}

/// Turn a non-success response into the matching [`AppError`].
pub(super) async fn ensure_success(res: reqwest::Response) -> Result<reqwest::Response, AppError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = match res.text().await {
        Ok(body) => body,
        Err(err) => format!("failed to read error response body: {}", err),
    };
    let message = error_message_for_response(status, &body);
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(message));
    }
    Err(AppError::Store {
        status: status.as_u16(),
        message,
    })
}

/// Firebase Storage client for the `papers/` tree of one bucket.
pub struct FirebaseStorage {
    pub(super) client: reqwest::Client,
    config: StoreConfig,
    pub(super) chunk_size: usize,
}

impl FirebaseStorage {
    /// Build a client; configuration is validated per operation.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: StoreConfig, chunk_size: usize, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config,
            chunk_size: chunk_size.max(1),
        })
    }

    /// Build a client from the loaded [`Config`].
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.store.clone(),
            config.upload_chunk_size,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub(super) fn bucket(&self) -> Result<&str, AppError> {
        self.config.validate().map(|(_, bucket)| bucket)
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let host = &self.config.storage_host;
        let mut url = Url::parse(host).map_err(|err| {
            AppError::Configuration(format!("invalid storage host '{}': {}", host, err))
        })?;
        let mut path = url.path_segments_mut().map_err(|_| {
            AppError::Configuration(format!("storage host '{}' cannot be a base URL", host))
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
        drop(path);
        Ok(url)
    }

    /// `{host}/v0/b/{bucket}/o`
    pub(super) fn objects_url(&self, bucket: &str) -> Result<Url, AppError> {
        self.api_url(&["v0", "b", bucket, "o"])
    }

    /// `{host}/v0/b/{bucket}/o/{escaped path}`
    fn object_url(&self, bucket: &str, path: &str) -> Result<Url, AppError> {
        self.api_url(&["v0", "b", bucket, "o", path])
    }

    pub(super) fn append_api_key(&self, url: &mut Url) {
        if let Some(key) = self.config.api_key.as_deref() {
            url.query_pairs_mut().append_pair("key", key);
        }
    }

    fn download_url(&self, bucket: &str, path: &str, token: &str) -> Result<Url, AppError> {
        let mut url = self.object_url(bucket, path)?;
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        Ok(url)
    }

    async fn list_folder(&self, bucket: &str, folder: &str) -> Result<Listing, AppError> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        let mut listing = Listing::default();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.objects_url(bucket)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", &prefix);
                query.append_pair("delimiter", "/");
                if let Some(token) = page_token.as_deref() {
                    query.append_pair("pageToken", token);
                }
            }
            self.append_api_key(&mut url);

            let res = self.client.get(url).send().await?;
            let page: ListResponse = ensure_success(res).await?.json().await?;
            listing.items.extend(page.items.into_iter().map(|item| item.name));
            listing.folders.extend(
                page.prefixes
                    .into_iter()
                    .map(|p| p.trim_end_matches('/').to_string()),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(listing)
    }

    fn walk_folder<'a>(
        &'a self,
        bucket: &'a str,
        folder: String,
    ) -> BoxFuture<'a, Result<Vec<Paper>, AppError>> {
        async move {
            let listing = self.list_folder(bucket, &folder).await?;
            tracing::debug!(
                folder = %folder,
                items = listing.items.len(),
                folders = listing.folders.len(),
                "listed store folder"
            );

            let mut papers = Vec::with_capacity(listing.items.len());
            for name in &listing.items {
                match Paper::from_storage_path(name) {
                    Some(paper) => papers.push(paper),
                    None => tracing::debug!(path = %name, "skipping object outside paper layout"),
                }
            }

            let children = try_join_all(
                listing
                    .folders
                    .into_iter()
                    .map(|child| self.walk_folder(bucket, child)),
            )
            .await?;
            papers.extend(children.into_iter().flatten());
            Ok(papers)
        }
        .boxed()
    }

    /// Fetch a resolved download URL into a local file.
    ///
    /// # Errors
    /// Returns an error if the request fails or the file cannot be written.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64, AppError> {
        let url = Url::parse(url)
            .map_err(|err| AppError::Validation(format!("invalid paper URL '{}': {}", url, err)))?;
        let mut res = ensure_success(self.client.get(url).send().await?).await?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = res.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl PaperStore for FirebaseStorage {
    async fn list_all_papers(&self) -> Result<Vec<Paper>, AppError> {
        let bucket = self.bucket()?;
        let papers = self.walk_folder(bucket, PAPERS_ROOT.to_string()).await?;
        tracing::info!(count = papers.len(), "discovered papers in store");
        Ok(papers)
    }

    async fn get_paper_url(&self, path: &str) -> Result<String, AppError> {
        let bucket = self.bucket()?;
        let mut url = self.object_url(bucket, path)?;
        self.append_api_key(&mut url);

        let res = self.client.get(url).send().await?;
        let metadata: ObjectMetadata = ensure_success(res).await?.json().await?;
        let Some(token) = metadata.first_token() else {
            return Err(AppError::NotFound(format!("no download URL issued for {}", path)));
        };
        Ok(self.download_url(bucket, path, token)?.to_string())
    }

    async fn upload_paper(
        &self,
        file: &UploadFile,
        metadata: &PaperMetadata,
        on_progress: &ProgressFn<'_>,
    ) -> Result<Paper, AppError> {
        let bucket = self.bucket()?;
        let path = storage_path(metadata, &file.name);

        if let Err(err) = upload::resumable_upload(self, bucket, &path, file, on_progress).await {
            tracing::error!(path = %path, "Upload error: {}", err);
            return Err(err);
        }

        let url = self.get_paper_url(&path).await?;
        tracing::info!(path = %path, "uploaded paper");
        Ok(Paper::new(
            metadata.clone(),
            file.name.clone(),
            path,
            Some(url),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{error_message_for_response, FirebaseStorage, ObjectMetadata};
    use crate::config::StoreConfig;
    use crate::error::AppError;
    use crate::models::PaperMetadata;
    use crate::store::{PaperStore, UploadFile};
    use reqwest::StatusCode;
    use std::time::Duration;

    fn configured() -> StoreConfig {
        StoreConfig {
            project_id: Some("pastpaper".to_string()),
            storage_bucket: Some("pastpaper.appspot.com".to_string()),
            storage_host: "https://firebasestorage.googleapis.com".to_string(),
            ..StoreConfig::default()
        }
    }

    fn storage(config: StoreConfig) -> FirebaseStorage {
        FirebaseStorage::new(config, 256 * 1024, Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn object_urls_escape_the_whole_path() {
        let storage = storage(configured());
        let url = storage
            .object_url("pastpaper.appspot.com", "papers/BISE/9/Math/2023/final paper.pdf")
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://firebasestorage.googleapis.com/v0/b/pastpaper.appspot.com/o/papers%2FBISE%2F9%2FMath%2F2023%2Ffinal%20paper.pdf"
        );
    }

    #[test]
    fn download_url_carries_token() {
        let storage = storage(configured());
        let url = storage.download_url("b", "papers/x.pdf", "tok-1").expect("url");
        assert!(url.as_str().ends_with("/o/papers%2Fx.pdf?alt=media&token=tok-1"));
    }

    #[test]
    fn first_download_token_is_used() {
        let metadata: ObjectMetadata =
            serde_json::from_str(r#"{"name":"papers/x.pdf","downloadTokens":"a,b"}"#)
                .expect("metadata");
        assert_eq!(metadata.first_token(), Some("a"));
        let metadata: ObjectMetadata =
            serde_json::from_str(r#"{"name":"papers/x.pdf"}"#).expect("metadata");
        assert_eq!(metadata.first_token(), None);
    }

    #[test]
    fn error_messages_prefer_store_error_field() {
        let body = r#"{"error":{"code":403,"message":"Permission denied."}}"#;
        assert_eq!(
            error_message_for_response(StatusCode::FORBIDDEN, body),
            "Permission denied."
        );
        assert_eq!(
            error_message_for_response(StatusCode::BAD_GATEWAY, ""),
            "Bad Gateway"
        );
        assert_eq!(
            error_message_for_response(StatusCode::BAD_REQUEST, "plain text"),
            "plain text"
        );
    }

    #[tokio::test]
    async fn unconfigured_store_fails_before_any_request() {
        // Unroutable host: reaching the network would surface a Network error instead.
        let storage = storage(StoreConfig {
            storage_host: "http://127.0.0.1:1".to_string(),
            ..StoreConfig::default()
        });

        let err = storage.list_all_papers().await.expect_err("list must fail");
        assert!(matches!(err, AppError::Configuration(_)), "{:?}", err);

        let file = UploadFile::new("final.pdf", b"%PDF".to_vec());
        let err = storage
            .upload_paper(&file, &PaperMetadata::default(), &|_: f64| {})
            .await
            .expect_err("upload must fail");
        assert!(matches!(err, AppError::Configuration(_)), "{:?}", err);
    }
}
