//! Resumable upload protocol used by Firebase Storage.
//!
//! A session is opened with a `start` command, then the body is sent in
//! fixed-size chunks at increasing offsets; the last chunk also finalizes.

use super::firebase::{ensure_success, FirebaseStorage};
use super::{progress_percent, ProgressFn, UploadFile};
use crate::error::AppError;
use reqwest::Url;

const UPLOAD_PROTOCOL: &str = "x-goog-upload-protocol";
const UPLOAD_COMMAND: &str = "x-goog-upload-command";
const UPLOAD_OFFSET: &str = "x-goog-upload-offset";
const UPLOAD_URL: &str = "x-goog-upload-url";
const UPLOAD_STATUS: &str = "x-goog-upload-status";
const UPLOAD_CONTENT_LENGTH: &str = "x-goog-upload-header-content-length";
const UPLOAD_CONTENT_TYPE: &str = "x-goog-upload-header-content-type";

fn header_value<'r>(res: &'r reqwest::Response, name: &str) -> Option<&'r str> {
    res.headers().get(name).and_then(|value| value.to_str().ok())
}

async fn start_session(
    storage: &FirebaseStorage,
    bucket: &str,
    path: &str,
    file: &UploadFile,
) -> Result<Url, AppError> {
    let mut url = storage.objects_url(bucket)?;
    url.query_pairs_mut().append_pair("name", path);
    storage.append_api_key(&mut url);

    let body = serde_json::json!({
        "name": path,
        "contentType": file.content_type,
    });
    let res = storage
        .client
        .post(url)
        .header(UPLOAD_PROTOCOL, "resumable")
        .header(UPLOAD_COMMAND, "start")
        .header(UPLOAD_CONTENT_LENGTH, file.bytes.len().to_string())
        .header(UPLOAD_CONTENT_TYPE, file.content_type.as_str())
        .json(&body)
        .send()
        .await?;
    let res = ensure_success(res).await?;
    let status = res.status().as_u16();

    let session = header_value(&res, UPLOAD_URL).ok_or_else(|| AppError::Store {
        status,
        message: "upload session URL missing from start response".to_string(),
    })?;
    Url::parse(session).map_err(|err| AppError::Store {
        status,
        message: format!("invalid upload session URL '{}': {}", session, err),
    })
}

/// Upload `file` to `path`, reporting progress after each chunk.
pub(super) async fn resumable_upload(
    storage: &FirebaseStorage,
    bucket: &str,
    path: &str,
    file: &UploadFile,
    on_progress: &ProgressFn<'_>,
) -> Result<(), AppError> {
    let session = start_session(storage, bucket, path, file).await?;
    let total = file.bytes.len();
    let mut offset = 0usize;

    loop {
        let end = (offset + storage.chunk_size).min(total);
        let is_last = end == total;
        let command = if is_last { "upload, finalize" } else { "upload" };

        let res = storage
            .client
            .post(session.clone())
            .header(UPLOAD_COMMAND, command)
            .header(UPLOAD_OFFSET, offset.to_string())
            .body(file.bytes[offset..end].to_vec())
            .send()
            .await?;
        let res = ensure_success(res).await?;
        let upload_status = header_value(&res, UPLOAD_STATUS).map(str::to_string);

        offset = end;
        tracing::debug!(path = %path, offset, total, "sent upload chunk");
        on_progress(progress_percent(offset, total));

        if is_last {
            if let Some(status) = upload_status.as_deref() {
                if status != "final" {
                    return Err(AppError::Store {
                        status: res.status().as_u16(),
                        message: format!("upload did not finalize (status '{}')", status),
                    });
                }
            }
            return Ok(());
        }
        if upload_status.as_deref() == Some("final") {
            return Err(AppError::Store {
                status: res.status().as_u16(),
                message: "store finalized the upload before all bytes were sent".to_string(),
            });
        }
    }
}
