//! Streaming multipart upload transport.
//!
//! One POST per file. The body is streamed in `chunk_size` pieces and a
//! progress event is emitted as each piece is handed to the connection.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::Inner;
use crate::error::UploadFailure;
use crate::sdk::{
    CallOptions, FileHandle, TransferProgress, UploadListener, UploadOptions, UploadRegistration,
    UploadTransport,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedFile {
    #[serde(alias = "file_id", alias = "id")]
    file_id: String,
    url: String,
}

/// [`UploadTransport`] backed by the platform's `files/upload` endpoint.
#[derive(Debug, Clone)]
pub struct HttpUploadTransport {
    inner: Arc<Inner>,
}

impl HttpUploadTransport {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self { inner }
    }
}

impl UploadTransport for HttpUploadTransport {
    fn upload_file(
        &self,
        file: FileHandle,
        options: &UploadOptions,
        listener: Arc<dyn UploadListener>,
    ) -> Result<UploadRegistration, UploadFailure> {
        if file.name.trim().is_empty() {
            return Err(UploadFailure::new("file name is empty"));
        }
        if file.len() > self.inner.upload.max_file_size {
            return Err(UploadFailure::new(format!(
                "'{}' exceeds the maximum upload size ({} > {} bytes)",
                file.name,
                file.len(),
                self.inner.upload.max_file_size
            )));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| UploadFailure::new(format!("no async runtime available: {e}")))?;
        let options_json = serde_json::to_string(options)
            .map_err(|e| UploadFailure::new(format!("invalid upload options: {e}")))?;
        let builder = self
            .inner
            .request(Method::POST, &["files", "upload"], CallOptions::default())
            .map_err(|e| UploadFailure::new(e.to_string()))?;

        let upload_id = Uuid::new_v4().to_string();
        let abort = CancellationToken::new();
        let job = UploadJob {
            upload_id: upload_id.clone(),
            file,
            options_json,
            chunk_size: self.inner.upload.chunk_size.max(1),
            builder,
        };
        runtime.spawn(job.run(abort.clone(), listener));

        Ok(UploadRegistration { upload_id, abort })
    }
}

struct UploadJob {
    upload_id: String,
    file: FileHandle,
    options_json: String,
    chunk_size: usize,
    builder: reqwest::RequestBuilder,
}

impl UploadJob {
    #[instrument(skip_all, fields(upload_id = %self.upload_id, file = %self.file.name))]
    async fn run(self, abort: CancellationToken, listener: Arc<dyn UploadListener>) {
        tokio::select! {
            () = abort.cancelled() => {
                debug!(name: "upload.transport.aborted", "Upload aborted");
            }
            result = self.transfer(Arc::clone(&listener)) => match result {
                Ok(uploaded) => listener.on_success(uploaded.file_id, uploaded.url),
                Err(failure) => {
                    warn!(name: "upload.transport.failed", error = %failure, "Upload failed");
                    listener.on_error(failure);
                }
            }
        }
    }

    async fn transfer(
        self,
        listener: Arc<dyn UploadListener>,
    ) -> Result<UploadedFile, UploadFailure> {
        let bytes = self.file.shared_bytes();
        let len = bytes.len();
        let total = self.file.len();
        let chunk_size = self.chunk_size;

        let chunks = (0..len).step_by(chunk_size).map(move |start| {
            let end = (start + chunk_size).min(len);
            listener.on_progress(TransferProgress::from_bytes(end as u64, total));
            Ok::<_, std::io::Error>(bytes[start..end].to_vec())
        });
        let body = Body::wrap_stream(futures::stream::iter(chunks));

        let part = Part::stream_with_length(body, total)
            .file_name(self.file.name)
            .mime_str(&self.file.mime_type)
            .map_err(|e| UploadFailure::new(format!("invalid MIME type: {e}")))?;
        let form = Form::new()
            .text("uploadId", self.upload_id)
            .text("options", self.options_json)
            .part("file", part);

        let response = self
            .builder
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadFailure::new(e.to_string()))?;

        let envelope = Inner::handle_response(response)
            .await
            .map_err(|e| match e {
                crate::Error::Api { status, message } => {
                    UploadFailure::new(message).with_status(status)
                }
                other => UploadFailure::new(other.to_string()),
            })?;
        serde_json::from_value(super::unwrap_envelope(envelope, false))
            .map_err(|e| UploadFailure::new(format!("unexpected upload response: {e}")))
    }
}
