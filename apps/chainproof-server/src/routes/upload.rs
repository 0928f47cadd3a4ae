//! Multipart upload intake shared by the page and API endpoints

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use futures::TryStreamExt;

use crate::records::{RecordService, UploadError, UploadReceipt};

/// Name of the form field carrying the file
pub const FILE_FIELD: &str = "file";

fn intake_error(e: MultipartError, limit: usize) -> UploadError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::PayloadTooLarge { limit }
    } else {
        UploadError::Body(e.body_text())
    }
}

/// Find the `file` field and hand its stream to the record service
pub async fn receive(
    records: &RecordService,
    mut multipart: Multipart,
    limit: usize,
) -> Result<UploadReceipt, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| intake_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            tracing::debug!(field = ?field.name(), "Ignoring multipart field");
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        tracing::debug!(filename = %filename, content_type = ?field.content_type(), "Receiving upload");

        let body = field.map_err(move |e| intake_error(e, limit));
        return records.upload(&filename, body).await;
    }

    Err(UploadError::MissingFile)
}
