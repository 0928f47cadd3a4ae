//! Browser-facing pages
//!
//! - GET / - landing page with record count and upload form
//! - POST /upload - store, hash and record a file
//! - GET /files - recorded files
//! - GET /verify/:index - re-check a local copy, then back to /files

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::html::{self, redirect_with_notice, Level, Notice, NoticeQuery};
use crate::records::{UploadError, VerifyOutcome};
use crate::state::AppState;

use super::upload;

/// Create the pages router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/upload", post(upload_file))
        .route("/files", get(files))
        .route("/verify/:index", get(verify))
}

async fn landing(State(state): State<AppState>, Query(query): Query<NoticeQuery>) -> Html<String> {
    let mut notices: Vec<Notice> = query.into_notice().into_iter().collect();

    let count = match state.records().count().await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!(error = %e, "Error fetching file count from contract");
            notices.push(Notice::error(format!(
                "Error connecting to blockchain for status: {}",
                e
            )));
            None
        }
    };

    Html(html::landing(
        count,
        state.config().storage.max_upload_bytes,
        &notices,
    ))
}

async fn upload_file(State(state): State<AppState>, multipart: Multipart) -> Response {
    let limit = state.config().storage.max_upload_bytes;

    match upload::receive(state.records(), multipart, limit).await {
        Ok(receipt) => {
            redirect_with_notice("/files", &Notice::new(Level::Success, receipt.message())).into_response()
        }
        Err(e @ UploadError::PayloadTooLarge { .. }) => (
            StatusCode::PAYLOAD_TOO_LARGE,
            Html(html::message_page("Upload rejected", &Notice::error(e.to_string()))),
        )
            .into_response(),
        Err(e) => {
            let mut text = e.to_string();
            if let UploadError::Ledger { retained: true, filename, .. } = &e {
                if e.is_pending() {
                    text.push_str(&format!(
                        " The transaction may still be recorded; the file was kept as {}.",
                        filename
                    ));
                } else {
                    text.push_str(&format!(
                        " The file was saved locally as {} but is not recorded on chain.",
                        filename
                    ));
                }
            }
            redirect_with_notice("/", &Notice::error(text)).into_response()
        }
    }
}

async fn files(State(state): State<AppState>, Query(query): Query<NoticeQuery>) -> Html<String> {
    let mut notices: Vec<Notice> = query.into_notice().into_iter().collect();

    let listing = state.records().list().await;
    if let Some(error) = &listing.error {
        notices.push(Notice::error(error.clone()));
    }
    if !listing.skipped.is_empty() {
        notices.push(Notice::error(format!(
            "{} record(s) could not be read and are not shown.",
            listing.skipped.len()
        )));
    }

    Html(html::file_list(&listing.records, &notices))
}

async fn verify(State(state): State<AppState>, Path(index): Path<u64>) -> Response {
    let notice = match state.records().verify(index).await {
        Ok(outcome) => {
            let level = match outcome {
                VerifyOutcome::Intact { .. } => Level::Success,
                VerifyOutcome::Tampered { .. } => Level::Error,
                VerifyOutcome::MissingLocally { .. } => Level::Info,
            };
            Notice::new(level, outcome.message())
        }
        Err(e) => {
            tracing::warn!(index = index, error = %e, "Verification could not run");
            Notice::error(e.to_string())
        }
    };

    redirect_with_notice("/files", &notice).into_response()
}
