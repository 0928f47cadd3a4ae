//! JSON record API
//!
//! Endpoints:
//! - GET /api/v1/records - every readable record, plus skipped indices
//! - POST /api/v1/records - multipart upload, returns the ledger receipt
//! - GET /api/v1/records/:index - one record
//! - GET /api/v1/records/:index/verify - integrity check of the local copy

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::error::Result;
use crate::ledger::FileRecord;
use crate::records::{Listing, UploadReceipt, VerifyOutcome};
use crate::state::AppState;

use super::upload;

/// Create the records router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_records).post(upload_record))
        .route("/:index", get(get_record))
        .route("/:index/verify", get(verify_record))
}

async fn list_records(State(state): State<AppState>) -> Json<Listing> {
    Json(state.records().list().await)
}

async fn upload_record(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadReceipt>)> {
    let limit = state.config().storage.max_upload_bytes;
    let receipt = upload::receive(state.records(), multipart, limit).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_record(State(state): State<AppState>, Path(index): Path<u64>) -> Result<Json<FileRecord>> {
    Ok(Json(state.records().record(index).await?))
}

async fn verify_record(
    State(state): State<AppState>,
    Path(index): Path<u64>,
) -> Result<Json<VerifyOutcome>> {
    Ok(Json(state.records().verify(index).await?))
}
