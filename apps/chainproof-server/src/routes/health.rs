//! Health check endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub ledger: &'static str,
    pub signer: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ledger = state.records().ledger();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "chainproof-server",
        ledger: ledger.backend(),
        signer: ledger.signer(),
    })
}
