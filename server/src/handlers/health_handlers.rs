// Health check and info endpoints

use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

pub(crate) async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metadata.clone())
}

pub(crate) async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metadata.clone())
}
