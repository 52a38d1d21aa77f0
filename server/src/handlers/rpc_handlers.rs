use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use serde_json::Value as JsonValue;

use crate::{error::AppError, state::AppState};

/// Generic dispatch endpoint: `POST /rpc/{name}` with the procedure input as
/// the JSON body. An empty body is dispatched as null and rejected by the
/// procedure's own input contract where one applies.
pub(crate) async fn rpc_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JsonValue>, AppError> {
    let input = parse_body(&body)?;
    dispatch(state, &name, headers, input).await
}

// REST aliases for the organization procedures, matching the routes the
// procedures advertise.

pub(crate) async fn list_organizations_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<JsonValue>, AppError> {
    dispatch(state, "organizations.list", headers, JsonValue::Null).await
}

pub(crate) async fn search_members_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JsonValue>, AppError> {
    let input = parse_body(&body)?;
    dispatch(state, "organizations.searchMembers", headers, input).await
}

pub(crate) async fn organization_stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JsonValue>, AppError> {
    let input = parse_body(&body)?;
    dispatch(state, "organizations.stats", headers, input).await
}

fn parse_body(body: &Bytes) -> Result<JsonValue, AppError> {
    if body.is_empty() {
        return Ok(JsonValue::Null);
    }

    serde_json::from_slice(body)
        .map_err(|err| AppError::validation_message(format!("invalid JSON body: {err}")))
}

async fn dispatch(
    state: AppState,
    name: &str,
    headers: HeaderMap,
    input: JsonValue,
) -> Result<Json<JsonValue>, AppError> {
    let procedures = state.procedures.clone();
    let value = procedures.dispatch(&state, name, headers, input).await?;
    Ok(Json(value))
}
