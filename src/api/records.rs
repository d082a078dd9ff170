use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde_json::{Value as JsonValue, json};

use super::blocking;
use crate::data::model::Entry;
use crate::data::schema::validate_entry;
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Positions are signed so `-1` reaches the range check and becomes a 404.
fn parse_position(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::validation("id", format!("'{raw}' is not an integer")))
}

fn parse_entry(payload: Result<Json<JsonValue>, JsonRejection>) -> ApiResult<Entry> {
    let Json(value) = payload.map_err(|rej| ApiError::validation("body", rej.body_text()))?;
    validate_entry(&value).map_err(ApiError::Validation)
}

fn message(text: &str) -> Json<JsonValue> {
    Json(json!({ "message": text }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /data`
pub async fn list(State(state): State<SharedState>) -> ApiResult<Json<Vec<Entry>>> {
    let entries = blocking(move || state.all()).await?;
    log::debug!("Listing {} entries", entries.len());
    Ok(Json(entries))
}

/// `GET /data/:id`
pub async fn show(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entry>> {
    let position = parse_position(&id)?;
    let entry = blocking(move || state.get(position)).await?;
    Ok(Json(entry))
}

/// `POST /data`
pub async fn create(
    State(state): State<SharedState>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<Json<JsonValue>> {
    let entry = parse_entry(payload)?;
    let position = blocking(move || state.append(entry)).await?;
    log::info!("Added entry at position {position}");
    Ok(message("Data added successfully"))
}

/// `PUT /data/:id`
pub async fn update(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<Json<JsonValue>> {
    let position = parse_position(&id)?;
    let entry = parse_entry(payload)?;
    blocking(move || state.update_at(position, entry)).await?;
    log::info!("Updated entry at position {position}");
    Ok(message("Data updated successfully"))
}

/// `DELETE /data/:id`
pub async fn remove(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JsonValue>> {
    let position = parse_position(&id)?;
    blocking(move || state.delete_at(position)).await?;
    log::info!("Deleted entry at position {position}");
    Ok(message("Data deleted successfully"))
}
