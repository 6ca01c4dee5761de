use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use univia_types::api::{Claims, CreateExamEntryRequest};

use crate::error::ApiError;
use crate::middleware::actor;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.timetable.list().await?))
}

pub async fn add(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateExamEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state.timetable.add(actor(&claims), req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Idempotent: deleting an entry that is already gone reports `entry_removed: false`.
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((title, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.timetable.delete(actor(&claims), &title, id).await?))
}
