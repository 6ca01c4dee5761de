use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use univia_types::api::{Claims, SetDetainedRequest};

use crate::error::ApiError;
use crate::middleware::actor;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.roster.list_students(actor(&claims)).await?))
}

pub async fn set_detained(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetDetainedRequest>,
) -> Result<StatusCode, ApiError> {
    state.roster.set_detained(actor(&claims), id, req.detained).await?;
    Ok(StatusCode::NO_CONTENT)
}
