use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tracing::debug;

use univia_core::CoreError;
use univia_core::form::{Document, SubmissionForm};
use univia_types::api::{Claims, FilterQuery, MySubmissionsQuery, SubmitQuery};
use univia_types::models::{Category, InvalidValue};

use crate::error::ApiError;
use crate::middleware::actor;
use crate::state::AppState;

/// POST /submissions: form fields in the query string, the document as the raw body.
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SubmitQuery>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // Bodies past the router limit surface as the same field error as any oversized document.
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::from(CoreError::validation(
                "document",
                format!("document exceeds {} bytes", state.max_document_bytes),
            ))
        } else {
            ApiError::new(rejection.status(), rejection.body_text())
        }
    })?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| *ct != "application/octet-stream")
        .map(str::to_string);

    let document = (!bytes.is_empty()).then(|| Document {
        file_name: query.file_name,
        content_type,
        bytes,
    });
    let form = SubmissionForm {
        category: parse_category(&query.category)?,
        title: query.title,
        semester: query.semester,
        section: query.section,
        document,
    };

    let owner = claims.sub;
    let report = move |pct: u8| debug!("Upload for {}: {}%", owner, pct);
    let submission = state.workflow.submit(owner, form, &report).await?;

    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /submissions/mine: the caller's own records, newest first.
pub async fn mine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MySubmissionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let category = query.category.as_deref().map(parse_category).transpose()?;
    let submissions = state.workflow.recorder().owned_by(claims.sub, category).await?;
    Ok(Json(submissions))
}

/// GET /submissions: teacher filter by category, semester and section.
pub async fn filter(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    actor(&claims).require_teacher()?;
    let views = state.retrieval.query(&query).await?;
    Ok(Json(views))
}

fn parse_category(raw: &str) -> Result<Category, CoreError> {
    raw.parse()
        .map_err(|e: InvalidValue| CoreError::validation("category", e.0))
}
