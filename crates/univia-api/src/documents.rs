use axum::{
    Extension,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tokio_util::io::ReaderStream;
use tracing::error;

use univia_storage::StorageError;
use univia_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /documents/{folder}/{file}: streams a document kept on local disk.
pub async fn download(
    State(state): State<AppState>,
    Path((folder, file)): Path<(String, String)>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state
        .local_documents
        .as_ref()
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "documents are not served here"))?;

    let (handle, len) = store.open(&folder, &file).await.map_err(|e| match e {
        StorageError::InvalidPath(_) => ApiError::new(StatusCode::BAD_REQUEST, e.to_string()),
        StorageError::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
            ApiError::new(StatusCode::NOT_FOUND, "document not found")
        }
        other => {
            error!("Failed to open document {}/{}: {}", folder, file, other);
            ApiError::internal()
        }
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&file).to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        Body::from_stream(ReaderStream::new(handle)),
    ))
}

fn content_type_for(file: &str) -> &'static str {
    match file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
