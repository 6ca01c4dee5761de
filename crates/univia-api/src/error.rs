use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use univia_core::CoreError;
use univia_types::api::ErrorBody;

/// Error response: a status code plus a JSON `{field, error}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                field: None,
                error: message.into(),
            },
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "invalid or missing credentials")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { field, reason } => Self {
                status: StatusCode::BAD_REQUEST,
                body: ErrorBody {
                    field: Some(field.to_string()),
                    error: reason,
                },
            },
            CoreError::Forbidden(msg) => Self::new(StatusCode::FORBIDDEN, msg),
            e @ CoreError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            CoreError::Conflict(msg) => Self::new(StatusCode::CONFLICT, msg),
            e @ CoreError::Upload(_) => {
                error!("{}", e);
                Self::new(StatusCode::BAD_GATEWAY, "document upload failed")
            }
            e @ (CoreError::Store(_) | CoreError::Join(_) | CoreError::LocalState(_)) => {
                error!("{}", e);
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
