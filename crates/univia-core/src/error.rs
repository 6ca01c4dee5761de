use univia_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Rejected form input. Raised before any store or network call.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("local state error: {0}")]
    LocalState(#[from] std::io::Error),
}

impl CoreError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}
