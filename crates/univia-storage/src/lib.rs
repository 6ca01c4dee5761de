//! Document Store Adapter: puts a submitted document into a remote or local
//! object store and hands back a shareable link.

pub mod drive;
pub mod folders;
pub mod links;
pub mod local;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub use drive::DriveStore;
pub use folders::FolderMap;
pub use links::direct_download_url;
pub use local::LocalStore;

/// Progress callback, called with coarse percentages in 0..=100.
pub type Progress<'a> = &'a (dyn Fn(u8) + Send + Sync);

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("document is empty")]
    Empty,
    #[error("invalid path component '{0}'")]
    InvalidPath(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("credentials error: {0}")]
    Credentials(String),
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("remote store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// One document to upload into a destination folder.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub folder: String,
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub file_id: String,
    pub link: String,
    pub size: u64,
    pub sha256: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Upload and return the confirmed link. `progress` ends at 100 only on success.
    async fn upload(
        &self,
        request: UploadRequest,
        progress: Progress<'_>,
    ) -> Result<StoredDocument, StorageError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_` so a title can be used
/// as a file name on any backend.
pub fn sanitize_file_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() { "document".into() } else { cleaned }
}

/// Turns byte counts into coarse 10% steps. Never reports 100 until `finish`.
pub(crate) struct ProgressTracker<'a> {
    total: u64,
    sent: u64,
    last: Option<u8>,
    callback: Progress<'a>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn start(total: u64, callback: Progress<'a>) -> Self {
        let mut tracker = Self { total, sent: 0, last: None, callback };
        tracker.emit(0);
        tracker
    }

    pub(crate) fn advance(&mut self, bytes: u64) {
        self.sent = (self.sent + bytes).min(self.total);
        let pct = if self.total == 0 { 0 } else { self.sent * 100 / self.total };
        let step = ((pct / 10) * 10).min(90) as u8;
        self.emit(step);
    }

    pub(crate) fn finish(&mut self) {
        self.emit(100);
    }

    fn emit(&mut self, pct: u8) {
        if self.last.is_none_or(|last| pct > last) {
            self.last = Some(pct);
            (self.callback)(pct);
        }
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
