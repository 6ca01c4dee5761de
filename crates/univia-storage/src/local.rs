use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    DocumentStore, Progress, ProgressTracker, StorageError, StoredDocument, UploadRequest,
    sanitize_file_name, sha256_hex,
};

const WRITE_CHUNK: usize = 64 * 1024;

/// Stores documents on local disk.
///
/// Each document lives at `{root}/{folder}/{file_id}-{name}` and is served back
/// by the API under `{public_base}/documents/{folder}/{file}`.
pub struct LocalStore {
    root: PathBuf,
    public_base: String,
}

impl LocalStore {
    pub async fn new(root: PathBuf, public_base: impl Into<String>) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        info!("Document storage directory: {}", root.display());
        Ok(Self {
            root,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a stored document, rejecting anything that could escape the root.
    pub fn file_path(&self, folder: &str, file: &str) -> Result<PathBuf, StorageError> {
        check_component(folder)?;
        check_component(file)?;
        Ok(self.root.join(folder).join(file))
    }

    /// Open a stored document for streaming. Returns the file and its length.
    pub async fn open(&self, folder: &str, file: &str) -> Result<(fs::File, u64), StorageError> {
        let path = self.file_path(folder, file)?;
        let handle = fs::File::open(&path).await?;
        let len = handle.metadata().await?.len();
        Ok((handle, len))
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn upload(
        &self,
        request: UploadRequest,
        progress: Progress<'_>,
    ) -> Result<StoredDocument, StorageError> {
        if request.bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        check_component(&request.folder)?;

        let file_id = Uuid::new_v4().simple().to_string();
        let file_name = format!("{}-{}", file_id, sanitize_file_name(&request.name));
        let dir = self.root.join(&request.folder);
        fs::create_dir_all(&dir).await?;

        let path = dir.join(&file_name);
        let mut tracker = ProgressTracker::start(request.bytes.len() as u64, progress);
        let mut file = fs::File::create(&path).await?;
        write_or_discard(&path, &mut file, &request.bytes, &mut tracker).await?;
        if let Err(e) = file.sync_all().await {
            discard_partial(&path).await;
            return Err(e.into());
        }
        tracker.finish();

        debug!("Stored {} ({} bytes)", path.display(), request.bytes.len());

        Ok(StoredDocument {
            link: format!("{}/documents/{}/{}", self.public_base, request.folder, file_name),
            file_id,
            size: request.bytes.len() as u64,
            sha256: sha256_hex(&request.bytes),
        })
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

/// Write `bytes` in chunks, removing the file at `path` if any write fails.
async fn write_or_discard<W>(
    path: &Path,
    writer: &mut W,
    bytes: &[u8],
    tracker: &mut ProgressTracker<'_>,
) -> Result<(), StorageError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        for chunk in bytes.chunks(WRITE_CHUNK) {
            writer.write_all(chunk).await?;
            tracker.advance(chunk.len() as u64);
        }
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        discard_partial(path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn discard_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => warn!("Removed partially written {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial {}: {}", path.display(), e),
    }
}

fn check_component(part: &str) -> Result<(), StorageError> {
    let ok = !part.is_empty()
        && part != "."
        && part != ".."
        && part.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if ok { Ok(()) } else { Err(StorageError::InvalidPath(part.to_string())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Mutex;
    use tokio::io::AsyncReadExt;

    fn request(folder: &str, bytes: &'static [u8]) -> UploadRequest {
        UploadRequest {
            folder: folder.into(),
            name: "Certificate_Hackathon.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[tokio::test]
    async fn upload_writes_file_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().to_path_buf(), "http://localhost:3000/").await.unwrap();
        let seen = Mutex::new(Vec::new());
        let record = |p: u8| seen.lock().unwrap().push(p);

        let stored = store.upload(request("certs", b"%PDF-1.4 hello"), &record).await.unwrap();

        assert!(stored.link.starts_with("http://localhost:3000/documents/certs/"));
        assert!(stored.link.ends_with("-Certificate_Hackathon.pdf"));
        assert_eq!(stored.size, 14);
        assert_eq!(stored.sha256.len(), 64);

        let file = stored.link.rsplit('/').next().unwrap();
        let (mut handle, len) = store.open("certs", file).await.unwrap();
        let mut body = Vec::new();
        handle.read_to_end(&mut body).await.unwrap();
        assert_eq!(len, 14);
        assert_eq!(body, b"%PDF-1.4 hello");

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test]
    async fn rejects_traversal_and_empty_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().to_path_buf(), "http://localhost").await.unwrap();
        let noop = |_: u8| {};

        assert!(matches!(
            store.upload(request("..", b"x"), &noop).await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            store.upload(request("certs", b""), &noop).await,
            Err(StorageError::Empty)
        ));
        assert!(store.file_path("certs", "../secret").is_err());
    }

    /// Accepts the first chunk, then fails like a full disk.
    struct FullDisk {
        inner: fs::File,
        written: usize,
    }

    impl AsyncWrite for FullDisk {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            if self.written >= WRITE_CHUNK {
                return std::task::Poll::Ready(Err(std::io::Error::other("no space left on device")));
            }
            let this = &mut *self;
            let poll = std::pin::Pin::new(&mut this.inner).poll_write(cx, buf);
            if let std::task::Poll::Ready(Ok(n)) = &poll {
                this.written += n;
            }
            poll
        }

        fn poll_flush(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.inner).poll_flush(cx)
        }

        fn poll_shutdown(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::pin::Pin::new(&mut self.inner).poll_shutdown(cx)
        }
    }

    #[tokio::test]
    async fn failed_write_removes_the_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc-Leave_Fever.pdf");
        let mut writer = FullDisk {
            inner: fs::File::create(&path).await.unwrap(),
            written: 0,
        };
        let seen = Mutex::new(Vec::new());
        let record = |p: u8| seen.lock().unwrap().push(p);
        let mut tracker = ProgressTracker::start((WRITE_CHUNK * 3) as u64, &record);

        let document = vec![b'x'; WRITE_CHUNK * 3];
        let result = write_or_discard(&path, &mut writer, &document, &mut tracker).await;

        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(!path.exists());
        assert!(!seen.into_inner().unwrap().contains(&100));
    }
}
