use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use univia_db::{Database, NewUser, UserRepository};
use univia_storage::{DocumentStore, Progress, StorageError, StoredDocument, UploadRequest};
use univia_types::models::Role;

/// Document store double that counts uploads and can be told to fail.
#[derive(Default)]
pub struct FakeStore {
    pub uploads: AtomicUsize,
    pub fail: bool,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn upload(
        &self,
        request: UploadRequest,
        progress: Progress<'_>,
    ) -> Result<StoredDocument, StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        progress(0);
        if self.fail {
            return Err(StorageError::Rejected {
                status: 503,
                body: "backend unavailable".into(),
            });
        }
        progress(100);
        Ok(StoredDocument {
            file_id: "file-1".into(),
            link: format!("https://drive.google.com/file/d/{}/view?usp=sharing", request.folder),
            size: request.bytes.len() as u64,
            sha256: String::new(),
        })
    }

    fn backend(&self) -> &'static str {
        "fake"
    }
}

pub fn database() -> Arc<Database> {
    Arc::new(Database::open_in_memory().unwrap())
}

pub fn add_user(db: &Database, name: &str, role: Role, section: Option<&str>) -> Uuid {
    let id = Uuid::new_v4();
    db.create_user(&NewUser {
        id,
        email: format!("{}@uni.test", name.to_lowercase()),
        password_hash: "hash".into(),
        name: name.into(),
        external_id: format!("AU-{}", name),
        section: section.map(|s| s.parse().unwrap()),
        batch: "2022".into(),
        role,
        created_at: Utc::now(),
    })
    .unwrap();
    id
}
