//! Typed repository interfaces, one per entity.
//!
//! Callers never see table names or key paths; `Database` implements every
//! trait (see `queries.rs`) and services hold them as `Arc<dyn ...>` handles.
//! All methods block on SQLite, so async callers wrap them in
//! `tokio::task::spawn_blocking`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use univia_types::models::{Category, ExamEntry, Message, Role, Section, Submission, UserProfile};

/// Everything needed to insert an account row.
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub external_id: String,
    pub section: Option<Section>,
    pub batch: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

pub trait UserRepository: Send + Sync {
    fn create_user(&self, user: &NewUser) -> Result<()>;

    /// Returns `(user_id, password_hash)` for a login attempt.
    fn credentials_by_email(&self, email: &str) -> Result<Option<(Uuid, String)>>;

    fn profile(&self, id: Uuid) -> Result<Option<UserProfile>>;

    fn list_students(&self) -> Result<Vec<UserProfile>>;

    /// Returns false when no student with this id exists.
    fn set_detained(&self, id: Uuid, detained: bool) -> Result<bool>;
}

pub trait SubmissionRepository: Send + Sync {
    /// Additive insert; never replaces an existing record.
    fn append(&self, submission: &Submission) -> Result<()>;

    /// Newest first.
    fn owned_by(&self, owner: Uuid, category: Option<Category>) -> Result<Vec<Submission>>;

    fn in_category(&self, category: Category) -> Result<Vec<Submission>>;
}

pub trait MessageRepository: Send + Sync {
    fn insert_message(&self, message: &Message) -> Result<()>;

    /// All messages with their full reader sets, in storage order.
    fn list_messages(&self) -> Result<Vec<Message>>;

    fn delete_message(&self, id: Uuid) -> Result<bool>;

    /// Idempotent. Returns false when the message does not exist.
    fn mark_read(&self, message_id: Uuid, reader: Uuid) -> Result<bool>;
}

pub trait ExamRepository: Send + Sync {
    fn insert_entry(&self, entry: &ExamEntry) -> Result<()>;

    fn list_entries(&self) -> Result<Vec<ExamEntry>>;

    /// Returns `(entry_removed, entries_left_under_title)`.
    fn delete_entry(&self, exam_title: &str, id: Uuid) -> Result<(bool, usize)>;
}
