use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use univia_db::UserRepository;
use univia_storage::{DocumentStore, FolderMap, Progress, UploadRequest};
use univia_types::models::{Role, Submission};

use crate::form::SubmissionForm;
use crate::recorder::MetadataRecorder;
use crate::{CoreError, blocking};

/// 50 MB upload limit for documents
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 50 * 1024 * 1024;

/// Validate → upload → record, for every submission category.
pub struct SubmissionWorkflow {
    store: Arc<dyn DocumentStore>,
    recorder: MetadataRecorder,
    users: Arc<dyn UserRepository>,
    folders: FolderMap,
    max_document_bytes: usize,
}

impl SubmissionWorkflow {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        recorder: MetadataRecorder,
        users: Arc<dyn UserRepository>,
        folders: FolderMap,
    ) -> Self {
        Self {
            store,
            recorder,
            users,
            folders,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    pub fn with_max_document_bytes(mut self, limit: usize) -> Self {
        self.max_document_bytes = limit;
        self
    }

    pub fn recorder(&self) -> &MetadataRecorder {
        &self.recorder
    }

    /// Submit a document for `owner`.
    ///
    /// Invalid forms are rejected before any store is touched. The metadata
    /// record is written only after the store confirms the link, so a failed
    /// upload leaves nothing behind.
    pub async fn submit(
        &self,
        owner: Uuid,
        form: SubmissionForm,
        progress: Progress<'_>,
    ) -> Result<Submission, CoreError> {
        let valid = form.validate(self.max_document_bytes)?;

        let users = self.users.clone();
        let profile = blocking(move || users.profile(owner)).await?.ok_or_else(|| {
            error!("Submission by {} aborted: no user record", owner);
            CoreError::NotFound(format!("user {}", owner))
        })?;
        if profile.role != Role::Student {
            return Err(CoreError::Forbidden("only students submit documents".into()));
        }
        if profile.detained {
            return Err(CoreError::Forbidden("detained students cannot submit documents".into()));
        }

        let request = UploadRequest {
            folder: self.folders.folder_for(valid.category).to_string(),
            name: valid.document_name(),
            content_type: valid.content_type(),
            bytes: valid.document.bytes.clone(),
        };
        debug!(
            "Uploading {} ({} bytes) to {} via {}",
            request.name,
            request.bytes.len(),
            request.folder,
            self.store.backend()
        );

        let stored = self.store.upload(request, progress).await.map_err(|e| {
            error!("Upload of {} submission for {} failed: {}", valid.category, owner, e);
            CoreError::Upload(e)
        })?;

        let submission = Submission {
            id: Uuid::new_v4(),
            category: valid.category,
            owner_id: owner,
            title: valid.title,
            semester: valid.semester,
            section: valid.section,
            document_link: stored.link,
            created_at: Utc::now(),
        };

        if let Err(e) = self.recorder.record(&submission).await {
            warn!(
                "Document {} uploaded but its record failed; link orphaned: {}",
                submission.document_link, e
            );
            return Err(e);
        }

        info!(
            "{} submitted {} '{}' (semester {}, section {})",
            profile.name, submission.category, submission.title, submission.semester, submission.section
        );
        Ok(submission)
    }
}
