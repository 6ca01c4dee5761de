use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use univia_db::SubmissionRepository;
use univia_types::models::{Category, Submission};

use crate::{CoreError, blocking};

/// Writes submission metadata once its document link is confirmed.
#[derive(Clone)]
pub struct MetadataRecorder {
    submissions: Arc<dyn SubmissionRepository>,
}

impl MetadataRecorder {
    pub fn new(submissions: Arc<dyn SubmissionRepository>) -> Self {
        Self { submissions }
    }

    /// Append a new record. Each call adds a row; nothing is overwritten.
    pub async fn record(&self, submission: &Submission) -> Result<(), CoreError> {
        let repo = self.submissions.clone();
        let row = submission.clone();
        blocking(move || repo.append(&row)).await?;

        info!(
            "Recorded {} submission {} for {}",
            submission.category, submission.id, submission.owner_id
        );
        Ok(())
    }

    /// The owner's own submissions, newest first.
    pub async fn owned_by(
        &self,
        owner: Uuid,
        category: Option<Category>,
    ) -> Result<Vec<Submission>, CoreError> {
        let repo = self.submissions.clone();
        blocking(move || repo.owned_by(owner, category)).await
    }
}
