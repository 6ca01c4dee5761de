use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use univia_db::{SubmissionRepository, UserRepository};
use univia_storage::direct_download_url;
use univia_types::api::{FilterQuery, SubmissionView};
use univia_types::models::{Category, InvalidValue, Section, Semester, Submission, UserProfile};

use crate::{CoreError, blocking};

/// Teacher-side view over every student's submissions.
pub struct RetrievalView {
    users: Arc<dyn UserRepository>,
    submissions: Arc<dyn SubmissionRepository>,
}

impl RetrievalView {
    pub fn new(users: Arc<dyn UserRepository>, submissions: Arc<dyn SubmissionRepository>) -> Self {
        Self { users, submissions }
    }

    /// Records of one category matching semester and section, newest first.
    ///
    /// The student set and the category are each read once.
    pub async fn query(&self, filter: &FilterQuery) -> Result<Vec<SubmissionView>, CoreError> {
        let category: Category = filter
            .category
            .parse()
            .map_err(|e: InvalidValue| CoreError::validation("category", e.0))?;
        let semester: Semester = filter
            .semester
            .parse()
            .map_err(|e: InvalidValue| CoreError::validation("semester", e.0))?;
        if filter.section.trim().is_empty() {
            debug!("Filter on {} with empty section; nothing to match", category);
            return Ok(Vec::new());
        }
        let section: Section = filter
            .section
            .parse()
            .map_err(|e: InvalidValue| CoreError::validation("section", e.0))?;

        let users = self.users.clone();
        let students = blocking(move || users.list_students()).await?;

        let repo = self.submissions.clone();
        let records = blocking(move || repo.in_category(category)).await?;

        let views = filter_submissions(&students, records, semester, section);
        debug!(
            "Filter {} semester {} section {}: {} records across {} students",
            category,
            semester,
            section,
            views.len(),
            students.len()
        );
        Ok(views)
    }
}

/// Join students in `section` with their records for `semester`.
///
/// A record is kept only when both its owner's section and its own section
/// equal the query section.
pub fn filter_submissions(
    students: &[UserProfile],
    records: Vec<Submission>,
    semester: Semester,
    section: Section,
) -> Vec<SubmissionView> {
    let names: HashMap<Uuid, &str> = students
        .iter()
        .filter(|s| s.section == Some(section))
        .map(|s| (s.id, s.name.as_str()))
        .collect();

    let mut views: Vec<SubmissionView> = records
        .into_iter()
        .filter(|r| r.semester == semester && r.section == section)
        .filter_map(|r| {
            let name = names.get(&r.owner_id)?.to_string();
            Some(SubmissionView {
                download_url: direct_download_url(&r.document_link),
                student_name: name,
                submission: r,
            })
        })
        .collect();

    views.sort_by(|a, b| b.submission.created_at.cmp(&a.submission.created_at));
    views
}
