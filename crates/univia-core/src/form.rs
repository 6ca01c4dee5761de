use bytes::Bytes;

use univia_storage::sanitize_file_name;
use univia_types::models::{Category, Semester, Section};

use crate::CoreError;

pub const DEFAULT_CONTENT_TYPE: &str = "application/pdf";
const DEFAULT_EXTENSION: &str = "pdf";

/// The attached file, as picked by the user.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Raw form input for any submission category.
#[derive(Debug, Clone)]
pub struct SubmissionForm {
    pub category: Category,
    /// Certificate name, ECA course title or leave reason.
    pub title: String,
    pub semester: String,
    pub section: String,
    pub document: Option<Document>,
}

/// A form that passed validation. Only this type can reach the upload step.
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub category: Category,
    pub title: String,
    pub semester: Semester,
    pub section: Section,
    pub document: Document,
}

impl SubmissionForm {
    /// Field checks in form order. Pure: touches no store.
    pub fn validate(self, max_document_bytes: usize) -> Result<ValidSubmission, CoreError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(CoreError::validation("title", "must not be blank"));
        }

        let semester: Semester = self
            .semester
            .parse()
            .map_err(|e: univia_types::models::InvalidValue| CoreError::validation("semester", e.0))?;

        let section: Section = self
            .section
            .parse()
            .map_err(|e: univia_types::models::InvalidValue| CoreError::validation("section", e.0))?;

        let document = self
            .document
            .ok_or_else(|| CoreError::validation("document", "a document must be attached"))?;
        if document.bytes.is_empty() {
            return Err(CoreError::validation("document", "document is empty"));
        }
        if document.bytes.len() > max_document_bytes {
            return Err(CoreError::validation(
                "document",
                format!("document exceeds {} bytes", max_document_bytes),
            ));
        }

        Ok(ValidSubmission {
            category: self.category,
            title,
            semester,
            section,
            document,
        })
    }
}

impl ValidSubmission {
    /// Name the document is filed under, e.g. `Certificate_Hackathon.pdf`.
    pub fn document_name(&self) -> String {
        let extension = self
            .document
            .file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or(DEFAULT_EXTENSION)
            .to_ascii_lowercase();

        sanitize_file_name(&format!(
            "{}{}.{}",
            self.category.document_prefix(),
            self.title,
            extension
        ))
    }

    pub fn content_type(&self) -> String {
        self.document
            .content_type
            .clone()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.into())
    }
}
