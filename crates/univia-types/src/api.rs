use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ExamEntry, Landing, Role, Submission, UserProfile};

// -- JWT Claims --

/// JWT claims shared by the API middleware and any service validating tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub repeat_password: String,
    pub name: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub section: Option<String>,
    /// Present only when registering a teacher account.
    #[serde(default)]
    pub teacher_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
    pub landing: Landing,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
    pub landing: Landing,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub profile: UserProfile,
    pub landing: Landing,
}

// -- Submissions --

/// Form fields of a document submission. The document itself is the request body.
///
/// Every field is a raw string that defaults to empty, so a missing or
/// malformed value is reported by validation against its field name instead
/// of failing query extraction.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmitQuery {
    pub category: String,
    pub title: String,
    pub semester: String,
    pub section: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MySubmissionsQuery {
    pub category: Option<String>,
}

/// Teacher-side filter, raw as received. An empty section matches nothing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterQuery {
    pub category: String,
    pub semester: String,
    pub section: String,
}

/// A submission as shown in the teacher's filtered list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub student_name: String,
    pub download_url: String,
}

// -- Messages --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PostMessageRequest {
    pub content: String,
}

// -- Exam timetable --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateExamEntryRequest {
    pub exam_title: String,
    pub subject: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, 24-hour
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamGroup {
    pub exam_title: String,
    pub entries: Vec<ExamEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRemoval {
    pub entry_removed: bool,
    pub title_removed: bool,
}

// -- Roster --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SetDetainedRequest {
    pub detained: bool,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub error: String,
}
