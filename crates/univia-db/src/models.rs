//! Database row types. These map directly to SQLite rows.
//! Conversion into univia-types models drops rows with corrupt columns
//! (logged) instead of failing the whole query.
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use univia_types::models::{ExamEntry, Message, Submission, UserProfile};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub external_id: String,
    pub section: Option<String>,
    pub batch: String,
    pub role: String,
    pub detained: bool,
    pub created_at: String,
}

pub struct SubmissionRow {
    pub id: String,
    pub owner_id: String,
    pub category: String,
    pub title: String,
    pub semester: i64,
    pub section: String,
    pub document_link: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub date: String,
    pub created_at: String,
    pub read_by: Vec<String>,
}

pub struct ExamEntryRow {
    pub id: String,
    pub exam_title: String,
    pub subject: String,
    pub exam_date: String,
    pub exam_time: String,
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; treat it as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .ok()
}

fn parse_id(raw: &str, what: &str, row_id: &str) -> Option<Uuid> {
    raw.parse()
        .map_err(|e| warn!("Corrupt {} '{}' on row '{}': {}", what, raw, row_id, e))
        .ok()
}

impl UserRow {
    pub fn into_profile(self) -> Option<UserProfile> {
        let id = parse_id(&self.id, "user id", &self.id)?;
        let role = self
            .role
            .parse()
            .map_err(|e| warn!("Corrupt role on user '{}': {}", self.id, e))
            .ok()?;
        // A teacher has no section; a malformed one is treated the same way.
        let section = self.section.as_deref().and_then(|s| {
            s.parse()
                .map_err(|e| warn!("Corrupt section on user '{}': {}", self.id, e))
                .ok()
        });
        let created_at = parse_timestamp(&self.created_at).unwrap_or_else(|| {
            warn!("Corrupt created_at '{}' on user '{}'", self.created_at, self.id);
            DateTime::default()
        });

        Some(UserProfile {
            id,
            email: self.email,
            name: self.name,
            external_id: self.external_id,
            section,
            batch: self.batch,
            role,
            detained: self.detained,
            created_at,
        })
    }
}

impl SubmissionRow {
    pub fn into_submission(self) -> Option<Submission> {
        let id = parse_id(&self.id, "submission id", &self.id)?;
        let owner_id = parse_id(&self.owner_id, "owner_id", &self.id)?;
        let category = self
            .category
            .parse()
            .map_err(|e| warn!("Corrupt category on submission '{}': {}", self.id, e))
            .ok()?;
        let semester = u8::try_from(self.semester)
            .ok()
            .and_then(|s| univia_types::models::Semester::new(s).ok())
            .or_else(|| {
                warn!("Corrupt semester {} on submission '{}'", self.semester, self.id);
                None
            })?;
        let section = self
            .section
            .parse()
            .map_err(|e| warn!("Corrupt section on submission '{}': {}", self.id, e))
            .ok()?;
        let created_at = parse_timestamp(&self.created_at).or_else(|| {
            warn!("Corrupt created_at '{}' on submission '{}'", self.created_at, self.id);
            None
        })?;

        Some(Submission {
            id,
            category,
            owner_id,
            title: self.title,
            semester,
            section,
            document_link: self.document_link,
            created_at,
        })
    }
}

impl MessageRow {
    pub fn into_message(self) -> Option<Message> {
        let id = parse_id(&self.id, "message id", &self.id)?;
        let author_id = parse_id(&self.author_id, "author_id", &self.id)?;
        // An unparseable date keeps the message visible; it just sorts last.
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|e| warn!("Corrupt date '{}' on message '{}': {}", self.date, self.id, e))
            .ok();
        let created_at = parse_timestamp(&self.created_at).unwrap_or_else(|| {
            warn!("Corrupt created_at '{}' on message '{}'", self.created_at, self.id);
            DateTime::default()
        });
        let read_by: BTreeSet<Uuid> = self
            .read_by
            .iter()
            .filter_map(|r| parse_id(r, "reader_id", &self.id))
            .collect();

        Some(Message {
            id,
            author_id,
            content: self.content,
            date,
            created_at,
            read_by,
        })
    }
}

impl ExamEntryRow {
    pub fn into_entry(self) -> Option<ExamEntry> {
        let id = parse_id(&self.id, "exam entry id", &self.id)?;
        let date = NaiveDate::parse_from_str(&self.exam_date, DATE_FORMAT)
            .map_err(|e| warn!("Corrupt date '{}' on exam entry '{}': {}", self.exam_date, self.id, e))
            .ok()?;
        let time = NaiveTime::parse_from_str(&self.exam_time, TIME_FORMAT)
            .map_err(|e| warn!("Corrupt time '{}' on exam entry '{}': {}", self.exam_time, self.id, e))
            .ok()?;

        Some(ExamEntry {
            id,
            exam_title: self.exam_title,
            subject: self.subject,
            date,
            time,
        })
    }
}
