use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::info;
use uuid::Uuid;

use univia_db::ExamRepository;
use univia_db::models::{DATE_FORMAT, TIME_FORMAT};
use univia_types::api::{CreateExamEntryRequest, EntryRemoval, ExamGroup};
use univia_types::models::ExamEntry;

use crate::{Actor, CoreError, blocking};

#[derive(Clone)]
pub struct ExamTimetable {
    entries: Arc<dyn ExamRepository>,
}

impl ExamTimetable {
    pub fn new(entries: Arc<dyn ExamRepository>) -> Self {
        Self { entries }
    }

    pub async fn add(&self, actor: Actor, request: CreateExamEntryRequest) -> Result<ExamEntry, CoreError> {
        actor.require_teacher()?;
        let entry = parse_entry(request)?;

        let repo = self.entries.clone();
        let row = entry.clone();
        blocking(move || repo.insert_entry(&row)).await?;

        info!("Exam entry {} added under '{}'", entry.id, entry.exam_title);
        Ok(entry)
    }

    /// Entries grouped by exam title, titles in order, entries by date then time.
    pub async fn list(&self) -> Result<Vec<ExamGroup>, CoreError> {
        let repo = self.entries.clone();
        let entries = blocking(move || repo.list_entries()).await?;
        Ok(group_by_title(entries))
    }

    /// Remove one entry. Removing the last entry of a title removes the title.
    /// Deleting something already gone is not an error.
    pub async fn delete(&self, actor: Actor, exam_title: &str, id: Uuid) -> Result<EntryRemoval, CoreError> {
        actor.require_teacher()?;
        let repo = self.entries.clone();
        let title = exam_title.to_string();
        let (entry_removed, left) = blocking(move || repo.delete_entry(&title, id)).await?;

        let removal = EntryRemoval {
            entry_removed,
            title_removed: entry_removed && left == 0,
        };
        if removal.title_removed {
            info!("Exam '{}' removed with its last entry", exam_title);
        }
        Ok(removal)
    }
}

fn required(field: &'static str, value: String) -> Result<String, CoreError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        Err(CoreError::validation(field, "required"))
    } else {
        Ok(value)
    }
}

fn parse_entry(request: CreateExamEntryRequest) -> Result<ExamEntry, CoreError> {
    let exam_title = required("exam_title", request.exam_title)?;
    let subject = required("subject", request.subject)?;
    let date = NaiveDate::parse_from_str(&required("date", request.date)?, DATE_FORMAT)
        .map_err(|_| CoreError::validation("date", "expected YYYY-MM-DD"))?;
    let time = NaiveTime::parse_from_str(&required("time", request.time)?, TIME_FORMAT)
        .map_err(|_| CoreError::validation("time", "expected HH:MM"))?;

    Ok(ExamEntry {
        id: Uuid::new_v4(),
        exam_title,
        subject,
        date,
        time,
    })
}

/// Assumes `entries` arrive ordered by title.
fn group_by_title(entries: Vec<ExamEntry>) -> Vec<ExamGroup> {
    let mut groups: Vec<ExamGroup> = Vec::new();
    for entry in entries {
        match groups.last_mut() {
            Some(group) if group.exam_title == entry.exam_title => group.entries.push(entry),
            _ => groups.push(ExamGroup {
                exam_title: entry.exam_title.clone(),
                entries: vec![entry],
            }),
        }
    }
    groups
}
