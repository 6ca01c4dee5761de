use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use univia_types::models::{Category, ExamEntry, Message, Submission, UserProfile};

use crate::Database;
use crate::models::{
    DATE_FORMAT, ExamEntryRow, MessageRow, SubmissionRow, TIME_FORMAT, UserRow, format_timestamp,
};
use crate::repos::{ExamRepository, MessageRepository, NewUser, SubmissionRepository, UserRepository};

const USER_COLUMNS: &str =
    "id, email, password, name, external_id, section, batch, role, detained, created_at";

const SUBMISSION_COLUMNS: &str =
    "id, owner_id, category, title, semester, section, document_link, created_at";

// -- Users --

impl UserRepository for Database {
    fn create_user(&self, user: &NewUser) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, name, external_id, section, batch, role, detained, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
                params![
                    user.id.to_string(),
                    user.email,
                    user.password_hash,
                    user.name,
                    user.external_id,
                    user.section.map(String::from),
                    user.batch,
                    user.role.as_str(),
                    format_timestamp(&user.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn credentials_by_email(&self, email: &str) -> Result<Option<(Uuid, String)>> {
        self.with_conn(|conn| {
            let row = query_user(conn, "email = ?1", email)?;
            Ok(row.and_then(|r| {
                let id = r.id.parse().ok()?;
                Some((id, r.password))
            }))
        })
    }

    fn profile(&self, id: Uuid) -> Result<Option<UserProfile>> {
        self.with_conn(|conn| {
            let row = query_user(conn, "id = ?1", &id.to_string())?;
            Ok(row.and_then(UserRow::into_profile))
        })
    }

    fn list_students(&self) -> Result<Vec<UserProfile>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE role = 'student' ORDER BY name COLLATE NOCASE",
                USER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().filter_map(UserRow::into_profile).collect())
        })
    }

    fn set_detained(&self, id: Uuid, detained: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET detained = ?1 WHERE id = ?2 AND role = 'student'",
                params![detained, id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        name: row.get(3)?,
        external_id: row.get(4)?,
        section: row.get(5)?,
        batch: row.get(6)?,
        role: row.get(7)?,
        detained: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, predicate);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

// -- Submissions --

impl SubmissionRepository for Database {
    fn append(&self, submission: &Submission) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO submissions (id, owner_id, category, title, semester, section, document_link, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    submission.id.to_string(),
                    submission.owner_id.to_string(),
                    submission.category.as_str(),
                    submission.title,
                    submission.semester.get(),
                    String::from(submission.section),
                    submission.document_link,
                    format_timestamp(&submission.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn owned_by(&self, owner: Uuid, category: Option<Category>) -> Result<Vec<Submission>> {
        self.with_conn(|conn| {
            let owner = owner.to_string();
            let rows = match category {
                Some(category) => query_submissions(
                    conn,
                    "owner_id = ?1 AND category = ?2",
                    params![owner, category.as_str()],
                )?,
                None => query_submissions(conn, "owner_id = ?1", params![owner])?,
            };
            Ok(rows)
        })
    }

    fn in_category(&self, category: Category) -> Result<Vec<Submission>> {
        self.with_conn(|conn| query_submissions(conn, "category = ?1", params![category.as_str()]))
    }
}

fn query_submissions(
    conn: &Connection,
    predicate: &str,
    values: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Submission>> {
    let sql = format!(
        "SELECT {} FROM submissions WHERE {} ORDER BY created_at DESC",
        SUBMISSION_COLUMNS, predicate
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(values, |row| {
            Ok(SubmissionRow {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                category: row.get(2)?,
                title: row.get(3)?,
                semester: row.get(4)?,
                section: row.get(5)?,
                document_link: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows.into_iter().filter_map(SubmissionRow::into_submission).collect())
}

// -- Messages --

impl MessageRepository for Database {
    fn insert_message(&self, message: &Message) -> Result<()> {
        let date = message
            .date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (id, author_id, content, date, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    message.id.to_string(),
                    message.author_id.to_string(),
                    message.content,
                    date,
                    format_timestamp(&message.created_at),
                ],
            )?;
            Ok(())
        })
    }

    fn list_messages(&self) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, author_id, content, date, created_at FROM messages ORDER BY created_at")?;
            let mut rows = stmt
                .query_map([], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        content: row.get(2)?,
                        date: row.get(3)?,
                        created_at: row.get(4)?,
                        read_by: Vec::new(),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // One pass over the read table instead of a query per message
            let mut reads: HashMap<String, Vec<String>> = HashMap::new();
            let mut stmt = conn.prepare("SELECT message_id, reader_id FROM message_reads")?;
            let pairs = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
            for pair in pairs {
                let (message_id, reader_id) = pair?;
                reads.entry(message_id).or_default().push(reader_id);
            }

            for row in &mut rows {
                if let Some(readers) = reads.remove(&row.id) {
                    row.read_by = readers;
                }
            }

            Ok(rows.into_iter().filter_map(MessageRow::into_message).collect())
        })
    }

    fn delete_message(&self, id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let id = id.to_string();
            conn.execute("DELETE FROM message_reads WHERE message_id = ?1", [&id])?;
            let removed = conn.execute("DELETE FROM messages WHERE id = ?1", [&id])?;
            Ok(removed > 0)
        })
    }

    fn mark_read(&self, message_id: Uuid, reader: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let message_id = message_id.to_string();
            let exists: Option<String> = conn
                .query_row("SELECT id FROM messages WHERE id = ?1", [&message_id], |row| row.get(0))
                .optional()?;
            if exists.is_none() {
                return Ok(false);
            }

            conn.execute(
                "INSERT OR IGNORE INTO message_reads (message_id, reader_id, read_at) VALUES (?1, ?2, ?3)",
                params![message_id, reader.to_string(), format_timestamp(&chrono::Utc::now())],
            )?;
            Ok(true)
        })
    }
}

// -- Exam timetable --

impl ExamRepository for Database {
    fn insert_entry(&self, entry: &ExamEntry) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO exam_entries (id, exam_title, subject, exam_date, exam_time, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.id.to_string(),
                    entry.exam_title,
                    entry.subject,
                    entry.date.format(DATE_FORMAT).to_string(),
                    entry.time.format(TIME_FORMAT).to_string(),
                    format_timestamp(&chrono::Utc::now()),
                ],
            )?;
            Ok(())
        })
    }

    fn list_entries(&self) -> Result<Vec<ExamEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, exam_title, subject, exam_date, exam_time
                 FROM exam_entries
                 ORDER BY exam_title, exam_date, exam_time",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ExamEntryRow {
                        id: row.get(0)?,
                        exam_title: row.get(1)?,
                        subject: row.get(2)?,
                        exam_date: row.get(3)?,
                        exam_time: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().filter_map(ExamEntryRow::into_entry).collect())
        })
    }

    fn delete_entry(&self, exam_title: &str, id: Uuid) -> Result<(bool, usize)> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM exam_entries WHERE id = ?1 AND exam_title = ?2",
                params![id.to_string(), exam_title],
            )?;
            let left: i64 = conn.query_row(
                "SELECT COUNT(*) FROM exam_entries WHERE exam_title = ?1",
                [exam_title],
                |row| row.get(0),
            )?;
            Ok((removed > 0, left as usize))
        })
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
