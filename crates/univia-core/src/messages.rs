use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use univia_db::MessageRepository;
use univia_types::models::{Message, Role};

use crate::poller::MessageSource;
use crate::{Actor, CoreError, blocking};

/// Notices posted by teachers, with per-reader read state.
#[derive(Clone)]
pub struct MessageBoard {
    messages: Arc<dyn MessageRepository>,
}

impl MessageBoard {
    pub fn new(messages: Arc<dyn MessageRepository>) -> Self {
        Self { messages }
    }

    pub async fn post(&self, actor: Actor, content: &str) -> Result<Message, CoreError> {
        actor.require_teacher()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(CoreError::validation("content", "message must not be blank"));
        }

        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            author_id: actor.id,
            content: content.to_string(),
            date: Some(now.date_naive()),
            created_at: now,
            read_by: Default::default(),
        };

        let repo = self.messages.clone();
        let row = message.clone();
        blocking(move || repo.insert_message(&row)).await?;

        info!("Message {} posted by {}", message.id, actor.id);
        Ok(message)
    }

    /// Every message, newest date first. Students only see their own read mark.
    pub async fn list_for(&self, actor: Actor) -> Result<Vec<Message>, CoreError> {
        let repo = self.messages.clone();
        let mut messages = blocking(move || repo.list_messages()).await?;

        sort_messages(&mut messages);
        if actor.role == Role::Student {
            for message in &mut messages {
                message.read_by.retain(|reader| *reader == actor.id);
            }
        }
        Ok(messages)
    }

    pub async fn delete(&self, actor: Actor, id: Uuid) -> Result<(), CoreError> {
        actor.require_teacher()?;
        let repo = self.messages.clone();
        if !blocking(move || repo.delete_message(id)).await? {
            return Err(CoreError::NotFound(format!("message {}", id)));
        }
        info!("Message {} deleted by {}", id, actor.id);
        Ok(())
    }

    /// Mark `id` read for the caller only. Repeating it changes nothing.
    pub async fn mark_read(&self, actor: Actor, id: Uuid) -> Result<(), CoreError> {
        let repo = self.messages.clone();
        let reader = actor.id;
        if !blocking(move || repo.mark_read(id, reader)).await? {
            return Err(CoreError::NotFound(format!("message {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSource for MessageBoard {
    async fn fetch_messages(&self, viewer: Actor) -> Result<Vec<Message>, CoreError> {
        self.list_for(viewer).await
    }
}

/// Date descending; undated (corrupt) messages last; ties by creation time, newest first.
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| {
        let by_date = match (a.date, b.date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date.then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    use crate::testing::{add_user, database};

    fn message(date: Option<&str>, age_secs: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content: "notice".into(),
            date: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            created_at: Utc::now() - Duration::seconds(age_secs),
            read_by: Default::default(),
        }
    }

    #[test]
    fn sort_puts_undated_last_and_breaks_ties_by_creation() {
        let older_same_day = message(Some("2024-03-02"), 50);
        let newer_same_day = message(Some("2024-03-02"), 5);
        let earlier_day = message(Some("2024-03-01"), 1);
        let undated = message(None, 0);

        let mut all = vec![undated.clone(), earlier_day.clone(), older_same_day.clone(), newer_same_day.clone()];
        sort_messages(&mut all);

        let ids: Vec<Uuid> = all.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![newer_same_day.id, older_same_day.id, earlier_day.id, undated.id]);
    }

    #[tokio::test]
    async fn read_state_is_tracked_per_reader() {
        let db = database();
        let teacher = Actor::new(add_user(&db, "Mrs Rao", Role::Teacher, None), Role::Teacher);
        let s1 = Actor::new(add_user(&db, "Asha", Role::Student, Some("A")), Role::Student);
        let s2 = Actor::new(add_user(&db, "Ravi", Role::Student, Some("A")), Role::Student);
        let board = MessageBoard::new(db.clone());

        let posted = board.post(teacher, "  Exams start Monday ").await.unwrap();
        assert_eq!(posted.content, "Exams start Monday");

        board.mark_read(s1, posted.id).await.unwrap();
        board.mark_read(s1, posted.id).await.unwrap();

        let for_s1 = board.list_for(s1).await.unwrap();
        let for_s2 = board.list_for(s2).await.unwrap();
        assert!(for_s1[0].is_read_by(s1.id));
        assert!(!for_s2[0].is_read_by(s2.id));
        assert!(for_s2[0].read_by.is_empty());

        let for_teacher = board.list_for(teacher).await.unwrap();
        assert_eq!(for_teacher[0].read_by.len(), 1);
    }

    #[tokio::test]
    async fn only_teachers_post_and_delete() {
        let db = database();
        let teacher = Actor::new(add_user(&db, "Mrs Rao", Role::Teacher, None), Role::Teacher);
        let student = Actor::new(add_user(&db, "Asha", Role::Student, Some("A")), Role::Student);
        let board = MessageBoard::new(db.clone());

        assert!(matches!(board.post(student, "hi").await, Err(CoreError::Forbidden(_))));
        assert!(matches!(
            board.post(teacher, "   ").await,
            Err(CoreError::Validation { field: "content", .. })
        ));

        let posted = board.post(teacher, "Holiday on Friday").await.unwrap();
        assert!(matches!(board.delete(student, posted.id).await, Err(CoreError::Forbidden(_))));
        board.delete(teacher, posted.id).await.unwrap();
        assert!(matches!(board.delete(teacher, posted.id).await, Err(CoreError::NotFound(_))));
        assert!(matches!(board.mark_read(student, posted.id).await, Err(CoreError::NotFound(_))));
    }
}
