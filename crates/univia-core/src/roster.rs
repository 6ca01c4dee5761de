use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use univia_db::UserRepository;
use univia_types::models::UserProfile;

use crate::{Actor, CoreError, blocking};

/// Teacher view of the student list and the detained flag.
#[derive(Clone)]
pub struct Roster {
    users: Arc<dyn UserRepository>,
}

impl Roster {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn list_students(&self, actor: Actor) -> Result<Vec<UserProfile>, CoreError> {
        actor.require_teacher()?;
        let users = self.users.clone();
        blocking(move || users.list_students()).await
    }

    pub async fn set_detained(&self, actor: Actor, student: Uuid, detained: bool) -> Result<(), CoreError> {
        actor.require_teacher()?;
        let users = self.users.clone();
        if !blocking(move || users.set_detained(student, detained)).await? {
            return Err(CoreError::NotFound(format!("student {}", student)));
        }
        info!("Student {} detained={} (set by {})", student, detained, actor.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use univia_types::models::Role;

    use crate::testing::{add_user, database};

    #[tokio::test]
    async fn teachers_toggle_detention_on_students_only() {
        let db = database();
        let teacher_id = add_user(&db, "Mrs Rao", Role::Teacher, None);
        let teacher = Actor::new(teacher_id, Role::Teacher);
        let student = add_user(&db, "Asha", Role::Student, Some("A"));
        let roster = Roster::new(db.clone());

        roster.set_detained(teacher, student, true).await.unwrap();
        let students = roster.list_students(teacher).await.unwrap();
        assert_eq!(students.len(), 1);
        assert!(students[0].detained);

        assert!(matches!(
            roster.set_detained(teacher, teacher_id, true).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            roster.set_detained(teacher, Uuid::new_v4(), true).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            roster.list_students(Actor::new(student, Role::Student)).await,
            Err(CoreError::Forbidden(_))
        ));
    }
}
