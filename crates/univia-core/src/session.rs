use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use univia_db::{NewUser, UserRepository};
use univia_types::api::RegisterRequest;
use univia_types::models::{InvalidValue, Landing, Role, Section, UserProfile};

use crate::{CoreError, blocking};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Shown to a detained student instead of a dashboard.
pub const DETAINED_MESSAGE: &str = "Access denied: you are detained";

/// A registration that passed every field check. The password is not kept.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub external_id: String,
    pub batch: String,
    pub section: Option<Section>,
    pub role: Role,
}

impl Registration {
    /// Check a registration form. Supplying `teacher_code` asks for a teacher
    /// account, which needs `expected_code` to be configured and to match.
    pub fn check(request: &RegisterRequest, expected_code: Option<&str>) -> Result<Self, CoreError> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(CoreError::validation("email", "a valid email is required"));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::validation(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }
        if request.password != request.repeat_password {
            return Err(CoreError::validation("repeat_password", "passwords do not match"));
        }
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::validation("name", "must not be blank"));
        }

        let role = match request.teacher_code.as_deref() {
            None => Role::Student,
            Some(code) => match expected_code {
                Some(expected) if !expected.is_empty() && code == expected => Role::Teacher,
                Some(_) => return Err(CoreError::Forbidden("invalid teacher code".into())),
                None => return Err(CoreError::Forbidden("teacher registration is disabled".into())),
            },
        };

        let section = match role {
            Role::Teacher => None,
            Role::Student => {
                let raw = request.section.as_deref().unwrap_or_default();
                Some(raw.parse().map_err(|e: InvalidValue| CoreError::validation("section", e.0))?)
            }
        };
        let external_id = request.external_id.trim().to_string();
        if role == Role::Student && external_id.is_empty() {
            return Err(CoreError::validation("external_id", "student id is required"));
        }

        Ok(Self {
            email,
            name,
            external_id,
            batch: request.batch.trim().to_string(),
            section,
            role,
        })
    }
}

/// Where a signed-in user lands. Detained students get nowhere.
pub fn landing_for(profile: &UserProfile) -> Result<Landing, CoreError> {
    match profile.role {
        Role::Teacher => Ok(Landing::TeacherDashboard),
        Role::Student if profile.detained => Err(CoreError::Forbidden(DETAINED_MESSAGE.into())),
        Role::Student => Ok(Landing::StudentDashboard),
    }
}

/// Account creation and session resolution over the user repository.
#[derive(Clone)]
pub struct Sessions {
    users: Arc<dyn UserRepository>,
}

impl Sessions {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Store a checked registration with an already hashed password.
    pub async fn create_account(
        &self,
        registration: Registration,
        password_hash: String,
    ) -> Result<UserProfile, CoreError> {
        let users = self.users.clone();
        let email = registration.email.clone();
        if blocking(move || users.credentials_by_email(&email)).await?.is_some() {
            return Err(CoreError::Conflict("email already registered".into()));
        }

        let user = NewUser {
            id: Uuid::new_v4(),
            email: registration.email,
            password_hash,
            name: registration.name,
            external_id: registration.external_id,
            section: registration.section,
            batch: registration.batch,
            role: registration.role,
            created_at: Utc::now(),
        };
        let id = user.id;
        let users = self.users.clone();
        blocking(move || users.create_user(&user)).await?;
        info!("Registered {} account {}", registration.role.as_str(), id);

        let users = self.users.clone();
        blocking(move || users.profile(id))
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("user {}", id)))
    }

    /// `(user_id, password_hash)` for the account with this email, if any.
    pub async fn credentials(&self, email: &str) -> Result<Option<(Uuid, String)>, CoreError> {
        let users = self.users.clone();
        let email = email.trim().to_lowercase();
        blocking(move || users.credentials_by_email(&email)).await
    }

    /// Load the profile behind a session and decide its landing route.
    pub async fn resolve(&self, user_id: Uuid) -> Result<(UserProfile, Landing), CoreError> {
        let users = self.users.clone();
        let profile = blocking(move || users.profile(user_id)).await?.ok_or_else(|| {
            warn!("Session for {} has no user record", user_id);
            CoreError::Forbidden("Access denied: account not found".into())
        })?;
        let landing = landing_for(&profile)?;
        Ok((profile, landing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{add_user, database};

    fn request() -> RegisterRequest {
        RegisterRequest {
            email: "Asha@Uni.Test".into(),
            password: "correct horse".into(),
            repeat_password: "correct horse".into(),
            name: "Asha".into(),
            external_id: "AU-1001".into(),
            batch: "2022".into(),
            section: Some("b".into()),
            teacher_code: None,
        }
    }

    fn field_of(result: Result<Registration, CoreError>) -> &'static str {
        match result {
            Err(CoreError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn registration_checks_password_and_section() {
        let ok = Registration::check(&request(), None).unwrap();
        assert_eq!(ok.email, "asha@uni.test");
        assert_eq!(ok.role, Role::Student);
        assert_eq!(ok.section.map(|s| s.letter()), Some('B'));

        let mut short = request();
        short.password = "short".into();
        short.repeat_password = "short".into();
        assert_eq!(field_of(Registration::check(&short, None)), "password");

        let mut mismatch = request();
        mismatch.repeat_password = "correct horsf".into();
        assert_eq!(field_of(Registration::check(&mismatch, None)), "repeat_password");

        let mut no_section = request();
        no_section.section = None;
        assert_eq!(field_of(Registration::check(&no_section, None)), "section");
    }

    #[test]
    fn teacher_registration_needs_the_configured_code() {
        let mut teacher = request();
        teacher.section = None;
        teacher.external_id = String::new();
        teacher.teacher_code = Some("staff-2024".into());

        let ok = Registration::check(&teacher, Some("staff-2024")).unwrap();
        assert_eq!(ok.role, Role::Teacher);
        assert!(ok.section.is_none());

        assert!(matches!(
            Registration::check(&teacher, Some("other")),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(Registration::check(&teacher, None), Err(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn landing_depends_on_role_and_detention() {
        let db = database();
        let student = add_user(&db, "Asha", Role::Student, Some("A"));
        let teacher = add_user(&db, "Mrs Rao", Role::Teacher, None);
        let sessions = Sessions::new(db.clone());

        assert_eq!(sessions.resolve(student).await.unwrap().1, Landing::StudentDashboard);
        assert_eq!(sessions.resolve(teacher).await.unwrap().1, Landing::TeacherDashboard);

        db.set_detained(student, true).unwrap();
        match sessions.resolve(student).await {
            Err(CoreError::Forbidden(msg)) => assert_eq!(msg, DETAINED_MESSAGE),
            other => panic!("expected denial, got {:?}", other),
        }
        assert!(matches!(sessions.resolve(Uuid::new_v4()).await, Err(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let db = database();
        let sessions = Sessions::new(db.clone());
        let registration = Registration::check(&request(), None).unwrap();

        let profile = sessions.create_account(registration.clone(), "hash".into()).await.unwrap();
        assert_eq!(profile.section.map(|s| s.letter()), Some('B'));
        assert!(sessions.credentials("ASHA@uni.test").await.unwrap().is_some());

        assert!(matches!(
            sessions.create_account(registration, "hash".into()).await,
            Err(CoreError::Conflict(_))
        ));
    }
}
