//! Univia workflows. Every service receives its repositories and stores as
//! explicit handles; nothing here reaches for process-wide state.

pub mod error;
pub mod form;
pub mod messages;
pub mod poller;
pub mod recorder;
pub mod retrieval;
pub mod roster;
pub mod session;
pub mod timetable;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use uuid::Uuid;

use univia_types::models::Role;

pub use error::CoreError;

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn require_teacher(&self) -> Result<(), CoreError> {
        match self.role {
            Role::Teacher => Ok(()),
            Role::Student => Err(CoreError::Forbidden("teacher role required".into())),
        }
    }
}

/// Run a blocking repository call off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, CoreError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}
