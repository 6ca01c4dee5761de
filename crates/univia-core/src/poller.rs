//! Periodic check for unread teacher messages.
//!
//! A poll reads the message list, and when any unread message has not been
//! notified about on this device yet, emits exactly one local notification.
//! The device-local flag file only suppresses repeats; read state itself
//! lives with the messages.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use univia_types::models::Message;

use crate::{Actor, CoreError};

pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(60 * 60);

pub const NOTIFICATION_TITLE: &str = "Teacher Notice";
pub const NOTIFICATION_BODY: &str = "You have unread teacher messages. Tap to view.";

/// Where the poller reads messages from.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_messages(&self, viewer: Actor) -> Result<Vec<Message>, CoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNotification {
    pub title: String,
    pub body: String,
    pub unread: usize,
}

/// Emits one user-visible notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &LocalNotification);
}

/// Message ids this device already notified about, persisted as a JSON array.
#[derive(Debug, Default)]
pub struct SeenFlags {
    path: Option<PathBuf>,
    seen: BTreeSet<Uuid>,
}

impl SeenFlags {
    /// Flags that live only as long as the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load flags from `path`. A missing file means nothing was seen yet; a
    /// corrupt one is discarded.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let seen = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                warn!("Discarding corrupt seen-flag file {}: {}", path.display(), e);
                BTreeSet::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path: Some(path), seen })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Replace the flagged set. Ids that are no longer unread drop out.
    pub fn replace(&mut self, ids: BTreeSet<Uuid>) {
        self.seen = ids;
    }

    pub async fn save(&self) -> Result<(), CoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec(&self.seen).map_err(std::io::Error::other)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Notified { unread: usize },
    AlreadyNotified,
    NothingUnread,
}

pub struct NotificationPoller {
    source: Arc<dyn MessageSource>,
    notifier: Arc<dyn Notifier>,
    flags: Mutex<SeenFlags>,
    viewer: Actor,
}

impl NotificationPoller {
    pub fn new(
        source: Arc<dyn MessageSource>,
        notifier: Arc<dyn Notifier>,
        flags: SeenFlags,
        viewer: Actor,
    ) -> Self {
        Self {
            source,
            notifier,
            flags: Mutex::new(flags),
            viewer,
        }
    }

    pub async fn run_once(&self) -> Result<PollOutcome, CoreError> {
        let messages = self.source.fetch_messages(self.viewer).await?;
        let unread: BTreeSet<Uuid> = messages
            .iter()
            .filter(|m| !m.is_read_by(self.viewer.id))
            .map(|m| m.id)
            .collect();

        let mut flags = self.flags.lock().await;
        if unread.is_empty() {
            if !flags.is_empty() {
                flags.replace(BTreeSet::new());
                flags.save().await?;
            }
            debug!("No unread messages for {}", self.viewer.id);
            return Ok(PollOutcome::NothingUnread);
        }

        let fresh = unread.iter().filter(|id| !flags.contains(id)).count();
        if fresh == 0 {
            debug!("{} unread messages already notified", unread.len());
            return Ok(PollOutcome::AlreadyNotified);
        }

        self.notifier.notify(&LocalNotification {
            title: NOTIFICATION_TITLE.into(),
            body: NOTIFICATION_BODY.into(),
            unread: unread.len(),
        });
        let count = unread.len();
        flags.replace(unread);
        flags.save().await?;

        info!("Notified {} of {} unread messages ({} new)", self.viewer.id, count, fresh);
        Ok(PollOutcome::Notified { unread: count })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Started,
    KeptExisting,
}

/// Named periodic poll jobs. Scheduling a name that is still running keeps
/// the existing job.
pub struct PollScheduler {
    period: Duration,
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_PERIOD)
    }
}

impl PollScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Start polling under `name`. The first poll runs immediately.
    pub async fn schedule(&self, name: &str, poller: Arc<NotificationPoller>) -> Schedule {
        let mut jobs = self.jobs.lock().await;
        if jobs.get(name).is_some_and(|job| !job.is_finished()) {
            debug!("Poll job '{}' already scheduled", name);
            return Schedule::KeptExisting;
        }

        let period = self.period;
        let job_name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = poller.run_once().await {
                    error!("Poll job '{}' failed: {}", job_name, e);
                }
            }
        });
        jobs.insert(name.to_string(), handle);
        info!("Poll job '{}' scheduled every {:?}", name, period);
        Schedule::Started
    }

    pub async fn is_scheduled(&self, name: &str) -> bool {
        self.jobs
            .lock()
            .await
            .get(name)
            .is_some_and(|job| !job.is_finished())
    }

    /// Abort the job. Returns false if nothing was scheduled under `name`.
    pub async fn cancel(&self, name: &str) -> bool {
        match self.jobs.lock().await.remove(name) {
            Some(job) => {
                job.abort();
                info!("Poll job '{}' cancelled", name);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use univia_types::models::Role;

    #[derive(Default)]
    struct FixedSource {
        messages: std::sync::Mutex<Vec<Message>>,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl MessageSource for FixedSource {
        async fn fetch_messages(&self, _viewer: Actor) -> Result<Vec<Message>, CoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.messages.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        sent: std::sync::Mutex<Vec<LocalNotification>>,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, notification: &LocalNotification) {
            self.sent.lock().unwrap().push(notification.clone());
        }
    }

    fn message(read_by: &[Uuid]) -> Message {
        Message {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content: "notice".into(),
            date: Some(Utc::now().date_naive()),
            created_at: Utc::now(),
            read_by: read_by.iter().copied().collect(),
        }
    }

    fn viewer() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Student)
    }

    #[tokio::test]
    async fn notifies_once_per_new_unread_set() {
        let me = viewer();
        let source = Arc::new(FixedSource::default());
        source.messages.lock().unwrap().push(message(&[]));
        source.messages.lock().unwrap().push(message(&[me.id]));
        let notifier = Arc::new(CountingNotifier::default());
        let poller = NotificationPoller::new(source.clone(), notifier.clone(), SeenFlags::in_memory(), me);

        assert_eq!(poller.run_once().await.unwrap(), PollOutcome::Notified { unread: 1 });
        assert_eq!(poller.run_once().await.unwrap(), PollOutcome::AlreadyNotified);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
        assert_eq!(notifier.sent.lock().unwrap()[0].title, NOTIFICATION_TITLE);

        source.messages.lock().unwrap().push(message(&[]));
        assert_eq!(poller.run_once().await.unwrap(), PollOutcome::Notified { unread: 2 });
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn messages_read_by_someone_else_still_count_as_unread() {
        let me = viewer();
        let source = Arc::new(FixedSource::default());
        source.messages.lock().unwrap().push(message(&[Uuid::new_v4()]));
        let notifier = Arc::new(CountingNotifier::default());
        let poller = NotificationPoller::new(source, notifier.clone(), SeenFlags::in_memory(), me);

        assert_eq!(poller.run_once().await.unwrap(), PollOutcome::Notified { unread: 1 });
    }

    #[tokio::test]
    async fn nothing_unread_sends_nothing() {
        let me = viewer();
        let source = Arc::new(FixedSource::default());
        source.messages.lock().unwrap().push(message(&[me.id]));
        let notifier = Arc::new(CountingNotifier::default());
        let poller = NotificationPoller::new(source, notifier.clone(), SeenFlags::in_memory(), me);

        assert_eq!(poller.run_once().await.unwrap(), PollOutcome::NothingUnread);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn seen_flags_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("seen.json");
        let me = viewer();
        let source = Arc::new(FixedSource::default());
        source.messages.lock().unwrap().push(message(&[]));

        let first = Arc::new(CountingNotifier::default());
        let flags = SeenFlags::load(&path).await.unwrap();
        assert!(flags.is_empty());
        let poller = NotificationPoller::new(source.clone(), first.clone(), flags, me);
        poller.run_once().await.unwrap();
        assert_eq!(first.sent.lock().unwrap().len(), 1);

        let second = Arc::new(CountingNotifier::default());
        let flags = SeenFlags::load(&path).await.unwrap();
        assert_eq!(flags.len(), 1);
        let poller = NotificationPoller::new(source, second.clone(), flags, me);
        assert_eq!(poller.run_once().await.unwrap(), PollOutcome::AlreadyNotified);
        assert!(second.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_flag_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let flags = SeenFlags::load(&path).await.unwrap();
        assert!(flags.is_empty());
        assert_eq!(flags.path(), Some(path.as_path()));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_polls_hourly_and_keeps_existing_jobs() {
        let source = Arc::new(FixedSource::default());
        let poller = Arc::new(NotificationPoller::new(
            source.clone(),
            Arc::new(CountingNotifier::default()),
            SeenFlags::in_memory(),
            viewer(),
        ));
        let scheduler = PollScheduler::default();

        assert_eq!(scheduler.schedule("messages", poller.clone()).await, Schedule::Started);
        assert_eq!(scheduler.schedule("messages", poller.clone()).await, Schedule::KeptExisting);

        tokio::time::sleep(Duration::from_secs(2 * 3600 + 1)).await;
        tokio::task::yield_now().await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);

        assert!(scheduler.is_scheduled("messages").await);
        assert!(scheduler.cancel("messages").await);
        assert!(!scheduler.cancel("messages").await);
        assert!(!scheduler.is_scheduled("messages").await);
    }
}
