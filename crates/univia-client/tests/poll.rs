use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tempfile::TempDir;

use univia_api::{AppStateInner, StateConfig, router};
use univia_client::ApiClient;
use univia_core::Actor;
use univia_core::poller::{LocalNotification, NotificationPoller, Notifier, PollOutcome, SeenFlags};
use univia_db::Database;
use univia_storage::LocalStore;
use univia_types::api::{RegisterRequest, SubmitQuery};
use univia_types::models::{Category, Role};

const TEACHER_CODE: &str = "staff-code";

#[derive(Default)]
struct Recorded(Mutex<Vec<LocalNotification>>);

impl Notifier for Recorded {
    fn notify(&self, notification: &LocalNotification) {
        self.0.lock().unwrap().push(notification.clone());
    }
}

async fn serve() -> (String, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let db = Arc::new(Database::open_in_memory().unwrap());
    let local = Arc::new(LocalStore::new(dir.path().to_path_buf(), base.clone()).await.unwrap());
    let mut config = StateConfig::new("client-test-secret");
    config.teacher_code = Some(TEACHER_CODE.into());
    let app = router(AppStateInner::new(db, local.clone(), Some(local), config));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base, dir)
}

fn registration(name: &str, teacher: bool) -> RegisterRequest {
    RegisterRequest {
        email: format!("{}@uni.test", name.to_lowercase()),
        password: "password123".into(),
        repeat_password: "password123".into(),
        name: name.into(),
        external_id: if teacher { String::new() } else { format!("AU-{}", name) },
        batch: "2022".into(),
        section: (!teacher).then(|| "B".into()),
        teacher_code: teacher.then(|| TEACHER_CODE.into()),
    }
}

#[tokio::test]
async fn student_is_notified_once_until_messages_are_read() {
    let (base, _dir) = serve().await;

    let teacher = ApiClient::new(&base);
    teacher.register(&registration("Rao", true)).await.unwrap();
    let student = Arc::new(ApiClient::new(&base));
    let me = student.register(&registration("Asha", false)).await.unwrap();

    let notifier = Arc::new(Recorded::default());
    let poller = NotificationPoller::new(
        student.clone(),
        notifier.clone(),
        SeenFlags::in_memory(),
        Actor::new(me.user_id, Role::Student),
    );

    assert_eq!(poller.run_once().await.unwrap(), PollOutcome::NothingUnread);

    let notice = teacher.post_message("Exams start Monday").await.unwrap();
    assert_eq!(poller.run_once().await.unwrap(), PollOutcome::Notified { unread: 1 });
    assert_eq!(poller.run_once().await.unwrap(), PollOutcome::AlreadyNotified);
    assert_eq!(notifier.0.lock().unwrap().len(), 1);

    student.mark_read(notice.id).await.unwrap();
    assert_eq!(poller.run_once().await.unwrap(), PollOutcome::NothingUnread);
    assert!(student.post_message("not allowed").await.is_err());
}

#[tokio::test]
async fn submit_and_login_round_trip() {
    let (base, _dir) = serve().await;

    let student = ApiClient::new(&base);
    student.register(&registration("Ravi", false)).await.unwrap();

    let session = ApiClient::new(&base);
    let login = session.login("ravi@uni.test", "password123").await.unwrap();
    assert_eq!(login.role, Role::Student);

    let query = SubmitQuery {
        category: "leave".into(),
        title: "Fever".into(),
        semester: "3".into(),
        section: "B".into(),
        file_name: Some("note.pdf".into()),
    };
    let submission = session
        .submit(&query, "application/pdf", Bytes::from_static(b"%PDF-1.7 note"))
        .await
        .unwrap();
    assert_eq!(submission.category, Category::Leave);
    assert!(submission.document_link.starts_with(&base));

    let bad = SubmitQuery {
        semester: "9".into(),
        ..query
    };
    assert!(session.submit(&bad, "application/pdf", Bytes::from_static(b"%PDF")).await.is_err());
}
