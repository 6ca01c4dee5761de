use std::sync::Arc;

use univia_core::messages::MessageBoard;
use univia_core::recorder::MetadataRecorder;
use univia_core::retrieval::RetrievalView;
use univia_core::roster::Roster;
use univia_core::session::Sessions;
use univia_core::timetable::ExamTimetable;
use univia_core::workflow::{DEFAULT_MAX_DOCUMENT_BYTES, SubmissionWorkflow};
use univia_db::Database;
use univia_storage::{DocumentStore, FolderMap, LocalStore};

pub type AppState = Arc<AppStateInner>;

/// Settings the HTTP layer needs beyond its handles.
pub struct StateConfig {
    pub jwt_secret: String,
    /// Unset disables teacher self-registration.
    pub teacher_code: Option<String>,
    pub folders: FolderMap,
    pub max_document_bytes: usize,
}

impl StateConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            teacher_code: None,
            folders: FolderMap::default(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

pub struct AppStateInner {
    pub sessions: Sessions,
    pub workflow: SubmissionWorkflow,
    pub retrieval: RetrievalView,
    pub board: MessageBoard,
    pub timetable: ExamTimetable,
    pub roster: Roster,
    /// Set when documents are kept on local disk and served by this API.
    pub local_documents: Option<Arc<LocalStore>>,
    pub jwt_secret: String,
    pub teacher_code: Option<String>,
    pub max_document_bytes: usize,
}

impl AppStateInner {
    /// Wire every service to one database and one document store.
    pub fn new(
        db: Arc<Database>,
        store: Arc<dyn DocumentStore>,
        local_documents: Option<Arc<LocalStore>>,
        config: StateConfig,
    ) -> AppState {
        let workflow = SubmissionWorkflow::new(
            store,
            MetadataRecorder::new(db.clone()),
            db.clone(),
            config.folders,
        )
        .with_max_document_bytes(config.max_document_bytes);

        Arc::new(Self {
            sessions: Sessions::new(db.clone()),
            workflow,
            retrieval: RetrievalView::new(db.clone(), db.clone()),
            board: MessageBoard::new(db.clone()),
            timetable: ExamTimetable::new(db.clone()),
            roster: Roster::new(db),
            local_documents,
            jwt_secret: config.jwt_secret,
            teacher_code: config.teacher_code,
            max_document_bytes: config.max_document_bytes,
        })
    }
}
