pub mod auth;
pub mod documents;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod state;
pub mod students;
pub mod submissions;
pub mod timetable;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner, StateConfig};

use crate::middleware::require_auth;

/// Room for the request line and headers on top of the document itself.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// All routes. CORS and request tracing are layered on by the server.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(auth::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let upload_routes = Router::new()
        .route("/submissions", post(submissions::submit).get(submissions::filter))
        .layer(DefaultBodyLimit::max(state.max_document_bytes + BODY_LIMIT_SLACK));

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/submissions/mine", get(submissions::mine))
        .route("/documents/{folder}/{file}", get(documents::download))
        .route("/messages", get(messages::list).post(messages::post))
        .route("/messages/{id}", delete(messages::delete))
        .route("/messages/{id}/read", post(messages::mark_read))
        .route("/timetable", get(timetable::list).post(timetable::add))
        .route("/timetable/{title}/{id}", delete(timetable::delete))
        .route("/students", get(students::list))
        .route("/students/{id}/detained", put(students::set_detained))
        .merge(upload_routes)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
