//! pointage-srv library - operator time-tracking HTTP service
//!
//! Thin REST layer over the session store plus the reconciliation engine
//! that exports raw clock events into the unified operations ledger.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::directory::OperatorDirectory;

pub mod api;
pub mod directory;
pub mod reconcile;
pub mod sessions;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Admin token; empty string disables the admin auth check
    pub admin_token: String,
    /// Operator directory source, fixed at construction time
    pub directory: OperatorDirectory,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, admin_token: String, directory: OperatorDirectory) -> Self {
        Self {
            db,
            admin_token,
            directory,
        }
    }
}

/// Build application router
///
/// Admin and export routes sit behind the admin-token middleware; the
/// operator-facing routes and the health endpoint are public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let admin = Router::new()
        .route("/api/admin/sessions", get(api::admin::list_sessions))
        .route("/api/admin/sessions/finish", post(api::admin::finish_session))
        .route("/api/admin/sessions/update", post(api::admin::update_session))
        .route("/api/export/provision", post(api::export::provision))
        .route("/api/export/run", post(api::export::run))
        .route("/api/operations", get(api::export::list_operations))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::admin_auth_middleware,
        ));

    let public = Router::new()
        .route("/api/operators", get(api::operators::list_operators))
        .route("/api/operators/badged", get(api::operators::badged_operators))
        .route("/api/operators/:id/history", get(api::operators::operator_history))
        .route("/api/launches/status", get(api::launches::launch_status))
        .route("/api/launches/:code", get(api::launches::launch_lookup))
        .route("/api/work/start", post(api::work::start_work))
        .route("/api/work/finish", post(api::work::finish_work))
        .merge(api::health::health_routes());

    Router::new()
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
