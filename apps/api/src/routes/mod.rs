pub mod dashboard;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::assist::handlers as assist;
use crate::entitlements::handlers as entitlements;
use crate::files::handlers as files;
use crate::files::upload::MAX_PDF_BYTES;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

/// Headroom over the largest accepted file for multipart framing.
const UPLOAD_BODY_LIMIT: usize = MAX_PDF_BYTES + 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/dashboard", get(dashboard::handle_dashboard))
        // File access
        .route("/files/*key", get(files::handle_get_file))
        .route(
            "/api/v1/files/:kind",
            post(files::handle_upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Resumes and entitlements
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_create_resume),
        )
        .route(
            "/api/v1/entitlements",
            get(entitlements::handle_get_entitlements),
        )
        // Writing assistance
        .route("/api/v1/assist/bullet", post(assist::handle_improve_bullet))
        .with_state(state)
}
