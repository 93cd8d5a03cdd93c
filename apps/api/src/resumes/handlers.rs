//! Axum route handlers for the Resume API.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;

use crate::auth::require_session_or_fail;
use crate::entitlements::can_create_resume;
use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::resumes::store::NewResume;
use crate::state::AppState;

const DEFAULT_TEMPLATE: &str = "classic";
const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct CreateResumeRequest {
    pub title: String,
    pub template: Option<String>,
}

/// POST /api/v1/resumes
///
/// Consults the quota gate before inserting. Free users past the limit get
/// a 403 with `RESUME_LIMIT_REACHED`.
pub async fn handle_create_resume(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateResumeRequest>,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    let session = require_session_or_fail(state.sessions.as_ref(), &headers).await?;
    let user_id = &session.user.id;

    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }

    let quota = can_create_resume(state.billing.as_ref(), state.resumes.as_ref(), user_id).await?;
    if !quota.allowed {
        info!(
            "Resume creation denied for {user_id}: {}/{}",
            quota.current, quota.limit
        );
        return Err(AppError::QuotaExceeded {
            current: quota.current,
            limit: quota.limit,
        });
    }

    let template = request
        .template
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TEMPLATE);
    let data = serde_json::json!({});

    let resume = state
        .resumes
        .insert(NewResume {
            user_id,
            title,
            template,
            data: &data,
        })
        .await?;

    info!("Created resume {} for {user_id}", resume.id);
    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    let session = require_session_or_fail(state.sessions.as_ref(), &headers).await?;
    let resumes = state.resumes.list_for_user(&session.user.id).await?;
    Ok(Json(resumes))
}
