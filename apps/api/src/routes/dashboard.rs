use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{require_session_or_redirect, UserId};
use crate::entitlements::{is_premium, quota_for, QuotaDecision};
use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::state::AppState;

const DASHBOARD_PATH: &str = "/dashboard";

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user_id: UserId,
    pub is_premium: bool,
    pub resumes: Vec<ResumeRow>,
    pub quota: QuotaDecision,
}

/// GET /dashboard
///
/// Page route: visitors without a session are redirected to the login page.
pub async fn handle_dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match require_session_or_redirect(
        state.sessions.as_ref(),
        &headers,
        &state.config.login_url,
        DASHBOARD_PATH,
    )
    .await
    {
        Ok(session) => session,
        Err(redirect) => return redirect,
    };

    match load_dashboard(&state, session.user.id).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn load_dashboard(state: &AppState, user_id: UserId) -> Result<DashboardResponse, AppError> {
    let premium = is_premium(state.billing.as_ref(), &user_id).await?;
    let quota = quota_for(premium, state.resumes.as_ref(), &user_id).await?;
    let resumes = state.resumes.list_for_user(&user_id).await?;

    Ok(DashboardResponse {
        user_id,
        is_premium: premium,
        resumes,
        quota,
    })
}
