use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

use crate::auth::require_session_or_fail;
use crate::entitlements::{is_premium, quota_for, QuotaDecision};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EntitlementsResponse {
    pub is_premium: bool,
    pub resumes: QuotaDecision,
}

/// GET /api/v1/entitlements
pub async fn handle_get_entitlements(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<EntitlementsResponse>, AppError> {
    let session = require_session_or_fail(state.sessions.as_ref(), &headers).await?;
    let user_id = &session.user.id;

    let premium = is_premium(state.billing.as_ref(), user_id).await?;
    let resumes = quota_for(premium, state.resumes.as_ref(), user_id).await?;

    Ok(Json(EntitlementsResponse {
        is_premium: premium,
        resumes,
    }))
}
