use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};

use crate::assist::prompts::{bullet_system, improve_bullet_prompt};
use crate::auth::require_session_or_fail;
use crate::errors::AppError;
use crate::state::AppState;

const MAX_BULLET_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ImproveBulletRequest {
    pub bullet: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImproveBulletResponse {
    pub improved: String,
}

/// POST /api/v1/assist/bullet
pub async fn handle_improve_bullet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ImproveBulletRequest>,
) -> Result<Json<ImproveBulletResponse>, AppError> {
    require_session_or_fail(state.sessions.as_ref(), &headers).await?;

    let bullet = request.bullet.trim();
    if bullet.is_empty() {
        return Err(AppError::Validation("bullet cannot be empty".to_string()));
    }
    if bullet.chars().count() > MAX_BULLET_CHARS {
        return Err(AppError::Validation(format!(
            "bullet must be at most {MAX_BULLET_CHARS} characters"
        )));
    }

    let prompt = improve_bullet_prompt(bullet, request.role.as_deref());
    let response: ImproveBulletResponse = state
        .llm
        .call_json(&prompt, &bullet_system())
        .await
        .map_err(|e| AppError::Llm(format!("Failed to improve bullet: {e}")))?;

    Ok(Json(response))
}
