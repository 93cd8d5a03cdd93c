use axum::{
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::auth::session::{Session, SessionResolver};
use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No valid session")]
    Unauthenticated,

    #[error("Session lookup failed: {0}")]
    Lookup(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unauthenticated => AppError::Unauthorized,
            SessionError::Lookup(e) => AppError::Internal(e),
        }
    }
}

/// Resolves the session or fails with [`SessionError::Unauthenticated`].
/// For programmatic endpoints, which answer with a status code.
pub async fn require_session_or_fail(
    resolver: &dyn SessionResolver,
    headers: &HeaderMap,
) -> Result<Session, SessionError> {
    resolver
        .resolve(headers)
        .await?
        .ok_or(SessionError::Unauthenticated)
}

/// Resolves the session or produces a redirect to `login_url`, carrying
/// `callback` so the login page can send the user back.
pub async fn require_session_or_redirect(
    resolver: &dyn SessionResolver,
    headers: &HeaderMap,
    login_url: &str,
    callback: &str,
) -> Result<Session, Response> {
    match require_session_or_fail(resolver, headers).await {
        Ok(session) => Ok(session),
        Err(SessionError::Unauthenticated) => {
            let separator = if login_url.contains('?') { '&' } else { '?' };
            let target = format!(
                "{login_url}{separator}callbackUrl={}",
                urlencoding::encode(callback)
            );
            Err(Redirect::to(&target).into_response())
        }
        Err(SessionError::Lookup(e)) => Err(AppError::Internal(e).into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bearer, FakeSessions};
    use axum::http::{header, StatusCode};

    #[tokio::test]
    async fn test_fail_returns_session_when_present() {
        let sessions = FakeSessions::default();
        let session = require_session_or_fail(&sessions, &bearer("alice"))
            .await
            .unwrap();
        assert_eq!(session.user.id.as_str(), "alice");
    }

    #[tokio::test]
    async fn test_fail_without_session() {
        let sessions = FakeSessions::default();
        let err = require_session_or_fail(&sessions, &HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_lookup_error_is_not_unauthenticated() {
        let sessions = FakeSessions::failing();
        let err = require_session_or_fail(&sessions, &bearer("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Lookup(_)));
    }

    #[tokio::test]
    async fn test_redirect_points_at_login_with_callback() {
        let sessions = FakeSessions::default();
        let resp = require_session_or_redirect(&sessions, &HeaderMap::new(), "/login", "/dashboard")
            .await
            .unwrap_err();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/login?callbackUrl=%2Fdashboard"
        );
    }

    #[tokio::test]
    async fn test_redirect_appends_to_existing_query() {
        let sessions = FakeSessions::default();
        let resp = require_session_or_redirect(
            &sessions,
            &HeaderMap::new(),
            "/auth?provider=github",
            "/dashboard",
        )
        .await
        .unwrap_err();
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/auth?provider=github&callbackUrl=%2Fdashboard"
        );
    }

    #[tokio::test]
    async fn test_redirect_lookup_error_is_500() {
        let sessions = FakeSessions::failing();
        let resp = require_session_or_redirect(&sessions, &bearer("alice"), "/login", "/dashboard")
            .await
            .unwrap_err();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
