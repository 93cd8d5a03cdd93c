use std::fmt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SESSION_KEY_PREFIX: &str = "session:";
const MAX_TOKEN_LEN: usize = 256;

/// Opaque identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can stand as a single path segment in a resource key.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty() && !self.0.contains('/')
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: Option<String>,
}

/// A verified identity bound to the current request.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: SessionUser,
}

#[cfg(test)]
impl Session {
    pub fn for_user(id: impl Into<String>) -> Self {
        Self {
            user: SessionUser {
                id: UserId::new(id),
                email: None,
            },
        }
    }
}

/// Resolves request headers into a session.
///
/// `Ok(None)` means "no valid session"; `Err` means the lookup itself failed
/// and callers must treat it as an internal error, not as a logged-out user.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>>;
}

/// Session record as written to Redis by the auth service.
#[derive(Debug, Deserialize)]
struct StoredSession {
    user_id: String,
    email: Option<String>,
    expires_at: DateTime<Utc>,
}

impl StoredSession {
    fn into_session(self, now: DateTime<Utc>) -> Option<Session> {
        if self.expires_at <= now {
            return None;
        }
        let id = UserId::new(self.user_id);
        if !id.is_path_safe() {
            warn!("Rejecting session for unusable user id {id:?}");
            return None;
        }
        Some(Session {
            user: SessionUser {
                id,
                email: self.email,
            },
        })
    }
}

/// Looks session tokens up in Redis under `session:<token>`.
///
/// Holds one long-lived connection; each lookup works on a cheap clone of it.
#[derive(Clone)]
pub struct RedisSessionResolver<C = ConnectionManager> {
    conn: C,
    cookie_name: String,
}

impl RedisSessionResolver {
    /// Opens the shared connection. Called once at startup.
    pub async fn connect(client: redis::Client, cookie_name: impl Into<String>) -> Result<Self> {
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to session store")?;
        Ok(Self::with_connection(conn, cookie_name))
    }
}

impl<C> RedisSessionResolver<C> {
    pub fn with_connection(conn: C, cookie_name: impl Into<String>) -> Self {
        Self {
            conn,
            cookie_name: cookie_name.into(),
        }
    }
}

#[async_trait]
impl<C> SessionResolver for RedisSessionResolver<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        let Some(token) = extract_token(headers, &self.cookie_name) else {
            return Ok(None);
        };

        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(format!("{SESSION_KEY_PREFIX}{token}"))
            .await
            .context("Session lookup failed")?;

        let Some(raw) = raw else {
            debug!("Session token not found in store");
            return Ok(None);
        };

        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(stored) => Ok(stored.into_session(Utc::now())),
            Err(e) => {
                warn!("Discarding malformed session record: {e}");
                Ok(None)
            }
        }
    }
}

/// Pulls the session token from the session cookie, falling back to an
/// `Authorization: Bearer` header. Tokens outside the URL-safe and standard
/// base64 alphabets are ignored.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let token = cookie_value(headers, cookie_name).or_else(|| bearer_token(headers))?;
    if !is_well_formed_token(&token) {
        debug!("Ignoring malformed session token ({} chars)", token.len());
        return None;
    }
    Some(token)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"').to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim().to_string())
}

fn is_well_formed_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '/' | '='))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::http::HeaderValue;
    use chrono::Duration;
    use redis::{RedisFuture, Value};

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_token_from_cookie() {
        let h = headers(&[(header::COOKIE, "theme=dark; session_token=abc123; other=1")]);
        assert_eq!(extract_token(&h, "session_token").as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_from_second_cookie_header() {
        let h = headers(&[
            (header::COOKIE, "theme=dark"),
            (header::COOKIE, "session_token=xyz"),
        ]);
        assert_eq!(extract_token(&h, "session_token").as_deref(), Some("xyz"));
    }

    #[test]
    fn test_token_from_bearer() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer tok-1.2_3")]);
        assert_eq!(extract_token(&h, "session_token").as_deref(), Some("tok-1.2_3"));
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        let h = headers(&[
            (header::COOKIE, "session_token=from-cookie"),
            (header::AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(
            extract_token(&h, "session_token").as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_non_bearer_scheme_ignored() {
        let h = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_token(&h, "session_token"), None);
    }

    #[test]
    fn test_malformed_token_rejected() {
        let h = headers(&[(header::COOKIE, "session_token=abc*def")]);
        assert_eq!(extract_token(&h, "session_token"), None);
    }

    #[test]
    fn test_base64_token_accepted() {
        let h = headers(&[(header::AUTHORIZATION, "Bearer abc+/def==")]);
        assert_eq!(
            extract_token(&h, "session_token").as_deref(),
            Some("abc+/def==")
        );
    }

    #[test]
    fn test_no_headers_no_token() {
        assert_eq!(extract_token(&HeaderMap::new(), "session_token"), None);
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let now = Utc::now();
        let stored = StoredSession {
            user_id: "alice".into(),
            email: None,
            expires_at: now - Duration::seconds(1),
        };
        assert!(stored.into_session(now).is_none());
    }

    #[test]
    fn test_user_id_with_slash_is_rejected() {
        let now = Utc::now();
        let stored = StoredSession {
            user_id: "team/alice".into(),
            email: None,
            expires_at: now + Duration::hours(1),
        };
        assert!(stored.into_session(now).is_none());
    }

    #[test]
    fn test_empty_user_id_is_rejected() {
        let now = Utc::now();
        let stored = StoredSession {
            user_id: String::new(),
            email: None,
            expires_at: now + Duration::hours(1),
        };
        assert!(stored.into_session(now).is_none());
    }

    #[test]
    fn test_path_safe_user_ids() {
        assert!(UserId::new("alice").is_path_safe());
        assert!(UserId::new("user 1").is_path_safe());
        assert!(!UserId::new("team/alice").is_path_safe());
        assert!(!UserId::new("").is_path_safe());
    }

    #[test]
    fn test_live_session_carries_identity() {
        let now = Utc::now();
        let stored: StoredSession = serde_json::from_value(serde_json::json!({
            "user_id": "alice",
            "email": "alice@example.com",
            "expires_at": (now + Duration::hours(1)).to_rfc3339(),
        }))
        .unwrap();
        let session = stored.into_session(now).unwrap();
        assert_eq!(session.user.id.as_str(), "alice");
        assert_eq!(session.user.email.as_deref(), Some("alice@example.com"));
    }

    /// In-memory stand-in for a Redis connection answering `GET` from a map.
    #[derive(Clone, Default)]
    struct FakeRedis {
        values: Arc<HashMap<String, String>>,
        requests: Arc<AtomicUsize>,
    }

    impl FakeRedis {
        fn with(pairs: &[(&str, String)]) -> Self {
            let values = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();
            Self {
                values: Arc::new(values),
                requests: Arc::default(),
            }
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    impl ConnectionLike for FakeRedis {
        fn req_packed_command<'a>(&'a mut self, cmd: &'a redis::Cmd) -> RedisFuture<'a, Value> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let key = cmd
                .args_iter()
                .nth(1)
                .and_then(|arg| match arg {
                    redis::Arg::Simple(bytes) => std::str::from_utf8(bytes).ok(),
                    redis::Arg::Cursor => None,
                })
                .map(str::to_owned);
            let value = key
                .and_then(|k| self.values.get(&k).cloned())
                .map_or(Value::Nil, |v| Value::Data(v.into_bytes()));
            Box::pin(async move { Ok(value) })
        }

        fn req_packed_commands<'a>(
            &'a mut self,
            _cmd: &'a redis::Pipeline,
            _offset: usize,
            _count: usize,
        ) -> RedisFuture<'a, Vec<Value>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn get_db(&self) -> i64 {
            0
        }
    }

    fn live_record(user_id: &str) -> String {
        serde_json::json!({
            "user_id": user_id,
            "email": null,
            "expires_at": (Utc::now() + Duration::hours(1)).to_rfc3339(),
        })
        .to_string()
    }

    fn cookie(token: &str) -> HeaderMap {
        let value = format!("session_token={token}");
        headers(&[(header::COOKIE, value.as_str())])
    }

    #[tokio::test]
    async fn test_resolver_reuses_one_connection() {
        let redis = FakeRedis::with(&[("session:tok1", live_record("alice"))]);
        let resolver = RedisSessionResolver::with_connection(redis.clone(), "session_token");

        for _ in 0..3 {
            let session = resolver.resolve(&cookie("tok1")).await.unwrap().unwrap();
            assert_eq!(session.user.id.as_str(), "alice");
        }
        assert_eq!(redis.requests(), 3);
    }

    #[tokio::test]
    async fn test_resolver_unknown_token_is_none() {
        let redis = FakeRedis::default();
        let resolver = RedisSessionResolver::with_connection(redis, "session_token");
        assert!(resolver.resolve(&cookie("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolver_malformed_record_is_none() {
        let redis = FakeRedis::with(&[("session:tok1", "{not json".to_string())]);
        let resolver = RedisSessionResolver::with_connection(redis, "session_token");
        assert!(resolver.resolve(&cookie("tok1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolver_rejects_slash_identity() {
        let redis = FakeRedis::with(&[("session:tok1", live_record("team/alice"))]);
        let resolver = RedisSessionResolver::with_connection(redis, "session_token");
        assert!(resolver.resolve(&cookie("tok1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolver_skips_store_without_token() {
        let redis = FakeRedis::default();
        let resolver = RedisSessionResolver::with_connection(redis.clone(), "session_token");
        assert!(resolver.resolve(&HeaderMap::new()).await.unwrap().is_none());
        assert_eq!(redis.requests(), 0);
    }
}
