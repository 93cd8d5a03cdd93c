//! In-memory doubles for the store and session traits, used by unit and
//! router tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::session::extract_token;
use crate::auth::{Session, SessionResolver, UserId};
use crate::config::test_config;
use crate::entitlements::BillingStore;
use crate::llm_client::LlmClient;
use crate::models::resume::ResumeRow;
use crate::models::subscription::SubscriptionRow;
use crate::resumes::store::{NewResume, ResumeStore};
use crate::state::AppState;
use crate::storage::{ResourceStore, StoredObject};

/// Headers carrying `Authorization: Bearer <user>`; [`FakeSessions`] treats
/// the token as the user id.
pub fn bearer(user: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {user}")).unwrap(),
    );
    headers
}

#[derive(Default)]
pub struct FakeSessions {
    fail: bool,
}

impl FakeSessions {
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl SessionResolver for FakeSessions {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        if self.fail {
            return Err(anyhow!("session store unreachable"));
        }
        Ok(extract_token(headers, "session_token")
            .map(Session::for_user)
            .filter(|s| s.user.id.is_path_safe()))
    }
}

/// An object held by [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, MemoryObject>>,
    gets: AtomicUsize,
    fail: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, key: &str, body: impl Into<Bytes>, content_type: Option<&str>) {
        let body = body.into();
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        let object = MemoryObject {
            etag: Some(format!("\"{:016x}\"", hasher.finish())),
            content_type: content_type.map(str::to_string),
            body,
        };
        self.objects.lock().unwrap().insert(key.to_string(), object);
    }

    pub fn object(&self, key: &str) -> Option<MemoryObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn etag_of(&self, key: &str) -> Option<String> {
        self.object(key).and_then(|o| o.etag)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("bucket unreachable"));
        }
        Ok(self
            .object(key)
            .map(|o| StoredObject::from_bytes(o.body, o.content_type, o.etag)))
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        if self.fail {
            return Err(anyhow!("bucket unreachable"));
        }
        self.insert(key, body, Some(content_type));
        Ok(())
    }
}

pub fn subscription(user_id: &str, period_end: DateTime<Utc>, cancel: bool) -> SubscriptionRow {
    let now = Utc::now();
    SubscriptionRow {
        user_id: user_id.to_string(),
        stripe_customer_id: Some(format!("cus_{user_id}")),
        stripe_subscription_id: Some(format!("sub_{user_id}")),
        status: "active".to_string(),
        current_period_end: period_end,
        cancel_at_period_end: cancel,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Default)]
pub struct FakeBilling {
    subscriptions: Mutex<HashMap<String, SubscriptionRow>>,
    fail: bool,
}

impl FakeBilling {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn set(&self, row: SubscriptionRow) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(row.user_id.clone(), row);
    }
}

#[async_trait]
impl BillingStore for FakeBilling {
    async fn find_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRow>, sqlx::Error> {
        if self.fail {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.subscriptions.lock().unwrap().get(user_id.as_str()).cloned())
    }
}

#[derive(Default)]
pub struct FakeResumes {
    rows: Mutex<Vec<ResumeRow>>,
    counts: AtomicUsize,
}

impl FakeResumes {
    pub fn with_count(user_id: &str, count: usize) -> Self {
        let store = Self::default();
        for i in 0..count {
            store.push(user_id, &format!("Resume {}", i + 1), "classic");
        }
        store
    }

    fn push(&self, user_id: &str, title: &str, template: &str) -> ResumeRow {
        let now = Utc::now();
        let row = ResumeRow {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            template: template.to_string(),
            data: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(row.clone());
        row
    }

    pub fn count_calls(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }

    pub fn rows_for(&self, user_id: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl ResumeStore for FakeResumes {
    async fn count_for_user(&self, user_id: &UserId) -> Result<i64, sqlx::Error> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows_for(user_id.as_str()) as i64)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ResumeRow>, sqlx::Error> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id.as_str())
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn insert(&self, resume: NewResume<'_>) -> Result<ResumeRow, sqlx::Error> {
        Ok(self.push(resume.user_id.as_str(), resume.title, resume.template))
    }
}

/// Fakes wired into an `AppState`, kept reachable for assertions.
#[derive(Default)]
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub billing: Arc<FakeBilling>,
    pub resumes: Arc<FakeResumes>,
}

impl TestHarness {
    pub fn state(&self) -> AppState {
        let config = test_config();
        AppState {
            sessions: Arc::new(FakeSessions::default()),
            files: self.store.clone(),
            billing: self.billing.clone(),
            resumes: self.resumes.clone(),
            llm: LlmClient::new(config.anthropic_api_key.clone(), config.ai_model.clone())
                .unwrap(),
            config,
        }
    }
}
