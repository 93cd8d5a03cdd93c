use async_trait::async_trait;
use serde_json::Value;

use crate::auth::UserId;
use crate::models::resume::ResumeRow;

pub struct NewResume<'a> {
    pub user_id: &'a UserId,
    pub title: &'a str,
    pub template: &'a str,
    pub data: &'a Value,
}

/// Persistence for resume rows, scoped by owner.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn count_for_user(&self, user_id: &UserId) -> Result<i64, sqlx::Error>;

    /// Newest first.
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ResumeRow>, sqlx::Error>;

    async fn insert(&self, resume: NewResume<'_>) -> Result<ResumeRow, sqlx::Error>;
}
