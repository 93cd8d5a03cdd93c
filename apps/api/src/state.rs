use std::sync::Arc;

use crate::auth::SessionResolver;
use crate::config::Config;
use crate::entitlements::BillingStore;
use crate::llm_client::LlmClient;
use crate::resumes::store::ResumeStore;
use crate::storage::ResourceStore;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Collaborators sit behind traits so the production wiring (Redis, S3,
/// Postgres) and the in-memory test doubles are interchangeable.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionResolver>,
    pub files: Arc<dyn ResourceStore>,
    pub billing: Arc<dyn BillingStore>,
    pub resumes: Arc<dyn ResumeStore>,
    pub llm: LlmClient,
    pub config: Config,
}
