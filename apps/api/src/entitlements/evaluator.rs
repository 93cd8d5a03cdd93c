//! Entitlement decisions.
//!
//! Nothing here is cached: every call re-reads the subscription and resume
//! count, so a lapsed subscription is noticed on the next decision. The
//! quota check and the subsequent insert are separate statements, so two
//! concurrent creates by the same user can both pass the check.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::auth::UserId;
use crate::entitlements::store::BillingStore;
use crate::errors::AppError;
use crate::models::subscription::SubscriptionRow;
use crate::resumes::store::ResumeStore;

/// Resumes a user without premium may own.
pub const FREE_RESUME_LIMIT: i64 = 3;

/// Upper bound on resumes; serialized as a number, or `null` when unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeLimit {
    Limited(i64),
    Unbounded,
}

impl Serialize for ResumeLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResumeLimit::Limited(n) => serializer.serialize_i64(*n),
            ResumeLimit::Unbounded => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for ResumeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeLimit::Limited(n) => write!(f, "{n}"),
            ResumeLimit::Unbounded => f.write_str("unlimited"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub current: i64,
    pub limit: ResumeLimit,
}

/// Premium iff the paid period has not ended and the subscription is not
/// set to cancel at period end.
pub fn is_premium_at(subscription: Option<&SubscriptionRow>, now: DateTime<Utc>) -> bool {
    subscription.is_some_and(|s| s.current_period_end > now && !s.cancel_at_period_end)
}

pub async fn is_premium(billing: &dyn BillingStore, user_id: &UserId) -> Result<bool, AppError> {
    let subscription = billing.find_subscription(user_id).await?;
    Ok(is_premium_at(subscription.as_ref(), Utc::now()))
}

/// Quota given an already-known premium status.
///
/// Premium users are not counted: `current` is reported as 0 for them.
pub async fn quota_for(
    premium: bool,
    resumes: &dyn ResumeStore,
    user_id: &UserId,
) -> Result<QuotaDecision, AppError> {
    if premium {
        return Ok(QuotaDecision {
            allowed: true,
            current: 0,
            limit: ResumeLimit::Unbounded,
        });
    }

    let current = resumes.count_for_user(user_id).await?;
    debug!("User {user_id} owns {current}/{FREE_RESUME_LIMIT} resumes");
    Ok(QuotaDecision {
        allowed: current < FREE_RESUME_LIMIT,
        current,
        limit: ResumeLimit::Limited(FREE_RESUME_LIMIT),
    })
}

pub async fn can_create_resume(
    billing: &dyn BillingStore,
    resumes: &dyn ResumeStore,
    user_id: &UserId,
) -> Result<QuotaDecision, AppError> {
    let premium = is_premium(billing, user_id).await?;
    quota_for(premium, resumes, user_id).await
}
