// Entitlements: premium status from the subscription record and the
// free-tier resume quota that gates resume creation.

pub mod evaluator;
pub mod handlers;
pub mod store;

pub use evaluator::{can_create_resume, is_premium, quota_for, QuotaDecision, ResumeLimit};
pub use store::BillingStore;
