use async_trait::async_trait;

use crate::auth::UserId;
use crate::models::subscription::SubscriptionRow;

/// Read access to billing state.
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn find_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRow>, sqlx::Error>;
}
