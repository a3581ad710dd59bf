use async_trait::async_trait;

use crate::{app_error::AppResult, domain::entities::entitlement::EntitlementClaims};

/// Non-authoritative copy of entitlement fields attached to a user's auth claims.
#[async_trait]
pub trait ClaimsMirror: Send + Sync {
    async fn set_claims(&self, user_id: &str, claims: EntitlementClaims) -> AppResult<()>;
}
