use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::claims_mirror::ClaimsMirror,
    domain::entities::entitlement::EntitlementClaims,
    infra::InfraError,
};

/// Mirrors entitlement claims into a Redis hash per user, read by the token
/// issuer when it mints access tokens.
#[derive(Clone)]
pub struct RedisClaimsMirror {
    manager: ConnectionManager,
}

impl RedisClaimsMirror {
    pub async fn new(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url).map_err(InfraError::RedisConnection)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(InfraError::RedisConnection)?;
        Ok(Self { manager })
    }

    fn key(user_id: &str) -> String {
        format!("claims:{user_id}")
    }
}

fn claim_fields(claims: &EntitlementClaims) -> [(&'static str, String); 3] {
    [
        ("plan", claims.plan.to_string()),
        ("is_premium", claims.is_premium.to_string()),
        ("access_plan", claims.access_plan.to_string()),
    ]
}

#[async_trait]
impl ClaimsMirror for RedisClaimsMirror {
    async fn set_claims(&self, user_id: &str, claims: EntitlementClaims) -> AppResult<()> {
        let mut conn = self.manager.clone();

        let _: () = conn
            .hset_multiple(Self::key(user_id), &claim_fields(&claims)[..])
            .await
            .map_err(|e| AppError::UpstreamUnavailable(e.to_string()))?;

        Ok(())
    }
}
