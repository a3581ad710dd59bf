use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{app_error::AppResult, domain::entities::purchase::StorePlatform};

/// What the client sent us to prove a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum VerificationRequest {
    Google {
        product_id: Option<String>,
        purchase_token: String,
        is_subscription: bool,
    },
    Apple {
        receipt_data: String,
        product_id: Option<String>,
    },
}

impl VerificationRequest {
    pub fn platform(&self) -> StorePlatform {
        match self {
            VerificationRequest::Google { .. } => StorePlatform::Google,
            VerificationRequest::Apple { .. } => StorePlatform::Apple,
        }
    }

    /// Raw token or receipt as submitted by the client.
    pub fn token(&self) -> &str {
        match self {
            VerificationRequest::Google { purchase_token, .. } => purchase_token,
            VerificationRequest::Apple { receipt_data, .. } => receipt_data,
        }
    }

    pub fn product_id(&self) -> Option<&str> {
        match self {
            VerificationRequest::Google { product_id, .. }
            | VerificationRequest::Apple { product_id, .. } => product_id.as_deref(),
        }
    }
}

/// Store-confirmed state of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub platform: StorePlatform,
    pub product_id: Option<String>,
    pub status: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled: bool,
    /// Stable purchase identity when the store has one (Apple's original
    /// transaction id). Receipts change on renewal; this does not.
    #[serde(default)]
    pub purchase_identity: Option<String>,
}

#[async_trait]
pub trait PurchaseVerifier: Send + Sync {
    /// Ask the store about a purchase. Network and store failures surface as
    /// `AppError::UpstreamUnavailable`.
    async fn verify(&self, request: &VerificationRequest) -> AppResult<VerificationResult>;
}
