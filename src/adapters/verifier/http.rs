use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::purchase_verifier::{
        PurchaseVerifier, VerificationRequest, VerificationResult,
    },
    infra::{InfraError, http_client::try_build_client},
};

/// Client for the store verification service, which holds the Google Play
/// and App Store credentials and answers with the store's view of a purchase.
pub struct HttpPurchaseVerifier {
    client: Client,
    endpoint: Url,
}

impl HttpPurchaseVerifier {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = try_build_client(timeout).map_err(InfraError::HttpClient)?;
        Ok(Self {
            client,
            endpoint: verify_endpoint(base_url),
        })
    }
}

fn verify_endpoint(base_url: &Url) -> Url {
    let mut endpoint = base_url.clone();
    if let Ok(mut segments) = endpoint.path_segments_mut() {
        segments.pop_if_empty().push("verify");
    }
    endpoint
}

#[async_trait]
impl PurchaseVerifier for HttpPurchaseVerifier {
    async fn verify(&self, request: &VerificationRequest) -> AppResult<VerificationResult> {
        debug!(platform = %request.platform(), "Verifying purchase with store");

        self.client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Verifier request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::UpstreamUnavailable(format!("Verifier rejected purchase: {e}")))?
            .json::<VerificationResult>()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Verifier response invalid: {e}")))
    }
}
